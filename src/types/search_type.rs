use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Retrieval profiles offered by the backend.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Semantic similarity search over the vector store.
    Vector,

    /// Entity/relationship search over the knowledge graph.
    Graph,

    /// Combined vector and graph retrieval.
    #[default]
    Hybrid,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchType::Vector => write!(f, "vector"),
            SearchType::Graph => write!(f, "graph"),
            SearchType::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Error returned when parsing an invalid search type string.
#[derive(Debug)]
pub struct SearchTypeParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for SearchTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown search type: {}", self.invalid_value)
    }
}

impl std::error::Error for SearchTypeParseError {}

impl FromStr for SearchType {
    type Err = SearchTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vector" => Ok(SearchType::Vector),
            "graph" => Ok(SearchType::Graph),
            "hybrid" => Ok(SearchType::Hybrid),
            _ => Err(SearchTypeParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization() {
        let json = serde_json::to_string(&SearchType::Hybrid).unwrap();
        assert_eq!(json, r#""hybrid""#);

        let json = serde_json::to_string(&SearchType::Vector).unwrap();
        assert_eq!(json, r#""vector""#);
    }

    #[test]
    fn deserialization() {
        let search: SearchType = serde_json::from_str(r#""graph""#).unwrap();
        assert_eq!(search, SearchType::Graph);
    }

    #[test]
    fn from_str_round_trip() {
        for variant in [SearchType::Vector, SearchType::Graph, SearchType::Hybrid] {
            let parsed = variant.to_string().parse::<SearchType>().unwrap();
            assert_eq!(parsed, variant);
        }
        assert!("keyword".parse::<SearchType>().is_err());
    }

    #[test]
    fn default_is_hybrid() {
        assert_eq!(SearchType::default(), SearchType::Hybrid);
    }
}
