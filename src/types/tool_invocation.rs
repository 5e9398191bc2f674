use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record of one tool call the backend agent performed while answering.
///
/// The backend reports these in a single `tools` event near the end of a
/// stream; they are attached to the assistant message for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Name of the tool that was invoked.
    pub tool_name: String,

    /// Arguments the agent passed to the tool.
    #[serde(default)]
    pub args: Value,

    /// Backend-assigned identifier for this call, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ToolInvocation {
    /// Create a new `ToolInvocation` with the given tool name and arguments.
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
            tool_call_id: None,
        }
    }

    /// Sets the backend-assigned call id.
    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserialization_from_backend_shape() {
        let json = json!({
            "tool_name": "vector_search",
            "args": {"query": "rust streams", "limit": 5},
            "tool_call_id": "call_789"
        });

        let tool: ToolInvocation = serde_json::from_value(json).unwrap();
        assert_eq!(tool.tool_name, "vector_search");
        assert_eq!(tool.args["limit"], 5);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_789"));
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = json!({"tool_name": "list_documents"});

        let tool: ToolInvocation = serde_json::from_value(json).unwrap();
        assert_eq!(tool.args, Value::Null);
        assert!(tool.tool_call_id.is_none());
    }
}
