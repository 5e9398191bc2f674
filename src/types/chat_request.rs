use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, QueryOptions, SearchType};

/// Request body for the backend's streaming chat endpoint.
///
/// `session_id` is omitted for a fresh conversation; the backend then
/// creates one and announces it in the stream's opening `session` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's query text.
    pub message: String,

    /// Conversation to continue, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<ConversationId>,

    /// Caller identity forwarded for attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Retrieval profile for this query.
    #[serde(default)]
    pub search_type: SearchType,

    /// Generation profile override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Instruction prefix for the generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// Create a request for the given message with default options.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: None,
            user_id: None,
            search_type: SearchType::default(),
            model: None,
            system_prompt: None,
        }
    }

    /// Targets an existing conversation.
    pub fn with_session(mut self, session_id: ConversationId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    /// Applies per-query options to the request.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.search_type = options.search_type;
        self.model = options.model;
        self.system_prompt = options.system_prompt;
        self.user_id = options.user_id;
        self
    }
}
