use std::time::Duration;

use crate::types::SearchType;

/// Per-query configuration supplied alongside the user's message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Backend generation profile to use; the backend default when `None`.
    pub model: Option<String>,

    /// Optional instruction prefix for the generation.
    pub system_prompt: Option<String>,

    /// Which retrieval profile the backend should use.
    pub search_type: SearchType,

    /// Caller identity forwarded to the backend for attribution.
    pub user_id: Option<String>,

    /// Optional overall deadline for the streamed response. Expiry takes
    /// the same path as an explicit cancellation.
    pub deadline: Option<Duration>,
}

impl QueryOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the generation model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Sets the retrieval profile.
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Sets the caller identity.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the response deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
