// Public modules
pub mod chat_request;
pub mod conversation_id;
pub mod message;
pub mod query_options;
pub mod search_type;
pub mod tool_invocation;

// Re-exports
pub use chat_request::ChatRequest;
pub use conversation_id::ConversationId;
pub use message::{Message, MessageRole};
pub use query_options::QueryOptions;
pub use search_type::{SearchType, SearchTypeParseError};
pub use tool_invocation::ToolInvocation;
