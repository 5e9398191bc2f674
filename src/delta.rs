//! Interpretation of frame payloads into typed deltas.
//!
//! Every frame payload is a compact JSON record with a `type`
//! discriminator. Interpretation is pure and total: a payload that cannot
//! be parsed becomes a [`Delta::Malformed`] rather than an error, and a
//! well-formed record with an unrecognized `type` becomes
//! [`Delta::Ignored`] so newer backends can add event types without
//! breaking older consumers.

use serde::Deserialize;

use crate::types::{ConversationId, ToolInvocation};

/// The interpreted effect of one frame on conversation state.
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Append a text fragment to the in-progress assistant message.
    TextAppend {
        /// The fragment to append.
        text: String,
    },

    /// Opening event carrying the server-assigned conversation id.
    SessionStart {
        /// The conversation the backend routed this stream to.
        conversation_id: ConversationId,
    },

    /// Tool invocations the agent performed while answering.
    ToolUse {
        /// The reported tool calls, in invocation order.
        tools: Vec<ToolInvocation>,
    },

    /// Explicit end-of-stream sentinel.
    StreamEnd,

    /// The backend reported a failure mid-stream. Terminates the session;
    /// content accumulated so far is preserved.
    StreamError {
        /// Human-readable failure description.
        message: String,
    },

    /// The payload was not a parseable record. Never aborts the session;
    /// the frame is counted and skipped.
    Malformed {
        /// Human-readable parse failure description.
        message: String,
    },

    /// A well-formed record of an unrecognized type.
    Ignored,
}

/// Wire shape of a frame payload.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireEvent {
    Session {
        session_id: String,
    },
    Text {
        content: String,
    },
    Tools {
        tools: Vec<ToolInvocation>,
    },
    End,
    Error {
        #[serde(default)]
        content: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Interpret one frame payload into exactly one [`Delta`].
pub fn interpret(payload: &str) -> Delta {
    match serde_json::from_str::<WireEvent>(payload) {
        Ok(WireEvent::Text { content }) => Delta::TextAppend { text: content },
        Ok(WireEvent::Session { session_id }) => Delta::SessionStart {
            conversation_id: ConversationId::new(session_id),
        },
        Ok(WireEvent::Tools { tools }) => Delta::ToolUse { tools },
        Ok(WireEvent::End) => Delta::StreamEnd,
        Ok(WireEvent::Error { content }) => Delta::StreamError {
            message: content.unwrap_or_else(|| "stream error".to_string()),
        },
        Ok(WireEvent::Unknown) => Delta::Ignored,
        Err(_) => Delta::Malformed {
            message: "malformed payload".to_string(),
        },
    }
}
