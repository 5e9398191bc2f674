// Public modules
pub mod accumulator;
pub mod client;
pub mod controller;
pub mod delta;
pub mod error;
pub mod frame;
pub mod logger;
pub mod observability;
pub mod session;
pub mod types;

// Re-exports
pub use accumulator::{MessageAccumulator, TranscriptSnapshot};
pub use client::{BackendClient, StaticTokenProvider, TokenProvider};
pub use controller::{ConversationController, HistoryStore};
pub use delta::{Delta, interpret};
pub use error::{Error, Result};
pub use frame::{DATA_PREFIX, Frame, FrameDecoder};
pub use logger::StreamLogger;
pub use session::{ByteStream, ChatTransport, SessionOutcome, StreamSession, StreamState};
pub use types::*;
