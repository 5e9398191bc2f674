//! Stream session lifecycle management.
//!
//! A [`StreamSession`] drives exactly one streamed request/response: it
//! opens the stream through a [`ChatTransport`], pulls raw chunks, feeds
//! them through the frame decoder and delta interpreter into the message
//! accumulator, and publishes a fresh transcript snapshot after every
//! delta that changes state. It terminates on end-of-input, explicit
//! cancellation, or transport error; a new query always constructs a new
//! session.

use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::accumulator::{MessageAccumulator, TranscriptSnapshot};
use crate::delta::{Delta, interpret};
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameDecoder};
use crate::logger::StreamLogger;
use crate::observability;
use crate::types::{ChatRequest, ConversationId};

/// The raw response body as a stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Transport seam for opening a streamed chat response.
///
/// Implemented by [`BackendClient`](crate::client::BackendClient) over
/// HTTP and by in-memory fixtures in tests. A successful open means the
/// transport confirmed a streamable body; `Error::NoStreamBody` means a
/// success status without one.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open the stream for the given request.
    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream>;
}

/// Lifecycle states of a stream session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// Constructed, not yet started.
    Idle,

    /// Request sent; waiting for the transport to confirm a body.
    Sending,

    /// Pulling chunks from the response body.
    Streaming,

    /// The transport reached end-of-input.
    Completed,

    /// Stopped by explicit cancellation or deadline expiry.
    Cancelled,

    /// Stopped by a transport error or a backend-reported stream error.
    Failed,
}

impl StreamState {
    /// Returns true for states with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Cancelled | StreamState::Failed
        )
    }
}

/// The terminal result of driving a session to completion.
#[derive(Debug)]
pub struct SessionOutcome {
    /// The terminal state the session reached.
    pub state: StreamState,

    /// The final transcript snapshot, partial content included.
    pub transcript: TranscriptSnapshot,

    /// The conversation this stream belonged to: the requested one, or
    /// the server-assigned id announced in the opening `session` event.
    pub conversation_id: Option<ConversationId>,

    /// The failure, when `state` is `Failed`. Cancellation is not a
    /// failure and carries no error.
    pub error: Option<Error>,
}

/// Drives one request/stream lifecycle.
pub struct StreamSession {
    transport: Arc<dyn ChatTransport>,
    request: ChatRequest,
    accumulator: MessageAccumulator,
    cancel: CancellationToken,
    deadline: Option<Duration>,
    logger: Option<Arc<dyn StreamLogger>>,
    conversation_id: Option<ConversationId>,
    state_tx: watch::Sender<StreamState>,
    snapshot_tx: watch::Sender<TranscriptSnapshot>,
}

impl StreamSession {
    /// Create a session over the given transport and accumulator.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        request: ChatRequest,
        accumulator: MessageAccumulator,
    ) -> Self {
        let conversation_id = request.session_id.clone();
        let (state_tx, _) = watch::channel(StreamState::Idle);
        let (snapshot_tx, _) = watch::channel(accumulator.snapshot());
        Self {
            transport,
            request,
            accumulator,
            cancel: CancellationToken::new(),
            deadline: None,
            logger: None,
            conversation_id,
            state_tx,
            snapshot_tx,
        }
    }

    /// Sets an overall deadline; expiry takes the cancellation path.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches a logger for frames, deltas, and the outcome.
    pub fn with_logger(mut self, logger: Arc<dyn StreamLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Publish snapshots through an externally owned channel instead of
    /// the session's own. The current snapshot is published immediately.
    pub fn with_snapshot_sender(mut self, sender: watch::Sender<TranscriptSnapshot>) -> Self {
        sender.send_replace(self.accumulator.snapshot());
        self.snapshot_tx = sender;
        self
    }

    /// Returns a token that cancels this session when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to lifecycle state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to transcript snapshots.
    pub fn subscribe_snapshots(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Drive the session to a terminal state.
    pub async fn run(mut self) -> SessionOutcome {
        observability::SESSIONS_STARTED.click();
        let started = Instant::now();
        let outcome = self.drive().await;
        observability::SESSION_DURATION.add(started.elapsed().as_secs_f64());
        match outcome.state {
            StreamState::Completed => observability::SESSIONS_COMPLETED.click(),
            StreamState::Cancelled => observability::SESSIONS_CANCELLED.click(),
            StreamState::Failed => observability::SESSIONS_FAILED.click(),
            _ => {}
        }
        if let Some(logger) = &self.logger {
            logger.log_outcome(&outcome);
        }
        outcome
    }

    async fn drive(&mut self) -> SessionOutcome {
        if self.request.message.trim().is_empty() {
            return self.fail(Error::validation(
                "query must not be empty",
                Some("message".to_string()),
            ));
        }

        self.set_state(StreamState::Sending);
        let cancel = self.cancel.clone();
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.transport.open_stream(&self.request) => Some(opened),
        };
        let mut stream = match opened {
            None => return self.finish_cancelled(),
            Some(Ok(stream)) => stream,
            Some(Err(err)) => return self.fail(err),
        };

        self.set_state(StreamState::Streaming);
        let opened_at = Instant::now();
        let mut awaiting_first_chunk = true;
        let mut decoder = FrameDecoder::new();

        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expiry);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.finish_cancelled(),
                _ = &mut expiry => {
                    // Deadline expiry and explicit cancellation share one path.
                    cancel.cancel();
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        if awaiting_first_chunk {
                            observability::STREAM_TTFB.add(opened_at.elapsed().as_secs_f64());
                            awaiting_first_chunk = false;
                        }
                        observability::STREAM_CHUNKS.click();
                        for frame in decoder.push(&bytes) {
                            if let Some(outcome) = self.handle_frame(frame) {
                                return outcome;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        observability::STREAM_ERRORS.click();
                        return self.fail(err);
                    }
                    None => {
                        if let Some(frame) = decoder.flush() {
                            if let Some(outcome) = self.handle_frame(frame) {
                                return outcome;
                            }
                        }
                        self.accumulator.seal();
                        self.publish_snapshot();
                        self.set_state(StreamState::Completed);
                        return self.outcome(StreamState::Completed, None);
                    }
                },
            }
        }
    }

    /// Decode, interpret, and fold one frame. Returns a terminal outcome
    /// when the frame ends the session.
    fn handle_frame(&mut self, frame: Frame) -> Option<SessionOutcome> {
        observability::STREAM_FRAMES.click();
        if let Some(logger) = &self.logger {
            logger.log_frame(&frame);
        }
        let delta = interpret(&frame.payload);
        if let Some(logger) = &self.logger {
            logger.log_delta(&delta);
        }
        match &delta {
            Delta::Malformed { .. } => {
                observability::STREAM_MALFORMED_FRAMES.click();
                None
            }
            Delta::Ignored => None,
            Delta::SessionStart { conversation_id } => {
                if self.conversation_id.is_none() {
                    self.conversation_id = Some(conversation_id.clone());
                }
                None
            }
            Delta::StreamError { message } => {
                let message = message.clone();
                observability::STREAM_ERRORS.click();
                self.accumulator.apply(&delta);
                self.publish_snapshot();
                self.set_state(StreamState::Failed);
                Some(self.outcome(StreamState::Failed, Some(Error::streaming(message, None))))
            }
            Delta::TextAppend { .. } | Delta::ToolUse { .. } | Delta::StreamEnd => {
                let snapshot = self.accumulator.apply(&delta);
                self.snapshot_tx.send_replace(snapshot);
                None
            }
        }
    }

    fn fail(&mut self, error: Error) -> SessionOutcome {
        self.accumulator.seal();
        self.publish_snapshot();
        self.set_state(StreamState::Failed);
        self.outcome(StreamState::Failed, Some(error))
    }

    fn finish_cancelled(&mut self) -> SessionOutcome {
        self.accumulator.seal();
        self.publish_snapshot();
        self.set_state(StreamState::Cancelled);
        self.outcome(StreamState::Cancelled, None)
    }

    fn outcome(&self, state: StreamState, error: Option<Error>) -> SessionOutcome {
        SessionOutcome {
            state,
            transcript: self.accumulator.snapshot(),
            conversation_id: self.conversation_id.clone(),
            error,
        }
    }

    fn set_state(&self, state: StreamState) {
        self.state_tx.send_replace(state);
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(self.accumulator.snapshot());
    }
}
