//! Conversation-state coordination.
//!
//! The [`ConversationController`] owns the active conversation id, the
//! materialized message list for that conversation, and at most one
//! stream session. Switching conversations or submitting a new query
//! always cancels the prior in-flight session and waits for its teardown
//! before any new state is loaded, so two conversations' deltas can never
//! interleave in the transcript.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::accumulator::{MessageAccumulator, TranscriptSnapshot};
use crate::error::{Error, Result};
use crate::logger::StreamLogger;
use crate::observability;
use crate::session::{ChatTransport, SessionOutcome, StreamSession, StreamState};
use crate::types::{ChatRequest, ConversationId, Message, QueryOptions};

/// Read-only access to persisted conversation history.
///
/// The external store is the system of record; the controller reads one
/// snapshot on activation and appends locally as the stream progresses.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// List a conversation's messages, ordered by creation time.
    async fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;
}

struct ActiveSession {
    cancel: CancellationToken,
    state: watch::Receiver<StreamState>,
    handle: JoinHandle<SessionOutcome>,
}

/// Owns the set of known conversation state and the single allowed
/// in-flight stream session.
pub struct ConversationController {
    transport: Arc<dyn ChatTransport>,
    history: Arc<dyn HistoryStore>,
    logger: Option<Arc<dyn StreamLogger>>,
    active_conversation: Option<ConversationId>,
    messages: Vec<Message>,
    session: Option<ActiveSession>,
    snapshot_tx: watch::Sender<TranscriptSnapshot>,
}

impl ConversationController {
    /// Create a controller over the given transport and history store.
    pub fn new(transport: Arc<dyn ChatTransport>, history: Arc<dyn HistoryStore>) -> Self {
        let (snapshot_tx, _) = watch::channel(TranscriptSnapshot::default());
        Self {
            transport,
            history,
            logger: None,
            active_conversation: None,
            messages: Vec::new(),
            session: None,
            snapshot_tx,
        }
    }

    /// Attaches a logger passed to every stream session.
    pub fn with_logger(mut self, logger: Arc<dyn StreamLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Subscribe to transcript snapshots for the active conversation.
    pub fn subscribe(&self) -> watch::Receiver<TranscriptSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Returns the current transcript snapshot.
    pub fn transcript(&self) -> TranscriptSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Returns the active conversation id, if any.
    pub fn active_conversation(&self) -> Option<&ConversationId> {
        self.active_conversation.as_ref()
    }

    /// Returns the lifecycle state of the current session, `Idle` if none
    /// was ever started.
    pub fn session_state(&self) -> StreamState {
        self.session
            .as_ref()
            .map(|session| *session.state.borrow())
            .unwrap_or(StreamState::Idle)
    }

    /// Returns true while a session is in a non-terminal state.
    pub fn has_active_session(&self) -> bool {
        !self.session_state().is_terminal() && self.session.is_some()
    }

    /// Switch to a conversation, cancelling any in-flight stream first,
    /// then loading its history from the external store.
    ///
    /// A failed load is non-fatal: the conversation stays selected with an
    /// empty transcript and the error is returned to the caller. No
    /// automatic retry is attempted.
    pub async fn select_conversation(&mut self, conversation_id: ConversationId) -> Result<()> {
        self.cancel_active().await;
        self.active_conversation = Some(conversation_id.clone());

        observability::HISTORY_LOADS.click();
        match self.history.list_messages(&conversation_id).await {
            Ok(messages) => {
                self.messages = messages;
                self.publish();
                Ok(())
            }
            Err(err) => {
                observability::HISTORY_LOAD_ERRORS.click();
                self.messages.clear();
                self.publish();
                Err(err)
            }
        }
    }

    /// Submit a query against the active conversation.
    ///
    /// Rejects with a validation error, before any transport call, when
    /// the query is empty or no conversation is active. Otherwise cancels
    /// any prior session, appends the user message optimistically, and
    /// starts a new stream session.
    pub async fn send_query(&mut self, query: &str, options: QueryOptions) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::validation(
                "query must not be empty",
                Some("message".to_string()),
            ));
        }
        let Some(conversation_id) = self.active_conversation.clone() else {
            return Err(Error::validation("no active conversation", None));
        };

        self.cancel_active().await;
        let request = ChatRequest::new(query)
            .with_session(conversation_id)
            .with_options(options.clone());
        self.start_session(query, request, options);
        Ok(())
    }

    /// Start a fresh conversation with an opening query.
    ///
    /// The request names no conversation; the backend creates one and
    /// announces its id in the stream's opening `session` event, which the
    /// controller adopts when the session is reaped.
    pub async fn start_conversation(&mut self, query: &str, options: QueryOptions) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::validation(
                "query must not be empty",
                Some("message".to_string()),
            ));
        }

        self.cancel_active().await;
        self.active_conversation = None;
        self.messages.clear();
        let request = ChatRequest::new(query).with_options(options.clone());
        self.start_session(query, request, options);
        Ok(())
    }

    /// Cancel the in-flight session, if any, and wait for its teardown.
    ///
    /// Returns the session's outcome. Idempotent: a session that already
    /// reached a terminal state is simply reaped.
    pub async fn cancel_active(&mut self) -> Option<SessionOutcome> {
        let active = self.session.take()?;
        active.cancel.cancel();
        match active.handle.await {
            Ok(outcome) => {
                self.absorb_outcome(&outcome);
                Some(outcome)
            }
            Err(_) => None,
        }
    }

    /// Wait for the in-flight session to reach a terminal state on its
    /// own, without cancelling it, and reap the result.
    pub async fn await_active(&mut self) -> Option<SessionOutcome> {
        let active = self.session.take()?;
        match active.handle.await {
            Ok(outcome) => {
                self.absorb_outcome(&outcome);
                Some(outcome)
            }
            Err(_) => None,
        }
    }

    fn start_session(&mut self, query: &str, request: ChatRequest, options: QueryOptions) {
        let accumulator = MessageAccumulator::new(self.messages.clone(), query);
        let mut session = StreamSession::new(self.transport.clone(), request, accumulator)
            .with_snapshot_sender(self.snapshot_tx.clone());
        if let Some(deadline) = options.deadline {
            session = session.with_deadline(deadline);
        }
        if let Some(logger) = &self.logger {
            session = session.with_logger(logger.clone());
        }

        let cancel = session.cancellation_token();
        let state = session.subscribe_state();
        let handle = tokio::spawn(session.run());
        self.session = Some(ActiveSession {
            cancel,
            state,
            handle,
        });
    }

    /// Fold a terminated session's result back into controller state.
    fn absorb_outcome(&mut self, outcome: &SessionOutcome) {
        self.messages = outcome.transcript.to_vec();
        if self.active_conversation.is_none() {
            self.active_conversation = outcome.conversation_id.clone();
        }
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(TranscriptSnapshot::new(self.messages.clone()));
    }
}
