//! Folds deltas into a render-ready conversation transcript.
//!
//! The accumulator owns the in-progress transcript for one conversation
//! turn. Each fold returns an immutable [`TranscriptSnapshot`]; prior
//! snapshots remain valid, so renderers can hold one across await points
//! without synchronization.

use std::sync::Arc;

use crate::delta::Delta;
use crate::types::Message;

/// An immutable, point-in-time view of a conversation's message list.
///
/// Cloning is cheap (shared ownership of the backing list). Snapshots
/// taken before a fold are unaffected by it.
#[derive(Debug, Clone, Default)]
pub struct TranscriptSnapshot {
    messages: Arc<[Message]>,
}

impl TranscriptSnapshot {
    /// Create a snapshot from a message list.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into(),
        }
    }

    /// Returns the messages in creation order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the trailing message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Copies the messages into an owned list.
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.to_vec()
    }
}

/// Folds a stream's deltas into the trailing assistant message.
///
/// Constructed per stream with the user's triggering query already in
/// place; immediately appends an empty assistant message as the mutation
/// target. Content only ever grows, in delta arrival order. Once the
/// message is sealed (stream end, error, or cancellation) every further
/// fold is a no-op.
#[derive(Debug)]
pub struct MessageAccumulator {
    messages: Vec<Message>,
    sealed: bool,
    snapshot: TranscriptSnapshot,
}

impl MessageAccumulator {
    /// Create an accumulator over the prior transcript plus the user's
    /// triggering query.
    pub fn new(mut history: Vec<Message>, query: impl Into<String>) -> Self {
        history.push(Message::user(query));
        history.push(Message::assistant(""));
        let snapshot = TranscriptSnapshot::new(history.clone());
        Self {
            messages: history,
            sealed: false,
            snapshot,
        }
    }

    /// Fold one delta and return the resulting snapshot.
    pub fn apply(&mut self, delta: &Delta) -> TranscriptSnapshot {
        if self.sealed {
            return self.snapshot.clone();
        }
        match delta {
            Delta::TextAppend { text } => {
                if let Some(message) = self.messages.last_mut() {
                    message.content.push_str(text);
                }
                self.rebuild_snapshot();
            }
            Delta::ToolUse { tools } => {
                if let Some(message) = self.messages.last_mut() {
                    message.tool_calls.extend(tools.iter().cloned());
                }
                self.rebuild_snapshot();
            }
            Delta::StreamEnd => {
                self.sealed = true;
            }
            Delta::StreamError { .. } => {
                // Partial content stays visible; the error is reported by
                // the session, not reflected in the transcript.
                self.sealed = true;
            }
            Delta::SessionStart { .. } | Delta::Malformed { .. } | Delta::Ignored => {}
        }
        self.snapshot.clone()
    }

    /// Seal the trailing assistant message without folding a delta.
    ///
    /// Used on cancellation and transport failure, where no frame carries
    /// the termination.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Returns true once the trailing assistant message is immutable.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Returns the current snapshot without folding anything.
    pub fn snapshot(&self) -> TranscriptSnapshot {
        self.snapshot.clone()
    }

    fn rebuild_snapshot(&mut self) {
        self.snapshot = TranscriptSnapshot::new(self.messages.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageRole, ToolInvocation};
    use serde_json::json;

    fn text(s: &str) -> Delta {
        Delta::TextAppend {
            text: s.to_string(),
        }
    }

    fn trailing_content(snapshot: &TranscriptSnapshot) -> String {
        snapshot.last().unwrap().content.clone()
    }

    #[test]
    fn constructor_appends_query_and_empty_assistant() {
        let accumulator = MessageAccumulator::new(Vec::new(), "hello?");
        let snapshot = accumulator.snapshot();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.messages()[0].role, MessageRole::User);
        assert_eq!(snapshot.messages()[0].content, "hello?");
        assert_eq!(snapshot.messages()[1].role, MessageRole::Assistant);
        assert_eq!(snapshot.messages()[1].content, "");
    }

    #[test]
    fn text_appends_accumulate_in_order() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        accumulator.apply(&text("Hel"));
        let snapshot = accumulator.apply(&text("lo"));
        assert_eq!(trailing_content(&snapshot), "Hello");
    }

    #[test]
    fn content_is_prefix_extended_by_every_fold() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        let mut previous = trailing_content(&accumulator.snapshot());
        for fragment in ["a", "", "bc", "def", ""] {
            let snapshot = accumulator.apply(&text(fragment));
            let current = trailing_content(&snapshot);
            assert!(current.starts_with(&previous));
            previous = current;
        }
    }

    #[test]
    fn prior_snapshots_unaffected_by_later_folds() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        let early = accumulator.apply(&text("one"));
        accumulator.apply(&text(" two"));

        assert_eq!(trailing_content(&early), "one");
        assert_eq!(trailing_content(&accumulator.snapshot()), "one two");
    }

    #[test]
    fn stream_end_seals_without_content_change() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        accumulator.apply(&text("done"));
        let sealed = accumulator.apply(&Delta::StreamEnd);

        assert!(accumulator.is_sealed());
        assert_eq!(trailing_content(&sealed), "done");

        let after = accumulator.apply(&text(" late"));
        assert_eq!(trailing_content(&after), "done");
    }

    #[test]
    fn stream_error_preserves_partial_content() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        accumulator.apply(&text("partial answ"));
        let snapshot = accumulator.apply(&Delta::StreamError {
            message: "backend failure".to_string(),
        });

        assert!(accumulator.is_sealed());
        assert_eq!(trailing_content(&snapshot), "partial answ");
    }

    #[test]
    fn ignored_and_malformed_are_noops() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        accumulator.apply(&text("stable"));
        let a = accumulator.apply(&Delta::Ignored);
        let b = accumulator.apply(&Delta::Malformed {
            message: "malformed payload".to_string(),
        });
        assert_eq!(trailing_content(&a), "stable");
        assert_eq!(trailing_content(&b), "stable");
    }

    #[test]
    fn tool_use_attaches_to_assistant_message() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        accumulator.apply(&text("answer"));
        let snapshot = accumulator.apply(&Delta::ToolUse {
            tools: vec![ToolInvocation::new("vector_search", json!({"q": "x"}))],
        });

        let last = snapshot.last().unwrap();
        assert_eq!(last.tool_calls.len(), 1);
        assert_eq!(last.tool_calls[0].tool_name, "vector_search");
    }

    #[test]
    fn seal_without_delta() {
        let mut accumulator = MessageAccumulator::new(Vec::new(), "q");
        accumulator.apply(&text("cut off"));
        accumulator.seal();
        let after = accumulator.apply(&text(" more"));
        assert_eq!(trailing_content(&after), "cut off");
    }

    #[test]
    fn history_precedes_new_turn() {
        let history = vec![Message::user("old q"), Message::assistant("old a")];
        let accumulator = MessageAccumulator::new(history, "new q");
        let snapshot = accumulator.snapshot();

        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.messages()[0].content, "old q");
        assert_eq!(snapshot.messages()[2].content, "new q");
    }
}
