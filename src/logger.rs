//! Logging trait for stream pipeline operations.
//!
//! This module provides the [`StreamLogger`] trait that allows callers to
//! capture every frame and delta passing through a stream session, plus
//! the session's final outcome.

use crate::delta::Delta;
use crate::frame::Frame;
use crate::session::SessionOutcome;

/// A trait for logging stream session activity.
///
/// Implement this trait to record the raw protocol traffic and its
/// interpretation, for example to replay a problematic stream offline.
///
/// # Example
///
/// ```rust,ignore
/// use ragchat::{Delta, Frame, SessionOutcome, StreamLogger};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl StreamLogger for FileLogger {
///     fn log_frame(&self, frame: &Frame) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "frame: {}", frame.payload).unwrap();
///     }
///
///     fn log_delta(&self, delta: &Delta) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "delta: {delta:?}").unwrap();
///     }
///
///     fn log_outcome(&self, outcome: &SessionOutcome) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "outcome: {:?}", outcome.state).unwrap();
///     }
/// }
/// ```
pub trait StreamLogger: Send + Sync {
    /// Log one frame as it is decoded from the wire.
    fn log_frame(&self, frame: &Frame);

    /// Log the interpreted delta for a frame.
    fn log_delta(&self, delta: &Delta);

    /// Log the terminal outcome of a session.
    ///
    /// Called exactly once per session, whether it completed, failed, or
    /// was cancelled.
    fn log_outcome(&self, outcome: &SessionOutcome);
}
