use biometrics::{Collector, Counter, Moments};

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("ragchat.stream.chunks");
pub(crate) static STREAM_FRAMES: Counter = Counter::new("ragchat.stream.frames");
pub(crate) static STREAM_MALFORMED_FRAMES: Counter =
    Counter::new("ragchat.stream.malformed_frames");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("ragchat.stream.errors");
pub(crate) static STREAM_TTFB: Moments = Moments::new("ragchat.stream.ttfb_seconds");

pub(crate) static SESSIONS_STARTED: Counter = Counter::new("ragchat.session.started");
pub(crate) static SESSIONS_COMPLETED: Counter = Counter::new("ragchat.session.completed");
pub(crate) static SESSIONS_CANCELLED: Counter = Counter::new("ragchat.session.cancelled");
pub(crate) static SESSIONS_FAILED: Counter = Counter::new("ragchat.session.failed");
pub(crate) static SESSION_DURATION: Moments =
    Moments::new("ragchat.session.duration_seconds");

pub(crate) static HISTORY_LOADS: Counter = Counter::new("ragchat.history.loads");
pub(crate) static HISTORY_LOAD_ERRORS: Counter = Counter::new("ragchat.history.load_errors");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_MALFORMED_FRAMES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_moments(&STREAM_TTFB);

    collector.register_counter(&SESSIONS_STARTED);
    collector.register_counter(&SESSIONS_COMPLETED);
    collector.register_counter(&SESSIONS_CANCELLED);
    collector.register_counter(&SESSIONS_FAILED);
    collector.register_moments(&SESSION_DURATION);

    collector.register_counter(&HISTORY_LOADS);
    collector.register_counter(&HISTORY_LOAD_ERRORS);
}
