//! Line-delimited frame decoding for streamed chat responses.
//!
//! The backend delivers its answer as newline-separated lines in which a
//! data frame is any line prefixed with `data: `. Network reads split that
//! stream at arbitrary byte offsets, so a chunk may contain zero, one, or
//! several complete frames, and a frame may straddle two reads. The
//! decoder buffers the unconsumed tail between reads and only ever emits
//! complete lines.

/// Literal prefix that marks a data frame, trailing space included.
pub const DATA_PREFIX: &str = "data: ";

/// One logical protocol unit extracted from the raw stream.
///
/// Frames are ephemeral: they are handed to the interpreter immediately
/// and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The raw text after the `data: ` prefix. May be empty.
    pub payload: String,
}

impl Frame {
    /// Create a new `Frame` with the given payload.
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}

/// Stateful splitter from raw bytes to [`Frame`]s.
///
/// The residual buffer is owned by exactly one stream session and must be
/// discarded with it; it is never reused across sessions. The buffer holds
/// bytes rather than text so a UTF-8 sequence split across two reads
/// cannot corrupt the tail; each complete line is validated on its own.
///
/// The decoder never fails: unrecognized lines, blank lines, and lines
/// that are not valid UTF-8 yield fewer frames, not an error.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    residual: Vec<u8>,
}

impl FrameDecoder {
    /// Create a decoder with an empty residual buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of raw bytes, returning every frame completed by it.
    ///
    /// Every complete line in the concatenation of the residual and the
    /// chunk is consumed; a trailing fragment without a line terminator is
    /// re-buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.residual.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.residual.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.residual.drain(..=pos).collect();
            line.pop();
            if let Some(frame) = decode_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Consume any residual line at end of stream.
    ///
    /// A final data line without a trailing terminator is still a frame;
    /// without this call it would be lost silently.
    pub fn flush(&mut self) -> Option<Frame> {
        if self.residual.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.residual);
        decode_line(&line)
    }
}

/// Decode one complete line into a frame, or drop it.
///
/// Only `data: `-prefixed lines become frames; blank lines, comments, and
/// unrecognized prefixes never reach the interpreter.
fn decode_line(line: &[u8]) -> Option<Frame> {
    let line = match line {
        [head @ .., b'\r'] => head,
        _ => line,
    };
    let text = std::str::from_utf8(line).ok()?;
    let payload = text.strip_prefix(DATA_PREFIX)?;
    Some(Frame::new(payload))
}
