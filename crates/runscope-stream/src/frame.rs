//! Incremental SSE frame splitter.
//!
//! Frames are blank-line delimited; each useful frame carries an
//! `event:` line and a `data:` line (other lines ignored). Frames
//! missing either line are dropped silently and the stream continues.
//! The parser accepts arbitrary chunk boundaries, including boundaries
//! inside a multi-byte UTF-8 character, by buffering bytes and only
//! decoding complete frames.

use tracing::debug;

/// One parsed SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: String,
    pub data: String,
}

/// Stateful splitter fed with raw transport chunks.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every frame completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        // CR stripping makes CRLF and LF streams identical.
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_delimiter(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            let text = String::from_utf8_lossy(&raw[..end]);
            match parse_frame(&text) {
                Some(frame) => frames.push(frame),
                None => debug!("incomplete SSE frame dropped"),
            }
        }
        frames
    }
}

fn find_delimiter(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}

fn parse_frame(text: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data = Some(rest.trim_start().to_string());
        }
        // Comments and other fields (id:, retry:) are ignored.
    }
    Some(SseFrame {
        event: event?,
        data: data?,
    })
}
