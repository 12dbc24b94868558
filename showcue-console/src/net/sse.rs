//! Incremental SSE frame parsing
//!
//! The event stream arrives as arbitrary byte chunks that do not respect
//! frame boundaries. The parser accumulates text and emits complete frames
//! (terminated by a blank line) as they become available. Comment lines
//! (keep-alives) and unknown fields are skipped per the SSE wire format.

use showcue_common::NavEvent;
use tracing::debug;

/// One complete server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field, if present
    pub event: Option<String>,
    /// Concatenated `data:` lines
    pub data: String,
}

/// Push-based SSE parser, resilient to chunk boundaries anywhere
#[derive(Default)]
pub struct SseFrameParser {
    buffer: String,
}

impl SseFrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of stream text; returns every frame completed by it
    pub fn push(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        // A frame ends at a blank line; tolerate \r\n line endings
        loop {
            let (at, len) = match (self.buffer.find("\n\n"), self.buffer.find("\r\n\r\n")) {
                (Some(lf), Some(crlf)) if crlf < lf => (crlf, 4),
                (Some(lf), _) => (lf, 2),
                (None, Some(crlf)) => (crlf, 4),
                (None, None) => break,
            };
            let raw: String = self.buffer.drain(..at + len).collect();
            if let Some(frame) = parse_frame(&raw) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in raw.lines() {
        if line.starts_with(':') {
            // Comment / keep-alive
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value.to_string()),
            _ => {}
        }
    }

    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

/// Decode a frame's data payload into a navigation event
pub fn decode_event(frame: &SseFrame) -> Option<NavEvent> {
    if frame.data.is_empty() {
        return None;
    }
    match serde_json::from_str(&frame.data) {
        Ok(event) => Some(event),
        Err(err) => {
            debug!(error = %err, data = %frame.data, "unparseable event frame");
            None
        }
    }
}
