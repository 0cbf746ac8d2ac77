//! Line framing for the scale byte stream

use bytes::{Buf, BytesMut};
use serde::Serialize;
use tracing::{trace, warn};
use weighbridge_types::WeightSample;

use crate::extract::extract_weight;

/// Lines longer than this (terminator excluded) are dropped whole
pub const MAX_LINE_LEN: usize = 4096;

/// Counters kept by the framer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FramerStats {
    /// Lines that produced a sample
    pub lines_parsed: u64,
    /// Complete lines without a numeric token
    pub lines_dropped: u64,
    /// Lines over `MAX_LINE_LEN`
    pub lines_oversized: u64,
}

/// Reassembles `\n` / `\r\n` terminated lines from arbitrarily split chunks
/// and emits one sample per line that carries a number.
///
/// Splitting a stream into any partition of chunks yields the same samples as
/// delivering it at once. An unterminated tail is held back until more bytes
/// arrive and is never emitted on its own.
#[derive(Debug)]
pub struct TelemetryFramer {
    buffer: BytesMut,
    /// Set while skipping the rest of an oversized line
    discarding: bool,
    max_line_len: usize,
    stats: FramerStats,
}

impl TelemetryFramer {
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
            discarding: false,
            max_line_len,
            stats: FramerStats::default(),
        }
    }

    /// Feed a chunk and collect the samples for every line it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<WeightSample> {
        let mut samples = Vec::new();
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }

            let mut end = pos;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }
            if end > self.max_line_len {
                self.note_oversized();
                continue;
            }
            if let Some(sample) = self.parse_line(&line[..end]) {
                samples.push(sample);
            }
        }

        // Bound memory on a stream that never sends a terminator. One extra
        // byte is tolerated for a `\r` whose `\n` is still in flight.
        if !self.discarding && self.buffer.len() > self.max_line_len + 1 {
            self.note_oversized();
            self.discarding = true;
        }
        if self.discarding {
            self.buffer.clear();
        }

        samples
    }

    fn parse_line(&mut self, raw: &[u8]) -> Option<WeightSample> {
        let line = String::from_utf8_lossy(raw);
        match extract_weight(&line) {
            Some(value) => {
                self.stats.lines_parsed += 1;
                Some(WeightSample::new(value))
            }
            None => {
                self.stats.lines_dropped += 1;
                trace!(line = %line, "telemetry line without a reading dropped");
                None
            }
        }
    }

    fn note_oversized(&mut self) {
        self.stats.lines_oversized += 1;
        warn!(limit = self.max_line_len, "oversized telemetry line dropped");
    }

    /// Bytes held back waiting for a terminator
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// End of stream: discard the unterminated tail and report its size
    pub fn finish(&mut self) -> usize {
        let pending = self.buffer.remaining();
        self.buffer.clear();
        self.discarding = false;
        pending
    }
}

impl Default for TelemetryFramer {
    fn default() -> Self {
        Self::new()
    }
}
