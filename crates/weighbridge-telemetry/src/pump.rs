//! Async ingestion loop: reads the telemetry source until it ends

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};
use weighbridge_types::WeightSample;

use crate::framer::{FramerStats, TelemetryFramer};

const READ_BUFFER_SIZE: usize = 1024;

/// Why the stream stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum StreamEndReason {
    /// The source closed
    Eof,
    /// A read failed after the source was open
    Failed(String),
    /// The session was shut down before the source ended
    Stopped,
}

impl std::fmt::Display for StreamEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamEndReason::Eof => write!(f, "end of stream"),
            StreamEndReason::Failed(e) => write!(f, "read failed: {}", e),
            StreamEndReason::Stopped => write!(f, "stopped"),
        }
    }
}

/// End-of-stream signal returned by [`pump`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamEnd {
    pub reason: StreamEndReason,
    pub stats: FramerStats,
    /// Unterminated bytes discarded at the end
    pub discarded_tail: usize,
}

/// Read `reader` to the end, passing every sample to `sink`.
///
/// A broken stream is not an error here: the caller gets a `StreamEnd` either
/// way and decides about reconnecting.
pub async fn pump<R, F>(mut reader: R, framer: &mut TelemetryFramer, mut sink: F) -> StreamEnd
where
    R: AsyncRead + Unpin,
    F: FnMut(WeightSample),
{
    let mut buf = [0u8; READ_BUFFER_SIZE];

    let reason = loop {
        match reader.read(&mut buf).await {
            Ok(0) => break StreamEndReason::Eof,
            Ok(n) => {
                for sample in framer.push(&buf[..n]) {
                    sink(sample);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "telemetry read failed");
                break StreamEndReason::Failed(e.to_string());
            }
        }
    };

    let discarded_tail = framer.finish();
    if discarded_tail > 0 {
        debug!(bytes = discarded_tail, "unterminated telemetry tail discarded");
    }
    let stats = framer.stats();
    info!(%reason, parsed = stats.lines_parsed, dropped = stats.lines_dropped, "telemetry stream ended");

    StreamEnd {
        reason,
        stats,
        discarded_tail,
    }
}
