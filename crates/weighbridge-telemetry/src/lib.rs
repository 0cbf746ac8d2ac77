//! Scale telemetry: turns the raw indicator byte stream into weight readings

pub mod extract;
pub mod framer;
pub mod latest;
pub mod pump;
pub mod source;

pub use extract::{extract_weight, numeric_tokens};
pub use framer::{FramerStats, TelemetryFramer, MAX_LINE_LEN};
pub use latest::LatestWeight;
pub use pump::{pump, StreamEnd, StreamEndReason};
pub use source::{Parity, SerialSettings, TelemetrySource};
