//! Domain services

pub mod identification;
pub mod ledger;
pub mod stability;

pub use identification::VehicleIdentifier;
pub use ledger::{LedgerOutcome, LedgerSummary, SentinelPolicy, TicketLedger, VisitCapture};
pub use stability::{DetectorState, StabilityDetector, StabilityThresholds, TruckStableEvent};
