//! Weighbridge domain: materials, tickets, and the services that decide when a
//! truck is weighed and how its legs pair up.

pub mod model;
pub mod service;

pub use model::{Material, MaterialCatalog, Ticket, TicketStatus, WeighLeg};
pub use service::{
    DetectorState, LedgerOutcome, LedgerSummary, SentinelPolicy, StabilityDetector,
    StabilityThresholds, TicketLedger, TruckStableEvent, VehicleIdentifier, VisitCapture,
};
