//! Error types for the weighbridge engine

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Telemetry source errors.
///
/// Only failing to reach the source at all is an error; a stream that ends or
/// breaks after it was opened is reported as a `StreamEnd` instead.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Cannot open telemetry source {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("Cannot apply serial line settings: {0}")]
    LineSettings(String),
}

/// Ticket ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ticket not found: {0}")]
    TicketNotFound(String),

    #[error("Ticket {id} is {status}, not open")]
    NotOpen { id: String, status: String },
}

/// Vehicle identification errors.
///
/// The session never propagates these; they are replaced by the
/// `MANUAL_CHECK` sentinel.
#[derive(Debug, Error)]
pub enum IdentificationError {
    #[error("Identification is not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} failed: {reason}")]
    Failed { program: String, reason: String },

    #[error("Cannot parse recognizer output: {0}")]
    Parse(String),

    #[error("Camera returned an empty snapshot")]
    EmptySnapshot,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Identification error: {0}")]
    Identification(#[from] IdentificationError),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Material catalog error: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, Error>;
