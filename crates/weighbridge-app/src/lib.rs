//! Application layer - configuration and the weighbridge session runtime

pub mod config;
pub mod session;

pub use config::Config;
pub use session::{
    Session, SessionEvent, SessionHandle, SessionReport, SessionSettings, Trigger,
};
