//! Vehicle identification adapters

mod command;
mod reply;

pub use command::CommandIdentifier;
pub use reply::parse_recognizer_output;
