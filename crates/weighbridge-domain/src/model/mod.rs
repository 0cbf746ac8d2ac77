//! Domain model types

pub mod material;
pub mod ticket;

pub use material::{Material, MaterialCatalog};
pub use ticket::{Ticket, TicketStatus, WeighLeg};
