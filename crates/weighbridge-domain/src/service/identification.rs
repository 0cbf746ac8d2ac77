//! Port to the external vehicle identification service

use std::future::Future;

use weighbridge_types::{Identification, IdentificationError};

/// Captures a still of the vehicle on the scale and resolves its identifier.
///
/// Implementations may return sentinel identifiers in `Ok` for low-confidence
/// reads; hard failures are returned as `Err` and replaced by the caller.
pub trait VehicleIdentifier: Send + Sync + 'static {
    fn identify(&self) -> impl Future<Output = Result<Identification, IdentificationError>> + Send;
}
