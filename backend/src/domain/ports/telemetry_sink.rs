//! Port for shipping dependency telemetry.
//!
//! Submission is synchronous and must not block the request path: adapters
//! either log inline or hand the record to a background task.

use crate::domain::TaggedDependency;

use super::define_port_error;

define_port_error! {
    /// Errors raised by telemetry sink adapters.
    pub enum TelemetrySinkError {
        /// The sink cannot accept records right now.
        Unavailable { message: String } =>
            "telemetry sink unavailable: {message}",
        /// The record could not be encoded for the sink.
        Encoding { message: String } =>
            "telemetry record could not be encoded: {message}",
    }
}

/// Destination for tagged dependency records.
#[cfg_attr(test, mockall::automock)]
pub trait TelemetrySink: Send + Sync {
    /// Accept one record for delivery.
    fn submit(&self, dependency: TaggedDependency) -> Result<(), TelemetrySinkError>;
}
