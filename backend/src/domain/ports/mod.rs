//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Adapters for the document store, the audit service and the telemetry
//! backend implement these traits; the domain never names a concrete
//! driver.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_trail;
mod document_collection;
mod telemetry_sink;

#[cfg(test)]
pub use audit_trail::MockAuditTrail;
pub use audit_trail::{AuditReceipt, AuditTrail, AuditTrailError, UnconfiguredAuditTrail};
#[cfg(test)]
pub use document_collection::{MockDocumentCollection, MockDocumentStore};
pub use document_collection::{
    CollectionError, Document, DocumentCollection, DocumentStore, Filter, FindOptions,
    InsertOneResult, InsertOptions, THROTTLED_ERROR_CODE, Update, UpdateOneResult, UpdateOptions,
};
#[cfg(test)]
pub use telemetry_sink::MockTelemetrySink;
pub use telemetry_sink::{TelemetrySink, TelemetrySinkError};
