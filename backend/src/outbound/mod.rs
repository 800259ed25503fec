//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **document_store**: in-process document collections
//! - **audit**: reqwest client for the downstream audit service
//! - **telemetry**: dependency telemetry sinks (log stream or HTTP ingestion)
//!
//! Adapters are thin translators between domain types and the wire. They
//! contain no business logic.

pub mod audit;
pub mod document_store;
pub mod telemetry;
