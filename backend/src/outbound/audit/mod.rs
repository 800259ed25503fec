//! Audit service adapters.

mod http_audit_trail;

pub use http_audit_trail::{AUDIT_KEY_HEADER, HttpAuditTrail};
