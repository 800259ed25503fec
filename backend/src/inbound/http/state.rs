//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain services and remain testable without I/O.

use crate::domain::RecordServices;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Factory for the request-scoped record services.
    pub services: RecordServices,
}

impl HttpState {
    /// Construct state around the record services.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use backend::domain::RecordServices;
    /// use backend::domain::ports::UnconfiguredAuditTrail;
    /// use backend::inbound::http::state::HttpState;
    /// use backend::outbound::document_store::InMemoryDocumentStore;
    ///
    /// let services = RecordServices::new(
    ///     Arc::new(InMemoryDocumentStore::new("patient-tests")),
    ///     Arc::new(UnconfiguredAuditTrail),
    /// );
    /// let state = HttpState::new(services);
    /// let _services = state.services.clone();
    /// ```
    pub fn new(services: RecordServices) -> Self {
        Self { services }
    }
}
