//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use backend::domain::RecordServices;
use backend::domain::correlation::RequestIdGenerator;
use backend::domain::ports::TelemetrySink;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) services: RecordServices,
    pub(crate) telemetry: Option<Arc<dyn TelemetrySink>>,
    pub(crate) request_ids: Arc<RequestIdGenerator>,
}

impl ServerConfig {
    /// Serve `services` on `bind_addr` without dependency telemetry.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, services: RecordServices) -> Self {
        Self {
            bind_addr,
            services,
            telemetry: None,
            request_ids: Arc::new(RequestIdGenerator::new()),
        }
    }

    /// Report dependency calls to `sink` and propagate correlation headers.
    #[must_use]
    pub fn with_telemetry(mut self, sink: Option<Arc<dyn TelemetrySink>>) -> Self {
        self.telemetry = sink;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
