//! Dependency telemetry sinks.

mod http_sink;
mod tracing_sink;

pub use http_sink::HttpTelemetrySink;
pub use tracing_sink::TracingTelemetrySink;
