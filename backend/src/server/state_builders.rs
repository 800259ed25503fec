//! Builders turning settings into adapters and record services.

use std::io;
use std::sync::Arc;

use tracing::{info, warn};

use backend::domain::RecordServices;
use backend::domain::ports::{AuditTrail, DocumentStore, TelemetrySink, UnconfiguredAuditTrail};
use backend::outbound::audit::HttpAuditTrail;
use backend::outbound::document_store::InMemoryDocumentStore;
use backend::outbound::telemetry::{HttpTelemetrySink, TracingTelemetrySink};
use backend::settings::{AppSettings, DEFAULT_HTTP_TIMEOUT};

use super::ServerConfig;

fn settings_error(error: impl std::fmt::Display) -> io::Error {
    io::Error::other(error.to_string())
}

/// Build the audit trail, failing closed when no endpoint is configured.
///
/// # Errors
/// Returns [`io::Error`] when the endpoint is malformed or the HTTP client
/// cannot be built.
pub(crate) fn build_audit_trail(settings: &AppSettings) -> io::Result<Arc<dyn AuditTrail>> {
    match settings.audit_api_url().map_err(settings_error)? {
        Some(url) => {
            let timeout = settings.audit_timeout().unwrap_or(DEFAULT_HTTP_TIMEOUT);
            info!(endpoint = %url, "auditing through the audit API");
            let trail = HttpAuditTrail::new(url, settings.audit_api_key(), timeout)
                .map_err(settings_error)?;
            Ok(Arc::new(trail))
        }
        None => {
            warn!("no audit API configured; audited operations will be refused");
            Ok(Arc::new(UnconfiguredAuditTrail))
        }
    }
}

/// Build the dependency telemetry sink.
///
/// Telemetry is shipped to the ingestion endpoint when one is configured and
/// logging is not forced; otherwise it is written to the log stream.
///
/// # Errors
/// Returns [`io::Error`] when the endpoint is malformed or the HTTP client
/// cannot be built.
pub(crate) fn build_telemetry_sink(settings: &AppSettings) -> io::Result<Arc<dyn TelemetrySink>> {
    let endpoint = settings.telemetry_url().map_err(settings_error)?;
    match endpoint {
        Some(url) if !settings.telemetry_log_only => {
            info!(endpoint = %url, "shipping dependency telemetry");
            let sink =
                HttpTelemetrySink::new(url, settings.instrumentation_key(), DEFAULT_HTTP_TIMEOUT)
                    .map_err(settings_error)?;
            Ok(Arc::new(sink))
        }
        _ => Ok(Arc::new(TracingTelemetrySink)),
    }
}

/// Build the record services over `store`.
pub(crate) fn build_record_services(
    settings: &AppSettings,
    store: Arc<dyn DocumentStore>,
    audit_trail: Arc<dyn AuditTrail>,
) -> RecordServices {
    RecordServices::new(store, audit_trail)
        .with_collection_names(settings.collection_names())
        .with_retry(settings.retry_settings())
        .with_audit_timeout(settings.audit_timeout())
}

/// Assemble the server configuration from settings.
///
/// # Errors
/// Propagates failures from the individual builders and the bind address.
pub fn build_server_config(settings: &AppSettings) -> io::Result<ServerConfig> {
    let bind_addr = settings.bind_addr().map_err(settings_error)?;
    let store: Arc<dyn DocumentStore> =
        Arc::new(InMemoryDocumentStore::new(settings.database_name()));
    let audit_trail = build_audit_trail(settings)?;
    let telemetry = build_telemetry_sink(settings)?;
    let services = build_record_services(settings, store, audit_trail);
    Ok(ServerConfig::new(bind_addr, services).with_telemetry(Some(telemetry)))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the settings-driven builders.

    use std::ffi::OsString;

    use backend::domain::correlation::CorrelationHeaders;
    use backend::domain::ports::AuditTrailError;
    use backend::domain::{AuditOperation, AuditRecordRequest, AuditResource, ResourceType};
    use env_lock::lock_env;
    use ortho_config::OrthoConfig;
    use rstest::rstest;

    use super::*;

    fn settings(vars: &[(&'static str, Option<&str>)]) -> AppSettings {
        let _guard = lock_env(
            vars.iter()
                .map(|(name, value)| (*name, value.map(str::to_owned))),
        );
        AppSettings::load_from_iter([OsString::from("patient-tests")]).expect("settings load")
    }

    #[rstest]
    #[tokio::test]
    async fn missing_audit_endpoint_fails_closed() {
        let settings = settings(&[("PATIENT_TESTS_AUDIT_API_URL", None)]);
        let trail = build_audit_trail(&settings).expect("trail builds");

        let error = trail
            .record(
                &AuditRecordRequest::new(AuditResource::new(
                    ResourceType::Patient,
                    "p-1",
                    AuditOperation::Read,
                )),
                &CorrelationHeaders::default(),
            )
            .await
            .expect_err("refused");

        assert_eq!(error, AuditTrailError::NotConfigured);
    }

    #[rstest]
    fn malformed_audit_endpoint_is_an_error() {
        let settings = settings(&[("PATIENT_TESTS_AUDIT_API_URL", Some("::nope"))]);
        assert!(build_audit_trail(&settings).is_err());
    }

    #[rstest]
    fn malformed_telemetry_endpoint_is_an_error() {
        let settings = settings(&[
            ("PATIENT_TESTS_TELEMETRY_URL", Some("::nope")),
            ("PATIENT_TESTS_TELEMETRY_LOG_ONLY", None),
        ]);
        assert!(build_telemetry_sink(&settings).is_err());
    }

    #[rstest]
    fn server_config_uses_the_bind_address() {
        let settings = settings(&[
            ("PATIENT_TESTS_BIND_ADDR", Some("127.0.0.1:9911")),
            ("PATIENT_TESTS_AUDIT_API_URL", None),
            ("PATIENT_TESTS_TELEMETRY_URL", None),
        ]);
        let config = build_server_config(&settings).expect("config builds");
        assert_eq!(config.bind_addr().port(), 9911);
        assert!(config.telemetry.is_some());
    }
}
