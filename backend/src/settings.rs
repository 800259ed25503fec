//! Application settings loaded via OrthoConfig.
//!
//! Every value can come from `PATIENT_TESTS_*` environment variables, a
//! configuration file or the command line. Unset values fall back to the
//! defaults exposed by the accessors.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::{
    CollectionNames, DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, RetrySettings,
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_NAME: &str = "patient-tests";
/// Request timeout for outbound HTTP clients without an explicit setting.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for the patient tests service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PATIENT_TESTS")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// Name of the document database.
    pub database_name: Option<String>,
    /// Collection holding patients.
    pub patient_collection: Option<String>,
    /// Collection holding tests.
    pub test_collection: Option<String>,
    /// Collection holding accepted audit records.
    pub audit_collection: Option<String>,
    /// Endpoint the audit trail posts records to.
    pub audit_api_url: Option<String>,
    /// Static credential sent to the audit endpoint.
    pub audit_api_key: Option<String>,
    /// Upper bound on one audit call, in milliseconds.
    pub audit_timeout_ms: Option<u64>,
    /// Retries allowed after a throttled first attempt.
    pub retry_max_attempts: Option<u32>,
    /// Pause between throttled attempts, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Telemetry ingestion endpoint.
    pub telemetry_url: Option<String>,
    /// Instrumentation key stamped on telemetry envelopes.
    pub instrumentation_key: Option<String>,
    /// Log dependency telemetry instead of shipping it.
    #[ortho_config(default = false)]
    pub telemetry_log_only: bool,
}

/// Settings that are present but malformed.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not `host:port`.
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    /// A configured endpoint is not a URL.
    #[error("invalid {setting} URL {value:?}: {source}")]
    Url {
        setting: &'static str,
        value: String,
        source: url::ParseError,
    },
}

fn parse_url(setting: &'static str, value: Option<&str>) -> Result<Option<Url>, SettingsError> {
    value
        .map(|raw| {
            Url::parse(raw).map_err(|source| SettingsError::Url {
                setting,
                value: raw.to_owned(),
                source,
            })
        })
        .transpose()
}

impl AppSettings {
    /// Return the bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|source| SettingsError::BindAddr {
            value: value.to_owned(),
            source,
        })
    }

    /// Return the database name, falling back to `patient-tests`.
    pub fn database_name(&self) -> &str {
        self.database_name
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_NAME)
    }

    /// Return the collection names, each falling back to its default.
    pub fn collection_names(&self) -> CollectionNames {
        let defaults = CollectionNames::default();
        CollectionNames {
            patients: self
                .patient_collection
                .clone()
                .unwrap_or(defaults.patients),
            tests: self.test_collection.clone().unwrap_or(defaults.tests),
            audits: self.audit_collection.clone().unwrap_or(defaults.audits),
        }
    }

    /// Return the audit endpoint, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Url`] when the value is not a URL.
    pub fn audit_api_url(&self) -> Result<Option<Url>, SettingsError> {
        parse_url("audit API", self.audit_api_url.as_deref())
    }

    /// Return the audit credential, empty when unset.
    pub fn audit_api_key(&self) -> &str {
        self.audit_api_key.as_deref().unwrap_or_default()
    }

    /// Return the audit call bound, if configured.
    pub fn audit_timeout(&self) -> Option<Duration> {
        self.audit_timeout_ms.map(Duration::from_millis)
    }

    /// Return the retry settings, each falling back to its default.
    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            max_attempts: self
                .retry_max_attempts
                .unwrap_or(DEFAULT_MAX_RETRY_ATTEMPTS),
            delay: self
                .retry_delay_ms
                .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis),
        }
    }

    /// Return the telemetry ingestion endpoint, if configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Url`] when the value is not a URL.
    pub fn telemetry_url(&self) -> Result<Option<Url>, SettingsError> {
        parse_url("telemetry", self.telemetry_url.as_deref())
    }

    /// Return the instrumentation key, empty when unset.
    pub fn instrumentation_key(&self) -> &str {
        self.instrumentation_key.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 13] = [
        "PATIENT_TESTS_BIND_ADDR",
        "PATIENT_TESTS_DATABASE_NAME",
        "PATIENT_TESTS_PATIENT_COLLECTION",
        "PATIENT_TESTS_TEST_COLLECTION",
        "PATIENT_TESTS_AUDIT_COLLECTION",
        "PATIENT_TESTS_AUDIT_API_URL",
        "PATIENT_TESTS_AUDIT_API_KEY",
        "PATIENT_TESTS_AUDIT_TIMEOUT_MS",
        "PATIENT_TESTS_RETRY_MAX_ATTEMPTS",
        "PATIENT_TESTS_RETRY_DELAY_MS",
        "PATIENT_TESTS_TELEMETRY_URL",
        "PATIENT_TESTS_INSTRUMENTATION_KEY",
        "PATIENT_TESTS_TELEMETRY_LOG_ONLY",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("patient-tests")])
            .expect("config should load")
    }

    fn with_overrides(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(with_overrides(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default bind addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("socket addr")
        );
        assert_eq!(settings.database_name(), "patient-tests");
        assert_eq!(settings.collection_names(), CollectionNames::default());
        assert!(settings.audit_api_url().expect("no url").is_none());
        assert!(settings.audit_timeout().is_none());
        assert_eq!(settings.retry_settings(), RetrySettings::default());
        assert!(!settings.telemetry_log_only);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(with_overrides(&[
            ("PATIENT_TESTS_BIND_ADDR", "127.0.0.1:9000"),
            ("PATIENT_TESTS_TEST_COLLECTION", "lab-tests"),
            ("PATIENT_TESTS_AUDIT_API_URL", "https://audit.example.net/api/audit"),
            ("PATIENT_TESTS_AUDIT_TIMEOUT_MS", "2500"),
            ("PATIENT_TESTS_RETRY_MAX_ATTEMPTS", "3"),
            ("PATIENT_TESTS_RETRY_DELAY_MS", "50"),
            ("PATIENT_TESTS_TELEMETRY_LOG_ONLY", "true"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr().expect("bind addr").port(), 9000);
        assert_eq!(settings.collection_names().tests, "lab-tests");
        assert_eq!(settings.collection_names().patients, "patients");
        assert_eq!(
            settings
                .audit_api_url()
                .expect("valid url")
                .map(|url| url.host_str().map(str::to_owned)),
            Some(Some("audit.example.net".to_owned()))
        );
        assert_eq!(settings.audit_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(
            settings.retry_settings(),
            RetrySettings {
                max_attempts: 3,
                delay: Duration::from_millis(50),
            }
        );
        assert!(settings.telemetry_log_only);
    }

    #[rstest]
    fn malformed_bind_addresses_are_reported() {
        let _guard = lock_env(with_overrides(&[("PATIENT_TESTS_BIND_ADDR", "nowhere")]));

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }

    #[rstest]
    fn malformed_urls_name_the_setting() {
        let _guard = lock_env(with_overrides(&[("PATIENT_TESTS_TELEMETRY_URL", "not a url")]));

        let settings = load_from_empty_args();
        let error = settings.telemetry_url().expect_err("invalid url");
        assert!(error.to_string().starts_with("invalid telemetry URL"));
    }
}
