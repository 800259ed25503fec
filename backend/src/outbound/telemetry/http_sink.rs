//! Telemetry sink that ships dependency records to an ingestion endpoint.
//!
//! Records are wrapped in the Application Insights envelope and posted from
//! a background tokio task so the request path never waits on telemetry.
//! Delivery failures are logged and dropped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::warn;

use crate::domain::TaggedDependency;
use crate::domain::ports::{TelemetrySink, TelemetrySinkError};

const DEPENDENCY_BASE_TYPE: &str = "RemoteDependencyData";
const DEPENDENCY_DATA_VERSION: u8 = 2;

/// Posts dependency records to an HTTP ingestion endpoint.
#[derive(Clone)]
pub struct HttpTelemetrySink {
    client: Client,
    endpoint: Url,
    instrumentation_key: String,
}

impl HttpTelemetrySink {
    /// Build a sink with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        instrumentation_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            instrumentation_key: instrumentation_key.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    name: String,
    time: DateTime<Utc>,
    #[serde(rename = "iKey")]
    instrumentation_key: &'a str,
    tags: EnvelopeTags<'a>,
    data: EnvelopeData<'a>,
}

#[derive(Debug, Serialize)]
struct EnvelopeTags<'a> {
    #[serde(rename = "ai.operation.id")]
    operation_id: &'a str,
    #[serde(rename = "ai.operation.name")]
    operation_name: &'a str,
    #[serde(rename = "ai.operation.parentId")]
    operation_parent_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData<'a> {
    base_type: &'static str,
    base_data: DependencyData<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DependencyData<'a> {
    ver: u8,
    name: &'a str,
    data: &'a str,
    duration: String,
    result_code: &'a str,
    success: bool,
    #[serde(rename = "type")]
    dependency_type: &'static str,
    target: &'a str,
}

fn envelope<'a>(instrumentation_key: &'a str, record: &'a TaggedDependency) -> Envelope<'a> {
    let dependency = &record.dependency;
    Envelope {
        name: format!(
            "Microsoft.ApplicationInsights.{}.RemoteDependency",
            instrumentation_key.replace('-', "")
        ),
        time: dependency.timestamp,
        instrumentation_key,
        tags: EnvelopeTags {
            operation_id: &record.tags.operation_id,
            operation_name: &record.tags.operation_name,
            operation_parent_id: &record.tags.operation_parent_id,
        },
        data: EnvelopeData {
            base_type: DEPENDENCY_BASE_TYPE,
            base_data: DependencyData {
                ver: DEPENDENCY_DATA_VERSION,
                name: &dependency.name,
                data: &dependency.data,
                duration: format_duration(dependency.duration),
                result_code: &dependency.result_code,
                success: dependency.success,
                dependency_type: dependency.dependency_type.as_str(),
                target: &dependency.target,
            },
        },
    }
}

/// `d.hh:mm:ss.fff`, the ingestion format for durations.
fn format_duration(duration: Duration) -> String {
    let total_millis = duration.as_millis();
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = (total_seconds / 3600) % 24;
    let days = total_seconds / 86_400;
    format!("{days}.{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

impl TelemetrySink for HttpTelemetrySink {
    fn submit(&self, dependency: TaggedDependency) -> Result<(), TelemetrySinkError> {
        let body = serde_json::to_vec(&envelope(&self.instrumentation_key, &dependency))
            .map_err(|error| TelemetrySinkError::encoding(error.to_string()))?;
        let runtime = Handle::try_current()
            .map_err(|error| TelemetrySinkError::unavailable(error.to_string()))?;
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        let operation_id = dependency.tags.operation_id;
        runtime.spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        %operation_id,
                        status = response.status().as_u16(),
                        "telemetry ingestion rejected record"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%operation_id, %error, "telemetry ingestion failed");
                }
            }
        });
        Ok(())
    }
}
