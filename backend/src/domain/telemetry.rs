//! Dependency telemetry records and the timer used to measure them.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Wall-clock and monotonic stopwatch for one dependency call.
///
/// # Examples
/// ```
/// use backend::domain::Timer;
///
/// let mut timer = Timer::start();
/// timer.stop();
/// assert!(timer.ended_at() >= timer.started_at());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    started: Instant,
    started_at: DateTime<Utc>,
    elapsed: Option<Duration>,
}

impl Timer {
    /// Start measuring now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            elapsed: None,
        }
    }

    /// Freeze the measured duration. Later calls keep the first reading.
    pub fn stop(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
        }
    }

    /// Measured duration; still running timers report time so far.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// Wall-clock start time.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock start plus the measured duration.
    #[must_use]
    pub fn ended_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.duration())
            .ok()
            .and_then(|elapsed| self.started_at.checked_add_signed(elapsed))
            .unwrap_or(self.started_at)
    }
}

/// Kind of downstream dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DependencyKind {
    /// Document database.
    #[serde(rename = "mongodb")]
    DocumentStore,
    /// HTTP service.
    #[serde(rename = "HTTP")]
    Http,
}

impl DependencyKind {
    /// Wire name used by telemetry backends.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentStore => "mongodb",
            Self::Http => "HTTP",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a dependency call talks to, minus the outcome.
///
/// `data` describes the command without clinical payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTarget {
    /// Dependency kind.
    pub kind: DependencyKind,
    /// Command description.
    pub data: String,
    /// Logical name, e.g. a collection or URL path.
    pub name: String,
    /// Host or database.
    pub target: String,
}

/// One completed dependency call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyTelemetry {
    /// Command description.
    pub data: String,
    /// Dependency kind.
    #[serde(rename = "type")]
    pub dependency_type: DependencyKind,
    /// Time spent in the call.
    #[serde(serialize_with = "serialize_millis", rename = "durationMs")]
    pub duration: Duration,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
    /// `0` or an HTTP status on success, the error otherwise.
    pub result_code: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Logical name.
    pub name: String,
    /// Host or database.
    pub target: String,
}

impl DependencyTelemetry {
    /// Assemble a record from a target, a stopped timer and the outcome.
    #[must_use]
    pub fn completed(
        target: DependencyTarget,
        timer: &Timer,
        result_code: String,
        success: bool,
    ) -> Self {
        Self {
            data: target.data,
            dependency_type: target.kind,
            duration: timer.duration(),
            timestamp: timer.ended_at(),
            result_code,
            success,
            name: target.name,
            target: target.target,
        }
    }
}

/// Operation identity attached to every dependency record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationTags {
    /// Operation id.
    pub operation_id: String,
    /// Operation name.
    pub operation_name: String,
    /// Parent span id.
    pub operation_parent_id: String,
}

/// Dependency record tagged with the operation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedDependency {
    /// The record.
    #[serde(flatten)]
    pub dependency: DependencyTelemetry,
    /// Operation tags.
    pub tags: OperationTags,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}
