//! Telemetry sink that writes dependency records to the log stream.

use tracing::info;

use crate::domain::TaggedDependency;
use crate::domain::ports::{TelemetrySink, TelemetrySinkError};

/// Emits one structured `info` event per dependency call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn submit(&self, dependency: TaggedDependency) -> Result<(), TelemetrySinkError> {
        let TaggedDependency { dependency, tags } = dependency;
        info!(
            target: "dependency",
            operation_id = %tags.operation_id,
            operation_name = %tags.operation_name,
            operation_parent_id = %tags.operation_parent_id,
            dependency_type = %dependency.dependency_type,
            name = %dependency.name,
            target_host = %dependency.target,
            data = %dependency.data,
            duration_ms = u64::try_from(dependency.duration.as_millis()).unwrap_or(u64::MAX),
            result_code = %dependency.result_code,
            success = dependency.success,
            "dependency call"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use std::time::Duration;

    use chrono::Utc;

    use super::*;
    use crate::domain::{DependencyKind, DependencyTelemetry, OperationTags};

    #[test]
    fn submission_always_succeeds() {
        let record = TaggedDependency {
            dependency: DependencyTelemetry {
                data: "POST https://audit.local/api/audit".to_owned(),
                dependency_type: DependencyKind::Http,
                duration: Duration::from_millis(12),
                timestamp: Utc::now(),
                result_code: "201".to_owned(),
                success: true,
                name: "POST /api/audit".to_owned(),
                target: "audit.local".to_owned(),
            },
            tags: OperationTags {
                operation_id: "0af7651916cd43dd8448eb211c80319c".to_owned(),
                operation_name: "POST /api/v1/patients".to_owned(),
                operation_parent_id: "|0af7651916cd43dd8448eb211c80319c.b7ad6b7169203331."
                    .to_owned(),
            },
        };
        assert!(TracingTelemetrySink.submit(record).is_ok());
    }
}
