//! Port for the external audit service.

use async_trait::async_trait;

use crate::domain::correlation::CorrelationHeaders;
use crate::domain::{AuditRecordRequest, DependencyKind, DependencyTarget};

use super::define_port_error;

define_port_error! {
    /// Errors raised by audit trail adapters.
    pub enum AuditTrailError {
        /// No audit endpoint is configured.
        NotConfigured => "audit endpoint is not configured",
        /// The audit service asked the caller to back off.
        Throttled { message: String } =>
            "audit service throttled the request: {message}",
        /// The audit service answered with a non-success status.
        Rejected { status: u16, message: String } =>
            "audit service rejected the record with status {status}: {message}",
        /// The audit service could not be reached.
        Transport { message: String } =>
            "audit service request failed: {message}",
        /// No answer arrived in time.
        Timeout { message: String } =>
            "audit service timed out: {message}",
    }
}

impl AuditTrailError {
    /// HTTP status reported by the audit service, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Throttled { .. } => Some(429),
            _ => None,
        }
    }
}

/// Acknowledgement from the audit service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditReceipt {
    /// HTTP status of the accepted request.
    pub status: u16,
}

/// Port for recording audit entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Describe the endpoint for dependency telemetry.
    fn dependency_target(&self) -> DependencyTarget;

    /// Record one audit entry, forwarding the correlation headers.
    async fn record(
        &self,
        request: &AuditRecordRequest,
        headers: &CorrelationHeaders,
    ) -> Result<AuditReceipt, AuditTrailError>;
}

/// Audit trail used when no endpoint is configured.
///
/// Every call fails, so audit-gated operations are refused rather than
/// silently going unaudited.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredAuditTrail;

#[async_trait]
impl AuditTrail for UnconfiguredAuditTrail {
    fn dependency_target(&self) -> DependencyTarget {
        DependencyTarget {
            kind: DependencyKind::Http,
            data: "POST <unconfigured>".to_owned(),
            name: "<unconfigured>".to_owned(),
            target: "<unconfigured>".to_owned(),
        }
    }

    async fn record(
        &self,
        _request: &AuditRecordRequest,
        _headers: &CorrelationHeaders,
    ) -> Result<AuditReceipt, AuditTrailError> {
        Err(AuditTrailError::not_configured())
    }
}
