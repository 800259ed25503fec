//! Fail-closed audit gate.
//!
//! A gated operation runs only after its audit record has been accepted.
//! When auditing fails for any reason (rejection, transport, timeout,
//! missing configuration) the operation is never started.
//!
//! Slow audits are bounded by [`TimeoutAuditTrail`], which sits beneath the
//! telemetry decorator so a timed-out call is still reported.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::correlation::{CorrelationHeaders, CorrelationService};
use crate::domain::ports::{AuditReceipt, AuditTrail, AuditTrailError};
use crate::domain::{AuditRecordRequest, AuditResource, DependencyTarget};

/// Why a gated operation did not complete.
#[derive(Debug, Error)]
pub enum AuditGateError<E> {
    /// The audit record could not be written; the operation was not run.
    #[error("auditing failed: {0}")]
    AuditingFailed(#[source] AuditTrailError),
    /// The operation itself failed after a successful audit.
    #[error(transparent)]
    Primary(E),
}

/// Runs operations behind an audit record.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use backend::domain::correlation::CorrelationService;
/// use backend::domain::ports::UnconfiguredAuditTrail;
/// use backend::domain::{
///     AuditGate, AuditGateError, AuditOperation, AuditResource, ResourceType,
/// };
///
/// async fn read_patient(correlation: Arc<CorrelationService>) {
///     let gate = AuditGate::new(Arc::new(UnconfiguredAuditTrail), correlation);
///     let resource = AuditResource::new(ResourceType::Patient, "p-1", AuditOperation::Read);
///     let outcome = gate
///         .guard(resource, || async { Ok::<_, std::io::Error>("record") })
///         .await;
///     assert!(matches!(outcome, Err(AuditGateError::AuditingFailed(_))));
/// }
/// ```
#[derive(Clone)]
pub struct AuditGate {
    trail: Arc<dyn AuditTrail>,
    correlation: Arc<CorrelationService>,
}

impl AuditGate {
    /// Gate writing through `trail`, correlated with `correlation`.
    pub fn new(trail: Arc<dyn AuditTrail>, correlation: Arc<CorrelationService>) -> Self {
        Self { trail, correlation }
    }

    /// Audit `resource`, then run `primary` exactly once.
    pub async fn guard<T, E, F, Fut>(
        &self,
        resource: AuditResource,
        primary: F,
    ) -> Result<T, AuditGateError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Err(error) = self.record(resource).await {
            warn!(
                %error,
                operation_id = %self.correlation.operation_id(),
                "audit failed; operation refused"
            );
            return Err(AuditGateError::AuditingFailed(error));
        }
        primary().await.map_err(AuditGateError::Primary)
    }

    async fn record(&self, resource: AuditResource) -> Result<(), AuditTrailError> {
        let request = AuditRecordRequest::new(resource);
        let headers = self.correlation.outgoing_headers();
        let receipt = self.trail.record(&request, &headers).await?;
        debug!(
            status = receipt.status,
            resource_type = ?request.resource.resource_type,
            operation = ?request.resource.operation,
            "audit record accepted"
        );
        Ok(())
    }
}

/// Audit trail decorator failing calls that outlast a time limit.
///
/// Without a limit calls pass straight through.
pub struct TimeoutAuditTrail<A: ?Sized> {
    inner: Arc<A>,
    limit: Option<Duration>,
}

impl<A: ?Sized> TimeoutAuditTrail<A> {
    /// Wrap `inner`, failing calls slower than `limit`.
    pub fn new(inner: Arc<A>, limit: Option<Duration>) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<A> AuditTrail for TimeoutAuditTrail<A>
where
    A: AuditTrail + ?Sized,
{
    fn dependency_target(&self) -> DependencyTarget {
        self.inner.dependency_target()
    }

    async fn record(
        &self,
        request: &AuditRecordRequest,
        headers: &CorrelationHeaders,
    ) -> Result<AuditReceipt, AuditTrailError> {
        let call = self.inner.record(request, headers);
        match self.limit {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AuditTrailError::timeout(format!("no answer within {} ms", limit.as_millis()))
            })?,
            None => call.await,
        }
    }
}
