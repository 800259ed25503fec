//! Fixed-delay retry for throttled dependency calls.
//!
//! Only errors that classify themselves as throttled are retried; anything
//! else propagates on the first attempt. Sleeping goes through
//! [`RetrySleeper`] so tests can observe delays without waiting.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::correlation::CorrelationHeaders;
use crate::domain::ports::{
    AuditReceipt, AuditTrail, AuditTrailError, CollectionError, Document, DocumentCollection,
    Filter, FindOptions, InsertOneResult, InsertOptions, Update, UpdateOneResult, UpdateOptions,
};
use crate::domain::{AuditRecordRequest, DependencyTarget};

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 10;
/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Errors that can report throttling.
pub trait Throttled {
    /// Whether the dependency asked the caller to back off.
    fn is_throttled(&self) -> bool;
}

impl Throttled for CollectionError {
    fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

impl Throttled for AuditTrailError {
    fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }
}

/// Retry limits shared by every call through one decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Retries allowed after the first attempt.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetrySettings {
    /// Fresh policy for one logical call.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.delay)
    }
}

/// Retry budget of one logical call.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use backend::domain::RetryPolicy;
///
/// let mut policy = RetryPolicy::new(2, Duration::from_millis(5));
/// assert!(policy.should_retry());
/// assert!(policy.should_retry());
/// assert!(!policy.should_retry());
/// assert_eq!(policy.attempts_made(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts_made: u32,
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Policy allowing `max_attempts` retries spaced by `delay`.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            attempts_made: 0,
            max_attempts,
            delay,
        }
    }

    /// Consume one retry if any remain.
    pub fn should_retry(&mut self) -> bool {
        if self.attempts_made < self.max_attempts {
            self.attempts_made += 1;
            true
        } else {
            false
        }
    }

    /// Pause before the next attempt.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.delay
    }

    /// Retries consumed so far.
    #[must_use]
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }
}

/// Async sleep used between attempts.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Pause for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `operation`, retrying throttled failures under one policy.
///
/// The policy is created once per call, so retries triggered by retries
/// draw from the same budget.
pub async fn run_with_retry<T, E, F, Fut>(
    settings: RetrySettings,
    sleeper: &dyn RetrySleeper,
    mut operation: F,
) -> Result<T, E>
where
    E: Throttled + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut policy = settings.policy();
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_throttled() && policy.should_retry() => {
                warn!(
                    %error,
                    attempt = policy.attempts_made(),
                    delay_ms = u64::try_from(policy.retry_delay().as_millis()).unwrap_or(u64::MAX),
                    "dependency throttled; retrying"
                );
                sleeper.sleep(policy.retry_delay()).await;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Document collection decorator that retries throttled calls.
pub struct RetryCollection<C: ?Sized> {
    inner: Arc<C>,
    settings: RetrySettings,
    sleeper: Arc<dyn RetrySleeper>,
}

impl<C: ?Sized> RetryCollection<C> {
    /// Wrap `inner`, sleeping on the tokio timer.
    pub fn new(inner: Arc<C>, settings: RetrySettings) -> Self {
        Self::with_sleeper(inner, settings, Arc::new(TokioSleeper))
    }

    /// Wrap `inner` with an explicit sleeper.
    pub fn with_sleeper(
        inner: Arc<C>,
        settings: RetrySettings,
        sleeper: Arc<dyn RetrySleeper>,
    ) -> Self {
        Self {
            inner,
            settings,
            sleeper,
        }
    }
}

#[async_trait]
impl<C> DocumentCollection for RetryCollection<C>
where
    C: DocumentCollection + ?Sized,
{
    async fn insert_one(
        &self,
        document: Document,
        options: &InsertOptions,
    ) -> Result<InsertOneResult, CollectionError> {
        run_with_retry(self.settings, self.sleeper.as_ref(), || {
            self.inner.insert_one(document.clone(), options)
        })
        .await
    }

    async fn find_one(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>, CollectionError> {
        run_with_retry(self.settings, self.sleeper.as_ref(), || {
            self.inner.find_one(filter, options)
        })
        .await
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, CollectionError> {
        run_with_retry(self.settings, self.sleeper.as_ref(), || {
            self.inner.find_many(filter, options)
        })
        .await
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateOneResult, CollectionError> {
        run_with_retry(self.settings, self.sleeper.as_ref(), || {
            self.inner.update_one(filter, update, options)
        })
        .await
    }
}

/// Audit trail decorator that retries throttled calls.
pub struct RetryAuditTrail<A: ?Sized> {
    inner: Arc<A>,
    settings: RetrySettings,
    sleeper: Arc<dyn RetrySleeper>,
}

impl<A: ?Sized> RetryAuditTrail<A> {
    /// Wrap `inner`, sleeping on the tokio timer.
    pub fn new(inner: Arc<A>, settings: RetrySettings) -> Self {
        Self::with_sleeper(inner, settings, Arc::new(TokioSleeper))
    }

    /// Wrap `inner` with an explicit sleeper.
    pub fn with_sleeper(
        inner: Arc<A>,
        settings: RetrySettings,
        sleeper: Arc<dyn RetrySleeper>,
    ) -> Self {
        Self {
            inner,
            settings,
            sleeper,
        }
    }
}

#[async_trait]
impl<A> AuditTrail for RetryAuditTrail<A>
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
        run_with_retry(self.settings, self.sleeper.as_ref(), || {
            self.inner.record(request, headers)
        })
        .await
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
