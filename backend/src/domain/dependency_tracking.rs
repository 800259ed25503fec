//! Dependency telemetry decorators.
//!
//! Each decorated call is timed and reported once through the request's
//! [`CorrelationService`], whatever retries happen underneath. Records
//! describe the command, never the document or update payload.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::correlation::{CorrelationHeaders, CorrelationService};
use crate::domain::ports::{
    AuditReceipt, AuditTrail, AuditTrailError, CollectionError, Document, DocumentCollection,
    Filter, FindOptions, InsertOneResult, InsertOptions, Update, UpdateOneResult, UpdateOptions,
};
use crate::domain::{
    AuditRecordRequest, DependencyKind, DependencyTarget, DependencyTelemetry, Timer,
};

/// Result code reported for successful document-store calls.
pub const STORE_SUCCESS_CODE: &str = "0";

/// Time `call` and report it as one dependency record.
///
/// The outcome is returned unchanged.
pub async fn track_dependency_call<T, E, Fut>(
    correlation: &CorrelationService,
    target: DependencyTarget,
    call: Fut,
    success_code: impl FnOnce(&T) -> String,
    failure_code: impl FnOnce(&E) -> String,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let mut timer = Timer::start();
    let outcome = call.await;
    timer.stop();
    let (result_code, success) = match &outcome {
        Ok(value) => (success_code(value), true),
        Err(error) => (failure_code(error), false),
    };
    correlation.track_dependency(DependencyTelemetry::completed(
        target,
        &timer,
        result_code,
        success,
    ));
    outcome
}

/// `{"<operation>":{"<field>":<value>}}`, the command description.
fn describe(operation: &str, field: &str, value: &impl Serialize) -> String {
    let mut arguments = Map::new();
    arguments.insert(
        field.to_owned(),
        serde_json::to_value(value).unwrap_or(Value::Null),
    );
    let mut command = Map::new();
    command.insert(operation.to_owned(), Value::Object(arguments));
    Value::Object(command).to_string()
}

/// Document collection decorator that reports every call.
pub struct TelemetryCollection<C: ?Sized> {
    inner: Arc<C>,
    correlation: Arc<CorrelationService>,
    collection: String,
    database: String,
}

impl<C: ?Sized> TelemetryCollection<C> {
    /// Wrap `inner`, reporting calls as `database`/`collection`.
    pub fn new(
        inner: Arc<C>,
        correlation: Arc<CorrelationService>,
        collection: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            inner,
            correlation,
            collection: collection.into(),
            database: database.into(),
        }
    }

    fn target(&self, data: String) -> DependencyTarget {
        DependencyTarget {
            kind: DependencyKind::DocumentStore,
            data,
            name: self.collection.clone(),
            target: self.database.clone(),
        }
    }

    async fn track<T, Fut>(&self, data: String, call: Fut) -> Result<T, CollectionError>
    where
        Fut: Future<Output = Result<T, CollectionError>>,
    {
        track_dependency_call(
            &self.correlation,
            self.target(data),
            call,
            |_| STORE_SUCCESS_CODE.to_owned(),
            CollectionError::to_string,
        )
        .await
    }
}

#[async_trait]
impl<C> DocumentCollection for TelemetryCollection<C>
where
    C: DocumentCollection + ?Sized,
{
    async fn insert_one(
        &self,
        document: Document,
        options: &InsertOptions,
    ) -> Result<InsertOneResult, CollectionError> {
        let data = describe("insertOne", "options", options);
        self.track(data, self.inner.insert_one(document, options))
            .await
    }

    async fn find_one(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>, CollectionError> {
        let data = describe("findOne", "filter", filter);
        self.track(data, self.inner.find_one(filter, options)).await
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, CollectionError> {
        let data = describe("findMany", "query", filter);
        self.track(data, self.inner.find_many(filter, options)).await
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateOneResult, CollectionError> {
        let data = describe("updateOne", "filter", filter);
        self.track(data, self.inner.update_one(filter, update, options))
            .await
    }
}

/// Audit trail decorator that reports every call as an HTTP dependency.
pub struct TelemetryAuditTrail<A: ?Sized> {
    inner: Arc<A>,
    correlation: Arc<CorrelationService>,
}

impl<A: ?Sized> TelemetryAuditTrail<A> {
    /// Wrap `inner`, reporting through `correlation`.
    pub fn new(inner: Arc<A>, correlation: Arc<CorrelationService>) -> Self {
        Self { inner, correlation }
    }
}

#[async_trait]
impl<A> AuditTrail for TelemetryAuditTrail<A>
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
        track_dependency_call(
            &self.correlation,
            self.inner.dependency_target(),
            self.inner.record(request, headers),
            |receipt| receipt.status.to_string(),
            |error: &AuditTrailError| {
                error
                    .status()
                    .map_or_else(|| error.to_string(), |status| status.to_string())
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "dependency_tracking_tests.rs"]
mod tests;
