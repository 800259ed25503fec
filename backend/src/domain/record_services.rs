//! Request-scoped services for patients, tests and audit records.
//!
//! [`RecordServices`] is built once at start-up. For each request it wires
//! the raw store and audit trail through the retry and telemetry decorators
//! and hands out services bound to that request's correlation. Store calls
//! compose as telemetry(retry(raw)); audit calls as
//! telemetry(timeout(retry(trail))).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::correlation::CorrelationService;
use crate::domain::ports::{AuditTrail, CollectionError, DocumentCollection, DocumentStore};
use crate::domain::{
    AuditGate, AuditGateError, AuditOperation, AuditRecord, AuditRecords, AuditResource,
    AuditedResource, Error, Patient, PatientDetails, PatientRecords, RecordStoreError,
    ResourceType, RetryAuditTrail, RetryCollection, RetrySettings, RetrySleeper,
    TelemetryAuditTrail, TelemetryCollection, TestDetails, TestRecord, TestRecords,
    TimeoutAuditTrail, TokioSleeper,
};

/// Names of the collections backing each record kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionNames {
    /// Patient collection.
    pub patients: String,
    /// Test collection.
    pub tests: String,
    /// Audit record collection.
    pub audits: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            patients: "patients".to_owned(),
            tests: "tests".to_owned(),
            audits: "audits".to_owned(),
        }
    }
}

/// Shared wiring for the request services.
#[derive(Clone)]
pub struct RecordServices {
    store: Arc<dyn DocumentStore>,
    audit_trail: Arc<dyn AuditTrail>,
    names: CollectionNames,
    retry: RetrySettings,
    audit_timeout: Option<Duration>,
    sleeper: Arc<dyn RetrySleeper>,
}

impl RecordServices {
    /// Services over `store`, auditing through `audit_trail`.
    pub fn new(store: Arc<dyn DocumentStore>, audit_trail: Arc<dyn AuditTrail>) -> Self {
        Self {
            store,
            audit_trail,
            names: CollectionNames::default(),
            retry: RetrySettings::default(),
            audit_timeout: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Use `names` for the backing collections.
    #[must_use]
    pub fn with_collection_names(mut self, names: CollectionNames) -> Self {
        self.names = names;
        self
    }

    /// Retry throttled calls according to `retry`.
    #[must_use]
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Fail audits that take longer than `timeout`.
    #[must_use]
    pub fn with_audit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.audit_timeout = timeout;
        self
    }

    /// Pause between retries with `sleeper`.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn RetrySleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn collection(
        &self,
        name: &str,
        correlation: &Arc<CorrelationService>,
    ) -> Arc<dyn DocumentCollection> {
        let retried = Arc::new(RetryCollection::with_sleeper(
            self.store.collection(name),
            self.retry,
            Arc::clone(&self.sleeper),
        ));
        Arc::new(TelemetryCollection::new(
            retried,
            Arc::clone(correlation),
            name,
            self.store.database_name(),
        ))
    }

    fn gate(&self, correlation: &Arc<CorrelationService>) -> AuditGate {
        let retried = Arc::new(RetryAuditTrail::with_sleeper(
            Arc::clone(&self.audit_trail),
            self.retry,
            Arc::clone(&self.sleeper),
        ));
        let bounded = Arc::new(TimeoutAuditTrail::new(retried, self.audit_timeout));
        let tracked = TelemetryAuditTrail::new(bounded, Arc::clone(correlation));
        AuditGate::new(Arc::new(tracked), Arc::clone(correlation))
    }

    /// Patient service bound to `correlation`.
    pub fn patients(&self, correlation: &Arc<CorrelationService>) -> PatientService {
        PatientService {
            records: PatientRecords::new(self.collection(&self.names.patients, correlation)),
            gate: self.gate(correlation),
        }
    }

    /// Test service bound to `correlation`.
    pub fn tests(&self, correlation: &Arc<CorrelationService>) -> TestService {
        TestService {
            records: TestRecords::new(self.collection(&self.names.tests, correlation)),
            gate: self.gate(correlation),
        }
    }

    /// Audit record service bound to `correlation`.
    pub fn audit_records(&self, correlation: &Arc<CorrelationService>) -> AuditRecordService {
        AuditRecordService {
            records: AuditRecords::new(self.collection(&self.names.audits, correlation)),
        }
    }
}

impl From<RecordStoreError> for Error {
    fn from(error: RecordStoreError) -> Self {
        match error {
            RecordStoreError::NotFound => Error::not_found("Record not found"),
            RecordStoreError::Collection(
                CollectionError::Throttled { .. } | CollectionError::Connection { .. },
            ) => Error::service_unavailable("Data store unavailable")
                .with_details(json!({ "cause": error.to_string() })),
            other => Error::internal(other.to_string()),
        }
    }
}

impl From<AuditGateError<RecordStoreError>> for Error {
    fn from(error: AuditGateError<RecordStoreError>) -> Self {
        match error {
            AuditGateError::AuditingFailed(cause) => {
                Error::auditing_failed("Error creating audit log")
                    .with_details(json!({ "cause": cause.to_string() }))
            }
            AuditGateError::Primary(inner) => inner.into(),
        }
    }
}

/// Patient operations, each gated by an audit record.
pub struct PatientService {
    records: PatientRecords<dyn DocumentCollection>,
    gate: AuditGate,
}

impl PatientService {
    /// Store a new patient under a fresh id.
    pub async fn create(&self, details: PatientDetails) -> Result<Patient, Error> {
        let patient = Patient::new(Uuid::new_v4(), details, Utc::now());
        let resource =
            AuditResource::new(ResourceType::Patient, patient.id, AuditOperation::Create);
        self.gate
            .guard(resource, || self.records.insert(&patient))
            .await?;
        info!(patient_id = %patient.id, "patient created");
        Ok(patient)
    }

    /// Load one patient.
    pub async fn get(&self, id: Uuid) -> Result<Patient, Error> {
        let resource = AuditResource::new(ResourceType::Patient, id, AuditOperation::Read);
        self.gate
            .guard(resource, || self.records.find(id))
            .await?
            .ok_or_else(|| Error::not_found(format!("Patient {id} not found")))
    }

    /// Replace the fields of an existing patient.
    pub async fn update(&self, id: Uuid, details: PatientDetails) -> Result<Patient, Error> {
        let patient = Patient::new(id, details, Utc::now());
        let resource = AuditResource::new(ResourceType::Patient, id, AuditOperation::Update);
        match self
            .gate
            .guard(resource, || self.records.update(&patient))
            .await
        {
            Ok(()) => {
                info!(patient_id = %id, "patient updated");
                Ok(patient)
            }
            Err(AuditGateError::Primary(RecordStoreError::NotFound)) => {
                Err(Error::not_found(format!("Patient {id} not found")))
            }
            Err(other) => Err(other.into()),
        }
    }
}

/// Test operations, each gated by an audit record.
pub struct TestService {
    records: TestRecords<dyn DocumentCollection>,
    gate: AuditGate,
}

impl TestService {
    /// Store a new test for `patient_id`.
    pub async fn create(
        &self,
        patient_id: Uuid,
        details: TestDetails,
    ) -> Result<TestRecord, Error> {
        let test = TestRecord::new(Uuid::new_v4(), patient_id, details, Utc::now());
        let resource = AuditResource::new(ResourceType::Test, test.id, AuditOperation::Create);
        self.gate.guard(resource, || self.records.insert(&test)).await?;
        info!(%patient_id, test_id = %test.id, "test created");
        Ok(test)
    }

    /// Every test for `patient_id`; audited as a read keyed by the patient.
    pub async fn list(&self, patient_id: Uuid) -> Result<Vec<TestRecord>, Error> {
        let resource = AuditResource::new(ResourceType::Test, patient_id, AuditOperation::Read);
        Ok(self
            .gate
            .guard(resource, || self.records.find_for_patient(patient_id))
            .await?)
    }

    /// One test of `patient_id`.
    pub async fn get(&self, patient_id: Uuid, test_id: Uuid) -> Result<TestRecord, Error> {
        let resource = AuditResource::new(ResourceType::Test, test_id, AuditOperation::Read);
        self.gate
            .guard(resource, || self.records.find(patient_id, test_id))
            .await?
            .ok_or_else(|| Error::not_found(format!("Test {test_id} not found")))
    }
}

/// Accepts audit records raised by other systems.
pub struct AuditRecordService {
    records: AuditRecords<dyn DocumentCollection>,
}

impl AuditRecordService {
    /// Stamp and store an audit record.
    pub async fn accept(
        &self,
        source_system_name: String,
        resource: AuditedResource,
    ) -> Result<AuditRecord, Error> {
        let record = AuditRecord::accept(source_system_name, resource, Utc::now());
        self.records.insert(&record).await?;
        info!(audit_record_id = %record.id, "audit record stored");
        Ok(record)
    }
}

#[cfg(test)]
#[path = "record_services_tests.rs"]
mod tests;
