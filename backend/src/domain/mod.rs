//! Domain primitives, services and the correlation machinery.
//!
//! Purpose: define the patient and test aggregates, the audit gate that
//! guards every data operation, and the decorators that add retries and
//! dependency telemetry around driven ports. Keep types immutable and
//! document serialisation contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and its stable identifier.
//! - Patient / TestRecord / AuditRecord: stored aggregates.
//! - AuditGate: fail-closed audit-before-operation wrapper.
//! - PatientService / TestService / AuditRecordService: request services.

pub mod audit;
pub mod audit_gate;
pub mod correlation;
pub mod dependency_tracking;
pub mod error;
pub mod operation_id;
pub mod patient;
pub mod ports;
pub mod record_services;
pub mod record_store;
pub mod retry;
pub mod telemetry;
pub mod test_record;

pub use self::audit::{
    AUDIT_RECORD_ID_LEN, AuditOperation, AuditRecord, AuditRecordRequest, AuditResource,
    AuditedResource, ResourceType, SOURCE_SYSTEM_NAME,
};
pub use self::audit_gate::{AuditGate, AuditGateError, TimeoutAuditTrail};
pub use self::dependency_tracking::{
    STORE_SUCCESS_CODE, TelemetryAuditTrail, TelemetryCollection, track_dependency_call,
};
pub use self::error::{Error, ErrorCode};
pub use self::operation_id::{OperationId, TRACE_ID_HEADER};
pub use self::patient::{
    Gender, MAX_FULL_NAME_LEN, MAX_NAME_LEN, POST_CODE_LEN, Patient, PatientDetails, PatientDraft,
    PatientValidationError,
};
pub use self::record_services::{
    AuditRecordService, CollectionNames, PatientService, RecordServices, TestService,
};
pub use self::record_store::{AuditRecords, PatientRecords, RecordStoreError, TestRecords};
pub use self::retry::{
    DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryAuditTrail, RetryCollection,
    RetryPolicy, RetrySettings, RetrySleeper, Throttled, TokioSleeper, run_with_retry,
};
pub use self::telemetry::{
    DependencyKind, DependencyTarget, DependencyTelemetry, OperationTags, TaggedDependency, Timer,
};
pub use self::test_record::{
    Observation, ObservationDraft, TestDetails, TestDraft, TestRecord, TestValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::not_found("no such patient"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
