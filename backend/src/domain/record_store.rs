//! Typed access to the patient, test and audit collections.
//!
//! Stored documents carry `_id` and `_shardKey` alongside the entity
//! fields; read models strip both before decoding.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ports::{
    CollectionError, Document, DocumentCollection, Filter, FindOptions, InsertOptions, Update,
    UpdateOptions,
};
use crate::domain::{AuditRecord, Patient, TestRecord};

const ID_FIELD: &str = "_id";
const SHARD_KEY_FIELD: &str = "_shardKey";

/// Failures while reading or writing records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordStoreError {
    /// The collection call failed.
    #[error(transparent)]
    Collection(#[from] CollectionError),
    /// The store acknowledged the insert but wrote nothing.
    #[error("insert reported no documents written")]
    InsertFailed,
    /// No stored record matched.
    #[error("record not found")]
    NotFound,
    /// A record could not be converted to or from its stored form.
    #[error("stored record could not be converted: {0}")]
    Encoding(String),
}

fn to_document(
    entity: &impl Serialize,
    id: &str,
    shard_key: &str,
) -> Result<Document, RecordStoreError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(mut document)) => {
            document.insert(ID_FIELD.to_owned(), Value::from(id));
            document.insert(SHARD_KEY_FIELD.to_owned(), Value::from(shard_key));
            Ok(document)
        }
        Ok(_) => Err(RecordStoreError::Encoding(
            "entity did not serialise to an object".to_owned(),
        )),
        Err(error) => Err(RecordStoreError::Encoding(error.to_string())),
    }
}

fn from_document<T: DeserializeOwned>(mut document: Document) -> Result<T, RecordStoreError> {
    document.remove(ID_FIELD);
    document.remove(SHARD_KEY_FIELD);
    serde_json::from_value(Value::Object(document))
        .map_err(|error| RecordStoreError::Encoding(error.to_string()))
}

async fn insert(
    collection: &(impl DocumentCollection + ?Sized),
    document: Document,
) -> Result<(), RecordStoreError> {
    let result = collection
        .insert_one(document, &InsertOptions::default())
        .await?;
    if result.inserted_count == 0 {
        return Err(RecordStoreError::InsertFailed);
    }
    Ok(())
}

/// Patient records, sharded by patient id.
pub struct PatientRecords<C: ?Sized> {
    collection: Arc<C>,
}

impl<C> PatientRecords<C>
where
    C: DocumentCollection + ?Sized,
{
    /// Records stored in `collection`.
    pub fn new(collection: Arc<C>) -> Self {
        Self { collection }
    }

    fn key(id: Uuid) -> Filter {
        let id = id.to_string();
        Filter::new()
            .and(ID_FIELD, id.clone())
            .and(SHARD_KEY_FIELD, id)
    }

    /// Store a new patient.
    pub async fn insert(&self, patient: &Patient) -> Result<Uuid, RecordStoreError> {
        let id = patient.id.to_string();
        insert(self.collection.as_ref(), to_document(patient, &id, &id)?).await?;
        Ok(patient.id)
    }

    /// Load a patient by id.
    pub async fn find(&self, id: Uuid) -> Result<Option<Patient>, RecordStoreError> {
        self.collection
            .find_one(&Self::key(id), &FindOptions::default())
            .await?
            .map(from_document)
            .transpose()
    }

    /// Replace the stored fields of an existing patient.
    pub async fn update(&self, patient: &Patient) -> Result<(), RecordStoreError> {
        let id = patient.id.to_string();
        let mut fields = to_document(patient, &id, &id)?;
        fields.remove(ID_FIELD);
        fields.remove(SHARD_KEY_FIELD);
        let result = self
            .collection
            .update_one(
                &Self::key(patient.id),
                &Update::set(fields),
                &UpdateOptions::default(),
            )
            .await?;
        if result.matched_count == 0 {
            return Err(RecordStoreError::NotFound);
        }
        Ok(())
    }
}

/// Test records, sharded by patient id.
pub struct TestRecords<C: ?Sized> {
    collection: Arc<C>,
}

impl<C> TestRecords<C>
where
    C: DocumentCollection + ?Sized,
{
    /// Records stored in `collection`.
    pub fn new(collection: Arc<C>) -> Self {
        Self { collection }
    }

    /// Store a new test.
    pub async fn insert(&self, test: &TestRecord) -> Result<Uuid, RecordStoreError> {
        let document = to_document(test, &test.id.to_string(), &test.patient_id.to_string())?;
        insert(self.collection.as_ref(), document).await?;
        Ok(test.id)
    }

    /// Every test stored for `patient_id`.
    pub async fn find_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<TestRecord>, RecordStoreError> {
        let patient_id = patient_id.to_string();
        let filter = Filter::new()
            .and("patientId", patient_id.clone())
            .and(SHARD_KEY_FIELD, patient_id);
        self.collection
            .find_many(&filter, &FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// One test of `patient_id`.
    pub async fn find(
        &self,
        patient_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestRecord>, RecordStoreError> {
        let filter = Filter::new()
            .and(ID_FIELD, test_id.to_string())
            .and(SHARD_KEY_FIELD, patient_id.to_string());
        self.collection
            .find_one(&filter, &FindOptions::default())
            .await?
            .map(from_document)
            .transpose()
    }
}

/// Audit records, sharded by record id.
pub struct AuditRecords<C: ?Sized> {
    collection: Arc<C>,
}

impl<C> AuditRecords<C>
where
    C: DocumentCollection + ?Sized,
{
    /// Records stored in `collection`.
    pub fn new(collection: Arc<C>) -> Self {
        Self { collection }
    }

    /// Store an accepted audit record.
    pub async fn insert(&self, record: &AuditRecord) -> Result<String, RecordStoreError> {
        insert(
            self.collection.as_ref(),
            to_document(record, &record.id, &record.id)?,
        )
        .await?;
        Ok(record.id.clone())
    }
}

#[cfg(test)]
#[path = "record_store_tests.rs"]
mod tests;
