//! Port for document-store collections.
//!
//! The contract mirrors the subset of a document database the services use:
//! single inserts, equality-filtered reads and `$set` updates. Decorators
//! (retry, dependency telemetry) implement the same trait so they stack in
//! front of any adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use super::define_port_error;

/// Store error code signalling request-rate throttling.
pub const THROTTLED_ERROR_CODE: i32 = 16500;

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

define_port_error! {
    /// Errors raised by document collection adapters.
    pub enum CollectionError {
        /// The store rejected the request because its rate budget is spent.
        Throttled { message: String } =>
            "document store throttled the request: {message}",
        /// The store could not be reached.
        Connection { message: String } =>
            "document store connection failed: {message}",
        /// The query or mutation failed during execution.
        Query { message: String } =>
            "document store query failed: {message}",
        /// A document with the same `_id` already exists.
        Duplicate { id: String } =>
            "document {id} already exists",
    }
}

impl CollectionError {
    /// Numeric store error code, when the failure carries one.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Throttled { .. } => Some(THROTTLED_ERROR_CODE),
            _ => None,
        }
    }
}

/// Equality filter over top-level document fields.
///
/// # Examples
/// ```
/// use backend::domain::ports::Filter;
/// use serde_json::json;
///
/// let filter = Filter::new().and("_id", "p-1").and("_shardKey", "p-1");
/// let document = json!({ "_id": "p-1", "_shardKey": "p-1", "firstName": "Ada" });
/// assert!(filter.matches(document.as_object().expect("object")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filter(Document);

impl Filter {
    /// An empty filter that matches every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    #[must_use]
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Whether `document` satisfies every clause.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    /// The required field values.
    #[must_use]
    pub fn fields(&self) -> &Document {
        &self.0
    }
}

/// Field assignments applied by `update_one` (`$set` semantics).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    set: Document,
}

impl Update {
    /// Replace the listed top-level fields.
    #[must_use]
    pub fn set(fields: Document) -> Self {
        Self { set: fields }
    }

    /// Fields assigned by this update.
    #[must_use]
    pub fn fields(&self) -> &Document {
        &self.set
    }
}

/// Options accepted by `insert_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOptions {
    /// Skip schema validation on the server.
    pub bypass_document_validation: bool,
}

/// Options accepted by the find operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

/// Options accepted by `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOptions {
    /// Insert the document when nothing matches.
    pub upsert: bool,
}

/// Outcome of `insert_one`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOneResult {
    /// Number of documents written.
    pub inserted_count: u64,
    /// `_id` of the written document.
    pub inserted_id: Option<Value>,
}

/// Outcome of `update_one`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOneResult {
    /// Number of documents matching the filter.
    pub matched_count: u64,
    /// Number of documents changed.
    pub modified_count: u64,
}

/// Port for a single named collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Insert one document.
    async fn insert_one(
        &self,
        document: Document,
        options: &InsertOptions,
    ) -> Result<InsertOneResult, CollectionError>;

    /// Return the first document matching `filter`.
    async fn find_one(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Option<Document>, CollectionError>;

    /// Return every document matching `filter`.
    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, CollectionError>;

    /// Apply `update` to the first document matching `filter`.
    async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateOneResult, CollectionError>;
}

/// Port resolving collections by name within one database.
#[cfg_attr(test, mockall::automock)]
pub trait DocumentStore: Send + Sync {
    /// Name of the database holding the collections.
    fn database_name(&self) -> &str;

    /// Handle to the named collection.
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;
}
