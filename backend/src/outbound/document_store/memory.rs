//! In-process document store.
//!
//! Collections live in memory for the lifetime of the store. Filters are
//! top-level equality matches and updates replace fields, which is all the
//! record services ask of a document database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::domain::ports::{
    CollectionError, Document, DocumentCollection, DocumentStore, Filter, FindOptions,
    InsertOneResult, InsertOptions, Update, UpdateOneResult, UpdateOptions,
};

const ID_FIELD: &str = "_id";

/// A named set of in-memory collections.
///
/// # Examples
/// ```
/// use backend::domain::ports::DocumentStore;
/// use backend::outbound::document_store::InMemoryDocumentStore;
///
/// let store = InMemoryDocumentStore::new("patient-tests");
/// let first = store.collection("patients");
/// let again = store.collection("patients");
/// assert!(std::sync::Arc::ptr_eq(&first, &again));
/// ```
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    database: String,
    collections: Mutex<HashMap<String, Arc<InMemoryCollection>>>,
}

impl InMemoryDocumentStore {
    /// An empty store named `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn database_name(&self) -> &str {
        &self.database
    }

    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let collection = collections.entry(name.to_owned()).or_insert_with(|| {
            debug!(database = %self.database, collection = name, "collection created");
            Arc::new(InMemoryCollection::default())
        });
        Arc::clone(collection) as Arc<dyn DocumentCollection>
    }
}

/// One in-memory collection, kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    documents: Mutex<Vec<Document>>,
}

impl InMemoryCollection {
    fn documents(&self) -> std::sync::MutexGuard<'_, Vec<Document>> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn id_text(id: &Value) -> String {
    match id {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    async fn insert_one(
        &self,
        document: Document,
        _options: &InsertOptions,
    ) -> Result<InsertOneResult, CollectionError> {
        let mut documents = self.documents();
        let inserted_id = document.get(ID_FIELD).cloned();
        if let Some(id) = inserted_id
            .as_ref()
            .filter(|id| documents.iter().any(|stored| stored.get(ID_FIELD) == Some(*id)))
        {
            return Err(CollectionError::duplicate(id_text(id)));
        }
        documents.push(document);
        Ok(InsertOneResult {
            inserted_count: 1,
            inserted_id,
        })
    }

    async fn find_one(
        &self,
        filter: &Filter,
        _options: &FindOptions,
    ) -> Result<Option<Document>, CollectionError> {
        Ok(self
            .documents()
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, CollectionError> {
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(self
            .documents()
            .iter()
            .filter(|document| filter.matches(document))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        options: &UpdateOptions,
    ) -> Result<UpdateOneResult, CollectionError> {
        let mut documents = self.documents();
        if let Some(document) = documents
            .iter_mut()
            .find(|document| filter.matches(document))
        {
            let before = document.clone();
            for (field, value) in update.fields() {
                document.insert(field.clone(), value.clone());
            }
            let modified_count = u64::from(*document != before);
            return Ok(UpdateOneResult {
                matched_count: 1,
                modified_count,
            });
        }
        if options.upsert {
            let mut document = filter.fields().clone();
            document.extend(update.fields().clone());
            documents.push(document);
        }
        Ok(UpdateOneResult::default())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[fixture]
    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new("patient-tests")
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_ids_are_rejected(store: InMemoryDocumentStore) {
        let patients = store.collection("patients");
        let options = InsertOptions::default();
        patients
            .insert_one(document(json!({ "_id": "p-1" })), &options)
            .await
            .expect("first insert");

        let error = patients
            .insert_one(document(json!({ "_id": "p-1" })), &options)
            .await
            .expect_err("second insert");
        assert_eq!(error, CollectionError::duplicate("p-1"));
    }

    #[rstest]
    #[tokio::test]
    async fn find_many_filters_and_limits(store: InMemoryDocumentStore) {
        let tests = store.collection("tests");
        for (id, patient) in [("t-1", "a"), ("t-2", "b"), ("t-3", "a"), ("t-4", "a")] {
            tests
                .insert_one(
                    document(json!({ "_id": id, "patientId": patient })),
                    &InsertOptions::default(),
                )
                .await
                .expect("insert");
        }
        let filter = Filter::new().and("patientId", "a");

        let all = tests
            .find_many(&filter, &FindOptions::default())
            .await
            .expect("find all");
        let limited = tests
            .find_many(&filter, &FindOptions { limit: Some(2) })
            .await
            .expect("find limited");

        assert_eq!(all.len(), 3);
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].get("_id"), Some(&json!("t-1")));
    }

    #[rstest]
    #[tokio::test]
    async fn update_sets_fields_on_the_first_match(store: InMemoryDocumentStore) {
        let patients = store.collection("patients");
        patients
            .insert_one(
                document(json!({ "_id": "p-1", "firstName": "Ada", "postCode": "NW10" })),
                &InsertOptions::default(),
            )
            .await
            .expect("insert");
        let filter = Filter::new().and("_id", "p-1");

        let result = patients
            .update_one(
                &filter,
                &Update::set(document(json!({ "firstName": "Augusta" }))),
                &UpdateOptions::default(),
            )
            .await
            .expect("update");
        let stored = patients
            .find_one(&filter, &FindOptions::default())
            .await
            .expect("find")
            .expect("document exists");

        assert_eq!(result.matched_count, 1);
        assert_eq!(result.modified_count, 1);
        assert_eq!(stored.get("firstName"), Some(&json!("Augusta")));
        assert_eq!(stored.get("postCode"), Some(&json!("NW10")));
    }

    #[rstest]
    #[tokio::test]
    async fn unmatched_updates_change_nothing_unless_upserting(store: InMemoryDocumentStore) {
        let patients = store.collection("patients");
        let filter = Filter::new().and("_id", "p-9");
        let update = Update::set(document(json!({ "firstName": "Mary" })));

        let plain = patients
            .update_one(&filter, &update, &UpdateOptions::default())
            .await
            .expect("update");
        assert_eq!(plain, UpdateOneResult::default());
        assert!(
            patients
                .find_one(&filter, &FindOptions::default())
                .await
                .expect("find")
                .is_none()
        );

        patients
            .update_one(&filter, &update, &UpdateOptions { upsert: true })
            .await
            .expect("upsert");
        let stored = patients
            .find_one(&filter, &FindOptions::default())
            .await
            .expect("find")
            .expect("upserted");
        assert_eq!(stored.get("firstName"), Some(&json!("Mary")));
    }

    #[rstest]
    fn collections_are_shared_by_name(store: InMemoryDocumentStore) {
        let first = store.collection("audits");
        let second = store.collection("audits");
        let other = store.collection("patients");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(store.database_name(), "patient-tests");
    }
}
