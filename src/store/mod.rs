/// Document Storage
///
/// Complaints, notifications, feedback, user profiles and image metadata are
/// kept as JSON documents grouped into named collections. Services talk to
/// the [`DocumentStore`] trait; the SQLite implementation lives in `sqlite`.

pub mod query;
pub mod sqlite;
pub mod time;

pub use query::{Direction, Filter, OrderBy, Query, Update};
pub use sqlite::SqliteDocumentStore;

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// Document store backend trait
///
/// Every call is a single request against the backend. Writes to one document
/// are atomic; nothing spans more than one document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document under the given id
    async fn create(&self, collection: &str, id: &str, body: Value) -> ServiceResult<()>;

    /// Fetch a document by id
    async fn get(&self, collection: &str, id: &str) -> ServiceResult<Option<Value>>;

    /// Apply a partial update to a document
    ///
    /// Fails with `NotFound` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, update: Update) -> ServiceResult<()>;

    /// Delete a document, returning whether it existed
    async fn delete(&self, collection: &str, id: &str) -> ServiceResult<bool>;

    /// Query documents by filters, with optional sort and limit
    async fn query(&self, collection: &str, query: &Query) -> ServiceResult<Vec<Value>>;

    /// Count documents matching the filters (sort and limit are ignored)
    async fn count(&self, collection: &str, query: &Query) -> ServiceResult<u64>;
}

/// Typed helpers over the JSON interface
impl dyn DocumentStore {
    /// Serialize and insert a record
    pub async fn insert<T: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        record: &T,
    ) -> ServiceResult<()> {
        let body = serde_json::to_value(record)?;
        self.create(collection, id, body).await
    }

    /// Fetch and deserialize a record
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> ServiceResult<Option<T>> {
        match self.get(collection, id).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    /// Fetch a record, failing with `NotFound` when absent
    pub async fn fetch_required<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> ServiceResult<T> {
        self.fetch(collection, id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("{} {} not found", singular(collection), id))
        })
    }

    /// Query and deserialize records
    pub async fn find<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> ServiceResult<Vec<T>> {
        self.query(collection, query)
            .await?
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(ServiceError::from))
            .collect()
    }
}

/// "complaints" -> "complaint", used in error messages
fn singular(collection: &str) -> &str {
    collection.strip_suffix('s').unwrap_or(collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular() {
        assert_eq!(singular("complaints"), "complaint");
        assert_eq!(singular("feedback"), "feedback");
    }
}
