use crate::store::error::StoreError;
use crate::store::models::{Document, Fields, Subscription, WatchTarget};
use async_trait::async_trait;
use std::sync::Arc;

/// DocumentStore trait defining the interface to the hierarchical document database
///
/// Paths alternate collection and record segments: `books/{bookId}/riddles/{riddleId}`.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Create a record with a store-assigned id inside `collection`
    ///
    /// * `collection` - The collection path
    /// * `fields` - Initial fields; `null` values are dropped
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into the record at `path`, creating it when missing
    ///
    /// Fields not named in the patch are left untouched. A `null` value clears the field.
    async fn merge_write_record(&self, path: &str, fields: Fields) -> Result<(), StoreError>;

    /// Delete the record at `path`. Deleting a missing record succeeds.
    async fn delete_record(&self, path: &str) -> Result<(), StoreError>;

    /// Read a single record
    async fn get_record(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Read every record directly inside `collection`, oldest first
    async fn list_records(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Subscribe to a record or a collection
    ///
    /// The current state is delivered immediately, then again after every write that affects it.
    async fn subscribe(&self, target: WatchTarget) -> Result<Subscription, StoreError>;
}

/// Implementation of DocumentStore trait for Arc<T> where T implements DocumentStore
///
/// This allows sharing store instances across tasks and components.
#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        (**self).create_record(collection, fields).await
    }

    async fn merge_write_record(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        (**self).merge_write_record(path, fields).await
    }

    async fn delete_record(&self, path: &str) -> Result<(), StoreError> {
        (**self).delete_record(path).await
    }

    async fn get_record(&self, path: &str) -> Result<Option<Document>, StoreError> {
        (**self).get_record(path).await
    }

    async fn list_records(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        (**self).list_records(collection).await
    }

    async fn subscribe(&self, target: WatchTarget) -> Result<Subscription, StoreError> {
        (**self).subscribe(target).await
    }
}
