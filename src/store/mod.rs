pub mod document_store;
pub mod error;
pub mod fake;
pub mod listeners;
pub mod models;
pub mod sqlite;
#[cfg(test)]
mod tests;

pub use document_store::DocumentStore;
pub use error::StoreError;
pub use fake::{FakeDocumentStore, StoreCall};
pub use models::{Document, Fields, Snapshot, Subscription, WatchTarget};
pub use sqlite::SqliteDocumentStore;
