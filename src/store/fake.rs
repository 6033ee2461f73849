use crate::store::document_store::DocumentStore;
use crate::store::error::StoreError;
use crate::store::listeners::{notify, read_snapshot, ListenerRegistry};
use crate::store::models::{
    check_collection_path, merge_fields, record_path, split_record_path, Document, Fields,
    Subscription, WatchTarget,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A write recorded by the fake store, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create { collection: String, id: String },
    MergeWrite { path: String, fields: Fields },
    Delete { path: String },
}

impl StoreCall {
    /// Path of the record the call wrote to
    pub fn path(&self) -> String {
        match self {
            StoreCall::Create { collection, id } => record_path(collection, id),
            StoreCall::MergeWrite { path, .. } | StoreCall::Delete { path } => path.clone(),
        }
    }
}

/// `FakeDocumentStore` is an in-memory implementation of the `DocumentStore` trait for testing purposes.
/// It records every write and can simulate failures for paths under a prefix.
#[derive(Clone)]
pub struct FakeDocumentStore {
    records: Arc<Mutex<HashMap<String, (u64, Document)>>>,
    next_seq: Arc<AtomicU64>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    fail_prefixes: Arc<Mutex<HashSet<String>>>,
    fail_subscriptions: Arc<AtomicBool>,
    listeners: Arc<ListenerRegistry>,
}

impl FakeDocumentStore {
    /// Create a new empty FakeDocumentStore
    pub fn new() -> Self {
        FakeDocumentStore {
            records: Arc::new(Mutex::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_prefixes: Arc::new(Mutex::new(HashSet::new())),
            fail_subscriptions: Arc::new(AtomicBool::new(false)),
            listeners: Arc::new(ListenerRegistry::new()),
        }
    }

    /// Simulate a failure for every write under `prefix`
    pub fn fake_fail_path(&self, prefix: &str) {
        let mut fail_prefixes = self.fail_prefixes.lock().unwrap();
        fail_prefixes.insert(prefix.to_string());
    }

    /// Clear all simulated write failures
    pub fn fake_reset_failures(&self) {
        let mut fail_prefixes = self.fail_prefixes.lock().unwrap();
        fail_prefixes.clear();
    }

    /// Make every later `subscribe` call fail
    pub fn fake_fail_subscriptions(&self) {
        self.fail_subscriptions.store(true, Ordering::SeqCst);
    }

    /// Seed a record without recording a call
    pub fn fake_insert(&self, collection: &str, id: &str, fields: Fields) {
        let path = record_path(collection, id);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let document = Document {
            id: id.to_string(),
            path: path.clone(),
            fields,
        };
        let mut records = self.records.lock().unwrap();
        records.insert(path, (seq, document));
    }

    /// Every write made so far, in order
    pub fn fake_calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Writes made so far to records directly inside `collection`
    pub fn fake_calls_in(&self, collection: &str) -> Vec<StoreCall> {
        let target = WatchTarget::Collection(collection.to_string());
        self.fake_calls()
            .into_iter()
            .filter(|call| target.is_affected_by(&call.path()))
            .collect()
    }

    pub fn fake_clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fake_listener_count(&self) -> usize {
        self.listeners.listener_count()
    }

    fn check_failure(&self, path: &str) -> Result<(), StoreError> {
        let fail_prefixes = self.fail_prefixes.lock().unwrap();
        if fail_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Err(StoreError::OperationError(format!(
                "Simulated failure for {}",
                path
            )));
        }
        Ok(())
    }

    fn record_call(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        check_collection_path(collection)?;
        self.check_failure(collection)?;

        let id = Uuid::new_v4().simple().to_string();
        let path = record_path(collection, &id);
        let mut initial = Fields::new();
        merge_fields(&mut initial, fields);

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        {
            let mut records = self.records.lock().unwrap();
            records.insert(path.clone(), (seq, Document::new(&path, initial)?));
        }
        self.record_call(StoreCall::Create {
            collection: collection.to_string(),
            id: id.clone(),
        });

        notify(self, &self.listeners, &path).await;
        Ok(id)
    }

    async fn merge_write_record(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        split_record_path(path)?;
        self.check_failure(path)?;

        {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(path) {
                Some((_, document)) => merge_fields(&mut document.fields, fields.clone()),
                None => {
                    let mut initial = Fields::new();
                    merge_fields(&mut initial, fields.clone());
                    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                    records.insert(path.to_string(), (seq, Document::new(path, initial)?));
                }
            }
        }
        self.record_call(StoreCall::MergeWrite {
            path: path.to_string(),
            fields,
        });

        notify(self, &self.listeners, path).await;
        Ok(())
    }

    async fn delete_record(&self, path: &str) -> Result<(), StoreError> {
        split_record_path(path)?;
        self.check_failure(path)?;

        self.records.lock().unwrap().remove(path);
        self.record_call(StoreCall::Delete {
            path: path.to_string(),
        });

        notify(self, &self.listeners, path).await;
        Ok(())
    }

    async fn get_record(&self, path: &str) -> Result<Option<Document>, StoreError> {
        split_record_path(path)?;
        let records = self.records.lock().unwrap();
        Ok(records.get(path).map(|(_, document)| document.clone()))
    }

    async fn list_records(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        check_collection_path(collection)?;
        let target = WatchTarget::Collection(collection.to_string());

        let records = self.records.lock().unwrap();
        let mut matching: Vec<&(u64, Document)> = records
            .values()
            .filter(|(_, document)| target.is_affected_by(&document.path))
            .collect();
        // Insertion order, to match SQLite rowid order
        matching.sort_by_key(|(seq, _)| *seq);
        Ok(matching
            .into_iter()
            .map(|(_, document)| document.clone())
            .collect())
    }

    async fn subscribe(&self, target: WatchTarget) -> Result<Subscription, StoreError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(StoreError::SubscriptionUnavailable(format!(
                "Simulated failure for {}",
                target
            )));
        }
        let initial = read_snapshot(self, &target).await?;
        self.listeners.register(target, initial)
    }
}

impl Default for FakeDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
