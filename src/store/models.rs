use serde_json::{Map, Value};
use std::fmt;
use tokio::sync::mpsc;

use crate::store::error::StoreError;

/// Field map of a stored document
pub type Fields = Map<String, Value>;

/// A stored document together with its identity
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier assigned by the store on creation
    pub id: String,
    /// Full path, `{collection}/{id}`
    pub path: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(path: &str, fields: Fields) -> Result<Self, StoreError> {
        let (_, id) = split_record_path(path)?;
        Ok(Self {
            id: id.to_string(),
            path: path.to_string(),
            fields,
        })
    }

    /// String value of a field, `None` when absent, null or not a string
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn u32_field(&self, key: &str) -> Option<u32> {
        self.fields
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }
}

/// What a subscription listens to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// A single document
    Record(String),
    /// Every document directly inside a collection
    Collection(String),
}

impl WatchTarget {
    /// Whether a write to `record_path` changes what this target sees
    pub fn is_affected_by(&self, record_path: &str) -> bool {
        match self {
            WatchTarget::Record(path) => path == record_path,
            WatchTarget::Collection(collection) => record_path
                .rsplit_once('/')
                .map(|(parent, _)| parent == collection)
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchTarget::Record(path) => write!(f, "record {}", path),
            WatchTarget::Collection(path) => write!(f, "collection {}", path),
        }
    }
}

/// State pushed to a subscriber, always the full current state of its target
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Record(Option<Document>),
    Collection(Vec<Document>),
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    target: WatchTarget,
    receiver: mpsc::UnboundedReceiver<Snapshot>,
}

impl Subscription {
    pub(crate) fn new(target: WatchTarget, receiver: mpsc::UnboundedReceiver<Snapshot>) -> Self {
        Self { target, receiver }
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Wait for the next snapshot. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Latest snapshot already delivered, skipping any older queued ones
    pub fn latest(&mut self) -> Option<Snapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.receiver.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }
}

fn check_segments(path: &str) -> Result<usize, StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath(
            path.to_string(),
            "path is empty".to_string(),
        ));
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(
            path.to_string(),
            "path contains an empty segment".to_string(),
        ));
    }
    Ok(segments.len())
}

/// Collections sit at odd depths: `books`, `books/{id}/riddles`
pub fn check_collection_path(path: &str) -> Result<(), StoreError> {
    if check_segments(path)? % 2 == 0 {
        return Err(StoreError::InvalidPath(
            path.to_string(),
            "expected a collection path".to_string(),
        ));
    }
    Ok(())
}

/// Split a record path into its collection and id
pub fn split_record_path(path: &str) -> Result<(&str, &str), StoreError> {
    if check_segments(path)? % 2 == 1 {
        return Err(StoreError::InvalidPath(
            path.to_string(),
            "expected a record path".to_string(),
        ));
    }
    path.rsplit_once('/').ok_or_else(|| {
        StoreError::InvalidPath(path.to_string(), "expected a record path".to_string())
    })
}

pub fn record_path(collection: &str, id: &str) -> String {
    format!("{}/{}", collection, id)
}

/// Apply a merge-write patch. A `null` value removes the field.
pub fn merge_fields(target: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}
