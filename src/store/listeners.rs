use crate::store::document_store::DocumentStore;
use crate::store::error::StoreError;
use crate::store::models::{Snapshot, Subscription, WatchTarget};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Registry of live subscriptions shared by the store implementations
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<(WatchTarget, mpsc::UnboundedSender<Snapshot>)>>,
    /// Held across read and publish so snapshots reach listeners in the order they were read
    refresh: tokio::sync::Mutex<()>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and deliver its initial snapshot
    pub fn register(
        &self,
        target: WatchTarget,
        initial: Snapshot,
    ) -> Result<Subscription, StoreError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail
        let _ = sender.send(initial);

        let mut listeners = self.listeners.lock().map_err(|_| StoreError::Locked)?;
        listeners.push((target.clone(), sender));
        debug!("Registered listener for {}", target);

        Ok(Subscription::new(target, receiver))
    }

    /// Targets with at least one live listener that a write to `record_path` affects
    pub fn targets_for(&self, record_path: &str) -> Vec<WatchTarget> {
        let mut listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(_) => return Vec::new(),
        };
        listeners.retain(|(_, sender)| !sender.is_closed());

        let mut targets: Vec<WatchTarget> = Vec::new();
        for (target, _) in listeners.iter() {
            if target.is_affected_by(record_path) && !targets.contains(target) {
                targets.push(target.clone());
            }
        }
        targets
    }

    /// Send a snapshot to every listener of `target`
    pub fn publish(&self, target: &WatchTarget, snapshot: Snapshot) {
        let mut listeners = match self.listeners.lock() {
            Ok(listeners) => listeners,
            Err(_) => return,
        };
        listeners.retain(|(listener_target, sender)| {
            if listener_target != target {
                return !sender.is_closed();
            }
            sender.send(snapshot.clone()).is_ok()
        });
    }

    pub fn listener_count(&self) -> usize {
        match self.listeners.lock() {
            Ok(mut listeners) => {
                listeners.retain(|(_, sender)| !sender.is_closed());
                listeners.len()
            }
            Err(_) => 0,
        }
    }
}

/// Read the current state of `target` from `store`
pub async fn read_snapshot<S: DocumentStore + ?Sized>(
    store: &S,
    target: &WatchTarget,
) -> Result<Snapshot, StoreError> {
    match target {
        WatchTarget::Record(path) => Ok(Snapshot::Record(store.get_record(path).await?)),
        WatchTarget::Collection(path) => Ok(Snapshot::Collection(store.list_records(path).await?)),
    }
}

/// Push fresh snapshots to every listener affected by a write to `record_path`
pub async fn notify<S: DocumentStore + ?Sized>(
    store: &S,
    registry: &ListenerRegistry,
    record_path: &str,
) {
    let targets = registry.targets_for(record_path);
    if targets.is_empty() {
        return;
    }
    let _refresh = registry.refresh.lock().await;
    for target in targets {
        match read_snapshot(store, &target).await {
            Ok(snapshot) => registry.publish(&target, snapshot),
            Err(e) => warn!("Failed to refresh {} after write: {}", target, e),
        }
    }
}
