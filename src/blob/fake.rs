use crate::blob::blob_store::BlobStore;
use crate::blob::error::BlobError;
use crate::blob::models::{BlobRef, LocalFile, UploadProgress, UploadTask};
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Base of the download URLs handed out by the fake
pub const FAKE_BASE_URL: &str = "https://storage.fake/";

const PROGRESS_STEPS: u64 = 4;

/// `FakeBlobStore` is an in-memory implementation of the `BlobStore` trait for testing purposes.
/// Uploads read the real local file, report progress in quarters and can be made to fail.
#[derive(Clone)]
pub struct FakeBlobStore {
    blobs: Arc<Mutex<BTreeMap<String, Bytes>>>,
    uploads: Arc<Mutex<Vec<String>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    fail_uploads: Arc<Mutex<HashSet<String>>>,
    fail_deletes: Arc<Mutex<HashSet<String>>>,
    fail_list: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeBlobStore {
    /// Create a new empty FakeBlobStore instance
    pub fn new() -> Self {
        FakeBlobStore {
            blobs: Arc::new(Mutex::new(BTreeMap::new())),
            uploads: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            fail_uploads: Arc::new(Mutex::new(HashSet::new())),
            fail_deletes: Arc::new(Mutex::new(HashSet::new())),
            fail_list: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every upload whose key contains `pattern`, after its first progress report
    pub async fn fake_fail_upload(&self, pattern: &str) {
        let mut fail_uploads = self.fail_uploads.lock().await;
        fail_uploads.insert(pattern.to_string());
    }

    /// Fail every delete whose key contains `pattern`
    pub async fn fake_fail_delete(&self, pattern: &str) {
        let mut fail_deletes = self.fail_deletes.lock().await;
        fail_deletes.insert(pattern.to_string());
    }

    pub fn fake_fail_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    /// Seed a blob without recording an upload
    pub async fn fake_add_blob(&self, key: &str, data: Bytes) {
        let mut blobs = self.blobs.lock().await;
        blobs.insert(key.to_string(), data);
    }

    pub async fn fake_blob(&self, key: &str) -> Option<Bytes> {
        self.blobs.lock().await.get(key).cloned()
    }

    /// Keys of every stored blob, ordered
    pub async fn fake_keys(&self) -> Vec<String> {
        self.blobs.lock().await.keys().cloned().collect()
    }

    /// Keys of completed uploads, in completion order
    pub async fn fake_uploads(&self) -> Vec<String> {
        self.uploads.lock().await.clone()
    }

    pub async fn fake_deleted(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }

    /// Highest number of uploads that were running at the same time
    pub fn fake_max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn download_url(key: &str) -> String {
        format!("{}{}", FAKE_BASE_URL, key)
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    fn upload_resumable(&self, path: &str, file: &LocalFile) -> UploadTask {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let store = self.clone();
        let key = path.to_string();
        let file = file.clone();
        let completion = async move {
            // Let sibling uploads start before this one makes progress
            tokio::task::yield_now().await;

            let result = async {
                let data = tokio::fs::read(file.path())
                    .await
                    .map_err(|e| BlobError::ReadError(file.to_string(), e.to_string()))?;
                let total = data.len() as u64;

                let should_fail = {
                    let fail_uploads = store.fail_uploads.lock().await;
                    fail_uploads.iter().any(|pattern| key.contains(pattern.as_str()))
                };

                for step in 1..=PROGRESS_STEPS {
                    let _ = progress_tx.send(UploadProgress {
                        bytes_transferred: total * step / PROGRESS_STEPS,
                        total_bytes: total,
                    });
                    if should_fail {
                        return Err(BlobError::UploadFailed(
                            key.clone(),
                            "Simulated upload failure".to_string(),
                        ));
                    }
                    tokio::task::yield_now().await;
                }

                store.blobs.lock().await.insert(key.clone(), Bytes::from(data));
                store.uploads.lock().await.push(key.clone());
                Ok::<_, BlobError>(Self::download_url(&key))
            }
            .await;

            store.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
        .boxed();

        UploadTask::new(progress_rx, completion)
    }

    async fn list_children(&self, prefix: &str) -> Result<Vec<BlobRef>, BlobError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(BlobError::ListFailed(
                prefix.to_string(),
                "Simulated list failure".to_string(),
            ));
        }

        let blobs = self.blobs.lock().await;
        Ok(blobs
            .keys()
            .filter(|key| key.starts_with(prefix))
            .map(BlobRef::new)
            .collect())
    }

    async fn delete_blob(&self, blob: &BlobRef) -> Result<(), BlobError> {
        {
            let fail_deletes = self.fail_deletes.lock().await;
            if fail_deletes
                .iter()
                .any(|pattern| blob.path.contains(pattern.as_str()))
            {
                return Err(BlobError::DeleteFailed(
                    blob.path.clone(),
                    "Simulated delete failure".to_string(),
                ));
            }
        }

        let mut blobs = self.blobs.lock().await;
        if blobs.remove(&blob.path).is_none() {
            return Err(BlobError::DeleteFailed(
                blob.path.clone(),
                "no such blob".to_string(),
            ));
        }
        self.deleted.lock().await.push(blob.path.clone());
        Ok(())
    }
}

impl Default for FakeBlobStore {
    fn default() -> Self {
        Self::new()
    }
}
