use crate::blob::error::BlobError;
use crate::blob::models::{BlobRef, LocalFile, UploadTask};
use async_trait::async_trait;
use std::sync::Arc;

/// BlobStore trait defining the interface to the media storage service
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Start uploading `file` to `path`
    ///
    /// The upload runs when the returned task's completion is awaited, which resolves to
    /// the blob's download URL. Progress reports arrive on the task's channel meanwhile.
    fn upload_resumable(&self, path: &str, file: &LocalFile) -> UploadTask;

    /// List every blob whose key starts with `prefix`, ordered by key
    async fn list_children(&self, prefix: &str) -> Result<Vec<BlobRef>, BlobError>;

    /// Delete a single blob
    async fn delete_blob(&self, blob: &BlobRef) -> Result<(), BlobError>;
}

/// Implementation of BlobStore trait for Arc<T> where T implements BlobStore
#[async_trait]
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn upload_resumable(&self, path: &str, file: &LocalFile) -> UploadTask {
        (**self).upload_resumable(path, file)
    }

    async fn list_children(&self, prefix: &str) -> Result<Vec<BlobRef>, BlobError> {
        (**self).list_children(prefix).await
    }

    async fn delete_blob(&self, blob: &BlobRef) -> Result<(), BlobError> {
        (**self).delete_blob(blob).await
    }
}
