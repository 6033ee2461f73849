use crate::blob::error::BlobError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A media file on the local disk, selected for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalFile(PathBuf);

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension, `None` when the name has none
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// MIME type guessed from the extension
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("mp4") => "video/mp4",
            Some("webm") => "video/webm",
            Some("mov") => "video/quicktime",
            Some("mp3") => "audio/mpeg",
            Some("wav") => "audio/wav",
            Some("ogg") => "audio/ogg",
            Some("m4a") => "audio/mp4",
            _ => "application/octet-stream",
        }
    }

    /// Resolve a relative path against `base`
    pub fn resolved_against(&self, base: &Path) -> Self {
        if self.0.is_absolute() {
            self.clone()
        } else {
            Self(base.join(&self.0))
        }
    }
}

impl fmt::Display for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A stored blob, addressed by its full key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlobRef {
    pub path: String,
}

impl BlobRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    /// Whole percent, rounded half up. An empty file counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let transferred = self.bytes_transferred.min(self.total_bytes);
        ((transferred * 200 + self.total_bytes) / (self.total_bytes * 2)) as u8
    }
}

/// A started upload: a stream of progress reports and the final download URL
pub struct UploadTask {
    pub progress: mpsc::UnboundedReceiver<UploadProgress>,
    pub completion: BoxFuture<'static, Result<String, BlobError>>,
}

impl UploadTask {
    pub fn new(
        progress: mpsc::UnboundedReceiver<UploadProgress>,
        completion: BoxFuture<'static, Result<String, BlobError>>,
    ) -> Self {
        Self {
            progress,
            completion,
        }
    }

    /// Wait for the upload, ignoring progress
    pub async fn wait(self) -> Result<String, BlobError> {
        self.completion.await
    }
}
