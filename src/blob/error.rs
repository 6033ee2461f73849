use thiserror::Error;

/// Errors that can occur when interacting with blob storage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlobError {
    #[error("Failed to read local file {0}: {1}")]
    ReadError(String, String),

    #[error("Upload of {0} failed: {1}")]
    UploadFailed(String, String),

    #[error("Failed to list blobs under {0}: {1}")]
    ListFailed(String, String),

    #[error("Failed to delete blob {0}: {1}")]
    DeleteFailed(String, String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}
