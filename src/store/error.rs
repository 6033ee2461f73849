use thiserror::Error;

/// Errors that can occur when interacting with the document store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    OpenError(String),

    #[error("Invalid path {0}: {1}")]
    InvalidPath(String, String),

    #[error("Store operation failed: {0}")]
    OperationError(String),

    #[error("Failed to decode fields of {0}: {1}")]
    DecodeError(String, String),

    #[error("Subscriptions are unavailable: {0}")]
    SubscriptionUnavailable(String),

    #[error("Store is locked")]
    Locked,
}
