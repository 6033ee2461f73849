pub mod blob_store;
pub mod error;
pub mod fake;
pub mod models;
pub mod s3;

pub use blob_store::BlobStore;
pub use error::BlobError;
pub use fake::FakeBlobStore;
pub use models::{BlobRef, LocalFile, UploadProgress, UploadTask};
pub use s3::S3BlobStore;
