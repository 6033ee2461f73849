use crate::blob::blob_store::BlobStore;
use crate::blob::error::BlobError;
use crate::blob::models::{BlobRef, LocalFile, UploadProgress, UploadTask};
use crate::config::BlobConfig;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const MIB: u64 = 1024 * 1024;
/// S3 rejects multipart parts smaller than this, except the last one
const MIN_PART_SIZE: u64 = 5 * MIB;

/// S3-compatible implementation of the BlobStore trait
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    part_size: u64,
    url_base: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance from configuration
    pub fn new(config: &BlobConfig) -> Result<Self, BlobError> {
        info!(
            "Creating S3BlobStore with config: endpoint={:?}, region={}, bucket={}, access_key={:?}",
            config.endpoint, config.region, config.bucket, config.access_key_id
        );

        if config.bucket.is_empty() {
            return Err(BlobError::ConfigurationError(
                "bucket must not be empty".to_string(),
            ));
        }

        let part_size = config.part_size_mb.saturating_mul(MIB);
        if part_size < MIN_PART_SIZE {
            return Err(BlobError::ConfigurationError(format!(
                "part_size_mb must be at least {}",
                MIN_PART_SIZE / MIB
            )));
        }

        // MinIO and most S3-compatible services require path-style requests
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .force_path_style(true);

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "StaticCredentialsProvider",
            );

            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            info!("Setting custom endpoint: {}", endpoint);
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());
        info!("Created S3 client for region {}", config.region);

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            part_size,
            url_base: Self::url_base(config),
        })
    }

    /// Base of the public download URL of every object in the bucket
    fn url_base(config: &BlobConfig) -> String {
        if let Some(public_url) = &config.public_url {
            return public_url.trim_end_matches('/').to_string();
        }
        match &config.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
            None => format!(
                "https://{}.s3.{}.amazonaws.com",
                config.bucket, config.region
            ),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_base, key)
    }

    #[cfg(test)]
    pub async fn ensure_bucket_exists(&self) -> Result<(), BlobError> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| BlobError::ConfigurationError(format!("Failed to create bucket: {e}")))?;
        Ok(())
    }
}

async fn put_whole(
    client: &Client,
    bucket: &str,
    key: &str,
    file: &LocalFile,
    data: Bytes,
) -> Result<(), BlobError> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(file.content_type())
        .body(ByteStream::from(data))
        .send()
        .await
        .map_err(|e| {
            error!("Failed to put object '{}' to bucket '{}': {}", key, bucket, e);
            BlobError::UploadFailed(key.to_string(), e.to_string())
        })?;
    Ok(())
}

async fn put_multipart(
    client: &Client,
    bucket: &str,
    key: &str,
    file: &LocalFile,
    data: Bytes,
    part_size: u64,
    progress: &mpsc::UnboundedSender<UploadProgress>,
) -> Result<(), BlobError> {
    let created = client
        .create_multipart_upload()
        .bucket(bucket)
        .key(key)
        .content_type(file.content_type())
        .send()
        .await
        .map_err(|e| BlobError::UploadFailed(key.to_string(), e.to_string()))?;
    let upload_id = created
        .upload_id()
        .ok_or_else(|| {
            BlobError::UploadFailed(key.to_string(), "no upload id returned".to_string())
        })?
        .to_string();
    debug!("Started multipart upload {} for {}", upload_id, key);

    match put_parts(client, bucket, key, &upload_id, data, part_size, progress).await {
        Ok(parts) => {
            client
                .complete_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map_err(|e| BlobError::UploadFailed(key.to_string(), e.to_string()))?;
            Ok(())
        }
        Err(e) => {
            if let Err(abort_err) = client
                .abort_multipart_upload()
                .bucket(bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                warn!("Failed to abort multipart upload {}: {}", upload_id, abort_err);
            }
            Err(e)
        }
    }
}

async fn put_parts(
    client: &Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    data: Bytes,
    part_size: u64,
    progress: &mpsc::UnboundedSender<UploadProgress>,
) -> Result<Vec<CompletedPart>, BlobError> {
    let total = data.len() as u64;
    let part_size = part_size as usize;
    let mut parts = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        let end = (offset + part_size).min(data.len());
        let part_number = parts.len() as i32 + 1;

        let response = client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(data.slice(offset..end)))
            .send()
            .await
            .map_err(|e| {
                error!("Part {} of {} failed: {}", part_number, key, e);
                BlobError::UploadFailed(key.to_string(), e.to_string())
            })?;

        parts.push(
            CompletedPart::builder()
                .set_e_tag(response.e_tag().map(str::to_string))
                .part_number(part_number)
                .build(),
        );
        offset = end;
        let _ = progress.send(UploadProgress {
            bytes_transferred: offset as u64,
            total_bytes: total,
        });
    }

    Ok(parts)
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn upload_resumable(&self, path: &str, file: &LocalFile) -> UploadTask {
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();

        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let part_size = self.part_size;
        let key = path.to_string();
        let url = self.object_url(path);
        let file = file.clone();

        let completion = async move {
            let data = tokio::fs::read(file.path())
                .await
                .map(Bytes::from)
                .map_err(|e| BlobError::ReadError(file.to_string(), e.to_string()))?;
            let total = data.len() as u64;
            debug!("Uploading {} ({} bytes) to {}", file, total, key);

            let _ = progress_tx.send(UploadProgress {
                bytes_transferred: 0,
                total_bytes: total,
            });

            if total <= part_size {
                put_whole(&client, &bucket, &key, &file, data).await?;
                let _ = progress_tx.send(UploadProgress {
                    bytes_transferred: total,
                    total_bytes: total,
                });
            } else {
                put_multipart(&client, &bucket, &key, &file, data, part_size, &progress_tx)
                    .await?;
            }

            info!("Uploaded {} to {}", file, key);
            Ok(url)
        }
        .boxed();

        UploadTask::new(progress_rx, completion)
    }

    async fn list_children(&self, prefix: &str) -> Result<Vec<BlobRef>, BlobError> {
        let mut blobs = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| {
                    error!("Failed to list objects under {}: {}", prefix, e);
                    BlobError::ListFailed(prefix.to_string(), e.to_string())
                })?;

            blobs.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .map(BlobRef::new),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        blobs.sort();
        debug!("Listed {} blobs under {}", blobs.len(), prefix);
        Ok(blobs)
    }

    async fn delete_blob(&self, blob: &BlobRef) -> Result<(), BlobError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&blob.path)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to delete object {}: {}", blob.path, e);
                BlobError::DeleteFailed(blob.path.clone(), e.to_string())
            })?;

        debug!("Deleted object {}", blob.path);
        Ok(())
    }
}
