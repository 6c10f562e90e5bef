//! Object storage for uploaded application artifacts
//!
//! Uploads are streamed straight from the request body into the store without
//! buffering the whole artifact in memory.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Byte stream of an upload body
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Destination for uploaded artifacts
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Store `body` under `key` and return a URL Spark can read it from
    async fn upload(&self, key: &str, body: ByteStream) -> Result<String>;
}

/// Object key for an uploaded file: `{root}/{first}{last}/{id}/{name}`
///
/// The first and last characters of the name spread keys across prefixes.
pub fn upload_key(root: &str, name: &str, id: &str) -> Option<String> {
    let first = name.chars().next()?;
    let last = name.chars().last()?;
    Some(format!("{}/{}{}/{}/{}", root, first, last, id, name))
}

/// [`UploadStore`] writing to an S3 bucket
pub struct S3UploadStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3UploadStore {
    /// Build a store for `bucket`; credentials come from the standard AWS environment
    pub fn new(region: &str, bucket: &str) -> Result<Self> {
        let store = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket)
            .build()
            .map_err(|e| Error::Config(format!("S3 bucket {}: {}", bucket, e)))?;
        Ok(Self::with_store(Arc::new(store), bucket))
    }

    /// Write through an existing object store client
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl UploadStore for S3UploadStore {
    async fn upload(&self, key: &str, body: ByteStream) -> Result<String> {
        // Parsed rather than encoded so the stored key is exactly the one in the URL
        let path = ObjectPath::parse(key)
            .map_err(|e| Error::BadRequest(format!("invalid object key {}: {}", key, e)))?;
        info!(bucket = %self.bucket, key = %path, "Uploading to S3");

        let mut writer = BufWriter::new(self.store.clone(), path.clone());
        let mut reader = StreamReader::new(body);

        if let Err(e) = tokio::io::copy(&mut reader, &mut writer).await {
            if let Err(abort) = writer.abort().await {
                warn!(key = %key, error = %abort, "Failed to abort partial upload");
            }
            return Err(Error::Upload(format!(
                "bucket {}, key {}: {}",
                self.bucket, key, e
            )));
        }
        writer.shutdown().await.map_err(|e| {
            Error::Upload(format!("bucket {}, key {}: {}", self.bucket, key, e))
        })?;

        info!(bucket = %self.bucket, key = %path, "Uploaded to S3");
        Ok(format!("s3a://{}/{}", self.bucket, path))
    }
}
