use std::sync::Arc;

use log::info;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};

use crate::configuration::{StorageBackend, StorageSettings};
use crate::error::IngestError;
use crate::record::IngestionRecord;

/// Writes ingestion records as Parquet objects.
pub struct ParquetSink {
    store: Arc<dyn ObjectStore>,
    location: String,
}

impl ParquetSink {
    pub fn new(store: Arc<dyn ObjectStore>, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
        }
    }

    /// Opens the configured backend. Fails if no bucket is configured.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, IngestError> {
        let bucket = settings
            .bucket_name
            .as_deref()
            .filter(|bucket| !bucket.is_empty())
            .ok_or(IngestError::MissingBucket)?;

        match settings.backend {
            StorageBackend::S3 => {
                let store = AmazonS3Builder::from_env().with_bucket_name(bucket).build()?;
                Ok(Self::new(Arc::new(store), format!("s3://{}", bucket)))
            }
            StorageBackend::Local => {
                let root = settings.local_root.join(bucket);
                std::fs::create_dir_all(&root).map_err(|source| object_store::Error::Generic {
                    store: "LocalFileSystem",
                    source: Box::new(source),
                })?;
                let store = LocalFileSystem::new_with_prefix(&root)?;
                Ok(Self::new(Arc::new(store), format!("file://{}", root.display())))
            }
        }
    }

    /// Encodes `record` and stores it under its object key.
    pub async fn write(&self, record: &IngestionRecord) -> Result<Path, IngestError> {
        let key = Path::from(record.object_key());
        let body = record.to_parquet()?;
        self.store.put(&key, PutPayload::from(body)).await?;
        info!(
            "Uploaded data for sensor {} to {}/{}",
            record.sensor_index, self.location, key
        );
        Ok(key)
    }
}
