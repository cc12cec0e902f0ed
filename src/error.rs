use reqwest::StatusCode;
use thiserror::Error;

/// Failures at the fetch boundary. These never fail an invocation, they only
/// mean there is no data for this run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Failures that end an invocation with an error status.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("configuration error: storage bucket name missing")]
    MissingBucket,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),

    #[error("failed to build record batch: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("failed to encode parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("storage error: {0}")]
    Storage(#[from] object_store::Error),
}
