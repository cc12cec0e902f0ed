use log::{error, info, warn};
use serde::Serialize;

use crate::client::{Fetched, PurpleAirClient, SensorSource};
use crate::configuration::Settings;
use crate::error::IngestError;
use crate::freshness::is_fresh;
use crate::models::SensorReading;
use crate::record::IngestionRecord;
use crate::storage::ParquetSink;
use crate::validation::clean;

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Uploaded { key: String },
    SkippedNoData,
    SkippedNoPayload,
    SkippedStale,
    Failed(String),
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Failed(_) => 500,
            _ => 200,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Outcome::Uploaded { .. } => "Data ingestion and upload successful!".to_string(),
            Outcome::SkippedNoData | Outcome::SkippedNoPayload | Outcome::SkippedStale => {
                "Data processing completed, but no record to upload.".to_string()
            }
            Outcome::Failed(reason) => format!("Error during data ingestion: {}", reason),
        }
    }

    pub fn into_response(self) -> InvocationResponse {
        InvocationResponse {
            status_code: self.status_code(),
            body: self.message(),
        }
    }
}

impl From<IngestError> for Outcome {
    fn from(e: IngestError) -> Self {
        Outcome::Failed(e.to_string())
    }
}

/// Result handed back to whatever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

/// Runs one fetch, clean and store cycle.
///
/// Fetch failures, a missing sensor payload and stale data end the run
/// without output. `open_sink` is only called once there is a record to
/// store.
pub async fn ingest<S, F>(source: &S, open_sink: F) -> Result<Outcome, IngestError>
where
    S: SensorSource + ?Sized,
    F: FnOnce() -> Result<ParquetSink, IngestError>,
{
    let Fetched {
        response,
        fetched_at,
    } = match source.fetch().await {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!("No data fetched, skipping this run: {}", e);
            return Ok(Outcome::SkippedNoData);
        }
    };

    let Some(payload) = response.sensor else {
        warn!("API response did not contain a 'sensor' payload, cannot proceed");
        return Ok(Outcome::SkippedNoPayload);
    };

    let reading = SensorReading::from(payload);
    if !is_fresh(Some(&reading), fetched_at) {
        warn!("Data not fresh, nothing to store");
        return Ok(Outcome::SkippedStale);
    }

    info!("Freshness check passed, cleaning data");
    let reading = clean(reading);
    let record = IngestionRecord::new(&reading, fetched_at)?;
    info!("Prepared record for sensor {}", record.sensor_index);

    let sink = open_sink()?;
    let key = sink.write(&record).await?;
    Ok(Outcome::Uploaded {
        key: key.to_string(),
    })
}

/// Entry point for one scheduled invocation.
pub async fn handle_invocation(settings: &Settings) -> InvocationResponse {
    info!("Starting PurpleAir data ingestion");

    let outcome = match PurpleAirClient::new(&settings.purpleair) {
        Ok(client) => ingest(&client, || ParquetSink::from_settings(&settings.storage))
            .await
            .unwrap_or_else(|e| {
                error!("Ingestion failed: {}", e);
                Outcome::from(e)
            }),
        Err(e) => {
            error!("Ingestion failed: {}", e);
            Outcome::from(e)
        }
    };

    info!("Ingestion finished: {:?}", outcome);
    outcome.into_response()
}
