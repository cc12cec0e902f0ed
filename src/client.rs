use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info};
use reqwest::header::ACCEPT;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

use crate::configuration::PurpleAirSettings;
use crate::error::{FetchError, IngestError};
use crate::models::SensorResponse;

/// Fields requested from the sensor endpoint.
pub const SENSOR_FIELDS: &str =
    "last_seen,rssi,humidity,temperature,pressure,pm2.5,pm2.5_alt,visual_range,pm2.5_6hour";

/// A parsed response and the moment it was received.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub response: SensorResponse,
    pub fetched_at: DateTime<Utc>,
}

/// Something that can produce the latest sensor response.
#[async_trait]
pub trait SensorSource {
    async fn fetch(&self) -> Result<Fetched, FetchError>;
}

pub struct PurpleAirClient {
    client: Client,
    url: String,
    api_key: Secret<String>,
}

impl PurpleAirClient {
    pub fn new(settings: &PurpleAirSettings) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(IngestError::HttpClient)?;
        let url = format!(
            "{}/sensors/{}/",
            settings.base_url.trim_end_matches('/'),
            settings.sensor_index
        );
        Ok(Self {
            client,
            url,
            api_key: settings.api_key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch_inner(&self) -> Result<SensorResponse, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .header("X-API-Key", self.api_key.expose_secret())
            .header(ACCEPT, "application/json")
            .query(&[("fields", SENSOR_FIELDS)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SensorSource for PurpleAirClient {
    async fn fetch(&self) -> Result<Fetched, FetchError> {
        match self.fetch_inner().await {
            Ok(response) => {
                let fetched_at = Utc::now();
                info!("Successfully fetched data from {}", self.url);
                Ok(Fetched {
                    response,
                    fetched_at,
                })
            }
            Err(e) => {
                error!("Error fetching data from {}: {}", self.url, e);
                Err(e)
            }
        }
    }
}
