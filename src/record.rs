use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::IngestError;
use crate::models::{Measurement, SensorReading};

/// One output row, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionRecord {
    pub sensor_index: i64,
    pub global_id: Option<String>,
    pub last_seen: i64,
    pub rssi: Option<i64>,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm2_5_alt: Option<f64>,
    pub visual_range: Option<f64>,
    pub pm2_5_6hour: Option<f64>,
    pub date: String,
    pub time: String,
    pub ingestion_timestamp_iso_utc: String,
    pub ingestion_timestamp_unix_utc: i64,
    pub ingested_at: DateTime<Utc>,
}

impl IngestionRecord {
    /// Builds the row from a cleaned reading and the time it was fetched.
    pub fn new(reading: &SensorReading, fetched_at: DateTime<Utc>) -> Result<Self, IngestError> {
        let last_seen = reading.last_seen.unwrap_or_default();
        let observed_at =
            DateTime::from_timestamp(last_seen, 0).ok_or(IngestError::InvalidTimestamp(last_seen))?;

        Ok(Self {
            sensor_index: reading.sensor_index,
            global_id: reading.global_id.clone(),
            last_seen,
            rssi: reading.rssi,
            humidity: numeric(&reading.humidity),
            temperature: numeric(&reading.temperature),
            pressure: numeric(&reading.pressure),
            pm2_5: numeric(&reading.pm2_5),
            pm2_5_alt: numeric(&reading.pm2_5_alt),
            visual_range: numeric(&reading.visual_range),
            pm2_5_6hour: numeric(&reading.pm2_5_6hour),
            date: observed_at.format("%Y-%m-%d").to_string(),
            time: observed_at.format("%H:%M:%S").to_string(),
            ingestion_timestamp_iso_utc: fetched_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ingestion_timestamp_unix_utc: fetched_at.timestamp(),
            ingested_at: fetched_at,
        })
    }

    /// `data/purpleair/YYYY/MM/DD/<id>_<timestamp>.parquet`, dated by ingestion time.
    pub fn object_key(&self) -> String {
        let id = match &self.global_id {
            Some(global_id) => global_id.clone(),
            None => format!("PA_Sensor_{}", self.sensor_index),
        };
        format!(
            "data/purpleair/{}/{}_{}.parquet",
            self.ingested_at.format("%Y/%m/%d"),
            id,
            self.ingestion_timestamp_iso_utc.replace(':', "-")
        )
    }

    pub fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("sensor_index", DataType::Int64, false),
            Field::new("last_seen", DataType::Int64, false),
            Field::new("rssi", DataType::Int64, true),
            Field::new("humidity", DataType::Float64, true),
            Field::new("temperature", DataType::Float64, true),
            Field::new("pressure", DataType::Float64, true),
            Field::new("pm2.5", DataType::Float64, true),
            Field::new("pm2.5_alt", DataType::Float64, true),
            Field::new("visual_range", DataType::Float64, true),
            Field::new("pm2.5_6hour", DataType::Float64, true),
            Field::new("date", DataType::Utf8, false),
            Field::new("time", DataType::Utf8, false),
            Field::new("ingestion_timestamp_iso_utc", DataType::Utf8, false),
            Field::new("ingestion_timestamp_unix_utc", DataType::Int64, false),
        ]))
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch, IngestError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![self.sensor_index])),
            Arc::new(Int64Array::from(vec![self.last_seen])),
            Arc::new(Int64Array::from(vec![self.rssi])),
            Arc::new(Float64Array::from(vec![self.humidity])),
            Arc::new(Float64Array::from(vec![self.temperature])),
            Arc::new(Float64Array::from(vec![self.pressure])),
            Arc::new(Float64Array::from(vec![self.pm2_5])),
            Arc::new(Float64Array::from(vec![self.pm2_5_alt])),
            Arc::new(Float64Array::from(vec![self.visual_range])),
            Arc::new(Float64Array::from(vec![self.pm2_5_6hour])),
            Arc::new(StringArray::from(vec![self.date.as_str()])),
            Arc::new(StringArray::from(vec![self.time.as_str()])),
            Arc::new(StringArray::from(vec![self.ingestion_timestamp_iso_utc.as_str()])),
            Arc::new(Int64Array::from(vec![self.ingestion_timestamp_unix_utc])),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    /// Encodes the row as a Snappy-compressed Parquet file.
    pub fn to_parquet(&self) -> Result<Vec<u8>, IngestError> {
        let batch = self.to_record_batch()?;
        let properties = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(properties))?;
        writer.write(&batch)?;
        writer.close()?;

        debug!("Encoded {} bytes of parquet for sensor {}", buffer.len(), self.sensor_index);
        Ok(buffer)
    }
}

fn numeric(measurement: &Option<Measurement>) -> Option<f64> {
    measurement.as_ref().and_then(Measurement::as_f64)
}
