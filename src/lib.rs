pub mod client;
pub mod configuration;
pub mod error;
pub mod freshness;
pub mod ingestion;
pub mod models;
pub mod record;
pub mod storage;
pub mod validation;
