use log::warn;
use serde_json::Value;

/// Top level body of `GET /sensors/{sensor_index}/`.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct SensorResponse {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub time_stamp: Option<i64>,
    #[serde(default)]
    pub sensor: Option<SensorPayload>,
}

/// The `sensor` object as the API sends it.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct SensorPayload {
    pub sensor_index: i64,
    #[serde(default)]
    pub last_seen: Option<i64>,
    #[serde(default)]
    pub rssi: Option<i64>,
    #[serde(default, rename = "globalID")]
    pub global_id: Option<String>,
    #[serde(default)]
    pub temperature: Option<Measurement>,
    #[serde(default)]
    pub humidity: Option<Measurement>,
    #[serde(default)]
    pub pressure: Option<Measurement>,
    #[serde(default, rename = "pm2.5")]
    pub pm2_5: Option<Measurement>,
    #[serde(default, rename = "pm2.5_alt")]
    pub pm2_5_alt: Option<Measurement>,
    #[serde(default)]
    pub visual_range: Option<Measurement>,
    #[serde(default)]
    pub stats: Option<Value>,
}

/// A measurement slot. Anything that is not a JSON number is kept as
/// `Other` so the cleaner can report it.
#[derive(serde::Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Measurement {
    Number(f64),
    Other(Value),
}

impl Measurement {
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(ref number) => match number.as_f64() {
                Some(number) => Some(Self::Number(number)),
                None => Some(Self::Other(value)),
            },
            other => Some(Self::Other(other)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            Self::Other(_) => None,
        }
    }
}

/// A single reading after the `stats` block has been flattened.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReading {
    pub sensor_index: i64,
    pub last_seen: Option<i64>,
    pub rssi: Option<i64>,
    pub global_id: Option<String>,
    pub temperature: Option<Measurement>,
    pub humidity: Option<Measurement>,
    pub pressure: Option<Measurement>,
    pub pm2_5: Option<Measurement>,
    pub pm2_5_alt: Option<Measurement>,
    pub visual_range: Option<Measurement>,
    pub pm2_5_6hour: Option<Measurement>,
}

impl From<SensorPayload> for SensorReading {
    fn from(payload: SensorPayload) -> Self {
        let pm2_5_6hour = match payload.stats {
            Some(Value::Object(mut stats)) => stats
                .remove("pm2.5_6hour")
                .and_then(Measurement::from_json),
            _ => {
                warn!(
                    "Sensor {}: stats block missing or not an object, pm2.5_6hour set to null",
                    payload.sensor_index
                );
                None
            }
        };

        Self {
            sensor_index: payload.sensor_index,
            last_seen: payload.last_seen,
            rssi: payload.rssi,
            global_id: payload.global_id,
            temperature: payload.temperature,
            humidity: payload.humidity,
            pressure: payload.pressure,
            pm2_5: payload.pm2_5,
            pm2_5_alt: payload.pm2_5_alt,
            visual_range: payload.visual_range,
            pm2_5_6hour,
        }
    }
}
