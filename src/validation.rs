//! Range validation and cleaning of the measurement fields.
//!
//! Every ranged field is handled on its own: values that are not numbers or
//! fall outside the inclusive range become `None`, fractional values are
//! rounded to two decimals. Other fields pass through untouched.

use log::warn;

use crate::models::{Measurement, SensorReading};

/// Inclusive range of plausible values for a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangedField {
    Temperature,
    Humidity,
    Pressure,
    Pm25,
    Pm25Alt,
    VisualRange,
}

impl RangedField {
    pub const ALL: [RangedField; 6] = [
        RangedField::Temperature,
        RangedField::Humidity,
        RangedField::Pressure,
        RangedField::Pm25,
        RangedField::Pm25Alt,
        RangedField::VisualRange,
    ];

    /// Field name as used by the API and in the output columns.
    pub fn name(self) -> &'static str {
        match self {
            RangedField::Temperature => "temperature",
            RangedField::Humidity => "humidity",
            RangedField::Pressure => "pressure",
            RangedField::Pm25 => "pm2.5",
            RangedField::Pm25Alt => "pm2.5_alt",
            RangedField::VisualRange => "visual_range",
        }
    }

    pub fn range(self) -> ValidRange {
        match self {
            RangedField::Temperature => ValidRange::new(0.0, 120.0),
            RangedField::Humidity => ValidRange::new(0.0, 100.0),
            RangedField::Pressure => ValidRange::new(750.0, 1300.0),
            RangedField::Pm25 | RangedField::Pm25Alt | RangedField::VisualRange => {
                ValidRange::new(0.0, 500.0)
            }
        }
    }

    fn slot(self, reading: &mut SensorReading) -> &mut Option<Measurement> {
        match self {
            RangedField::Temperature => &mut reading.temperature,
            RangedField::Humidity => &mut reading.humidity,
            RangedField::Pressure => &mut reading.pressure,
            RangedField::Pm25 => &mut reading.pm2_5,
            RangedField::Pm25Alt => &mut reading.pm2_5_alt,
            RangedField::VisualRange => &mut reading.visual_range,
        }
    }
}

/// Cleans every ranged field of `reading`.
pub fn clean(mut reading: SensorReading) -> SensorReading {
    let sensor_index = reading.sensor_index;
    for field in RangedField::ALL {
        let slot = field.slot(&mut reading);
        *slot = clean_value(sensor_index, field, slot.take());
    }
    reading
}

/// Cleans a single value of `field`.
pub fn clean_value(
    sensor_index: i64,
    field: RangedField,
    value: Option<Measurement>,
) -> Option<Measurement> {
    let value = match value {
        Some(Measurement::Number(value)) => value,
        other => {
            let shown = match other {
                Some(Measurement::Other(raw)) => raw.to_string(),
                _ => "null".to_string(),
            };
            warn!(
                "Sensor {}: {} is not numeric ({}), set to null",
                sensor_index,
                field.name(),
                shown
            );
            return None;
        }
    };

    let range = field.range();
    if !range.contains(value) {
        warn!(
            "Sensor {}: {} value {} out of range [{}, {}], set to null",
            sensor_index,
            field.name(),
            value,
            range.min,
            range.max
        );
        return None;
    }

    if value.fract() == 0.0 {
        Some(Measurement::Number(value))
    } else {
        Some(Measurement::Number(round_to_hundredths(value)))
    }
}

/// Rounds to two decimal places using the exact decimal expansion of the
/// float, so `55.555` (stored as 55.55499...) becomes `55.55`.
pub fn round_to_hundredths(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
