//! In-memory form of one EnvironmentLogger JSON record file.
//!
//! ```json
//! {
//!   "environment_sensor_fixed_infos": { ... },
//!   "environment_sensor_readings": [
//!     {
//!       "timestamp": "2016.04.07-12:00:07",
//!       "weather_station": { "airPressure": { "value": "1013.2", "unit": "hPa", "rawValue": "10132" }, ... },
//!       "sensor par": { "value": "1010", "unit": "umol/(m^2*s)", "rawValue": "2021" },
//!       "spectrometer": { "maxFixedIntensity": "16383", "integration time in us": "5000",
//!                         "wavelength": [337.7, ...], "spectrum": [812, ...] }
//!     }
//!   ]
//! }
//! ```
//!
//! Numeric scalars arrive as numbers or as numeric strings depending on the
//! logger firmware, so they are kept as [`Value`] and parsed during
//! extraction where the reading index is known.
use std::{collections::BTreeMap, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConvertError, ConvertResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Batch {
    #[serde(rename = "environment_sensor_fixed_infos", default)]
    pub fixed_infos: Map<String, Value>,
    #[serde(rename = "environment_sensor_readings")]
    pub readings: Vec<Reading>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reading {
    pub timestamp: String,
    #[serde(default)]
    pub weather_station: BTreeMap<String, Measurement>,
    pub spectrometer: Option<Spectrometer>,
    /// Everything else on the reading; `sensor *` entries are measurements.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub value: Value,
    /// `None` when the member is absent; `Some("")` is a unit-less field.
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(rename = "rawValue", default)]
    pub raw_value: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Spectrometer {
    #[serde(default)]
    pub wavelength: Vec<f64>,
    #[serde(default)]
    pub spectrum: Vec<f64>,
    #[serde(rename = "maxFixedIntensity", default)]
    pub max_fixed_intensity: Value,
    #[serde(
        rename = "integration time in us",
        alias = "integration time in ?s",
        alias = "integration time in µs",
        default
    )]
    pub integration_time_us: Value,
}

pub const SENSOR_PREFIX: &str = "sensor";

impl Batch {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.readings.first()
    }

    /// Weather-station field names on the first reading, sorted.
    pub fn weather_fields(&self) -> Vec<String> {
        self.first()
            .map(|r| r.weather_station.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// `sensor *` keys on the first reading, sorted.
    pub fn sensor_keys(&self) -> Vec<String> {
        self.first()
            .map(|r| {
                r.other
                    .keys()
                    .filter(|k| k.starts_with(SENSOR_PREFIX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Reading {
    /// `Ok(None)` when the reading has no `key`; an entry that is not a
    /// measurement object is `InvalidValue` at reading `index`.
    pub fn sensor(&self, key: &str, index: usize) -> ConvertResult<Option<Measurement>> {
        let Some(v) = self.other.get(key) else { return Ok(None) };
        serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|_| ConvertError::InvalidValue {
                index,
                path:  key.to_string(),
                value: v.to_string(),
            })
    }
}

/// JSON number or numeric string → `f64`.
pub fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn parse_record(text: &str) -> Result<Batch> {
    let batch: Batch = serde_json::from_str(text).context("parsing EnvironmentLogger JSON")?;
    if batch.is_empty() {
        bail!("record has no environment_sensor_readings");
    }
    Ok(batch)
}

pub fn load_record(path: &Path) -> Result<Batch> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_record(&text).with_context(|| format!("in {}", path.display()))
}
