// ─────────────────────────────────────────────────────────────────────
// Batch → per-field SI series
// ─────────────────────────────────────────────────────────────────────
use serde_json::Value;

use crate::{
    error::{ConvertError, ConvertResult},
    record::{number, Batch, Measurement, Reading},
    units::UnitTable,
};

/// One scalar field across the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSeries {
    /// Key as it appears in the record (`airPressure`, `sensor co2`, ...).
    pub key:        String,
    pub values:     Vec<f64>,
    pub raw_values: Vec<f64>,
    /// SI unit label of `values`.
    pub unit:       &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectrometerSeries {
    /// Channel centres in metres.
    pub wavelengths:           Vec<f64>,
    /// Raw counts, `spectra[i].len() == wavelengths.len()`.
    pub spectra:               Vec<Vec<f64>>,
    pub saturation_thresholds: Vec<f64>,
    pub integration_time_s:    f64,
}

fn parse_number(v: &Value, index: usize, path: &str) -> ConvertResult<f64> {
    if v.is_null() {
        return Err(ConvertError::MissingField { index, path: path.to_string() });
    }
    number(v).ok_or_else(|| ConvertError::InvalidValue {
        index,
        path:  path.to_string(),
        value: v.to_string(),
    })
}

/// Shared body of the weather-station and sensor extractors.
///
/// The unit is taken from the first reading and every other reading must
/// carry the same label. An absent `unit` member is a missing field, not a
/// unit-less one.
fn extract_measurements<'b, F>(
    batch: &'b Batch,
    units: &UnitTable,
    path:  &str,
    get:   F,
) -> ConvertResult<(Vec<f64>, Vec<f64>, &'static str)>
where
    F: Fn(usize, &'b Reading) -> ConvertResult<Option<Measurement>>,
{
    let mut measurements = Vec::with_capacity(batch.len());
    for (index, reading) in batch.readings.iter().enumerate() {
        let m = get(index, reading)?
            .ok_or_else(|| ConvertError::MissingField { index, path: path.to_string() })?;
        let label = m.unit
            .ok_or_else(|| ConvertError::MissingField { index, path: format!("{path}.unit") })?;
        measurements.push((label, m.value, m.raw_value));
    }

    let Some((first_label, ..)) = measurements.first() else {
        return Ok((Vec::new(), Vec::new(), ""));
    };
    let unit = units.lookup(first_label, path)?;

    let mut values = Vec::with_capacity(measurements.len());
    let mut raw    = Vec::with_capacity(measurements.len());
    for (index, (label, value, raw_value)) in measurements.iter().enumerate() {
        if label != first_label {
            return Err(ConvertError::InconsistentBatch {
                index,
                what: format!("unit of '{path}' ('{label}' vs '{first_label}')"),
            });
        }
        values.push(unit.to_si(parse_number(value, index, &format!("{path}.value"))?));
        raw.push(parse_number(raw_value, index, &format!("{path}.rawValue"))?);
    }
    Ok((values, raw, unit.si))
}

pub fn extract_weather_field(batch: &Batch, units: &UnitTable, name: &str) -> ConvertResult<FieldSeries> {
    let path = format!("weather_station.{name}");
    let (values, raw_values, unit) =
        extract_measurements(batch, units, &path, |_, r| Ok(r.weather_station.get(name).cloned()))?;
    Ok(FieldSeries { key: name.to_string(), values, raw_values, unit })
}

pub fn extract_sensor_field(batch: &Batch, units: &UnitTable, key: &str) -> ConvertResult<FieldSeries> {
    let (values, raw_values, unit) = extract_measurements(batch, units, key, |index, r| r.sensor(key, index))?;
    Ok(FieldSeries { key: key.to_string(), values, raw_values, unit })
}

/// Grid from the first reading, counts and saturation threshold from all.
///
/// Every later grid is checked against the first one; shape errors are
/// raised here, before any flux is computed.
pub fn extract_spectrometer(batch: &Batch, units: &UnitTable) -> ConvertResult<SpectrometerSeries> {
    let mut specs = Vec::with_capacity(batch.len());
    for (index, reading) in batch.readings.iter().enumerate() {
        let s = reading.spectrometer.as_ref().ok_or_else(|| ConvertError::MissingField {
            index,
            path: "spectrometer".into(),
        })?;
        specs.push(s);
    }
    let Some(first) = specs.first() else {
        return Err(ConvertError::MissingField { index: 0, path: "spectrometer".into() });
    };

    let nm = units.lookup("nm", "spectrometer.wavelength")?;
    let us = units.lookup("us", "spectrometer.integration time in us")?;

    let wavelengths: Vec<f64> = first.wavelength.iter().map(|&w| nm.to_si(w)).collect();
    let integration_us = parse_number(&first.integration_time_us, 0, "spectrometer.integration time in us")?;

    let mut spectra    = Vec::with_capacity(specs.len());
    let mut thresholds = Vec::with_capacity(specs.len());
    for (index, s) in specs.iter().enumerate() {
        if s.wavelength != first.wavelength {
            return Err(ConvertError::InconsistentBatch { index, what: "wavelength grid".into() });
        }
        if s.spectrum.len() != wavelengths.len() {
            return Err(ConvertError::SpectrometerShape {
                index,
                expected: wavelengths.len(),
                found:    s.spectrum.len(),
            });
        }
        let t = parse_number(&s.integration_time_us, index, "spectrometer.integration time in us")?;
        if t != integration_us {
            return Err(ConvertError::InconsistentBatch { index, what: "integration time".into() });
        }
        spectra.push(s.spectrum.clone());
        thresholds.push(parse_number(&s.max_fixed_intensity, index, "spectrometer.maxFixedIntensity")?);
    }

    Ok(SpectrometerSeries {
        wavelengths,
        spectra,
        saturation_thresholds: thresholds,
        integration_time_s: us.to_si(integration_us),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_record;
    use crate::units::UnitEntry;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn reading(pressure: Value, unit: &str, spectrum: Vec<f64>) -> Value {
        json!({
            "timestamp": "2016.04.07-12:00:07",
            "weather_station": {
                "airPressure": { "value": pressure, "unit": unit, "rawValue": pressure }
            },
            "sensor co2": { "value": "400", "unit": "ppm", "rawValue": "4000" },
            "spectrometer": {
                "maxFixedIntensity": "16383",
                "integration time in us": "5000",
                "wavelength": [400.0, 500.0, 600.0],
                "spectrum": spectrum
            }
        })
    }

    fn batch(readings: Vec<Value>) -> Batch {
        parse_record(&json!({ "environment_sensor_readings": readings }).to_string()).unwrap()
    }

    #[test]
    fn scales_values_and_keeps_raw() {
        let table = UnitTable::from_entries(&[UnitEntry {
            label: "cm", display: "centi", si: "hundredth", scale: 100.0,
        }]);
        let b = batch(
            [1.0, 2.0, 3.0]
                .into_iter()
                .map(|v| reading(json!(v), "cm", vec![0.0; 3]))
                .collect(),
        );
        let f = extract_weather_field(&b, &table, "airPressure").unwrap();
        assert_eq!(f.values, vec![100.0, 200.0, 300.0]);
        assert_eq!(f.raw_values, vec![1.0, 2.0, 3.0]);
        assert_eq!(f.unit, "hundredth");
    }

    #[test]
    fn sensor_field() {
        let b = batch(vec![reading(json!("1000"), "hPa", vec![0.0; 3])]);
        let f = extract_sensor_field(&b, &UnitTable::standard(), "sensor co2").unwrap();
        assert_relative_eq!(f.values[0], 400e-6);
        assert_eq!(f.raw_values, vec![4000.0]);
        assert_eq!(f.unit, "mol mol-1");
    }

    #[test]
    fn missing_field_reports_index() {
        let mut second = reading(json!("1000"), "hPa", vec![0.0; 3]);
        second["weather_station"] = json!({});
        let b = batch(vec![reading(json!("1000"), "hPa", vec![0.0; 3]), second]);
        let err = extract_weather_field(&b, &UnitTable::standard(), "airPressure").unwrap_err();
        assert_eq!(
            err,
            ConvertError::MissingField { index: 1, path: "weather_station.airPressure".into() }
        );
    }

    #[test]
    fn unknown_unit_is_refused() {
        let b = batch(vec![reading(json!("1000"), "mmHg", vec![0.0; 3])]);
        let err = extract_weather_field(&b, &UnitTable::standard(), "airPressure").unwrap_err();
        assert!(matches!(err, ConvertError::UnknownUnit { ref label, .. } if label == "mmHg"));
    }

    #[test]
    fn unit_change_mid_batch_is_flagged() {
        let b = batch(vec![
            reading(json!("1000"), "hPa", vec![0.0; 3]),
            reading(json!("100000"), "m", vec![0.0; 3]),
        ]);
        let err = extract_weather_field(&b, &UnitTable::standard(), "airPressure").unwrap_err();
        assert!(matches!(err, ConvertError::InconsistentBatch { index: 1, .. }));
    }

    #[test]
    fn non_numeric_value() {
        let b = batch(vec![reading(json!("n/a"), "hPa", vec![0.0; 3])]);
        let err = extract_weather_field(&b, &UnitTable::standard(), "airPressure").unwrap_err();
        assert!(matches!(err, ConvertError::InvalidValue { index: 0, .. }));
    }

    #[test]
    fn spectrometer_series() {
        let b = batch(vec![
            reading(json!("1000"), "hPa", vec![1.0, 2.0, 3.0]),
            reading(json!("1000"), "hPa", vec![4.0, 5.0, 6.0]),
        ]);
        let s = extract_spectrometer(&b, &UnitTable::standard()).unwrap();
        assert_relative_eq!(s.wavelengths[0], 400e-9);
        assert_relative_eq!(s.wavelengths[2], 600e-9);
        assert_eq!(s.spectra[1], vec![4.0, 5.0, 6.0]);
        assert_eq!(s.saturation_thresholds, vec![16383.0, 16383.0]);
        assert_relative_eq!(s.integration_time_s, 5e-3);
    }

    #[test]
    fn short_spectrum_is_shape_error() {
        let b = batch(vec![
            reading(json!("1000"), "hPa", vec![1.0, 2.0, 3.0]),
            reading(json!("1000"), "hPa", vec![1.0, 2.0]),
        ]);
        let err = extract_spectrometer(&b, &UnitTable::standard()).unwrap_err();
        assert_eq!(err, ConvertError::SpectrometerShape { index: 1, expected: 3, found: 2 });
    }

    #[test]
    fn drifting_grid_is_flagged() {
        let mut second = reading(json!("1000"), "hPa", vec![1.0, 2.0, 3.0]);
        second["spectrometer"]["wavelength"] = json!([400.0, 500.5, 600.0]);
        let b = batch(vec![reading(json!("1000"), "hPa", vec![1.0, 2.0, 3.0]), second]);
        let err = extract_spectrometer(&b, &UnitTable::standard()).unwrap_err();
        assert!(matches!(err, ConvertError::InconsistentBatch { index: 1, .. }));
    }

    #[test]
    fn absent_unit_is_missing_not_unitless() {
        let mut first = reading(json!("1013.2"), "hPa", vec![0.0; 3]);
        first["weather_station"]["airPressure"] = json!({ "value": "1013.2", "rawValue": "10132" });
        let b = batch(vec![first]);
        let err = extract_weather_field(&b, &UnitTable::standard(), "airPressure").unwrap_err();
        assert_eq!(
            err,
            ConvertError::MissingField { index: 0, path: "weather_station.airPressure.unit".into() }
        );
    }

    #[test]
    fn absent_unit_on_later_reading() {
        let mut second = reading(json!("400"), "ppm", vec![0.0; 3]);
        second["sensor co2"] = json!({ "value": "400", "rawValue": "4000" });
        let b = batch(vec![reading(json!("1000"), "hPa", vec![0.0; 3]), second]);
        let err = extract_sensor_field(&b, &UnitTable::standard(), "sensor co2").unwrap_err();
        assert_eq!(err, ConvertError::MissingField { index: 1, path: "sensor co2.unit".into() });
    }

    #[test]
    fn empty_unit_is_unitless() {
        let b = batch(vec![reading(json!("7"), "", vec![0.0; 3])]);
        let f = extract_weather_field(&b, &UnitTable::standard(), "airPressure").unwrap();
        assert_eq!(f.values, vec![7.0]);
        assert_eq!(f.unit, "");
    }

    #[test]
    fn malformed_sensor_object() {
        let mut r = reading(json!("1000"), "hPa", vec![0.0; 3]);
        r["sensor co2"] = json!({ "value": "400", "unit": 7, "rawValue": "4" });
        let b = batch(vec![r]);
        let err = extract_sensor_field(&b, &UnitTable::standard(), "sensor co2").unwrap_err();
        match err {
            ConvertError::InvalidValue { index, path, value } => {
                assert_eq!(index, 0);
                assert_eq!(path, "sensor co2");
                assert!(value.contains("\"unit\":7"));
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn integration_time_change_is_flagged() {
        let mut second = reading(json!("1000"), "hPa", vec![1.0, 2.0, 3.0]);
        second["spectrometer"]["integration time in us"] = json!("10000");
        let b = batch(vec![reading(json!("1000"), "hPa", vec![1.0, 2.0, 3.0]), second]);
        let err = extract_spectrometer(&b, &UnitTable::standard()).unwrap_err();
        assert_eq!(
            err,
            ConvertError::InconsistentBatch { index: 1, what: "integration time".into() }
        );
    }
}
