// ─────────────────────────────────────────────────────────────────────
// Spectrometer calibration: per-channel flux sensitivity + sensor area
// ─────────────────────────────────────────────────────────────────────
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::error::{ConvertError, ConvertResult};

/// Vendor IrradCal exports are in µW m-2 per count.
pub const FLUX_SENSITIVITY_TO_SI: f64 = 1e-6;
pub const NM_TO_M:                f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Channel centres the curve was measured at, metres.
    pub wavelengths:      Vec<f64>,
    /// W m-2 per count.
    pub flux_sensitivity: Vec<f64>,
    pub sensor_area_m2:   f64,
    pub source:           Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurveRow {
    wavelength:       f64,
    flux_sensitivity: f64,
}

impl Calibration {
    /// Parse a calibration CSV:
    ///
    /// ```text
    /// # source,S05673_08062015.IrradCal
    /// # sensor_area,6.4e-5
    /// wavelength,flux_sensitivity
    /// 337.7,0.3148
    /// ...
    /// ```
    ///
    /// Wavelengths in nm, sensitivities in µW m-2 per count; both are stored
    /// in SI.
    pub fn parse(text: &str) -> Result<Self> {
        let mut sensor_area = None;
        let mut source = None;
        let mut body = Vec::new();

        for line in text.lines() {
            let t = line.trim();
            if t.is_empty() { continue }
            let Some(meta) = t.strip_prefix('#') else {
                body.push(t);
                continue;
            };
            let Some((key, value)) = meta.split_once(',') else { continue };
            match key.trim() {
                "sensor_area" => {
                    let area: f64 = value.trim().parse()
                        .with_context(|| format!("bad sensor_area '{}'", value.trim()))?;
                    sensor_area = Some(area);
                }
                "source" => source = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let sensor_area_m2 = sensor_area.ok_or_else(|| anyhow!("calibration has no '# sensor_area' line"))?;
        if !(sensor_area_m2 > 0.0) {
            bail!("sensor_area must be positive, got {sensor_area_m2}");
        }

        let blob = body.join("\n");
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(blob.as_bytes());

        let mut wavelengths = Vec::new();
        let mut flux_sensitivity = Vec::new();
        for (i, row) in rdr.deserialize::<CurveRow>().enumerate() {
            let row = row.with_context(|| format!("calibration row {}", i + 1))?;
            wavelengths.push(row.wavelength * NM_TO_M);
            flux_sensitivity.push(row.flux_sensitivity * FLUX_SENSITIVITY_TO_SI);
        }
        if flux_sensitivity.is_empty() {
            bail!("calibration curve is empty");
        }

        Ok(Self { wavelengths, flux_sensitivity, sensor_area_m2, source })
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading calibration {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.flux_sensitivity.len()
    }

    /// Match the curve against a logger grid (metres) and its bandwidths.
    ///
    /// Each calibration wavelength must lie within half a bandwidth of the
    /// logger channel it is applied to.
    pub fn check_grid(&self, wavelengths: &[f64], deltas: &[f64]) -> ConvertResult<()> {
        if self.wavelengths.len() != wavelengths.len() {
            return Err(ConvertError::CalibrationShape {
                expected: wavelengths.len(),
                found:    self.wavelengths.len(),
            });
        }
        for (channel, ((&cal, &logger), &delta)) in
            self.wavelengths.iter().zip(wavelengths).zip(deltas).enumerate()
        {
            if !((cal - logger).abs() <= 0.5 * delta) {
                return Err(ConvertError::CalibrationGrid { channel, logger, calibration: cal });
            }
        }
        Ok(())
    }
}
