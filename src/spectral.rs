// ─────────────────────────────────────────────────────────────────────
// Channel bandwidths and downwelling irradiance
// ─────────────────────────────────────────────────────────────────────
use crate::error::{ConvertError, ConvertResult};

pub const MIN_CHANNELS: usize = 3;

/// Bandwidth of each channel of an irregular, strictly increasing grid.
///
/// Channel edges are the midpoints between neighbouring centres. The outer
/// edge of the first and last channel is unknown, so those two channels are
/// taken to be symmetric about their centre.
pub fn wavelength_deltas(wavelengths: &[f64]) -> ConvertResult<Vec<f64>> {
    let n = wavelengths.len();
    if n < MIN_CHANNELS {
        return Err(ConvertError::InvalidGrid(format!(
            "need at least {MIN_CHANNELS} channels, got {n}"
        )));
    }
    if let Some(k) = wavelengths.windows(2).position(|w| !(w[1] > w[0])) {
        return Err(ConvertError::InvalidGrid(format!(
            "not strictly increasing at channel {}: {} -> {}",
            k + 1,
            wavelengths[k],
            wavelengths[k + 1]
        )));
    }

    let mid: Vec<f64> = wavelengths.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

    let mut deltas = Vec::with_capacity(n);
    deltas.push(2.0 * (mid[0] - wavelengths[0]));
    deltas.extend(mid.windows(2).map(|m| m[1] - m[0]));
    deltas.push(2.0 * (wavelengths[n - 1] - mid[n - 2]));
    Ok(deltas)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownwellingFlux {
    /// W m-2 m-1, `[reading][channel]`.
    pub spectral:  Vec<Vec<f64>>,
    /// W m-2, one per reading.
    pub broadband: Vec<f64>,
}

/// Raw counts → spectral irradiance through the per-channel flux
/// sensitivity, then a Riemann sum over `deltas` for the broadband value.
///
/// `calibration` must already be in SI flux per count and match the grid
/// length exactly; it is never resampled.
pub fn downwelling_flux(
    spectra:            &[Vec<f64>],
    deltas:             &[f64],
    calibration:        &[f64],
    integration_time_s: f64,
    sensor_area_m2:     f64,
) -> ConvertResult<DownwellingFlux> {
    if calibration.len() != deltas.len() {
        return Err(ConvertError::CalibrationShape {
            expected: deltas.len(),
            found:    calibration.len(),
        });
    }
    if !(integration_time_s > 0.0) {
        return Err(ConvertError::InvalidParameter(format!(
            "integration time must be positive, got {integration_time_s} s"
        )));
    }
    if !(sensor_area_m2 > 0.0) {
        return Err(ConvertError::InvalidParameter(format!(
            "sensor area must be positive, got {sensor_area_m2} m2"
        )));
    }

    let norm = integration_time_s * sensor_area_m2;
    let mut spectral  = Vec::with_capacity(spectra.len());
    let mut broadband = Vec::with_capacity(spectra.len());

    for (index, counts) in spectra.iter().enumerate() {
        if counts.len() != deltas.len() {
            return Err(ConvertError::SpectrometerShape {
                index,
                expected: deltas.len(),
                found:    counts.len(),
            });
        }
        let row: Vec<f64> = counts
            .iter()
            .zip(calibration)
            .map(|(c, k)| c * k / norm)
            .collect();
        broadband.push(row.iter().zip(deltas).map(|(f, d)| f * d).sum());
        spectral.push(row);
    }

    Ok(DownwellingFlux { spectral, broadband })
}
