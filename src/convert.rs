// ─────────────────────────────────────────────────────────────────────
// Batch → Conversion, and the file/directory driver around it
// ─────────────────────────────────────────────────────────────────────
use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{bail, Context, Result};
use glob::glob;
use log::{debug, error, info};
use rayon::prelude::*;

use crate::{
    calibration::Calibration,
    error::ConvertResult,
    extract::{extract_sensor_field, extract_spectrometer, extract_weather_field, FieldSeries, SpectrometerSeries},
    record::{load_record, Batch},
    spectral::{downwelling_flux, wavelength_deltas, DownwellingFlux},
    time::days_since_epoch,
    units::UnitTable,
    writer::{write_netcdf, OutputFormat},
};

pub const INPUT_EXT:  &str = "json";
pub const OUTPUT_EXT: &str = "nc";

/// Everything that goes into one output file.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Days since 1970-01-01, one per reading.
    pub time:               Vec<f64>,
    pub weather:            Vec<FieldSeries>,
    pub sensors:            Vec<FieldSeries>,
    pub spectrometer:       SpectrometerSeries,
    pub wavelength_deltas:  Vec<f64>,
    pub flux_sensitivity:   Vec<f64>,
    pub flux:               DownwellingFlux,
    pub sensor_area_m2:     f64,
    pub calibration_source: Option<String>,
}

fn timeit<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let t0 = Instant::now();
    let out = f();
    debug!("{label:<20}{:?}", t0.elapsed());
    out
}

pub fn convert_batch(batch: &Batch, units: &UnitTable, calibration: &Calibration) -> ConvertResult<Conversion> {
    let time = batch
        .readings
        .iter()
        .map(|r| days_since_epoch(&r.timestamp))
        .collect::<ConvertResult<Vec<_>>>()?;

    let weather = batch
        .weather_fields()
        .iter()
        .map(|name| extract_weather_field(batch, units, name))
        .collect::<ConvertResult<Vec<_>>>()?;

    let sensors = batch
        .sensor_keys()
        .iter()
        .map(|key| extract_sensor_field(batch, units, key))
        .collect::<ConvertResult<Vec<_>>>()?;

    let spectrometer = extract_spectrometer(batch, units)?;
    let deltas = wavelength_deltas(&spectrometer.wavelengths)?;
    calibration.check_grid(&spectrometer.wavelengths, &deltas)?;
    let flux = downwelling_flux(
        &spectrometer.spectra,
        &deltas,
        &calibration.flux_sensitivity,
        spectrometer.integration_time_s,
        calibration.sensor_area_m2,
    )?;

    Ok(Conversion {
        time,
        weather,
        sensors,
        spectrometer,
        wavelength_deltas: deltas,
        flux_sensitivity: calibration.flux_sensitivity.clone(),
        flux,
        sensor_area_m2: calibration.sensor_area_m2,
        calibration_source: calibration.source.clone(),
    })
}

/// Injected once per run and shared read-only by every conversion.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    pub units:       UnitTable,
    pub calibration: Calibration,
    pub format:      OutputFormat,
    /// Global `history` attribute.
    pub history:     String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub input:  PathBuf,
    pub output: PathBuf,
}

pub fn convert_file(job: &Job, config: &ConversionConfig) -> Result<()> {
    let batch = timeit("load_record", || load_record(&job.input))?;
    let conv = timeit("convert_batch", || convert_batch(&batch, &config.units, &config.calibration))
        .with_context(|| format!("converting {}", job.input.display()))?;
    if let Some(parent) = job.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    timeit("write_netcdf", || write_netcdf(&conv, &job.output, config.format, &config.history))?;
    Ok(())
}

fn output_name(input: &Path) -> Result<PathBuf> {
    let name = input
        .file_name()
        .with_context(|| format!("no file name in {}", input.display()))?;
    Ok(Path::new(name).with_extension(OUTPUT_EXT))
}

/// Recursively list `*.json` under `base`, sorted.
pub fn list_records(base: &Path) -> Result<Vec<PathBuf>> {
    let mut v: Vec<_> = glob(&format!("{}/**/*.{INPUT_EXT}", base.display()))?
        .filter_map(Result::ok)
        .collect();
    v.sort();
    Ok(v)
}

/// Work out input → output pairs.
///
/// A file input goes to `output` itself when that ends in `.nc`, otherwise
/// into the directory `output`. A directory input is walked recursively and
/// its layout mirrored under `output`.
pub fn plan_jobs(input: &Path, output: &Path) -> Result<Vec<Job>> {
    let output_is_file = output.extension().is_some_and(|e| e == OUTPUT_EXT);

    if input.is_file() {
        let out = if output_is_file { output.to_path_buf() } else { output.join(output_name(input)?) };
        return Ok(vec![Job { input: input.to_path_buf(), output: out }]);
    }
    if !input.is_dir() {
        bail!("input {} does not exist", input.display());
    }
    if output_is_file {
        bail!("directory input needs an output directory, got {}", output.display());
    }

    list_records(input)?
        .into_iter()
        .map(|path| {
            let rel = path.strip_prefix(input).unwrap_or(&path);
            let out = output.join(rel).with_extension(OUTPUT_EXT);
            Ok(Job { input: path, output: out })
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub converted: Vec<PathBuf>,
    pub failed:    Vec<(PathBuf, String)>,
}

/// Convert every job in parallel. A failing file is logged here, once, and
/// recorded; the others carry on.
pub fn run(jobs: &[Job], config: &ConversionConfig) -> RunSummary {
    let results: Vec<(&Job, Result<()>)> = jobs
        .par_iter()
        .map(|job| {
            info!("processing {}", job.input.display());
            (job, convert_file(job, config))
        })
        .collect();

    let mut summary = RunSummary::default();
    for (job, res) in results {
        match res {
            Ok(()) => {
                info!("exported {} → {}", job.input.display(), job.output.display());
                summary.converted.push(job.output.clone());
            }
            Err(e) => {
                error!("FAILED {}: {e:#}", job.input.display());
                summary.failed.push((job.input.clone(), format!("{e:#}")));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use crate::record::parse_record;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn calibration(n: usize) -> Calibration {
        Calibration {
            wavelengths:      (0..n).map(|i| (400.0 + i as f64) * 1e-9).collect(),
            flux_sensitivity: vec![2e-6; n],
            sensor_area_m2:   1e-4,
            source:           Some("unit test".into()),
        }
    }

    fn batch() -> Batch {
        let reading = |stamp: &str, counts: [f64; 3]| {
            json!({
                "timestamp": stamp,
                "weather_station": {
                    "precipitation": { "value": "3.6", "unit": "mm/h", "rawValue": "36" },
                    "airPressure":   { "value": "1000", "unit": "hPa", "rawValue": "10000" }
                },
                "sensor par": { "value": "1000", "unit": "umol/(m^2*s)", "rawValue": "1" },
                "spectrometer": {
                    "maxFixedIntensity": 16383,
                    "integration time in us": 10000,
                    "wavelength": [400.0, 401.0, 402.0],
                    "spectrum": counts
                }
            })
        };
        let doc = json!({ "environment_sensor_readings": [
            reading("2016.04.07-12:00:00", [1.0, 2.0, 3.0]),
            reading("2016.04.07-12:00:05", [0.0, 0.0, 0.0]),
        ]});
        parse_record(&doc.to_string()).unwrap()
    }

    #[test]
    fn converts_whole_batch() {
        let conv = convert_batch(&batch(), &UnitTable::standard(), &calibration(3)).unwrap();

        assert_eq!(conv.time.len(), 2);
        assert_relative_eq!(conv.time[1] - conv.time[0], 5.0 / 86_400.0, max_relative = 1e-6);

        let keys: Vec<_> = conv.weather.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, ["airPressure", "precipitation"]);
        assert_relative_eq!(conv.weather[0].values[0], 1e5);
        assert_relative_eq!(conv.weather[1].values[0], 1e-6, max_relative = 1e-9);
        assert_relative_eq!(conv.sensors[0].values[0], 1e-3);

        for d in &conv.wavelength_deltas {
            assert_relative_eq!(*d, 1e-9, max_relative = 1e-6);
        }

        // counts * 2e-6 / (0.01 s * 1e-4 m2)
        assert_relative_eq!(conv.flux.spectral[0][2], 3.0 * 2e-6 / 1e-6, max_relative = 1e-9);
        assert_relative_eq!(conv.flux.broadband[0], 12.0 * 1e-9, max_relative = 1e-6);
        assert_eq!(conv.flux.broadband[1], 0.0);
    }

    #[test]
    fn calibration_length_must_match() {
        let err = convert_batch(&batch(), &UnitTable::standard(), &calibration(4)).unwrap_err();
        assert_eq!(err, ConvertError::CalibrationShape { expected: 3, found: 4 });
    }

    #[test]
    fn calibration_off_grid_is_refused() {
        let mut cal = calibration(3);
        cal.wavelengths[1] = 401.6e-9;
        let err = convert_batch(&batch(), &UnitTable::standard(), &cal).unwrap_err();
        assert!(matches!(err, ConvertError::CalibrationGrid { channel: 1, .. }));
    }

    #[test]
    fn plans_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("2016-04-07_12-00-07_environmentlogger.json");
        std::fs::write(&input, "{}").unwrap();

        let jobs = plan_jobs(&input, &dir.path().join("out")).unwrap();
        assert_eq!(jobs[0].output, dir.path().join("out/2016-04-07_12-00-07_environmentlogger.nc"));

        let jobs = plan_jobs(&input, &dir.path().join("explicit.nc")).unwrap();
        assert_eq!(jobs[0].output, dir.path().join("explicit.nc"));
    }

    #[test]
    fn plans_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(raw.join("2016-04-08")).unwrap();
        std::fs::write(raw.join("a.json"), "{}").unwrap();
        std::fs::write(raw.join("2016-04-08/b.json"), "{}").unwrap();
        std::fs::write(raw.join("notes.txt"), "").unwrap();

        let out = dir.path().join("out");
        let jobs = plan_jobs(&raw, &out).unwrap();
        let outputs: Vec<_> = jobs.iter().map(|j| j.output.clone()).collect();
        assert_eq!(outputs, vec![out.join("2016-04-08/b.nc"), out.join("a.nc")]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(plan_jobs(&dir.path().join("nope.json"), dir.path()).is_err());
    }
}
