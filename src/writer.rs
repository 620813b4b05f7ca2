// ─────────────────────────────────────────────────────────────────────
// Conversion → netCDF container
// ─────────────────────────────────────────────────────────────────────
use std::path::Path;

use anyhow::{Context, Result};
use netcdf::{FileMut, Options, VariableMut};

use crate::{
    convert::Conversion,
    extract::FieldSeries,
    naming,
    time::TIME_UNITS,
};

pub const TIME_DIM:      &str  = "time";
pub const WVL_DIM:       &str  = "wvl_lgr";
pub const TIME_CHUNK:    usize = 1024;
pub const DEFLATE_LEVEL: i32   = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(name = "NETCDF4")]
    Netcdf4,
    #[value(name = "NETCDF3_64BIT_DATA")]
    Netcdf3_64BitData,
}

impl OutputFormat {
    fn options(self) -> Options {
        match self {
            OutputFormat::Netcdf4           => Options::NETCDF4,
            OutputFormat::Netcdf3_64BitData => Options::_64BIT_DATA,
        }
    }

    /// Chunking and deflate only exist in the HDF5-backed format.
    fn chunked(self) -> bool {
        self == OutputFormat::Netcdf4
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Netcdf4           => write!(f, "NETCDF4"),
            OutputFormat::Netcdf3_64BitData => write!(f, "NETCDF3_64BIT_DATA"),
        }
    }
}

// Instrument provenance attached as `sensor_*` scalar variables.
struct Instrument {
    var:         &'static str,
    id:          &'static str,
    name:        &'static str,
    description: &'static str,
}

const INSTRUMENTS: &[Instrument] = &[
    Instrument {
        var: "sensor_weather_station", id: "5873a9724f0cad7d8131b4d3", name: "Thies CLIMA",
        description: "Documentation, datasheets, and metadata about the Thies CLIMA sensor.",
    },
    Instrument {
        var: "sensor_spectrum", id: "5873a9174f0cad7d8131b09a", name: "Skye PRI",
        description: "Documentation, datasheets, and metadata about the Skye PRI sensor.",
    },
    Instrument {
        var: "sensor_co2", id: "5873a9924f0cad7d8131b648", name: "Vaisala CO2",
        description: "Documentation, datasheets, and metadata about the Vaisala CO2 sensor.",
    },
    Instrument {
        var: "sensor_par", id: "5873a8ce4f0cad7d8131ad86", name: "Quantum PAR",
        description: "Documentation, datasheets, and metadata about the Quantum PAR sensor.",
    },
];

fn to_f32(v: &[f64]) -> Vec<f32> {
    v.iter().map(|&x| x as f32).collect()
}

fn flatten(rows: &[Vec<f64>]) -> Vec<f32> {
    rows.iter().flat_map(|r| r.iter().map(|&x| x as f32)).collect()
}

fn put_attrs(var: &mut VariableMut, attrs: &[(&str, &str)]) -> Result<()> {
    for (k, v) in attrs {
        if !v.is_empty() {
            var.put_attribute(k, *v)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    Time,
    Wvl,
    TimeWvl,
}

enum Payload {
    /// Attribute-only `i2` variable.
    Empty,
    F32(Vec<f32>),
    F64(Vec<f64>),
}

struct Pending {
    name:    String,
    shape:   Shape,
    payload: Payload,
}

/// Classic-format files cannot define variables once data is written, so
/// every variable is declared first and the values go in afterwards.
struct Layout {
    nc:      FileMut,
    format:  OutputFormat,
    n_time:  usize,
    n_wvl:   usize,
    pending: Vec<Pending>,
}

impl Layout {
    fn define(&mut self, name: &str, shape: Shape, payload: Payload, attrs: &[(&str, &str)]) -> Result<()> {
        let dims: &[&str] = match shape {
            Shape::Scalar  => &[],
            Shape::Time    => &[TIME_DIM],
            Shape::Wvl     => &[WVL_DIM],
            Shape::TimeWvl => &[TIME_DIM, WVL_DIM],
        };
        let mut v = match payload {
            Payload::Empty  => self.nc.add_variable::<i16>(name, dims)?,
            Payload::F32(_) => self.nc.add_variable::<f32>(name, dims)?,
            Payload::F64(_) => self.nc.add_variable::<f64>(name, dims)?,
        };
        if self.format.chunked() {
            match shape {
                Shape::Time    => v.set_chunking(&[TIME_CHUNK])?,
                Shape::TimeWvl => {
                    v.set_chunking(&[1, self.n_wvl])?;
                    v.set_compression(DEFLATE_LEVEL, true)?;
                }
                Shape::Scalar | Shape::Wvl => {}
            }
        }
        put_attrs(&mut v, attrs)?;
        self.pending.push(Pending { name: name.to_string(), shape, payload });
        Ok(())
    }

    fn field(&mut self, series: &FieldSeries, instrument: &str) -> Result<()> {
        let name = naming::variable_name(&series.key);
        let description = if series.key == "relHumidity" {
            "Ratio of partial pressure of water vapor to equilibrium vapor pressure at measured temperature"
        } else {
            ""
        };
        self.define(&name, Shape::Time, Payload::F32(to_f32(&series.values)), &[
            ("units",         series.unit),
            ("long_name",     naming::long_name(&series.key).unwrap_or_default()),
            ("standard_name", naming::standard_name(&series.key).unwrap_or_default()),
            ("description",   description),
            (instrument,      "refer to the instrument variable of the same name"),
        ])?;

        let raw_long_name = format!("raw logger value of {}", series.key);
        self.define(&format!("raw_{name}"), Shape::Time, Payload::F32(to_f32(&series.raw_values)), &[
            ("long_name", raw_long_name.as_str()),
        ])
    }

    fn write_all(mut self) -> Result<()> {
        let (n, m) = (self.n_time, self.n_wvl);
        for p in &self.pending {
            let mut v = self
                .nc
                .variable_mut(&p.name)
                .with_context(|| format!("variable {} vanished", p.name))?;
            macro_rules! put {
                ($data:expr) => {
                    match p.shape {
                        Shape::Scalar  => v.put_values($data, ..),
                        Shape::Time    => v.put_values($data, (&[0usize], &[n])),
                        Shape::Wvl     => v.put_values($data, (&[0usize], &[m])),
                        Shape::TimeWvl => v.put_values($data, (&[0usize, 0], &[n, m])),
                    }
                };
            }
            match &p.payload {
                Payload::Empty   => Ok(()),
                Payload::F32(d) => put!(d.as_slice()),
                Payload::F64(d) => put!(d.as_slice()),
            }
            .with_context(|| format!("writing {}", p.name))?;
        }
        Ok(())
    }
}

fn instrument_for_sensor(key: &str) -> &'static str {
    if key.ends_with("co2") { "sensor_co2" } else { "sensor_par" }
}

/// Write `conv` to `path`, replacing any existing file.
pub fn write_netcdf(conv: &Conversion, path: &Path, format: OutputFormat, history: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("removing old {}", path.display()))?;
    }
    let mut nc = netcdf::create_with(path, format.options())
        .with_context(|| format!("creating {}", path.display()))?;

    let n_time = conv.time.len();
    let n_wvl  = conv.spectrometer.wavelengths.len();
    nc.add_unlimited_dimension(TIME_DIM)?;
    nc.add_dimension(WVL_DIM, n_wvl)?;
    nc.add_attribute("Conventions", "CF-1.6")?;
    nc.add_attribute("history", history)?;

    let mut out = Layout { nc, format, n_time, n_wvl, pending: Vec::new() };

    for inst in INSTRUMENTS {
        let id          = format!("{}_id", inst.var);
        let name        = format!("{}_name", inst.var);
        let description = format!("{}_description", inst.var);
        out.define(inst.var, Shape::Scalar, Payload::Empty, &[
            (id.as_str(),          inst.id),
            (name.as_str(),        inst.name),
            (description.as_str(), inst.description),
        ])?;
    }

    // f8: f4 cannot resolve seconds at present-day day counts.
    out.define(TIME_DIM, Shape::Time, Payload::F64(conv.time.clone()), &[
        ("units",     TIME_UNITS),
        ("calendar",  "gregorian"),
        ("long_name", "time"),
    ])?;

    for series in &conv.weather {
        out.field(series, "sensor_weather_station")?;
    }
    for series in &conv.sensors {
        out.field(series, instrument_for_sensor(&series.key))?;
    }

    let spec = &conv.spectrometer;
    out.define(WVL_DIM, Shape::Wvl, Payload::F32(to_f32(&spec.wavelengths)), &[
        ("units",           "meter"),
        ("long_name",       "Wavelength of environmental sensor channel"),
        ("standard_name",   "radiation_wavelength"),
        ("sensor_spectrum", "refer to variable sensor_spectrum"),
    ])?;
    out.define("spectrum", Shape::TimeWvl, Payload::F32(flatten(&spec.spectra)), &[
        ("units",           "count"),
        ("long_name",       "Raw spectrometer counts"),
        ("sensor_spectrum", "refer to variable sensor_spectrum"),
    ])?;
    out.define("maxFixedIntensity", Shape::Time, Payload::F32(to_f32(&spec.saturation_thresholds)), &[
        ("units",           "count"),
        ("long_name",       "Spectrometer saturation threshold"),
        ("sensor_spectrum", "refer to variable sensor_spectrum"),
    ])?;
    out.define("wvl_dlt", Shape::Wvl, Payload::F64(conv.wavelength_deltas.clone()), &[
        ("units",     "meter"),
        ("long_name", "Bandwidth of environmental sensor"),
        ("notes",     "Differences between midpoints of adjacent band-centers; edge channels extrapolated symmetrically."),
    ])?;
    out.define("flx_sns", Shape::Wvl, Payload::F32(to_f32(&conv.flux_sensitivity)), &[
        ("units",      "watt meter-2 count-1"),
        ("long_name",  "Flux sensitivity of each band (irradiance per count)"),
        ("provenance", conv.calibration_source.as_deref().unwrap_or_default()),
    ])?;
    out.define("flx_spc_dwn", Shape::TimeWvl, Payload::F32(flatten(&conv.flux.spectral)), &[
        ("units",         "watt meter-2 meter-1"),
        ("long_name",     "Downwelling Spectral Irradiance"),
        ("standard_name", "downwelling_spectral_spherical_irradiance_in_air"),
    ])?;
    out.define("flx_dwn", Shape::Time, Payload::F32(to_f32(&conv.flux.broadband)), &[
        ("units",         "watt meter-2"),
        ("long_name",     "Downwelling Irradiance"),
        ("standard_name", "downwelling_spherical_irradiance_in_air"),
    ])?;
    out.define("time_integration", Shape::Scalar, Payload::F32(vec![spec.integration_time_s as f32]), &[
        ("units",     "second"),
        ("long_name", "Spectrometer integration time"),
    ])?;
    out.define("area_sensor", Shape::Scalar, Payload::F32(vec![conv.sensor_area_m2 as f32]), &[
        ("units",     "meter2"),
        ("long_name", "Spectrometer Area"),
    ])?;

    out.write_all()
}
