//! EnvironmentLogger JSON → CF netCDF.
//!
//! `record` loads a batch, `extract` pulls SI series out of it, `spectral`
//! derives bandwidths and downwelling irradiance, `writer` lays the result
//! out in a netCDF container and `convert` ties the stages together.
pub mod calibration;
pub mod convert;
pub mod error;
pub mod extract;
pub mod naming;
pub mod record;
pub mod spectral;
pub mod time;
pub mod units;
pub mod writer;

pub use calibration::Calibration;
pub use convert::{convert_batch, convert_file, plan_jobs, run, Conversion, ConversionConfig, Job, RunSummary};
pub use error::{ConvertError, ConvertResult};
pub use units::UnitTable;
pub use writer::{write_netcdf, OutputFormat};
