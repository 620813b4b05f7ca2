use thiserror::Error;

/// Everything that can stop a single record file from converting.
///
/// All variants are fatal to the conversion in progress; nothing is partially
/// written.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    #[error("unknown unit '{label}' on field '{field}'")]
    UnknownUnit { label: String, field: String },

    #[error("reading {index}: missing field '{path}'")]
    MissingField { index: usize, path: String },

    #[error("reading {index}: spectrum has {found} channels, wavelength grid has {expected}")]
    SpectrometerShape {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid wavelength grid: {0}")]
    InvalidGrid(String),

    #[error("calibration curve has {found} channels, wavelength grid has {expected}")]
    CalibrationShape { expected: usize, found: usize },

    #[error("calibration channel {channel} is at {calibration} m, logger channel at {logger} m")]
    CalibrationGrid {
        channel: usize,
        logger: f64,
        calibration: f64,
    },

    #[error("timestamp '{0}' is not in YYYY.MM.DD-HH:MM:SS form")]
    TimestampFormat(String),

    #[error("reading {index}: {what} differs from the first reading")]
    InconsistentBatch { index: usize, what: String },

    #[error("reading {index}: invalid value at '{path}': {value}")]
    InvalidValue {
        index: usize,
        path: String,
        value: String,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
