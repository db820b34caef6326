use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MissionError>;

/// Errors of a mission unit of work (one spacecraft, or one spacecraft/instrument/mode).
/// None of them are retried internally.
#[derive(Error, Debug)]
pub enum MissionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown {kind} type '{tag}'")]
    UnknownType { kind: &'static str, tag: String },

    #[error("access file registry is empty")]
    EmptyRegistry,

    #[error("no access file registered for instrument {instru_id:?}, mode {mode_id:?}")]
    AccessFileNotFound {
        instru_id: Option<String>,
        mode_id: Option<String>,
    },

    #[error("time index {index} not present in state file {}", path.display())]
    MissingTimeIndex { index: usize, path: PathBuf },

    #[error("no instrument model with id '{0}'")]
    InstrumentNotFound(String),

    /// raw failure reported by a propagation or instrument engine, before context is attached
    #[error("engine failure: {0}")]
    Engine(String),

    #[error("propagation of spacecraft '{spacecraft}' failed at time index {index}: {reason}")]
    Propagation {
        spacecraft: String,
        index: usize,
        reason: String,
    },

    #[error(
        "instrument model failed for spacecraft '{spacecraft}', instrument '{instru_id}', \
         mode '{mode_id}': {reason}"
    )]
    InstrumentModel {
        spacecraft: String,
        instru_id: String,
        mode_id: String,
        reason: String,
    },

    #[error("malformed file {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error {0}")]
    Csv(#[from] csv::Error),
}

macro_rules! config_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::error::MissionError::Config( format!( $fmt $(, $arg)* ))
    };
}
pub(crate) use config_error;

macro_rules! engine_error {
    ($fmt:literal $(, $arg:expr )* ) => {
        $crate::error::MissionError::Engine( format!( $fmt $(, $arg)* ))
    };
}
pub(crate) use engine_error;

macro_rules! format_error {
    ($path:expr, $fmt:literal $(, $arg:expr )* ) => {
        $crate::error::MissionError::Format {
            path: $path.into(),
            reason: format!( $fmt $(, $arg)* ),
        }
    };
}
pub(crate) use format_error;
