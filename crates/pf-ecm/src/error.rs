//! Error types for ECM table loading.

use std::path::PathBuf;

use pf_core::PfError;
use thiserror::Error;

use crate::table::Mode;

#[derive(Error, Debug)]
pub enum EcmError {
    #[error("Failed to read ECM source {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed ECM JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ECM source has no {mode} tables")]
    MissingMode { mode: Mode },

    #[error("Bad temperature key '{key}' (expected T<degC>)")]
    BadTemperatureKey { key: String },

    #[error("Duplicate temperature {temp_c} degC in {mode} tables")]
    DuplicateTemperature { mode: Mode, temp_c: f64 },

    #[error("{mode}/{key}: expected 7 columns (soc, ocv, r0, r1, r2, c1, c2), found {found}")]
    ColumnCount {
        mode: Mode,
        key: String,
        found: usize,
    },

    #[error("{mode}/{key}: column lengths differ")]
    RaggedColumns { mode: Mode, key: String },

    #[error("{mode}/{key}: SOC grid is empty")]
    EmptySocGrid { mode: Mode, key: String },

    #[error("{mode}/{key}: SOC grid must be strictly increasing")]
    SocNotIncreasing { mode: Mode, key: String },

    #[error("{mode}/{key}: SOC grid differs from the first table")]
    InconsistentSocGrid { mode: Mode, key: String },

    #[error("{mode}/{key}: negative {what}")]
    Negative {
        mode: Mode,
        key: String,
        what: &'static str,
    },

    #[error("Numeric error: {0}")]
    Numeric(#[from] PfError),
}

pub type EcmResult<T> = Result<T, EcmError>;
