//! Error types for step tables and the walker.

use thiserror::Error;

/// Configuration and runtime errors of a drive-cycle simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Step table is empty")]
    EmptyTable,

    #[error("Row {row}: unknown step type '{value}'")]
    UnknownStepType { row: usize, value: String },

    #[error("Row {row}: unknown value type '{value}'")]
    UnknownValueType { row: usize, value: String },

    #[error("Row {row}: unit '{unit}' does not match value type '{value_type}'")]
    UnitMismatch {
        row: usize,
        value_type: String,
        unit: String,
    },

    #[error("Row {row}: {what}")]
    InvalidRow { row: usize, what: String },

    #[error("Results error: {0}")]
    Results(#[from] pf_results::ResultsError),
}

pub type SimResult<T> = Result<T, SimError>;
