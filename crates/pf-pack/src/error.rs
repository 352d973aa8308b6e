//! Pack construction errors.

use pf_core::PfError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Pack has no cells")]
    EmptyPack,

    #[error("Duplicate cell label: {label}")]
    DuplicateLabel { label: String },

    #[error("Unknown cell label: {label}")]
    UnknownLabel { label: String },

    #[error("Cell {label}: ECM table index {table} out of range ({count} tables)")]
    UnknownTable {
        label: String,
        table: usize,
        count: usize,
    },

    #[error("Cell {label}: invalid {what} = {value}")]
    InvalidParam {
        label: String,
        what: &'static str,
        value: f64,
    },

    #[error("Invalid pack parameter {what} = {value}")]
    InvalidPackParam { what: &'static str, value: f64 },

    #[error("Invalid voltage limits: {what}")]
    InvalidLimits { what: String },

    #[error("Entropic curve: {what}")]
    InvalidEntropicCurve { what: &'static str },

    #[error("Numeric error: {0}")]
    Numeric(#[from] PfError),
}

pub type PackResult<T> = Result<T, PackError>;
