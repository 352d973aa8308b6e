//! Error types for solver operations.

use pf_core::{GroupId, PfError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Singular system for {group}")]
    Singular { group: GroupId },

    #[error("Ill-conditioned system for {group} (residual {residual:.3e})")]
    IllConditioned { group: GroupId, residual: f64 },

    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Numeric error: {0}")]
    Numeric(#[from] PfError),
}

pub type SolverResult<T> = Result<T, SolverError>;
