//! pf-results: run storage, batched result writing and checkpoints.

pub mod checkpoint;
pub mod hash;
pub mod sink;
pub mod store;
pub mod types;

pub use checkpoint::{
    CHECKPOINT_FORMAT, CheckpointFile, CheckpointMeta, read_checkpoint, restore_results,
    validate_checkpoint, write_checkpoint,
};
pub use hash::fingerprint;
pub use sink::{FlushPolicy, MemorySink, RecordSink, ResultSink, read_results};
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Malformed results file {path}: {what}")]
    MalformedResults { path: String, what: String },

    #[error("No checkpoint at {path}")]
    CheckpointMissing { path: String },

    #[error("Checkpoint {what} mismatch: expected {expected}, found {found}")]
    CheckpointMismatch {
        what: &'static str,
        expected: String,
        found: String,
    },

    #[error("Torn checkpoint: {what}")]
    TornCheckpoint { what: String },
}
