//! Error types for the pf-app service layer.

/// Application error wrapping the backend crates' errors behind one
/// interface for the CLI and other frontends.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Runtime compilation failed: {0}")]
    Compile(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Checkpoint rejected: {0}")]
    CheckpointRejected(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run {run_id} cannot be resumed (status {status})")]
    NotResumable { run_id: String, status: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<pf_project::ProjectError> for AppError {
    fn from(err: pf_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<pf_ecm::EcmError> for AppError {
    fn from(err: pf_ecm::EcmError) -> Self {
        AppError::Compile(format!("ECM table: {err}"))
    }
}

impl From<pf_pack::PackError> for AppError {
    fn from(err: pf_pack::PackError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<pf_sim::SimError> for AppError {
    fn from(err: pf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<pf_results::ResultsError> for AppError {
    fn from(err: pf_results::ResultsError) -> Self {
        use pf_results::ResultsError;
        match err {
            ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            ResultsError::CheckpointMissing { .. }
            | ResultsError::CheckpointMismatch { .. }
            | ResultsError::TornCheckpoint { .. } => AppError::CheckpointRejected(err.to_string()),
            other => AppError::Results(other.to_string()),
        }
    }
}
