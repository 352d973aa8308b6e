//! Shared application service layer for packflow.
//!
//! Both the CLI and embedding programs go through this crate: it loads and
//! compiles projects, drives runs through pause, stop and resume, and
//! answers queries over stored results.

pub mod error;
pub mod markers;
pub mod progress;
pub mod project_service;
pub mod query;
pub mod run_service;
pub mod runtime_compile;

pub use error::{AppError, AppResult};
pub use markers::MarkerSignals;
pub use progress::{RunProgressEvent, RunStage};
pub use project_service::{ProjectSummary, load_project, save_project, summarize_project};
pub use query::{
    CELL_VARIABLES, RunSummary, extract_cell_series, get_run_summary, list_cell_labels,
};
pub use run_service::{
    ResumeRequest, RunOptions, RunRequest, RunResponse, RunTimingSummary, list_runs, load_run,
    request_pause, request_stop, resume_run, resume_run_with_progress, start_run,
    start_run_with_progress,
};
pub use runtime_compile::{
    PackRuntime, compile_pack, compile_project, compile_steps, initial_cell_states,
};
