//! Everything a run needs to continue exactly where it stopped.

use pf_pack::CellState;
use serde::{Deserialize, Serialize};

use crate::signals::StopMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    TableExhausted,
    TimeCapReached,
}

impl CompletionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionReason::TableExhausted => "table_exhausted",
            CompletionReason::TimeCapReached => "time_cap_reached",
        }
    }
}

/// How a call to the walker ended. Failures are reported as errors instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed { reason: CompletionReason },
    Paused,
    Stopped { mode: StopMode },
    /// Hard cutoff; `reason` names the scope, value and limit.
    TerminatedEarly { reason: String },
}

impl RunOutcome {
    /// Machine-readable reason recorded in the run manifest.
    pub fn reason(&self) -> String {
        match self {
            RunOutcome::Completed { reason } => reason.as_str().to_string(),
            RunOutcome::Paused => "paused".to_string(),
            RunOutcome::Stopped { mode } => format!("stopped_{}", mode.as_str()),
            RunOutcome::TerminatedEarly { reason } => reason.clone(),
        }
    }
}

/// Consecutive non-progressing cutoffs at one row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutoffGuard {
    pub row: Option<usize>,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub t_global_s: f64,
    pub row_idx: usize,
    pub time_in_step_s: f64,
    pub per_day_time_s: f64,
    pub days_elapsed: u32,
    pub substeps: u64,
    /// Sub-steps spent in the current row.
    pub row_substeps: u64,
    pub skipped_groups: u64,
    pub prev_module_voltage: f64,
    pub energy_wh: f64,
    pub charge_ah: f64,
    pub heat_j: f64,
    pub cutoff_guard: CutoffGuard,
    pub termination: Option<RunOutcome>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub run: RunState,
    pub cells: Vec<CellState>,
}
