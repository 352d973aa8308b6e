//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

pub const RESULTS_FORMAT: &str = "packflow-results/1";

/// Content identity of the inputs a run was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    pub pack_id: String,
    pub drive_cycle_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Stopped,
    Paused,
    TerminatedEarly,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Stopped => "stopped",
            RunStatus::Paused => "paused",
            RunStatus::TerminatedEarly => "terminated_early",
            RunStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub fingerprints: Fingerprints,
    pub created_at: String,
    pub updated_at: String,
    pub status: RunStatus,
    /// Machine-readable reason for the status.
    pub reason: Option<String>,
    pub resumable: bool,
    pub sim_time_s: f64,
    pub substeps: u64,
    pub rows: u64,
    pub skipped_groups: u64,
    pub cell_count: usize,
    pub solver_version: String,
}

impl RunManifest {
    /// Fresh manifest for a run that is about to start.
    pub fn new(
        run_id: impl Into<RunId>,
        project_name: impl Into<String>,
        fingerprints: Fingerprints,
        cell_count: usize,
        solver_version: impl Into<String>,
    ) -> Self {
        let now = timestamp_now();
        Self {
            run_id: run_id.into(),
            project_name: project_name.into(),
            fingerprints,
            created_at: now.clone(),
            updated_at: now,
            status: RunStatus::Running,
            reason: None,
            resumable: false,
            sim_time_s: 0.0,
            substeps: 0,
            rows: 0,
            skipped_groups: 0,
            cell_count,
            solver_version: solver_version.into(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = timestamp_now();
    }
}

/// First line of a results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsHeader {
    pub format: String,
    pub run_id: RunId,
    pub cell_count: usize,
}

impl ResultsHeader {
    pub fn new(run_id: impl Into<RunId>, cell_count: usize) -> Self {
        Self {
            format: RESULTS_FORMAT.to_string(),
            run_id: run_id.into(),
            cell_count,
        }
    }
}

/// One row per (cell, sub-step).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub cell_index: usize,
    pub cell_label: String,
    pub time_s: f64,
    pub dt_s: f64,
    pub time_in_step_s: f64,

    pub soc: f64,
    pub v_term: f64,
    pub ocv: f64,
    pub v_rc1: f64,
    pub v_rc2: f64,
    pub r0: f64,
    pub r1: f64,
    pub r2: f64,
    pub c1: f64,
    pub c2: f64,
    pub i_cell_a: f64,
    pub q_irr_w: f64,
    pub q_rev_w: f64,
    pub q_gen_w: f64,
    pub heat_cum_j: f64,
    pub energy_wh: f64,
    pub temperature_k: f64,

    pub i_pack_a: f64,
    pub v_module_v: f64,

    pub row_index: usize,
    pub global_index: u64,
    pub day_of_year: u32,
    pub drive_cycle_id: String,
    pub subcycle_id: String,
    pub step_type: String,
    pub value_type: String,
    pub value: f64,
    pub unit: String,
    pub label: String,
    pub location: String,
    pub ambient_temp_c: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fired_triggers: Vec<String>,
}

/// Current UTC time in RFC 3339, as stored in manifests and checkpoints.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
