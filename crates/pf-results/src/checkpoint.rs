//! Checkpoint bundle: a directory holding the simulation snapshot and a
//! copy of every result row written up to it.
//!
//! ```text
//! checkpoint/checkpoint.json   CheckpointFile { meta, state }
//! checkpoint/results.jsonl     results as of the snapshot
//! ```
//!
//! The bundle is assembled in a sibling staging directory and renamed into
//! place, so an interrupted write leaves the previous checkpoint intact.

use std::fs;
use std::path::{Path, PathBuf};

use pf_core::{Tolerances, nearly_equal};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::sink::read_results;
use crate::store::RESULTS_FILE;
use crate::types::{Fingerprints, RunId};
use crate::{ResultsError, ResultsResult};

pub const CHECKPOINT_FORMAT: &str = "packflow-checkpoint/1";
const CHECKPOINT_FILE: &str = "checkpoint.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub format: String,
    pub run_id: RunId,
    pub fingerprints: Fingerprints,
    /// Step-table row the run continues from.
    pub resume_row: usize,
    pub sim_time_s: f64,
    pub cell_count: usize,
    pub rows: u64,
    pub created_at: String,
    /// Why the snapshot was taken (pause, stop, cutoff).
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile<S> {
    pub meta: CheckpointMeta,
    pub state: S,
}

fn staging_dir(dir: &Path) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".staging");
    dir.with_file_name(name)
}

/// Write a checkpoint bundle to `dir`, copying the results file at
/// `results_src` (if it exists) into it.
pub fn write_checkpoint<S: Serialize>(
    dir: &Path,
    meta: &CheckpointMeta,
    state: &S,
    results_src: &Path,
) -> ResultsResult<()> {
    let staging = staging_dir(dir);
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let file = CheckpointFile {
        meta: meta.clone(),
        state,
    };
    fs::write(
        staging.join(CHECKPOINT_FILE),
        serde_json::to_string_pretty(&file)?,
    )?;
    if results_src.exists() {
        fs::copy(results_src, staging.join(RESULTS_FILE))?;
    }

    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::rename(&staging, dir)?;
    info!(
        dir = %dir.display(),
        row = meta.resume_row,
        sim_time_s = meta.sim_time_s,
        reason = %meta.reason,
        "checkpoint written"
    );
    Ok(())
}

pub fn read_checkpoint<S: DeserializeOwned>(dir: &Path) -> ResultsResult<CheckpointFile<S>> {
    let path = dir.join(CHECKPOINT_FILE);
    if !path.exists() {
        return Err(ResultsError::CheckpointMissing {
            path: dir.display().to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Check a checkpoint against the run it is about to resume.
///
/// Rejects mismatched fingerprints and bundles whose result rows disagree
/// with the recorded snapshot (a torn write).
pub fn validate_checkpoint(
    dir: &Path,
    meta: &CheckpointMeta,
    expected: &Fingerprints,
    expected_cells: usize,
) -> ResultsResult<()> {
    if meta.format != CHECKPOINT_FORMAT {
        return Err(ResultsError::CheckpointMismatch {
            what: "format",
            expected: CHECKPOINT_FORMAT.to_string(),
            found: meta.format.clone(),
        });
    }
    if meta.fingerprints.pack_id != expected.pack_id {
        return Err(ResultsError::CheckpointMismatch {
            what: "pack id",
            expected: expected.pack_id.clone(),
            found: meta.fingerprints.pack_id.clone(),
        });
    }
    if meta.fingerprints.drive_cycle_id != expected.drive_cycle_id {
        return Err(ResultsError::CheckpointMismatch {
            what: "drive cycle id",
            expected: expected.drive_cycle_id.clone(),
            found: meta.fingerprints.drive_cycle_id.clone(),
        });
    }
    if meta.cell_count != expected_cells {
        return Err(ResultsError::CheckpointMismatch {
            what: "cell count",
            expected: expected_cells.to_string(),
            found: meta.cell_count.to_string(),
        });
    }

    let results = dir.join(RESULTS_FILE);
    if !results.exists() {
        if meta.rows == 0 && meta.sim_time_s == 0.0 {
            return Ok(());
        }
        return Err(ResultsError::TornCheckpoint {
            what: format!("{} rows recorded but no results file", meta.rows),
        });
    }

    let (_, records) = read_results(&results)?;
    if records.len() as u64 != meta.rows {
        return Err(ResultsError::TornCheckpoint {
            what: format!("{} rows recorded, {} present", meta.rows, records.len()),
        });
    }
    let Some(t_last) = records.iter().map(|r| r.time_s).reduce(f64::max) else {
        if meta.sim_time_s == 0.0 {
            return Ok(());
        }
        return Err(ResultsError::TornCheckpoint {
            what: "no rows but non-zero simulated time".to_string(),
        });
    };

    let tol = Tolerances::TIME;
    let last_rows = records
        .iter()
        .filter(|r| nearly_equal(r.time_s, t_last, tol))
        .count();
    if last_rows != expected_cells {
        return Err(ResultsError::TornCheckpoint {
            what: format!("last timestep has {last_rows} rows for {expected_cells} cells"),
        });
    }
    if !nearly_equal(t_last, meta.sim_time_s, tol) {
        return Err(ResultsError::TornCheckpoint {
            what: format!(
                "simulated time {} does not match last result time {t_last}",
                meta.sim_time_s
            ),
        });
    }
    Ok(())
}

/// Copy the checkpoint's results over `dest`; returns the row count.
pub fn restore_results(dir: &Path, dest: &Path) -> ResultsResult<u64> {
    let src = dir.join(RESULTS_FILE);
    if !src.exists() {
        if dest.exists() {
            fs::remove_file(dest)?;
        }
        return Ok(0);
    }
    fs::copy(&src, dest)?;
    Ok(read_results(dest)?.1.len() as u64)
}
