//! Run directory layout.
//!
//! ```text
//! <root>/<run_id>/manifest.json
//! <root>/<run_id>/results.jsonl
//! <root>/<run_id>/checkpoint/{checkpoint.json,results.jsonl}
//! <root>/<run_id>/PAUSE, STOP
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::sink::read_results;
use crate::types::{ResultRecord, RunManifest};
use crate::{ResultsError, ResultsResult};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const RESULTS_FILE: &str = "results.jsonl";
pub const CHECKPOINT_DIR: &str = "checkpoint";
pub const PAUSE_MARKER: &str = "PAUSE";
pub const STOP_MARKER: &str = "STOP";

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store kept next to the project file under `.packflow/runs`.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        Self::new(project_dir.join(".packflow").join("runs"))
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn results_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(RESULTS_FILE)
    }

    pub fn checkpoint_dir(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(CHECKPOINT_DIR)
    }

    pub fn pause_marker(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(PAUSE_MARKER)
    }

    pub fn stop_marker(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(STOP_MARKER)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST_FILE).exists()
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;
        let json = serde_json::to_string_pretty(manifest)?;
        // Write-then-rename so a reader never sees a half-written manifest.
        let tmp = run_dir.join("manifest.json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(tmp, run_dir.join(MANIFEST_FILE))?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(manifest_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_results(&self, run_id: &str) -> ResultsResult<Vec<ResultRecord>> {
        let path = self.results_path(run_id);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(read_results(&path)?.1)
    }

    /// Manifests of every run, optionally restricted to one pack fingerprint.
    pub fn list_runs(&self, pack_id: Option<&str>) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        if !self.root_dir.exists() {
            return Ok(runs);
        }
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let run_id = entry.file_name().to_string_lossy().to_string();
            if let Ok(manifest) = self.load_manifest(&run_id)
                && pack_id.is_none_or(|id| manifest.fingerprints.pack_id == id)
            {
                runs.push(manifest);
            }
        }
        runs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }

    pub fn delete_checkpoint(&self, run_id: &str) -> ResultsResult<()> {
        let dir = self.checkpoint_dir(run_id);
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    /// Remove stale pause/stop markers.
    pub fn clear_markers(&self, run_id: &str) -> ResultsResult<()> {
        for marker in [self.pause_marker(run_id), self.stop_marker(run_id)] {
            if marker.exists() {
                fs::remove_file(marker)?;
            }
        }
        Ok(())
    }
}
