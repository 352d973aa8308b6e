//! Run execution, pause/stop control and resume.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pf_results::{
    CHECKPOINT_FORMAT, CheckpointFile, CheckpointMeta, RecordSink, ResultRecord, ResultSink,
    ResultsError, ResultsHeader, RunManifest, RunStatus, RunStore, read_checkpoint,
    restore_results, timestamp_now, validate_checkpoint, write_checkpoint,
};
use pf_sim::{RunOutcome, SignalFlags, SimOptions, SimProgress, SimulationState, StopMode, Walker};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::markers::{self, DEFAULT_POLL_INTERVAL, MarkerSignals};
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service;
use crate::runtime_compile::{self, PackRuntime};

/// Options for starting or resuming a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Run id to use for a new run; a random UUID when absent.
    pub run_id: Option<String>,
    pub solver_version: String,
    /// Minimum wall time between checks of the pause/stop marker files.
    pub marker_poll_interval: Duration,
    /// In-process pause/stop requests, checked on every sub-step.
    pub signals: Option<SignalFlags>,
    /// Overrides how often simulation progress is reported (sub-steps).
    pub progress_every: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_id: None,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            marker_poll_interval: DEFAULT_POLL_INTERVAL,
            signals: None,
            progress_every: None,
        }
    }
}

/// Request to start a new run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub options: RunOptions,
}

/// Request to continue a paused, stopped or terminated run.
pub struct ResumeRequest<'a> {
    pub project_path: &'a Path,
    pub run_id: &'a str,
    /// Checkpoint to resume from instead of the run's own.
    pub checkpoint_dir: Option<&'a Path>,
    pub options: RunOptions,
}

/// Concise timing and execution summary for one session of a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub simulate_time_s: f64,
    pub checkpoint_time_s: f64,
    pub total_time_s: f64,
    /// Sub-steps taken in this session.
    pub substeps: u64,
}

/// Response from starting or resuming a run.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub outcome: RunOutcome,
    /// Row the session resumed at, if it was a resume.
    pub resumed_from_row: Option<usize>,
    pub timing: RunTimingSummary,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    run_id: &str,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            run_id,
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

fn check_run_id(run_id: &str) -> AppResult<()> {
    let bad = run_id.is_empty()
        || run_id == "."
        || run_id == ".."
        || run_id.contains(['/', '\\'])
        || run_id.chars().any(char::is_control);
    if bad {
        return Err(AppError::InvalidInput(format!("invalid run id '{run_id}'")));
    }
    Ok(())
}

fn sim_options(runtime: &PackRuntime, options: &RunOptions) -> SimOptions {
    let mut sim = runtime.options.clone();
    if let Some(every) = options.progress_every {
        sim.progress_every = every.max(1);
    }
    sim
}

/// Start a new run.
pub fn start_run(request: &RunRequest) -> AppResult<RunResponse> {
    start_run_with_progress(request, None)
}

/// Start a new run and stream progress events.
pub fn start_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();

    let run_id = request
        .options
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    check_run_id(&run_id)?;

    emit_progress(
        &mut progress_cb,
        &run_id,
        RunStage::LoadingProject,
        started,
        Some("Loading project".to_string()),
    );
    let project = project_service::load_project(request.project_path)?;

    emit_progress(
        &mut progress_cb,
        &run_id,
        RunStage::CompilingRuntime,
        started,
        Some("Compiling pack and drive cycle".to_string()),
    );
    let compile_start = Instant::now();
    let runtime = runtime_compile::compile_project(&project, request.project_path)?;
    timing.compile_time_s = compile_start.elapsed().as_secs_f64();

    let store = RunStore::for_project(request.project_path)?;
    if store.has_run(&run_id) {
        return Err(AppError::InvalidInput(format!("run {run_id} already exists")));
    }

    let options = sim_options(&runtime, &request.options);
    let state = Walker::new(&runtime.topology, &runtime.table, &options)?
        .initial_state(runtime.initial_cells.clone())?;

    let n_cells = runtime.topology.n_cells();
    let mut manifest = RunManifest::new(
        run_id.as_str(),
        runtime.project_name.as_str(),
        runtime.fingerprints.clone(),
        n_cells,
        request.options.solver_version.as_str(),
    );
    store.clear_markers(&run_id)?;
    store.save_manifest(&manifest)?;
    info!(run_id = %run_id, cells = n_cells, rows = runtime.table.len(), "run started");

    let sink = ResultSink::create(
        store.results_path(&run_id),
        ResultsHeader::new(run_id.as_str(), n_cells),
        runtime.flush,
    );
    let session = Session {
        store: &store,
        runtime: &runtime,
        sim_options: &options,
        run_options: &request.options,
        started,
    };
    let outcome = session.drive(&mut manifest, state, sink, &mut timing, &mut progress_cb)?;
    timing.total_time_s = started.elapsed().as_secs_f64();

    Ok(RunResponse {
        run_id,
        manifest,
        outcome,
        resumed_from_row: None,
        timing,
    })
}

/// Resume a run from its checkpoint.
pub fn resume_run(request: &ResumeRequest) -> AppResult<RunResponse> {
    resume_run_with_progress(request, None)
}

/// Resume a run from its checkpoint and stream progress events.
///
/// The checkpoint is validated against the current project before any
/// sub-step is taken; a checkpoint from a different pack or drive cycle is
/// rejected and the run is left untouched.
pub fn resume_run_with_progress(
    request: &ResumeRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let run_id = request.run_id;
    check_run_id(run_id)?;

    emit_progress(
        &mut progress_cb,
        run_id,
        RunStage::LoadingProject,
        started,
        Some("Loading project".to_string()),
    );
    let project = project_service::load_project(request.project_path)?;

    emit_progress(
        &mut progress_cb,
        run_id,
        RunStage::CompilingRuntime,
        started,
        Some("Compiling pack and drive cycle".to_string()),
    );
    let compile_start = Instant::now();
    let runtime = runtime_compile::compile_project(&project, request.project_path)?;
    timing.compile_time_s = compile_start.elapsed().as_secs_f64();
    let n_cells = runtime.topology.n_cells();

    let store = RunStore::for_project(request.project_path)?;
    let mut manifest = match store.load_manifest(run_id) {
        Ok(manifest) => manifest,
        Err(ResultsError::RunNotFound { .. }) if request.checkpoint_dir.is_some() => {
            RunManifest::new(
                run_id,
                runtime.project_name.as_str(),
                runtime.fingerprints.clone(),
                n_cells,
                request.options.solver_version.as_str(),
            )
        }
        Err(err) => return Err(err.into()),
    };
    if request.checkpoint_dir.is_none() && !manifest.resumable {
        return Err(AppError::NotResumable {
            run_id: run_id.to_string(),
            status: manifest.status.as_str().to_string(),
        });
    }

    emit_progress(
        &mut progress_cb,
        run_id,
        RunStage::ValidatingCheckpoint,
        started,
        Some("Validating checkpoint".to_string()),
    );
    let checkpoint_dir: PathBuf = request
        .checkpoint_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| store.checkpoint_dir(run_id));
    let checkpoint: CheckpointFile<SimulationState> = read_checkpoint(&checkpoint_dir)?;
    validate_checkpoint(
        &checkpoint_dir,
        &checkpoint.meta,
        &runtime.fingerprints,
        n_cells,
    )?;
    let state = checkpoint.state;
    if state.cells.len() != n_cells || state.run.row_idx != checkpoint.meta.resume_row {
        return Err(AppError::CheckpointRejected(format!(
            "snapshot disagrees with its metadata (row {} vs {}, {} cells vs {n_cells})",
            state.run.row_idx,
            checkpoint.meta.resume_row,
            state.cells.len()
        )));
    }
    if checkpoint.meta.run_id != run_id {
        warn!(
            run_id,
            checkpoint_run_id = %checkpoint.meta.run_id,
            "resuming from another run's checkpoint"
        );
    }

    let results_path = store.results_path(run_id);
    std::fs::create_dir_all(store.run_dir(run_id))?;
    let rows = restore_results(&checkpoint_dir, &results_path)?;
    let header = ResultsHeader::new(run_id, n_cells);
    let sink = if results_path.exists() {
        ResultSink::resume(results_path, header, runtime.flush, rows)?
    } else {
        ResultSink::create(results_path, header, runtime.flush)
    };

    let resumed_from_row = state.run.row_idx;
    manifest.status = RunStatus::Running;
    manifest.reason = None;
    manifest.touch();
    store.clear_markers(run_id)?;
    store.save_manifest(&manifest)?;
    info!(
        run_id,
        row = resumed_from_row,
        sim_time_s = state.run.t_global_s,
        rows,
        "run resumed"
    );

    let options = sim_options(&runtime, &request.options);
    let session = Session {
        store: &store,
        runtime: &runtime,
        sim_options: &options,
        run_options: &request.options,
        started,
    };
    let outcome = session.drive(&mut manifest, state, sink, &mut timing, &mut progress_cb)?;
    timing.total_time_s = started.elapsed().as_secs_f64();

    Ok(RunResponse {
        run_id: run_id.to_string(),
        manifest,
        outcome,
        resumed_from_row: Some(resumed_from_row),
        timing,
    })
}

struct Session<'a> {
    store: &'a RunStore,
    runtime: &'a PackRuntime,
    sim_options: &'a SimOptions,
    run_options: &'a RunOptions,
    started: Instant,
}

impl Session<'_> {
    /// Walk until the run ends or is interrupted, then record the outcome in
    /// the manifest and write or drop the checkpoint accordingly.
    fn drive(
        &self,
        manifest: &mut RunManifest,
        mut state: SimulationState,
        mut sink: ResultSink,
        timing: &mut RunTimingSummary,
        progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    ) -> AppResult<RunOutcome> {
        let run_id = manifest.run_id.clone();
        let store = self.store;
        let walker = Walker::new(
            &self.runtime.topology,
            &self.runtime.table,
            self.sim_options,
        )?;
        let mut signals = MarkerSignals::for_run(store, &run_id)
            .with_interval(self.run_options.marker_poll_interval)
            .with_flags(self.run_options.signals.clone());

        emit_progress(
            progress_cb,
            &run_id,
            RunStage::Simulating,
            self.started,
            Some("Walking drive cycle".to_string()),
        );
        let substeps_before = state.run.substeps;
        let sim_start = Instant::now();
        let started = self.started;
        let result = {
            let on_progress: &mut dyn FnMut(&SimProgress) = &mut |p: &SimProgress| {
                if let Some(cb) = progress_cb.as_deref_mut() {
                    cb(RunProgressEvent {
                        run_id: run_id.clone(),
                        stage: RunStage::Simulating,
                        elapsed_wall_s: started.elapsed().as_secs_f64(),
                        message: None,
                        sim: Some(p.clone()),
                    });
                }
            };
            walker.run(&mut state, &mut sink, &mut signals, Some(on_progress))
        };
        timing.simulate_time_s = sim_start.elapsed().as_secs_f64();
        timing.substeps = state.run.substeps - substeps_before;

        manifest.sim_time_s = state.run.t_global_s;
        manifest.substeps = state.run.substeps;
        manifest.rows = sink.rows_written();
        manifest.skipped_groups = state.run.skipped_groups;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(flush_err) = sink.flush() {
                    warn!(run_id = %run_id, error = %flush_err, "could not flush results of failed run");
                }
                error!(run_id = %run_id, error = %err, "run failed");
                manifest.status = RunStatus::Failed;
                manifest.reason = Some(err.to_string());
                manifest.resumable = false;
                manifest.touch();
                if let Err(save_err) = store.save_manifest(manifest) {
                    warn!(run_id = %run_id, error = %save_err, "could not record run failure");
                }
                return Err(err.into());
            }
        };

        let (status, keep_checkpoint) = match &outcome {
            RunOutcome::Completed { .. } => (RunStatus::Completed, false),
            RunOutcome::Paused => (RunStatus::Paused, true),
            RunOutcome::Stopped {
                mode: StopMode::Retain,
            } => (RunStatus::Stopped, true),
            RunOutcome::Stopped {
                mode: StopMode::Discard,
            } => (RunStatus::Stopped, false),
            RunOutcome::TerminatedEarly { .. } => (RunStatus::TerminatedEarly, true),
        };

        if keep_checkpoint {
            emit_progress(
                progress_cb,
                &run_id,
                RunStage::WritingCheckpoint,
                self.started,
                Some("Writing checkpoint".to_string()),
            );
            let checkpoint_start = Instant::now();
            let meta = CheckpointMeta {
                format: CHECKPOINT_FORMAT.to_string(),
                run_id: run_id.clone(),
                fingerprints: manifest.fingerprints.clone(),
                resume_row: state.run.row_idx,
                sim_time_s: state.run.t_global_s,
                cell_count: state.cells.len(),
                rows: manifest.rows,
                created_at: timestamp_now(),
                reason: outcome.reason(),
            };
            write_checkpoint(
                &store.checkpoint_dir(&run_id),
                &meta,
                &state,
                &store.results_path(&run_id),
            )?;
            timing.checkpoint_time_s = checkpoint_start.elapsed().as_secs_f64();
        } else {
            store.delete_checkpoint(&run_id)?;
        }

        manifest.status = status;
        manifest.reason = Some(outcome.reason());
        manifest.resumable = keep_checkpoint;
        manifest.touch();
        store.clear_markers(&run_id)?;
        store.save_manifest(manifest)?;
        info!(
            run_id = %run_id,
            status = status.as_str(),
            reason = %outcome.reason(),
            sim_time_s = manifest.sim_time_s,
            substeps = manifest.substeps,
            "run finished"
        );

        emit_progress(
            progress_cb,
            &run_id,
            RunStage::Completed,
            self.started,
            Some(format!("Run {}", status.as_str())),
        );
        Ok(outcome)
    }
}

/// Ask a running run to pause at its next sub-step boundary.
pub fn request_pause(project_path: &Path, run_id: &str) -> AppResult<()> {
    check_run_id(run_id)?;
    let store = RunStore::for_project(project_path)?;
    let manifest = store.load_manifest(run_id)?;
    if manifest.status != RunStatus::Running {
        return Err(AppError::InvalidInput(format!(
            "run {run_id} is not running (status {})",
            manifest.status.as_str()
        )));
    }
    markers::write_pause_marker(&store, run_id)?;
    info!(run_id, "pause requested");
    Ok(())
}

/// Stop a run. A running run is signalled and stops at its next sub-step
/// boundary; a paused or terminated run is marked stopped immediately,
/// dropping its checkpoint when `mode` is discard.
pub fn request_stop(project_path: &Path, run_id: &str, mode: StopMode) -> AppResult<RunManifest> {
    check_run_id(run_id)?;
    let store = RunStore::for_project(project_path)?;
    let mut manifest = store.load_manifest(run_id)?;
    match manifest.status {
        RunStatus::Running => {
            markers::write_stop_marker(&store, run_id, mode)?;
            info!(run_id, mode = mode.as_str(), "stop requested");
        }
        RunStatus::Completed | RunStatus::Failed => {
            return Err(AppError::InvalidInput(format!(
                "run {run_id} already finished (status {})",
                manifest.status.as_str()
            )));
        }
        RunStatus::Paused | RunStatus::Stopped | RunStatus::TerminatedEarly => {
            if mode == StopMode::Discard {
                store.delete_checkpoint(run_id)?;
                manifest.resumable = false;
            }
            manifest.status = RunStatus::Stopped;
            manifest.reason = Some(RunOutcome::Stopped { mode }.reason());
            manifest.touch();
            store.save_manifest(&manifest)?;
            info!(run_id, mode = mode.as_str(), "run stopped");
        }
    }
    Ok(manifest)
}

/// List the project's runs, most recent first.
pub fn list_runs(project_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;
    let mut runs = store.list_runs(None)?;
    runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(runs)
}

/// Load a run's manifest and its results. A run that never flushed a row
/// has no results.
pub fn load_run(project_path: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<ResultRecord>)> {
    check_run_id(run_id)?;
    let store = RunStore::for_project(project_path)?;
    let manifest = store.load_manifest(run_id)?;
    let records = if store.results_path(run_id).exists() {
        store.load_results(run_id)?
    } else {
        Vec::new()
    };
    Ok((manifest, records))
}
