//! The step-table walker: drives target conversion, the pack solve, result
//! logging and trigger handling one sub-step at a time.

use pf_core::{SECONDS_PER_DAY, SECONDS_PER_HOUR, Tolerances, days, reached, seconds};
use pf_pack::{CellState, HardLimits, PackTopology};
use pf_results::{RecordSink, ResultRecord};
use pf_solver::{PackSolution, commit, evaluate, resolve_current, rest_module_voltage};
use tracing::{debug, error, info, warn};

use crate::cutoff;
use crate::error::{SimError, SimResult};
use crate::metrics::Metrics;
use crate::signals::{ControlSignals, Signal};
use crate::state::{CompletionReason, CutoffGuard, RunOutcome, RunState, SimulationState};
use crate::step::{StepRow, StepTable, StepType};
use crate::trigger::{ActionLevel, Trigger, resolve_precedence};

/// Options for drive-cycle runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Simulated time after which the run completes (seconds).
    pub time_cap_s: f64,
    /// Sub-steps a `trigger_only` row may take before it is abandoned.
    pub trigger_only_max_substeps: u64,
    /// Non-progressing cutoffs at one row before the row is skipped.
    pub max_repeated_cutoffs: u32,
    pub limits: HardLimits,
    /// Report progress every N sub-steps.
    pub progress_every: u64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            time_cap_s: seconds(days(365.0)),
            trigger_only_max_substeps: 1_000_000,
            max_repeated_cutoffs: 3,
            limits: HardLimits::default(),
            progress_every: 1_000,
        }
    }
}

/// Progress snapshot handed to the optional callback.
#[derive(Clone, Debug, Default)]
pub struct SimProgress {
    pub sim_time_s: f64,
    pub time_cap_s: f64,
    pub fraction_complete: f64,
    pub row_idx: usize,
    pub rows_total: usize,
    pub substeps: u64,
    pub days_elapsed: u32,
}

/// Per-row-entry warning bookkeeping. Not part of the resumable state.
#[derive(Default)]
struct RowNotes {
    row: usize,
    fallback_warned: bool,
    missing_threshold_warned: bool,
}

impl RowNotes {
    fn at(&mut self, row: usize) -> &mut Self {
        if self.row != row {
            *self = RowNotes {
                row,
                ..RowNotes::default()
            };
        }
        self
    }
}

pub struct Walker<'a> {
    topology: &'a PackTopology,
    table: &'a StepTable,
    options: &'a SimOptions,
}

impl<'a> Walker<'a> {
    pub fn new(
        topology: &'a PackTopology,
        table: &'a StepTable,
        options: &'a SimOptions,
    ) -> SimResult<Self> {
        if !(options.time_cap_s.is_finite() && options.time_cap_s > 0.0) {
            return Err(SimError::InvalidArg {
                what: "time cap must be positive",
            });
        }
        if options.trigger_only_max_substeps == 0 {
            return Err(SimError::InvalidArg {
                what: "trigger_only_max_substeps must be positive",
            });
        }
        if options.max_repeated_cutoffs == 0 {
            return Err(SimError::InvalidArg {
                what: "max_repeated_cutoffs must be positive",
            });
        }
        if options.limits.validate().is_err() {
            return Err(SimError::InvalidArg {
                what: "hard voltage window is empty",
            });
        }
        Ok(Self {
            topology,
            table,
            options,
        })
    }

    /// State at t = 0 with cells at rest.
    pub fn initial_state(&self, mut cells: Vec<CellState>) -> SimResult<SimulationState> {
        self.check_cells(&cells)?;
        let v_rest = rest_module_voltage(self.topology, &mut cells);
        Ok(SimulationState {
            run: RunState {
                prev_module_voltage: v_rest,
                ..RunState::default()
            },
            cells,
        })
    }

    fn check_cells(&self, cells: &[CellState]) -> SimResult<()> {
        if cells.len() != self.topology.n_cells() {
            return Err(SimError::InvalidArg {
                what: "cell state count does not match the pack",
            });
        }
        Ok(())
    }

    /// Walk the table from wherever `state` stands until the run completes,
    /// is terminated or a control signal arrives. Buffered results are
    /// flushed before returning.
    pub fn run(
        &self,
        state: &mut SimulationState,
        sink: &mut dyn RecordSink,
        signals: &mut dyn ControlSignals,
        mut progress: Option<&mut dyn FnMut(&SimProgress)>,
    ) -> SimResult<RunOutcome> {
        self.check_cells(&state.cells)?;
        state.run.termination = None;
        let rows = self.table.rows();
        let opts = self.options;
        let mut session_substeps = 0u64;
        let mut notes = RowNotes {
            row: state.run.row_idx,
            ..RowNotes::default()
        };

        info!(
            row = state.run.row_idx,
            rows = rows.len(),
            cells = state.cells.len(),
            sim_time_s = state.run.t_global_s,
            "walker starting"
        );

        loop {
            let row_idx = state.run.row_idx;
            if row_idx >= rows.len() {
                return self.finish(
                    state,
                    sink,
                    RunOutcome::Completed {
                        reason: CompletionReason::TableExhausted,
                    },
                );
            }
            if reached(state.run.t_global_s, opts.time_cap_s, Tolerances::TIME) {
                return self.finish(
                    state,
                    sink,
                    RunOutcome::Completed {
                        reason: CompletionReason::TimeCapReached,
                    },
                );
            }

            // Used-up days and rows with no time left are passed over here. A
            // cutoff on a row's last sub-step leaves the run on such a row.
            let row = &rows[row_idx];
            if reached(state.run.per_day_time_s, SECONDS_PER_DAY, Tolerances::TIME) {
                let next = self.table.next_day_row(row_idx);
                debug!(row = row_idx, next = ?next, "day already complete, jumping");
                self.enter_row(&mut state.run, next.unwrap_or(rows.len()), true);
                continue;
            }
            if row.step_type != StepType::TriggerOnly
                && reached(state.run.time_in_step_s, row.duration_s, Tolerances::TIME)
            {
                debug!(row = row_idx, "row duration used up, advancing");
                self.enter_row(&mut state.run, row_idx + 1, false);
                continue;
            }

            match signals.poll() {
                Signal::None => {}
                Signal::Pause => return self.finish(state, sink, RunOutcome::Paused),
                Signal::Stop(mode) => {
                    return self.finish(state, sink, RunOutcome::Stopped { mode });
                }
            }
            if row.step_type == StepType::TriggerOnly
                && state.run.row_substeps >= opts.trigger_only_max_substeps
            {
                warn!(
                    row = row_idx,
                    substeps = state.run.row_substeps,
                    "trigger_only row hit its sub-step cap without a trigger, advancing"
                );
                self.enter_row(&mut state.run, row_idx + 1, false);
                continue;
            }

            let dt = self.substep_dt(row, &state.run);
            let notes = notes.at(row_idx);

            let resolved = resolve_current(
                row.target,
                self.topology,
                &state.cells,
                dt,
                state.run.prev_module_voltage,
            );
            if let Some(fallback) = resolved.fallback
                && !notes.fallback_warned
            {
                warn!(
                    row = row_idx,
                    target = row.target.kind(),
                    value = row.target.value(),
                    i_pack = resolved.i_pack,
                    "{}",
                    fallback.describe()
                );
                notes.fallback_warned = true;
            }

            let solution = evaluate(self.topology, &state.cells, resolved.i_pack, dt);
            commit(
                self.topology,
                &solution,
                &mut state.cells,
                dt,
                row.ambient_temp_c,
            );
            session_substeps += 1;
            self.advance_counters(&mut state.run, &solution, dt);

            let cut = cutoff::check(&opts.limits, &state.cells, solution.module_voltage);
            let fired = if cut.is_none() {
                self.fired_triggers(row, row_idx, state, &solution, notes)
            } else {
                Vec::new()
            };
            sink.push_substep(self.records(row_idx, row, state, &solution, dt, &fired))?;

            if let Some(cut) = cut {
                let guard = &mut state.run.cutoff_guard;
                if session_substeps == 1 && guard.row == Some(row_idx) {
                    guard.count += 1;
                } else {
                    *guard = CutoffGuard {
                        row: Some(row_idx),
                        count: 1,
                    };
                }
                if guard.count >= opts.max_repeated_cutoffs {
                    warn!(
                        row = row_idx,
                        count = guard.count,
                        reason = %cut,
                        "cutoff repeats without progress, advancing past row"
                    );
                    *guard = CutoffGuard::default();
                    self.enter_row(&mut state.run, row_idx + 1, false);
                    continue;
                }
                error!(row = row_idx, sim_time_s = state.run.t_global_s, reason = %cut, "hard cutoff");
                return self.finish(
                    state,
                    sink,
                    RunOutcome::TerminatedEarly {
                        reason: cut.to_string(),
                    },
                );
            }
            state.run.cutoff_guard = CutoffGuard::default();

            if let Some(winner) = resolve_precedence(&fired).map(|i| fired[i]) {
                let action = winner.action();
                let next = match action {
                    ActionLevel::Step => Some(row_idx + 1),
                    ActionLevel::Subcycle => self.table.next_subcycle_row(row_idx),
                    ActionLevel::Day => self.table.next_day_row(row_idx),
                };
                debug!(
                    row = row_idx,
                    trigger = %winner,
                    action = action.as_str(),
                    next = ?next,
                    "trigger fired"
                );
                self.enter_row(
                    &mut state.run,
                    next.unwrap_or(rows.len()),
                    action == ActionLevel::Day,
                );
            } else if row.step_type != StepType::TriggerOnly
                && reached(state.run.time_in_step_s, row.duration_s, Tolerances::TIME)
            {
                self.enter_row(&mut state.run, row_idx + 1, false);
            }

            if let Some(cb) = progress.as_deref_mut()
                && state.run.substeps % opts.progress_every.max(1) == 0
            {
                cb(&self.progress(&state.run));
            }
        }
    }

    fn substep_dt(&self, row: &StepRow, run: &RunState) -> f64 {
        let day_left = SECONDS_PER_DAY - run.per_day_time_s;
        let cap_left = self.options.time_cap_s - run.t_global_s;
        let dt = row.timestep_s.min(day_left).min(cap_left);
        let dt = match row.step_type {
            StepType::TriggerOnly => dt,
            StepType::Fixed | StepType::FixedWithTriggers => {
                dt.min(row.duration_s - run.time_in_step_s)
            }
        };
        debug_assert!(dt > 0.0, "sub-step width must be positive, got {dt}");
        dt
    }

    fn advance_counters(&self, run: &mut RunState, solution: &PackSolution, dt: f64) {
        run.t_global_s += dt;
        run.time_in_step_s += dt;
        run.per_day_time_s += dt;
        run.substeps += 1;
        run.row_substeps += 1;
        run.skipped_groups += solution.skipped_groups.len() as u64;
        run.prev_module_voltage = solution.module_voltage;
        run.energy_wh += (solution.module_voltage * solution.i_pack).abs() * dt / SECONDS_PER_HOUR;
        run.charge_ah += solution.i_pack.abs() * dt / SECONDS_PER_HOUR;
        run.heat_j += solution.cells.iter().map(|c| c.q_gen_w()).sum::<f64>() * dt;
    }

    /// Triggers that fired this sub-step in registration order: the day
    /// boundary, then step triggers, then subcycle triggers.
    fn fired_triggers(
        &self,
        row: &StepRow,
        row_idx: usize,
        state: &SimulationState,
        solution: &PackSolution,
        notes: &mut RowNotes,
    ) -> Vec<Trigger> {
        let per_day = state.run.per_day_time_s;
        let mut fired = Vec::new();
        if reached(per_day, SECONDS_PER_DAY, Tolerances::TIME) {
            fired.push(Trigger::day_boundary());
        }
        if !row.step_type.uses_triggers() {
            return fired;
        }

        let metrics = Metrics::observe(
            self.topology,
            &state.cells,
            solution.module_voltage,
            solution.i_pack,
        );
        for trigger in row.step_triggers.iter().chain(&row.subcycle_triggers) {
            match trigger.fires(&metrics, per_day) {
                Some(true) => fired.push(*trigger),
                Some(false) => {}
                None => {
                    if !notes.missing_threshold_warned {
                        warn!(row = row_idx, trigger = %trigger, "trigger has no threshold, skipping");
                        notes.missing_threshold_warned = true;
                    }
                }
            }
        }
        fired
    }

    fn enter_row(&self, run: &mut RunState, next: usize, day_action: bool) {
        let rows = self.table.rows();
        let prev_day = rows.get(run.row_idx).map(|r| r.day_of_year);
        let next_day = rows.get(next).map(|r| r.day_of_year);
        run.row_idx = next;
        run.time_in_step_s = 0.0;
        run.row_substeps = 0;
        if day_action || (next_day.is_some() && next_day != prev_day) {
            run.per_day_time_s = 0.0;
            run.days_elapsed += 1;
        }
        debug!(row = next, days_elapsed = run.days_elapsed, "entered row");
    }

    fn records(
        &self,
        row_idx: usize,
        row: &StepRow,
        state: &SimulationState,
        solution: &PackSolution,
        dt: f64,
        fired: &[Trigger],
    ) -> Vec<ResultRecord> {
        let run = &state.run;
        let fired: Vec<String> = fired.iter().map(Trigger::to_string).collect();
        self.topology
            .cells()
            .iter()
            .zip(state.cells.iter().zip(&solution.cells))
            .enumerate()
            .map(|(index, (params, (cell, sol)))| ResultRecord {
                cell_index: index,
                cell_label: params.label.clone(),
                time_s: run.t_global_s,
                dt_s: dt,
                time_in_step_s: run.time_in_step_s,
                soc: cell.soc,
                v_term: cell.v_term,
                ocv: cell.ocv,
                v_rc1: cell.v_rc1,
                v_rc2: cell.v_rc2,
                r0: sol.params.r0,
                r1: sol.params.r1,
                r2: sol.params.r2,
                c1: sol.params.c1,
                c2: sol.params.c2,
                i_cell_a: cell.current_a,
                q_irr_w: sol.q_irr_w,
                q_rev_w: sol.q_rev_w,
                q_gen_w: sol.q_gen_w(),
                heat_cum_j: cell.heat_j,
                energy_wh: cell.energy_wh,
                temperature_k: cell.temperature_k,
                i_pack_a: solution.i_pack,
                v_module_v: solution.module_voltage,
                row_index: row_idx,
                global_index: row.global_index,
                day_of_year: row.day_of_year,
                drive_cycle_id: row.drive_cycle_id.clone(),
                subcycle_id: row.subcycle_id.clone(),
                step_type: row.step_type.as_str().to_string(),
                value_type: row.target.kind().to_string(),
                value: row.target.value(),
                unit: row.unit.clone(),
                label: row.label.clone(),
                location: row.location.clone(),
                ambient_temp_c: row.ambient_temp_c,
                fired_triggers: fired.clone(),
            })
            .collect()
    }

    fn progress(&self, run: &RunState) -> SimProgress {
        let cap = self.options.time_cap_s;
        SimProgress {
            sim_time_s: run.t_global_s,
            time_cap_s: cap,
            fraction_complete: (run.row_idx as f64 / self.table.len() as f64)
                .max(run.t_global_s / cap)
                .min(1.0),
            row_idx: run.row_idx,
            rows_total: self.table.len(),
            substeps: run.substeps,
            days_elapsed: run.days_elapsed,
        }
    }

    fn finish(
        &self,
        state: &mut SimulationState,
        sink: &mut dyn RecordSink,
        outcome: RunOutcome,
    ) -> SimResult<RunOutcome> {
        sink.flush()?;
        info!(
            reason = %outcome.reason(),
            sim_time_s = state.run.t_global_s,
            substeps = state.run.substeps,
            rows_written = sink.rows_written(),
            "walker finished"
        );
        state.run.termination = Some(outcome.clone());
        Ok(outcome)
    }
}
