//! Whole-pack evaluation: every parallel group at one pack current.
//!
//! [`evaluate`] is pure so target conversion can probe trial currents;
//! [`commit`] applies an accepted solution to the cell states.

use pf_core::{CellId, GroupId, SECONDS_PER_HOUR, celsius_to_kelvin, kelvin_to_celsius};
use pf_ecm::{EcmParams, Mode};
use pf_pack::{CellState, PackTopology};
use tracing::warn;

use crate::coulomb::next_soc;
use crate::group::{CellBranch, solve_group};
use crate::heat::{irreversible_heat_w, reversible_heat_w, thermal_step};
use crate::rc::rc_step;

/// Per-cell outcome of one sub-step.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSolution {
    pub current_a: f64,
    pub params: EcmParams,
    pub v_rc1: f64,
    pub v_rc2: f64,
    pub v_term: f64,
    pub q_irr_w: f64,
    pub q_rev_w: f64,
    /// False when the cell's group was skipped this sub-step.
    pub solved: bool,
}

impl CellSolution {
    pub fn q_gen_w(&self) -> f64 {
        self.q_irr_w + self.q_rev_w
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PackSolution {
    pub i_pack: f64,
    pub mode: Mode,
    /// Indexed like the topology's cells.
    pub cells: Vec<CellSolution>,
    /// Node voltage per group in series order.
    pub group_voltages: Vec<f64>,
    pub module_voltage: f64,
    pub skipped_groups: Vec<GroupId>,
}

/// Solve every group for pack current `i_pack` over `dt` without touching
/// the cell states. Groups whose system cannot be solved are reported in
/// `skipped_groups` and hold their previous state.
pub fn evaluate(topology: &PackTopology, cells: &[CellState], i_pack: f64, dt: f64) -> PackSolution {
    let mode = Mode::for_current(i_pack);
    let r_p = topology.r_interconnect_ohm();

    let mut out: Vec<Option<CellSolution>> = vec![None; cells.len()];
    let mut group_voltages = Vec::with_capacity(topology.n_series());
    let mut skipped_groups = Vec::new();

    for group in topology.groups() {
        let lookups: Vec<EcmParams> = group
            .cells
            .iter()
            .map(|&id| lookup(topology, &cells[id.index()], id, mode))
            .collect();
        let branches: Vec<CellBranch> = group
            .cells
            .iter()
            .zip(&lookups)
            .map(|(&id, params)| CellBranch {
                params: *params,
                v_rc1_prev: cells[id.index()].v_rc1,
                v_rc2_prev: cells[id.index()].v_rc2,
            })
            .collect();

        match solve_group(group.id, &branches, r_p, i_pack, dt) {
            Ok(sol) => {
                for ((&id, params), &current) in group.cells.iter().zip(&lookups).zip(&sol.currents)
                {
                    let state = &cells[id.index()];
                    let v_rc1 = rc_step(state.v_rc1, params.r1, params.c1, current, dt);
                    let v_rc2 = rc_step(state.v_rc2, params.r2, params.c2, current, dt);
                    let du_dt = topology.entropic().du_dt(state.soc);
                    out[id.index()] = Some(CellSolution {
                        current_a: current,
                        params: *params,
                        v_rc1,
                        v_rc2,
                        v_term: params.ocv - current * params.r0 - v_rc1 - v_rc2,
                        q_irr_w: irreversible_heat_w(current, params.r0),
                        q_rev_w: reversible_heat_w(current, state.temperature_k, du_dt),
                        solved: true,
                    });
                }
                group_voltages.push(sol.v_group);
            }
            Err(err) => {
                warn!(group = %group.id, error = %err, "group solve skipped, holding previous state");
                let mut v_sum = 0.0;
                for (&id, params) in group.cells.iter().zip(&lookups) {
                    let state = &cells[id.index()];
                    v_sum += state.v_term;
                    out[id.index()] = Some(CellSolution {
                        current_a: 0.0,
                        params: *params,
                        v_rc1: state.v_rc1,
                        v_rc2: state.v_rc2,
                        v_term: state.v_term,
                        q_irr_w: 0.0,
                        q_rev_w: 0.0,
                        solved: false,
                    });
                }
                group_voltages.push(v_sum / group.cells.len() as f64);
                skipped_groups.push(group.id);
            }
        }
    }

    let series_links = topology.n_series().saturating_sub(1) as f64;
    let module_voltage = group_voltages.iter().sum::<f64>()
        - i_pack.abs() * topology.r_series_ohm() * series_links;

    PackSolution {
        i_pack,
        mode,
        // Every cell belongs to exactly one group, so every slot is filled.
        cells: out.into_iter().flatten().collect(),
        group_voltages,
        module_voltage,
        skipped_groups,
    }
}

/// Apply an evaluated solution. `ambient_c` feeds the optional thermal model.
pub fn commit(
    topology: &PackTopology,
    solution: &PackSolution,
    cells: &mut [CellState],
    dt: f64,
    ambient_c: f64,
) {
    let ambient_k = celsius_to_kelvin(ambient_c);
    for (params, (state, sol)) in topology
        .cells()
        .iter()
        .zip(cells.iter_mut().zip(&solution.cells))
    {
        if !sol.solved {
            continue;
        }
        let current = sol.current_a;
        state.soc = next_soc(
            state.soc,
            current,
            dt,
            params.capacity_ah,
            state.soh,
            params.coulombic_efficiency,
        );
        state.current_a = current;
        state.ocv = sol.params.ocv;
        state.v_rc1 = sol.v_rc1;
        state.v_rc2 = sol.v_rc2;
        state.v_term = sol.v_term;
        state.heat_j += sol.q_gen_w() * dt;
        state.energy_wh += (sol.v_term * current).abs() * dt / SECONDS_PER_HOUR;
        state.charge_ah += current.abs() * dt / SECONDS_PER_HOUR;
        if let Some(thermal) = &params.thermal {
            state.temperature_k =
                thermal_step(state.temperature_k, sol.q_gen_w(), ambient_k, thermal, dt);
        }
    }
}

/// Fill in open-circuit and terminal voltages for cells at rest and return
/// the resulting module voltage.
pub fn rest_module_voltage(topology: &PackTopology, cells: &mut [CellState]) -> f64 {
    let mut total = 0.0;
    for group in topology.groups() {
        let mut v_sum = 0.0;
        for &id in &group.cells {
            let state = &mut cells[id.index()];
            let params = lookup(topology, state, id, Mode::Discharge);
            state.ocv = params.ocv;
            state.v_term = params.ocv - state.v_rc1 - state.v_rc2;
            v_sum += state.v_term;
        }
        total += v_sum / group.cells.len() as f64;
    }
    total
}

fn lookup(topology: &PackTopology, state: &CellState, id: CellId, mode: Mode) -> EcmParams {
    topology.table(id).lookup(
        state.soc,
        kelvin_to_celsius(state.temperature_k),
        mode,
        state.dcir_aging_factor,
    )
}
