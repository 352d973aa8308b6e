//! Runtime compilation of a project into the structures a run needs.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pf_pack::{
    CellSpec, CellState, EntropicCurve, HardLimits, InitialState, PackBuilder, PackTopology,
    ThermalParams,
};
use pf_project::schema::{PackDef, Project, StepRowDef};
use pf_results::{Fingerprints, FlushPolicy, fingerprint};
use pf_sim::{
    SimOptions, StepRow, StepTable, StepType, TriggerSource, parse_target, parse_triggers,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Everything compiled from a project file.
pub struct PackRuntime {
    pub project_name: String,
    pub topology: PackTopology,
    pub initial_cells: Vec<CellState>,
    pub table: StepTable,
    pub options: SimOptions,
    pub flush: FlushPolicy,
    pub fingerprints: Fingerprints,
}

/// Directory that relative paths in a project file are resolved against.
pub fn project_dir(project_path: &Path) -> &Path {
    project_path.parent().unwrap_or_else(|| Path::new("."))
}

/// Compile a loaded project. `project_path` locates the ECM table and any
/// external steps file.
pub fn compile_project(project: &Project, project_path: &Path) -> AppResult<PackRuntime> {
    let dir = project_dir(project_path);
    let ecm_source = read_ecm_source(&project.pack, dir)?;
    let topology = compile_pack(&project.pack, &ecm_source)?;
    let initial_cells = initial_cell_states(&project.pack, &topology)?;

    let steps = pf_project::resolve_steps(project, dir)?;
    let table = compile_steps(&steps, project.simulation.default_timestep_s)?;

    let sim = &project.simulation;
    let options = SimOptions {
        time_cap_s: sim.time_cap_s,
        trigger_only_max_substeps: sim.trigger_only_max_substeps,
        limits: hard_limits(&project.pack),
        ..SimOptions::default()
    };
    let max_interval = Duration::try_from_secs_f64(sim.flush_interval_s).map_err(|e| {
        AppError::Compile(format!(
            "simulation.flush_interval_s = {}: {e}",
            sim.flush_interval_s
        ))
    })?;
    let flush = FlushPolicy {
        max_rows: sim.flush_rows,
        max_interval,
    };

    let fingerprints = Fingerprints {
        pack_id: fingerprint(&project.pack.id, &PackIdentity {
            pack: &project.pack,
            ecm_table: &ecm_source.content,
        })?,
        drive_cycle_id: fingerprint(&project.drive_cycle.id, &steps)?,
    };

    Ok(PackRuntime {
        project_name: project.name.clone(),
        topology,
        initial_cells,
        table,
        options,
        flush,
        fingerprints,
    })
}

/// Raw ECM table file, kept so its content feeds the pack fingerprint.
pub struct EcmSource {
    pub name: String,
    pub content: String,
}

#[derive(Serialize)]
struct PackIdentity<'a> {
    pack: &'a PackDef,
    ecm_table: &'a str,
}

pub fn read_ecm_source(pack: &PackDef, project_dir: &Path) -> AppResult<EcmSource> {
    let path = project_dir.join(&pack.cell.ecm_table);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        AppError::Compile(format!("Failed to read ECM table {}: {e}", path.display()))
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| pack.cell.ecm_table.clone());
    Ok(EcmSource { name, content })
}

/// Build the pack topology from its definition.
pub fn compile_pack(pack: &PackDef, ecm: &EcmSource) -> AppResult<PackTopology> {
    let table = pf_ecm::parse_json_str(&ecm.name, &ecm.content)?;

    let mut builder = PackBuilder::new();
    let table_idx = builder.add_table(Arc::new(table));
    builder
        .interconnect_resistance(pack.r_interconnect_ohm)
        .series_resistance(pack.r_series_ohm);
    if let Some(points) = &pack.cell.entropic_coefficient {
        builder.entropic_curve(EntropicCurve::new(points.clone())?);
    }

    let thermal = pack.cell.thermal.map(|t| ThermalParams {
        mass_kg: t.mass_kg,
        cp_j_per_kg_k: t.cp_j_per_kg_k,
        h_a_w_per_k: t.h_a_w_per_k,
    });
    for cell in &pack.cells {
        builder.add_cell(
            cell.label.as_str(),
            cell.group,
            CellSpec {
                capacity_ah: cell.capacity_ah.unwrap_or(pack.cell.capacity_ah),
                coulombic_efficiency: pack.cell.coulombic_efficiency,
                table: table_idx,
                thermal,
            },
        );
    }
    Ok(builder.build()?)
}

/// Initial state per cell in topology order, applying `varying` overrides.
/// Later override blocks win over earlier ones.
pub fn initial_cell_states(pack: &PackDef, topology: &PackTopology) -> AppResult<Vec<CellState>> {
    let ic = &pack.initial_conditions;
    let base = InitialState {
        temperature_k: ic.temperature_k,
        soc: ic.soc,
        soh: ic.soh,
        dcir_aging_factor: ic.dcir_aging_factor,
    };
    let mut per_cell: HashMap<&str, InitialState> = HashMap::new();
    for block in &ic.varying {
        for label in &block.cell_labels {
            if topology.find_label(label).is_none() {
                return Err(AppError::Compile(format!(
                    "initial_conditions.varying names unknown cell '{label}'"
                )));
            }
            let entry = per_cell.entry(label.as_str()).or_insert(base);
            if let Some(t) = block.temperature_k {
                entry.temperature_k = t;
            }
            if let Some(soc) = block.soc {
                entry.soc = soc;
            }
            if let Some(soh) = block.soh {
                entry.soh = soh;
            }
            if let Some(f) = block.dcir_aging_factor {
                entry.dcir_aging_factor = f;
            }
        }
    }
    Ok(topology
        .cells()
        .iter()
        .map(|cell| {
            let init = per_cell.get(cell.label.as_str()).unwrap_or(&base);
            CellState::at_rest(init)
        })
        .collect())
}

fn hard_limits(pack: &PackDef) -> HardLimits {
    HardLimits {
        cell_lower_v: pack.cell.voltage_lower_v,
        cell_upper_v: pack.cell.voltage_upper_v,
        pack_lower_v: pack.pack_voltage_lower_v,
        pack_upper_v: pack.pack_voltage_upper_v,
    }
}

/// Turn step definitions into a walkable table. Rows without an explicit
/// global index are numbered by position.
pub fn compile_steps(rows: &[StepRowDef], default_timestep_s: f64) -> AppResult<StepTable> {
    let mut compiled = Vec::with_capacity(rows.len());
    for (i, def) in rows.iter().enumerate() {
        let target = parse_target(i, &def.value_type, def.value, &def.unit)?;
        let step_type = StepType::parse(i, &def.step_type)?;
        compiled.push(StepRow {
            global_index: def.global_index.unwrap_or(i as u64),
            day_of_year: def.day_of_year,
            drive_cycle_id: def.drive_cycle_id.clone(),
            subcycle_id: def.subcycle_id.clone(),
            subcycle_step: def.subcycle_step,
            target,
            unit: def.unit.clone(),
            step_type,
            duration_s: def.duration_s,
            timestep_s: def.timestep_s.unwrap_or(default_timestep_s),
            ambient_temp_c: def.ambient_temp_c,
            location: def.location.clone(),
            label: def.label.clone(),
            step_triggers: parse_triggers(&def.step_triggers, TriggerSource::Step),
            subcycle_triggers: parse_triggers(&def.subcycle_triggers, TriggerSource::Subcycle),
        });
    }
    Ok(StepTable::new(compiled)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(value_type: &str, value: f64, unit: &str, step_type: &str) -> StepRowDef {
        StepRowDef {
            global_index: None,
            day_of_year: 1,
            drive_cycle_id: "dc".into(),
            subcycle_id: "sc".into(),
            subcycle_step: 0,
            value_type: value_type.into(),
            value,
            unit: unit.into(),
            step_type: step_type.into(),
            duration_s: 10.0,
            timestep_s: None,
            ambient_temp_c: 25.0,
            location: String::new(),
            label: String::new(),
            step_triggers: "V_cell_high:4.1".into(),
            subcycle_triggers: String::new(),
        }
    }

    #[test]
    fn steps_take_default_timestep_and_position_index() {
        let rows = vec![
            step("current", 5.0, "A", "fixed"),
            step("c_rate", 0.5, "C", "fixed_with_triggers"),
        ];
        let table = compile_steps(&rows, 2.0).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].global_index, 1);
        assert_eq!(table.rows()[0].timestep_s, 2.0);
        assert_eq!(table.rows()[1].step_type, StepType::FixedWithTriggers);
        assert_eq!(table.rows()[0].step_triggers.len(), 1);
    }

    #[test]
    fn unknown_step_type_is_rejected() {
        let rows = vec![step("current", 5.0, "A", "sometimes")];
        let err = compile_steps(&rows, 1.0).err().unwrap();
        assert!(matches!(err, AppError::Simulation(_)));
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn unit_mismatch_is_rejected() {
        let rows = vec![step("voltage", 4.0, "A", "fixed")];
        assert!(compile_steps(&rows, 1.0).is_err());
    }
}
