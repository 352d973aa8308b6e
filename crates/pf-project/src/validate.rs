//! Project validation logic.

use std::collections::{BTreeSet, HashSet};

use crate::schema::{CellTemplateDef, InitialConditionsDef, PackDef, Project, SimulationDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Empty: {what}")]
    Empty { what: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn unit_interval(field: &str, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, value, "must lie in [0, 1]"))
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }
    validate_pack(&project.pack)?;
    validate_simulation(&project.simulation)?;

    let cycle = &project.drive_cycle;
    match (&cycle.steps_file, cycle.steps.is_empty()) {
        (None, true) => {
            return Err(ValidationError::Empty {
                what: format!("drive cycle '{}' has no steps", cycle.id),
            });
        }
        (Some(_), false) => {
            return Err(invalid(
                "drive_cycle.steps_file",
                cycle.id.as_str(),
                "give either steps or steps_file, not both",
            ));
        }
        _ => {}
    }
    for (i, step) in cycle.steps.iter().enumerate() {
        if let Some(dt) = step.timestep_s {
            positive(&format!("drive_cycle.steps[{i}].timestep_s"), dt)?;
        }
        if !(step.duration_s.is_finite() && step.duration_s >= 0.0) {
            return Err(invalid(
                &format!("drive_cycle.steps[{i}].duration_s"),
                step.duration_s,
                "must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_pack(pack: &PackDef) -> Result<(), ValidationError> {
    if pack.cells.is_empty() {
        return Err(ValidationError::Empty {
            what: format!("pack '{}' has no cells", pack.id),
        });
    }
    validate_cell_template(&pack.cell)?;

    let mut labels = HashSet::new();
    for cell in &pack.cells {
        if !labels.insert(cell.label.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: cell.label.clone(),
                context: "pack cells".to_string(),
            });
        }
        if let Some(cap) = cell.capacity_ah {
            positive(&format!("cells[{}].capacity_ah", cell.label), cap)?;
        }
    }

    // Group numbers must be contiguous from zero.
    let groups: BTreeSet<u32> = pack.cells.iter().map(|c| c.group).collect();
    for (expected, &group) in groups.iter().enumerate() {
        if group as usize != expected {
            return Err(ValidationError::Empty {
                what: format!("parallel group {expected} has no cells"),
            });
        }
    }

    for (field, value) in [
        ("pack.r_interconnect_ohm", pack.r_interconnect_ohm),
        ("pack.r_series_ohm", pack.r_series_ohm),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            return Err(invalid(field, value, "must be non-negative"));
        }
    }
    if let (Some(lo), Some(hi)) = (pack.pack_voltage_lower_v, pack.pack_voltage_upper_v)
        && lo >= hi
    {
        return Err(invalid(
            "pack.pack_voltage_lower_v",
            lo,
            "must be below pack_voltage_upper_v",
        ));
    }

    validate_initial_conditions(&pack.initial_conditions, &labels)
}

fn validate_cell_template(cell: &CellTemplateDef) -> Result<(), ValidationError> {
    positive("cell.capacity_ah", cell.capacity_ah)?;
    if !(cell.coulombic_efficiency > 0.0 && cell.coulombic_efficiency <= 1.0) {
        return Err(invalid(
            "cell.coulombic_efficiency",
            cell.coulombic_efficiency,
            "must lie in (0, 1]",
        ));
    }
    if cell.ecm_table.trim().is_empty() {
        return Err(ValidationError::Empty {
            what: "cell.ecm_table path".to_string(),
        });
    }
    if !(cell.voltage_lower_v.is_finite() && cell.voltage_upper_v.is_finite())
        || cell.voltage_lower_v >= cell.voltage_upper_v
    {
        return Err(invalid(
            "cell.voltage_lower_v",
            cell.voltage_lower_v,
            "must be below voltage_upper_v",
        ));
    }
    if let Some(thermal) = &cell.thermal {
        positive("cell.thermal.mass_kg", thermal.mass_kg)?;
        positive("cell.thermal.cp_j_per_kg_k", thermal.cp_j_per_kg_k)?;
        if !(thermal.h_a_w_per_k.is_finite() && thermal.h_a_w_per_k >= 0.0) {
            return Err(invalid(
                "cell.thermal.h_a_w_per_k",
                thermal.h_a_w_per_k,
                "must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_initial_conditions(
    init: &InitialConditionsDef,
    labels: &HashSet<&str>,
) -> Result<(), ValidationError> {
    positive("initial_conditions.temperature_k", init.temperature_k)?;
    unit_interval("initial_conditions.soc", init.soc)?;
    positive("initial_conditions.soh", init.soh)?;
    positive("initial_conditions.dcir_aging_factor", init.dcir_aging_factor)?;

    for varying in &init.varying {
        for label in &varying.cell_labels {
            if !labels.contains(label.as_str()) {
                return Err(ValidationError::MissingReference {
                    id: label.clone(),
                    context: "initial_conditions.varying".to_string(),
                });
            }
        }
        if let Some(t) = varying.temperature_k {
            positive("varying.temperature_k", t)?;
        }
        if let Some(soc) = varying.soc {
            unit_interval("varying.soc", soc)?;
        }
        if let Some(soh) = varying.soh {
            positive("varying.soh", soh)?;
        }
        if let Some(f) = varying.dcir_aging_factor {
            positive("varying.dcir_aging_factor", f)?;
        }
    }
    Ok(())
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    positive("simulation.default_timestep_s", sim.default_timestep_s)?;
    positive("simulation.time_cap_s", sim.time_cap_s)?;
    positive("simulation.flush_interval_s", sim.flush_interval_s)?;
    if sim.flush_rows == 0 {
        return Err(invalid("simulation.flush_rows", 0, "must be positive"));
    }
    if sim.trigger_only_max_substeps == 0 {
        return Err(invalid(
            "simulation.trigger_only_max_substeps",
            0,
            "must be positive",
        ));
    }
    Ok(())
}
