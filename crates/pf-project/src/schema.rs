//! Project schema definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub pack: PackDef,
    pub drive_cycle: DriveCycleDef,
    #[serde(default)]
    pub simulation: SimulationDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackDef {
    pub id: String,
    pub cell: CellTemplateDef,
    pub cells: Vec<CellDef>,
    #[serde(default = "default_contact_resistance")]
    pub r_interconnect_ohm: f64,
    #[serde(default = "default_contact_resistance")]
    pub r_series_ohm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_voltage_upper_v: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack_voltage_lower_v: Option<f64>,
    #[serde(default)]
    pub initial_conditions: InitialConditionsDef,
}

/// Parameters shared by every cell of the pack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellTemplateDef {
    pub capacity_ah: f64,
    #[serde(default = "one")]
    pub coulombic_efficiency: f64,
    /// ECM table JSON, relative to the project file.
    pub ecm_table: String,
    #[serde(default = "default_upper_v")]
    pub voltage_upper_v: f64,
    #[serde(default = "default_lower_v")]
    pub voltage_lower_v: f64,
    /// (SOC, dU/dT in V/K) points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entropic_coefficient: Option<Vec<(f64, f64)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal: Option<ThermalDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThermalDef {
    pub mass_kg: f64,
    pub cp_j_per_kg_k: f64,
    pub h_a_w_per_k: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellDef {
    pub label: String,
    pub group: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_ah: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitialConditionsDef {
    #[serde(default = "default_temperature_k")]
    pub temperature_k: f64,
    #[serde(default = "one")]
    pub soc: f64,
    #[serde(default = "one")]
    pub soh: f64,
    #[serde(default = "one")]
    pub dcir_aging_factor: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub varying: Vec<VaryingDef>,
}

impl Default for InitialConditionsDef {
    fn default() -> Self {
        Self {
            temperature_k: default_temperature_k(),
            soc: 1.0,
            soh: 1.0,
            dcir_aging_factor: 1.0,
            varying: Vec::new(),
        }
    }
}

/// Per-cell overrides of the pack-wide initial conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaryingDef {
    pub cell_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soc: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dcir_aging_factor: Option<f64>,
}

/// Step rows given inline or in a separate YAML/JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriveCycleDef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepRowDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRowDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_index: Option<u64>,
    #[serde(default = "default_day")]
    pub day_of_year: u32,
    #[serde(default)]
    pub drive_cycle_id: String,
    #[serde(default)]
    pub subcycle_id: String,
    #[serde(default)]
    pub subcycle_step: u32,
    pub value_type: String,
    pub value: f64,
    pub unit: String,
    pub step_type: String,
    #[serde(default)]
    pub duration_s: f64,
    /// Falls back to `simulation.default_timestep_s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestep_s: Option<f64>,
    #[serde(default = "default_ambient_c")]
    pub ambient_temp_c: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub step_triggers: String,
    #[serde(default)]
    pub subcycle_triggers: String,
}

/// Contents of a `steps_file`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StepsFile {
    Rows(Vec<StepRowDef>),
    Wrapped { steps: Vec<StepRowDef> },
}

impl StepsFile {
    pub fn into_rows(self) -> Vec<StepRowDef> {
        match self {
            StepsFile::Rows(rows) | StepsFile::Wrapped { steps: rows } => rows,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    #[serde(default = "one")]
    pub default_timestep_s: f64,
    #[serde(default = "default_time_cap_s")]
    pub time_cap_s: f64,
    #[serde(default = "default_flush_rows")]
    pub flush_rows: usize,
    #[serde(default = "default_flush_interval_s")]
    pub flush_interval_s: f64,
    #[serde(default = "default_trigger_only_max_substeps")]
    pub trigger_only_max_substeps: u64,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            default_timestep_s: 1.0,
            time_cap_s: default_time_cap_s(),
            flush_rows: default_flush_rows(),
            flush_interval_s: default_flush_interval_s(),
            trigger_only_max_substeps: default_trigger_only_max_substeps(),
        }
    }
}

fn one() -> f64 {
    1.0
}

fn default_contact_resistance() -> f64 {
    0.001
}

fn default_upper_v() -> f64 {
    4.2
}

fn default_lower_v() -> f64 {
    2.5
}

fn default_temperature_k() -> f64 {
    298.15
}

fn default_day() -> u32 {
    1
}

fn default_ambient_c() -> f64 {
    25.0
}

fn default_time_cap_s() -> f64 {
    365.0 * 86_400.0
}

fn default_flush_rows() -> usize {
    10_000
}

fn default_flush_interval_s() -> f64 {
    20.0
}

fn default_trigger_only_max_substeps() -> u64 {
    1_000_000
}
