//! Queries over stored results.

use std::collections::BTreeMap;

use pf_results::ResultRecord;

use crate::error::{AppError, AppResult};

/// Per-cell variables that [`extract_cell_series`] understands.
pub const CELL_VARIABLES: &[&str] = &[
    "soc",
    "v_term",
    "ocv",
    "v_rc1",
    "v_rc2",
    "r0",
    "current",
    "temperature",
    "q_gen",
    "q_irr",
    "q_rev",
    "heat",
    "energy",
    "i_pack",
    "v_module",
];

/// Summary statistics for a run's results.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub record_count: usize,
    pub cell_count: usize,
    pub time_range: (f64, f64),
    pub final_v_module: f64,
    pub min_cell_soc: f64,
    pub max_temperature_k: f64,
}

pub fn get_run_summary(records: &[ResultRecord]) -> AppResult<RunSummary> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("run has no results".to_string()));
    };
    let cells = list_cell_labels(records).len();
    let at_end = records
        .iter()
        .filter(|r| r.time_s == last.time_s)
        .collect::<Vec<_>>();
    Ok(RunSummary {
        record_count: records.len(),
        cell_count: cells,
        time_range: (first.time_s - first.dt_s, last.time_s),
        final_v_module: last.v_module_v,
        min_cell_soc: at_end.iter().map(|r| r.soc).fold(f64::INFINITY, f64::min),
        max_temperature_k: records
            .iter()
            .map(|r| r.temperature_k)
            .fold(f64::NEG_INFINITY, f64::max),
    })
}

/// Cell labels in cell-index order.
pub fn list_cell_labels(records: &[ResultRecord]) -> Vec<String> {
    let mut labels = BTreeMap::new();
    for r in records {
        labels
            .entry(r.cell_index)
            .or_insert_with(|| r.cell_label.clone());
    }
    labels.into_values().collect()
}

/// Time series of one variable for one cell, given by label or index.
pub fn extract_cell_series(
    records: &[ResultRecord],
    cell: &str,
    variable: &str,
) -> AppResult<Vec<(f64, f64)>> {
    let pick: fn(&ResultRecord) -> f64 = match variable {
        "soc" => |r| r.soc,
        "v_term" | "voltage" => |r| r.v_term,
        "ocv" => |r| r.ocv,
        "v_rc1" => |r| r.v_rc1,
        "v_rc2" => |r| r.v_rc2,
        "r0" => |r| r.r0,
        "current" => |r| r.i_cell_a,
        "temperature" => |r| r.temperature_k,
        "q_gen" => |r| r.q_gen_w,
        "q_irr" => |r| r.q_irr_w,
        "q_rev" => |r| r.q_rev_w,
        "heat" => |r| r.heat_cum_j,
        "energy" => |r| r.energy_wh,
        "i_pack" => |r| r.i_pack_a,
        "v_module" => |r| r.v_module_v,
        _ => {
            return Err(AppError::InvalidInput(format!(
                "Unknown variable '{variable}' (expected one of {})",
                CELL_VARIABLES.join(", ")
            )));
        }
    };

    // Labels win over indices when a label happens to be numeric.
    let by_label = records.iter().any(|r| r.cell_label == cell);
    let index = if by_label { None } else { cell.parse::<usize>().ok() };
    let series: Vec<(f64, f64)> = records
        .iter()
        .filter(|r| {
            if by_label {
                r.cell_label == cell
            } else {
                Some(r.cell_index) == index
            }
        })
        .map(|r| (r.time_s, pick(r)))
        .collect();
    if series.is_empty() {
        return Err(AppError::InvalidInput(format!("Unknown cell '{cell}'")));
    }
    Ok(series)
}
