//! JSON source format:
//!
//! ```json
//! { "CHARGE":    { "T05": [[soc..], [ocv..], [r0..], [r1..], [r2..], [c1..], [c2..]], ... },
//!   "DISCHARGE": { ... } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EcmError, EcmResult};
use crate::grid::{EcmGrid, TemperatureSlice};
use crate::table::{EcmTable, Mode, same_axis};

type RawMode = BTreeMap<String, Vec<Vec<f64>>>;

#[derive(Deserialize)]
struct RawEcmSource {
    #[serde(rename = "CHARGE")]
    charge: Option<RawMode>,
    #[serde(rename = "DISCHARGE")]
    discharge: Option<RawMode>,
}

/// Load a table from a JSON file; the table is named after the file stem.
pub fn load_json(path: &Path) -> EcmResult<EcmTable> {
    let content = std::fs::read_to_string(path).map_err(|source| EcmError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let table = parse_json_str(&name, &content)?;
    debug!(
        table = %name,
        soc_points = table.grid(Mode::Discharge).soc_axis().len(),
        charge_temps = table.grid(Mode::Charge).temperature_axis().len(),
        discharge_temps = table.grid(Mode::Discharge).temperature_axis().len(),
        "loaded ECM table"
    );
    Ok(table)
}

pub fn parse_json_str(name: &str, json: &str) -> EcmResult<EcmTable> {
    let raw: RawEcmSource = serde_json::from_str(json)?;
    let charge = build_grid(Mode::Charge, raw.charge)?;
    let discharge = build_grid(Mode::Discharge, raw.discharge)?;
    EcmTable::new(name, charge, discharge)
}

fn build_grid(mode: Mode, tables: Option<RawMode>) -> EcmResult<EcmGrid> {
    let tables = tables
        .filter(|t| !t.is_empty())
        .ok_or(EcmError::MissingMode { mode })?;

    let mut soc_axis: Option<Vec<f64>> = None;
    let mut slices = Vec::with_capacity(tables.len());
    for (key, columns) in tables {
        let temp_c = parse_temperature_key(&key)?;
        let [soc, ocv, r0, r1, r2, c1, c2]: [Vec<f64>; 7] =
            columns
                .try_into()
                .map_err(|c: Vec<Vec<f64>>| EcmError::ColumnCount {
                    mode,
                    key: key.clone(),
                    found: c.len(),
                })?;
        if [&ocv, &r0, &r1, &r2, &c1, &c2]
            .iter()
            .any(|c| c.len() != soc.len())
        {
            return Err(EcmError::RaggedColumns { mode, key });
        }
        match &soc_axis {
            None => soc_axis = Some(soc),
            Some(reference) if !same_axis(reference, &soc) => {
                return Err(EcmError::InconsistentSocGrid { mode, key });
            }
            Some(_) => {}
        }
        slices.push(TemperatureSlice {
            temp_c,
            ocv,
            r0,
            r1,
            r2,
            c1,
            c2,
        });
    }

    EcmGrid::new(mode, soc_axis.unwrap_or_default(), slices)
}

/// `T05` -> 5.0, `T-10` -> -10.0
fn parse_temperature_key(key: &str) -> EcmResult<f64> {
    key.strip_prefix(['T', 't'])
        .and_then(|deg| deg.trim().parse::<i32>().ok())
        .map(f64::from)
        .ok_or_else(|| EcmError::BadTemperatureKey {
            key: key.to_string(),
        })
}
