//! Incremental pack builder.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use pf_core::{CellId, GroupId};
use pf_ecm::EcmTable;

use crate::cell::{CellParams, EntropicCurve, ThermalParams};
use crate::error::{PackError, PackResult};
use crate::topology::{PackTopology, ParallelGroup};

/// Default interconnect and series busbar resistance (ohm).
pub const DEFAULT_CONTACT_RESISTANCE_OHM: f64 = 0.001;

/// Static parameters supplied for one cell.
#[derive(Clone, Debug)]
pub struct CellSpec {
    pub capacity_ah: f64,
    pub coulombic_efficiency: f64,
    pub table: usize,
    pub thermal: Option<ThermalParams>,
}

/// Builder for a [`PackTopology`].
///
/// Group numbers are arbitrary; they are sorted and renumbered densely so
/// the lowest number becomes the first group in the series string.
#[derive(Debug)]
pub struct PackBuilder {
    cells: Vec<(String, u32, CellSpec)>,
    tables: Vec<Arc<EcmTable>>,
    r_interconnect_ohm: f64,
    r_series_ohm: f64,
    entropic: EntropicCurve,
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            tables: Vec::new(),
            r_interconnect_ohm: DEFAULT_CONTACT_RESISTANCE_OHM,
            r_series_ohm: DEFAULT_CONTACT_RESISTANCE_OHM,
            entropic: EntropicCurve::default(),
        }
    }
}

impl PackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shared ECM table and return its index.
    pub fn add_table(&mut self, table: Arc<EcmTable>) -> usize {
        self.tables.push(table);
        self.tables.len() - 1
    }

    /// Add a cell to parallel group `group`; returns its position.
    pub fn add_cell(&mut self, label: impl Into<String>, group: u32, spec: CellSpec) -> usize {
        self.cells.push((label.into(), group, spec));
        self.cells.len() - 1
    }

    pub fn interconnect_resistance(&mut self, ohm: f64) -> &mut Self {
        self.r_interconnect_ohm = ohm;
        self
    }

    pub fn series_resistance(&mut self, ohm: f64) -> &mut Self {
        self.r_series_ohm = ohm;
        self
    }

    pub fn entropic_curve(&mut self, curve: EntropicCurve) -> &mut Self {
        self.entropic = curve;
        self
    }

    /// Validate and freeze the pack.
    pub fn build(self) -> PackResult<PackTopology> {
        if self.cells.is_empty() {
            return Err(PackError::EmptyPack);
        }
        for (what, value) in [
            ("r_interconnect_ohm", self.r_interconnect_ohm),
            ("r_series_ohm", self.r_series_ohm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PackError::InvalidPackParam { what, value });
            }
        }

        let mut labels = HashSet::new();
        for (label, _, spec) in &self.cells {
            if !labels.insert(label.as_str()) {
                return Err(PackError::DuplicateLabel {
                    label: label.clone(),
                });
            }
            validate_spec(label, spec, self.tables.len())?;
        }

        let mut group_index = BTreeMap::new();
        for (_, group, _) in &self.cells {
            group_index.entry(*group).or_insert(0usize);
        }
        for (pos, slot) in group_index.values_mut().enumerate() {
            *slot = pos;
        }

        let mut groups = Vec::with_capacity(group_index.len());
        for pos in 0..group_index.len() {
            groups.push(ParallelGroup {
                id: GroupId::from_index(pos)?,
                cells: Vec::new(),
            });
        }

        let mut cells = Vec::with_capacity(self.cells.len());
        for (pos, (label, group, spec)) in self.cells.into_iter().enumerate() {
            let id = CellId::from_index(pos)?;
            let g = group_index[&group];
            groups[g].cells.push(id);
            cells.push(CellParams {
                id,
                label,
                group: groups[g].id,
                capacity_ah: spec.capacity_ah,
                coulombic_efficiency: spec.coulombic_efficiency,
                table: spec.table,
                thermal: spec.thermal,
            });
        }

        Ok(PackTopology {
            cells,
            groups,
            tables: self.tables,
            r_interconnect_ohm: self.r_interconnect_ohm,
            r_series_ohm: self.r_series_ohm,
            entropic: self.entropic,
        })
    }
}

fn validate_spec(label: &str, spec: &CellSpec, table_count: usize) -> PackResult<()> {
    let invalid = |what: &'static str, value: f64| PackError::InvalidParam {
        label: label.to_string(),
        what,
        value,
    };
    if !spec.capacity_ah.is_finite() || spec.capacity_ah <= 0.0 {
        return Err(invalid("capacity_ah", spec.capacity_ah));
    }
    if !(spec.coulombic_efficiency > 0.0 && spec.coulombic_efficiency <= 1.0) {
        return Err(invalid("coulombic_efficiency", spec.coulombic_efficiency));
    }
    if spec.table >= table_count {
        return Err(PackError::UnknownTable {
            label: label.to_string(),
            table: spec.table,
            count: table_count,
        });
    }
    if let Some(thermal) = &spec.thermal {
        for (what, value) in [
            ("thermal.mass_kg", thermal.mass_kg),
            ("thermal.cp_j_per_kg_k", thermal.cp_j_per_kg_k),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(what, value));
            }
        }
        if !thermal.h_a_w_per_k.is_finite() || thermal.h_a_w_per_k < 0.0 {
            return Err(invalid("thermal.h_a_w_per_k", thermal.h_a_w_per_k));
        }
    }
    Ok(())
}
