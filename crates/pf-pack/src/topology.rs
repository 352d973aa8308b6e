//! Frozen pack layout: parallel groups wired in series.

use std::sync::Arc;

use pf_core::{CellId, GroupId};
use pf_ecm::EcmTable;

use crate::cell::{CellParams, EntropicCurve};

/// Cells sharing one node voltage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParallelGroup {
    pub id: GroupId,
    pub cells: Vec<CellId>,
}

/// Immutable pack description produced by [`crate::PackBuilder`].
///
/// Groups are stored in series order; every cell appears in exactly one
/// group.
#[derive(Clone, Debug)]
pub struct PackTopology {
    pub(crate) cells: Vec<CellParams>,
    pub(crate) groups: Vec<ParallelGroup>,
    pub(crate) tables: Vec<Arc<EcmTable>>,
    pub(crate) r_interconnect_ohm: f64,
    pub(crate) r_series_ohm: f64,
    pub(crate) entropic: EntropicCurve,
}

impl PackTopology {
    pub fn cells(&self) -> &[CellParams] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> &CellParams {
        &self.cells[id.index()]
    }

    pub fn groups(&self) -> &[ParallelGroup] {
        &self.groups
    }

    pub fn table(&self, id: CellId) -> &EcmTable {
        &self.tables[self.cell(id).table]
    }

    pub fn tables(&self) -> &[Arc<EcmTable>] {
        &self.tables
    }

    pub fn r_interconnect_ohm(&self) -> f64 {
        self.r_interconnect_ohm
    }

    pub fn r_series_ohm(&self) -> f64 {
        self.r_series_ohm
    }

    pub fn entropic(&self) -> &EntropicCurve {
        &self.entropic
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of parallel groups in the series string.
    pub fn n_series(&self) -> usize {
        self.groups.len()
    }

    /// Nominal pack capacity: mean over groups of the summed cell capacity.
    pub fn pack_capacity_ah(&self) -> f64 {
        let total: f64 = self
            .groups
            .iter()
            .map(|g| g.cells.iter().map(|&c| self.cell(c).capacity_ah).sum::<f64>())
            .sum();
        total / self.groups.len() as f64
    }

    pub fn find_label(&self, label: &str) -> Option<CellId> {
        self.cells.iter().find(|c| c.label == label).map(|c| c.id)
    }
}
