//! Live quantities that triggers compare against.

use pf_pack::{CellState, PackTopology};

/// Smallest and largest value over all cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            Span {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |span, v| Span {
                min: span.min.min(v),
                max: span.max.max(v),
            },
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
    Soc,
    CRate,
    Power,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Cell,
    Pack,
}

/// Direction of a limit: `High` fires above the threshold, `Low` below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    High,
    Low,
}

/// Snapshot taken after a sub-step has been committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    pub v_cell: Span,
    pub i_cell: Span,
    pub soc_cell: Span,
    pub c_rate_cell: Span,
    pub p_cell: Span,
    pub v_pack: f64,
    pub i_pack: f64,
    pub soc_pack: f64,
    pub c_rate_pack: f64,
    pub p_pack: f64,
}

impl Metrics {
    pub fn observe(
        topology: &PackTopology,
        cells: &[CellState],
        module_voltage: f64,
        i_pack: f64,
    ) -> Self {
        let params = topology.cells();
        let n = cells.len().max(1) as f64;
        let capacity = topology.pack_capacity_ah();
        Self {
            v_cell: Span::of(cells.iter().map(|c| c.v_term)),
            i_cell: Span::of(cells.iter().map(|c| c.current_a.abs())),
            soc_cell: Span::of(cells.iter().map(|c| c.soc)),
            c_rate_cell: Span::of(
                cells
                    .iter()
                    .zip(params)
                    .map(|(c, p)| c.current_a.abs() / p.capacity_ah),
            ),
            p_cell: Span::of(cells.iter().map(|c| c.v_term * c.current_a)),
            v_pack: module_voltage,
            i_pack: i_pack.abs(),
            soc_pack: cells.iter().map(|c| c.soc).sum::<f64>() / n,
            c_rate_pack: if capacity > 0.0 {
                i_pack.abs() / capacity
            } else {
                0.0
            },
            p_pack: module_voltage * i_pack,
        }
    }

    /// Value a trigger compares: the worst cell for cell scope (largest for
    /// `High`, smallest for `Low`), the pack aggregate otherwise.
    pub fn value(&self, quantity: Quantity, scope: Scope, cmp: Comparator) -> f64 {
        let pick = |span: Span| match cmp {
            Comparator::High => span.max,
            Comparator::Low => span.min,
        };
        match (scope, quantity) {
            (Scope::Cell, Quantity::Voltage) => pick(self.v_cell),
            (Scope::Cell, Quantity::Current) => pick(self.i_cell),
            (Scope::Cell, Quantity::Soc) => pick(self.soc_cell),
            (Scope::Cell, Quantity::CRate) => pick(self.c_rate_cell),
            (Scope::Cell, Quantity::Power) => pick(self.p_cell),
            (Scope::Pack, Quantity::Voltage) => self.v_pack,
            (Scope::Pack, Quantity::Current) => self.i_pack,
            (Scope::Pack, Quantity::Soc) => self.soc_pack,
            (Scope::Pack, Quantity::CRate) => self.c_rate_pack,
            (Scope::Pack, Quantity::Power) => self.p_pack,
        }
    }
}
