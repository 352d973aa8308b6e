//! Static cell parameters and mutable per-cell state.

use pf_core::{CellId, GroupId};
use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// Lumped thermal mass of one cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThermalParams {
    pub mass_kg: f64,
    pub cp_j_per_kg_k: f64,
    /// Convective conductance to ambient (W/K).
    pub h_a_w_per_k: f64,
}

impl ThermalParams {
    pub fn heat_capacity_j_per_k(&self) -> f64 {
        self.mass_kg * self.cp_j_per_kg_k
    }
}

/// Entropic coefficient dU/dT (V/K) as a piecewise-linear function of SOC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntropicCurve {
    points: Vec<(f64, f64)>,
}

impl Default for EntropicCurve {
    fn default() -> Self {
        Self {
            points: vec![
                (0.0, -0.4e-3),
                (0.3, -0.15e-3),
                (0.6, 0.0),
                (1.0, 0.1e-3),
            ],
        }
    }
}

impl EntropicCurve {
    pub fn new(points: Vec<(f64, f64)>) -> PackResult<Self> {
        if points.is_empty() {
            return Err(PackError::InvalidEntropicCurve {
                what: "needs at least one point",
            });
        }
        if points.iter().any(|(s, d)| !s.is_finite() || !d.is_finite()) {
            return Err(PackError::InvalidEntropicCurve {
                what: "non-finite point",
            });
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(PackError::InvalidEntropicCurve {
                what: "SOC must be strictly increasing",
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// dU/dT at `soc`, held constant beyond the first/last point.
    pub fn du_dt(&self, soc: f64) -> f64 {
        let (first, last) = (self.points[0], self.points[self.points.len() - 1]);
        if soc.is_nan() || soc <= first.0 {
            return first.1;
        }
        if soc >= last.0 {
            return last.1;
        }
        let i = self.points.partition_point(|p| p.0 <= soc) - 1;
        let (x0, y0) = self.points[i];
        let (x1, y1) = self.points[i + 1];
        y0 + (y1 - y0) * (soc - x0) / (x1 - x0)
    }
}

/// Immutable parameters of one cell.
#[derive(Clone, Debug)]
pub struct CellParams {
    pub id: CellId,
    pub label: String,
    pub group: GroupId,
    pub capacity_ah: f64,
    pub coulombic_efficiency: f64,
    /// Index into the pack's ECM tables.
    pub table: usize,
    pub thermal: Option<ThermalParams>,
}

/// Starting point for a cell's dynamic state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub temperature_k: f64,
    pub soc: f64,
    pub soh: f64,
    pub dcir_aging_factor: f64,
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            temperature_k: 300.0,
            soc: 1.0,
            soh: 1.0,
            dcir_aging_factor: 1.0,
        }
    }
}

/// Per-cell dynamic state, rewritten every sub-step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub soc: f64,
    pub temperature_k: f64,
    pub soh: f64,
    pub dcir_aging_factor: f64,
    pub v_rc1: f64,
    pub v_rc2: f64,
    pub v_term: f64,
    pub ocv: f64,
    /// Last cell current, positive on discharge.
    pub current_a: f64,
    pub heat_j: f64,
    pub energy_wh: f64,
    pub charge_ah: f64,
}

impl CellState {
    /// Relaxed cell (no RC polarization). Voltages are filled in once the
    /// ECM table is consulted.
    pub fn at_rest(init: &InitialState) -> Self {
        Self {
            soc: init.soc,
            temperature_k: init.temperature_k,
            soh: init.soh,
            dcir_aging_factor: init.dcir_aging_factor,
            v_rc1: 0.0,
            v_rc2: 0.0,
            v_term: 0.0,
            ocv: 0.0,
            current_a: 0.0,
            heat_j: 0.0,
            energy_wh: 0.0,
            charge_ah: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropic_curve_interpolates_and_holds() {
        let curve = EntropicCurve::new(vec![(0.0, -1.0e-3), (1.0, 1.0e-3)]).unwrap();
        assert!((curve.du_dt(0.5)).abs() < 1e-15);
        assert_eq!(curve.du_dt(-0.2), -1.0e-3);
        assert_eq!(curve.du_dt(1.7), 1.0e-3);
    }

    #[test]
    fn entropic_curve_rejects_unsorted() {
        assert!(EntropicCurve::new(vec![(0.5, 0.0), (0.2, 0.0)]).is_err());
        assert!(EntropicCurve::new(vec![]).is_err());
    }

    #[test]
    fn default_initial_state() {
        let state = CellState::at_rest(&InitialState::default());
        assert_eq!(state.soc, 1.0);
        assert_eq!(state.temperature_k, 300.0);
        assert_eq!(state.v_rc1, 0.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn du_dt_stays_within_point_range(soc in -1.0f64..2.0) {
            let curve = EntropicCurve::default();
            let (lo, hi) = curve
                .points()
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
            let d = curve.du_dt(soc);
            prop_assert!(d >= lo - 1e-15 && d <= hi + 1e-15);
        }
    }
}
