//! Hard voltage cutoffs.

use std::fmt;

use pf_pack::{CellState, HardLimits};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

impl Bound {
    fn as_str(self) -> &'static str {
        match self {
            Bound::Lower => "below lower",
            Bound::Upper => "above upper",
        }
    }
}

/// A voltage outside the hard window.
#[derive(Clone, Debug, PartialEq)]
pub enum Cutoff {
    Cell {
        index: usize,
        voltage: f64,
        limit: f64,
        bound: Bound,
    },
    Pack {
        voltage: f64,
        limit: f64,
        bound: Bound,
    },
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cutoff::Cell {
                index,
                voltage,
                limit,
                bound,
            } => write!(
                f,
                "cell {index} voltage {voltage:.4} V {} limit {limit} V",
                bound.as_str()
            ),
            Cutoff::Pack {
                voltage,
                limit,
                bound,
            } => write!(
                f,
                "pack voltage {voltage:.4} V {} limit {limit} V",
                bound.as_str()
            ),
        }
    }
}

/// First violation in cell order, then the module voltage.
pub fn check(limits: &HardLimits, cells: &[CellState], module_voltage: f64) -> Option<Cutoff> {
    for (index, cell) in cells.iter().enumerate() {
        let bound = if cell.v_term > limits.cell_upper_v {
            Some((Bound::Upper, limits.cell_upper_v))
        } else if cell.v_term < limits.cell_lower_v {
            Some((Bound::Lower, limits.cell_lower_v))
        } else {
            None
        };
        if let Some((bound, limit)) = bound {
            return Some(Cutoff::Cell {
                index,
                voltage: cell.v_term,
                limit,
                bound,
            });
        }
    }
    if let Some(upper) = limits.pack_upper_v
        && module_voltage > upper
    {
        return Some(Cutoff::Pack {
            voltage: module_voltage,
            limit: upper,
            bound: Bound::Upper,
        });
    }
    if let Some(lower) = limits.pack_lower_v
        && module_voltage < lower
    {
        return Some(Cutoff::Pack {
            voltage: module_voltage,
            limit: lower,
            bound: Bound::Lower,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_pack::InitialState;

    fn cells(volts: &[f64]) -> Vec<CellState> {
        volts
            .iter()
            .map(|&v| {
                let mut c = CellState::at_rest(&InitialState::default());
                c.v_term = v;
                c
            })
            .collect()
    }

    #[test]
    fn window_edges_are_allowed() {
        let limits = HardLimits::default();
        assert_eq!(check(&limits, &cells(&[4.2, 2.5]), 6.7), None);
    }

    #[test]
    fn cell_violation_names_the_cell() {
        let cut = check(&HardLimits::default(), &cells(&[3.7, 4.25]), 7.95).unwrap();
        assert!(matches!(cut, Cutoff::Cell { index: 1, bound: Bound::Upper, .. }));
        assert!(cut.to_string().starts_with("cell 1"));
    }

    #[test]
    fn pack_limits_are_optional() {
        let limits = HardLimits {
            pack_lower_v: Some(7.0),
            ..HardLimits::default()
        };
        let cut = check(&limits, &cells(&[3.4, 3.4]), 6.8).unwrap();
        assert!(cut.to_string().starts_with("pack"));
        assert_eq!(check(&HardLimits::default(), &cells(&[3.4, 3.4]), 6.8), None);
    }
}
