//! Electrical-target conversion: turns a step's requested quantity into an
//! instantaneous pack current (positive discharges).

use pf_pack::{CellState, PackTopology};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pack::evaluate;
use crate::root::{BisectConfig, BisectOutcome, bisect};

/// Search bracket half-width in multiples of pack capacity (A per Ah).
pub const BRACKET_C_RATE: f64 = 10.0;

/// Requested quantity of a step row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Target {
    /// Pack current (A).
    Current(f64),
    /// Multiple of pack capacity per hour.
    CRate(f64),
    /// Module voltage (V).
    Voltage(f64),
    /// Pack power (W).
    Power(f64),
    /// Load resistance (ohm); not supported.
    Resistance(f64),
}

impl Target {
    pub fn value(&self) -> f64 {
        match *self {
            Target::Current(v)
            | Target::CRate(v)
            | Target::Voltage(v)
            | Target::Power(v)
            | Target::Resistance(v) => v,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Current(_) => "current",
            Target::CRate(_) => "c_rate",
            Target::Voltage(_) => "voltage",
            Target::Power(_) => "power",
            Target::Resistance(_) => "resistance",
        }
    }
}

/// Approximation used when a target cannot be met exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Voltage unreachable inside the bracket; bracket end closest to it.
    UnreachableVoltage,
    /// Power unreachable inside the bracket; `P / V_prev`.
    UnreachablePower,
    /// Resistance targets run at zero current.
    UnsupportedResistance,
}

impl Fallback {
    pub fn describe(&self) -> &'static str {
        match self {
            Fallback::UnreachableVoltage => "voltage target unreachable, using current-limited bracket end",
            Fallback::UnreachablePower => "power target unreachable, using P / V_prev",
            Fallback::UnsupportedResistance => "resistance targets are unsupported, using zero current",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resolved {
    pub i_pack: f64,
    pub fallback: Option<Fallback>,
}

impl Resolved {
    fn exact(i_pack: f64) -> Self {
        Self {
            i_pack,
            fallback: None,
        }
    }
}

/// Resolve `target` to a pack current for a sub-step of width `dt`.
///
/// `v_prev` is the module voltage of the previous sub-step.
pub fn resolve_current(
    target: Target,
    topology: &PackTopology,
    cells: &[CellState],
    dt: f64,
    v_prev: f64,
) -> Resolved {
    let capacity = topology.pack_capacity_ah();
    let bound = BRACKET_C_RATE * capacity;
    let config = BisectConfig::default();

    match target {
        Target::Current(i) => Resolved::exact(i),
        Target::CRate(c) => Resolved::exact(c * capacity),
        Target::Voltage(v_target) => {
            let f = |i: f64| evaluate(topology, cells, i, dt).module_voltage - v_target;
            match bisect(-bound, bound, f, &config) {
                BisectOutcome::Root { x, iterations } => {
                    debug!(v_target, i_pack = x, iterations, "voltage target resolved");
                    Resolved::exact(x)
                }
                BisectOutcome::NoSignChange { f_lo, f_hi } => Resolved {
                    i_pack: if f_lo.abs() <= f_hi.abs() { -bound } else { bound },
                    fallback: Some(Fallback::UnreachableVoltage),
                },
            }
        }
        Target::Power(p_target) => {
            // Search the branch matching the power sign so the low-current
            // root is found.
            let (lo, hi) = if p_target >= 0.0 {
                (0.0, bound)
            } else {
                (-bound, 0.0)
            };
            let f = |i: f64| {
                let v = evaluate(topology, cells, i, dt).module_voltage;
                v * i - p_target
            };
            match bisect(lo, hi, f, &config) {
                BisectOutcome::Root { x, iterations } => {
                    debug!(p_target, i_pack = x, iterations, "power target resolved");
                    Resolved::exact(x)
                }
                BisectOutcome::NoSignChange { .. } => {
                    let i = if v_prev.abs() > 1e-9 {
                        (p_target / v_prev).clamp(-bound, bound)
                    } else {
                        0.0
                    };
                    Resolved {
                        i_pack: i,
                        fallback: Some(Fallback::UnreachablePower),
                    }
                }
            }
        }
        Target::Resistance(_) => Resolved {
            i_pack: 0.0,
            fallback: Some(Fallback::UnsupportedResistance),
        },
    }
}
