//! Bracketed scalar root finding.

/// Bisection configuration.
#[derive(Clone, Copy, Debug)]
pub struct BisectConfig {
    /// Stop once the bracket half-width is below this (same unit as x).
    pub x_tol: f64,
    pub max_iterations: usize,
}

impl Default for BisectConfig {
    fn default() -> Self {
        Self {
            x_tol: 1e-3,
            max_iterations: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BisectOutcome {
    Root { x: f64, iterations: usize },
    /// `f` has the same sign at both ends of the bracket.
    NoSignChange { f_lo: f64, f_hi: f64 },
}

pub fn bisect<F>(mut lo: f64, mut hi: f64, mut f: F, config: &BisectConfig) -> BisectOutcome
where
    F: FnMut(f64) -> f64,
{
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if f_lo == 0.0 {
        return BisectOutcome::Root {
            x: lo,
            iterations: 0,
        };
    }
    if f_hi == 0.0 {
        return BisectOutcome::Root {
            x: hi,
            iterations: 0,
        };
    }
    if f_lo.signum() == f_hi.signum() || f_lo.is_nan() || f_hi.is_nan() {
        return BisectOutcome::NoSignChange { f_lo, f_hi };
    }

    let mut iterations = 0;
    while iterations < config.max_iterations {
        iterations += 1;
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || 0.5 * (hi - lo) < config.x_tol {
            return BisectOutcome::Root { x: mid, iterations };
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    BisectOutcome::Root {
        x: 0.5 * (lo + hi),
        iterations,
    }
}
