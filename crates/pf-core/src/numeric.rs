use crate::PfError;

/// Floating point type used throughout the engine.
pub type Real = f64;

/// Absolute/relative pair for float comparisons.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Tolerance used when comparing simulated timestamps.
    pub const TIME: Tolerances = Tolerances {
        abs: 1e-6,
        rel: 1e-12,
    };
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// `a >= b` allowing `b` to be missed by the tolerance.
pub fn reached(a: Real, b: Real, tol: Tolerances) -> bool {
    a >= b || nearly_equal(a, b, tol)
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, PfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(PfError::NonFinite { what, value: v })
    }
}

pub fn ensure_in_range(v: Real, min: Real, max: Real, what: &'static str) -> Result<Real, PfError> {
    let v = ensure_finite(v, what)?;
    if v < min || v > max {
        return Err(PfError::OutOfRange {
            what,
            value: v,
            min,
            max,
        });
    }
    Ok(v)
}
