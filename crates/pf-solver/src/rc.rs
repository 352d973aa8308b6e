//! RC branch dynamics.

/// Substitute time constant when R*C is zero or undefined.
pub const TAU_GUARD_S: f64 = 1e-6;

/// tau = R*C, guarded against zero/negative capacitance.
pub fn time_constant(r: f64, c: f64) -> f64 {
    let tau = r * c;
    if tau.is_finite() && tau > 0.0 {
        tau
    } else {
        TAU_GUARD_S
    }
}

/// exp(-dt/tau)
pub fn decay(dt: f64, tau: f64) -> f64 {
    (-dt / tau).exp()
}

/// Exact solution of `C dV/dt = I - V/R` over `dt` for constant `I`.
pub fn rc_step(v_prev: f64, r: f64, c: f64, current: f64, dt: f64) -> f64 {
    let e = decay(dt, time_constant(r, c));
    v_prev * e + r * current * (1.0 - e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacitance_uses_guard() {
        assert_eq!(time_constant(0.01, 0.0), TAU_GUARD_S);
        assert_eq!(time_constant(0.0, 1000.0), TAU_GUARD_S);
        assert!((time_constant(0.01, 1000.0) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn settles_to_ir() {
        let v = rc_step(0.0, 0.01, 100.0, 5.0, 1e6);
        assert!((v - 0.05).abs() < 1e-12);
    }

    #[test]
    fn guard_branch_tracks_current_immediately() {
        let v = rc_step(0.3, 0.02, 0.0, 2.0, 1.0);
        assert!((v - 0.04).abs() < 1e-12);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn vanishing_step_keeps_voltage(
                v_prev in -0.5f64..0.5,
                r in 1e-4f64..0.1,
                c in 1.0f64..1e5,
                i in -100.0f64..100.0,
            ) {
                let v = rc_step(v_prev, r, c, i, 1e-12);
                prop_assert!((v - v_prev).abs() < 1e-9);
            }

            #[test]
            fn update_stays_between_start_and_steady_state(
                v_prev in -0.5f64..0.5,
                r in 1e-4f64..0.1,
                c in 1.0f64..1e5,
                i in -100.0f64..100.0,
                dt in 1e-3f64..1e4,
            ) {
                let v = rc_step(v_prev, r, c, i, dt);
                let target = r * i;
                let (lo, hi) = if v_prev < target { (v_prev, target) } else { (target, v_prev) };
                prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
            }
        }
    }
}
