//! Cell heat generation and the optional lumped thermal update.

use pf_pack::ThermalParams;

/// Joule heating in R0 (W).
pub fn irreversible_heat_w(current: f64, r0: f64) -> f64 {
    current * current * r0
}

/// Entropic heat (W): `-I * T * dU/dT`, positive current discharging.
pub fn reversible_heat_w(current: f64, temperature_k: f64, du_dt: f64) -> f64 {
    -current * temperature_k * du_dt
}

/// Temperature after `dt` for `m cp dT/dt = q - hA (T - T_amb)` with `q`
/// held constant across the step.
pub fn thermal_step(
    temperature_k: f64,
    q_gen_w: f64,
    ambient_k: f64,
    params: &ThermalParams,
    dt: f64,
) -> f64 {
    let heat_capacity = params.heat_capacity_j_per_k();
    if params.h_a_w_per_k <= 0.0 {
        return temperature_k + q_gen_w * dt / heat_capacity;
    }
    let steady = ambient_k + q_gen_w / params.h_a_w_per_k;
    let e = (-dt * params.h_a_w_per_k / heat_capacity).exp();
    steady + (temperature_k - steady) * e
}
