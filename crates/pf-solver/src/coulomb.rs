//! Coulomb counting.

use pf_core::{amp_hours, coulombs};

/// SOC after `dt` seconds at `current` (positive discharges). Charge
/// current is scaled by the coulombic efficiency; usable capacity by SOH.
pub fn next_soc(
    soc: f64,
    current: f64,
    dt: f64,
    capacity_ah: f64,
    soh: f64,
    coulombic_efficiency: f64,
) -> f64 {
    let usable_c = coulombs(amp_hours(capacity_ah * soh));
    if usable_c <= 0.0 {
        return soc;
    }
    let effective = if current < 0.0 {
        coulombic_efficiency * current
    } else {
        current
    };
    soc - effective * dt / usable_c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_c_for_an_hour_empties_cell() {
        let soc = next_soc(1.0, 5.0, 3600.0, 5.0, 1.0, 0.98);
        assert!(soc.abs() < 1e-12);
    }

    #[test]
    fn charge_is_derated_by_efficiency() {
        let soc = next_soc(0.0, -5.0, 3600.0, 5.0, 1.0, 0.9);
        assert!((soc - 0.9).abs() < 1e-12);
    }

    #[test]
    fn faded_cell_moves_faster() {
        let fresh = next_soc(1.0, 1.0, 600.0, 5.0, 1.0, 1.0);
        let faded = next_soc(1.0, 1.0, 600.0, 5.0, 0.8, 1.0);
        assert!(faded < fresh);
    }
}
