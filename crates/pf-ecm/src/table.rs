//! Shared per-cell-type parameter table.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use pf_core::{Tolerances, nearly_equal};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EcmError, EcmResult};
use crate::grid::EcmGrid;

/// Plausible open-circuit voltage window; values outside only warn.
pub const OCV_PLAUSIBLE_RANGE: (f64, f64) = (2.5, 4.2);

const OCV_WARN_EVERY: u64 = 10_000;

/// Current direction selecting the parameter grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Charge,
    Discharge,
}

impl Mode {
    /// Negative pack current charges the pack.
    pub fn for_current(i_pack: f64) -> Self {
        if i_pack < 0.0 {
            Mode::Charge
        } else {
            Mode::Discharge
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Charge => "CHARGE",
            Mode::Discharge => "DISCHARGE",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit parameters at one operating point. Resistances in ohm,
/// capacitances in farad, OCV in volt.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EcmParams {
    pub ocv: f64,
    pub r0: f64,
    pub r1: f64,
    pub r2: f64,
    pub c1: f64,
    pub c2: f64,
}

impl EcmParams {
    pub(crate) fn lerp(&self, other: &EcmParams, w: f64) -> EcmParams {
        let mix = |a: f64, b: f64| a + (b - a) * w;
        EcmParams {
            ocv: mix(self.ocv, other.ocv),
            r0: mix(self.r0, other.r0),
            r1: mix(self.r1, other.r1),
            r2: mix(self.r2, other.r2),
            c1: mix(self.c1, other.c1),
            c2: mix(self.c2, other.c2),
        }
    }

    /// Resistances grow with the DCIR aging factor; OCV and capacitances do not.
    pub fn aged(mut self, dcir_aging_factor: f64) -> EcmParams {
        self.r0 *= dcir_aging_factor;
        self.r1 *= dcir_aging_factor;
        self.r2 *= dcir_aging_factor;
        self
    }
}

/// Immutable charge/discharge grids for one cell type.
///
/// Loaded once and shared by every cell that references it.
#[derive(Debug)]
pub struct EcmTable {
    name: String,
    charge: EcmGrid,
    discharge: EcmGrid,
    ocv_warnings: AtomicU64,
}

impl EcmTable {
    pub fn new(name: impl Into<String>, charge: EcmGrid, discharge: EcmGrid) -> EcmResult<Self> {
        if !same_axis(charge.soc_axis(), discharge.soc_axis()) {
            return Err(EcmError::InconsistentSocGrid {
                mode: Mode::Discharge,
                key: "all".to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            charge,
            discharge,
            ocv_warnings: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self, mode: Mode) -> &EcmGrid {
        match mode {
            Mode::Charge => &self.charge,
            Mode::Discharge => &self.discharge,
        }
    }

    /// Interpolated parameters at (SOC, temperature in degC) with
    /// resistances scaled by `dcir_aging_factor`.
    pub fn lookup(&self, soc: f64, temp_c: f64, mode: Mode, dcir_aging_factor: f64) -> EcmParams {
        let params = self.grid(mode).interpolate(soc, temp_c).aged(dcir_aging_factor);

        let (lo, hi) = OCV_PLAUSIBLE_RANGE;
        if !(lo..=hi).contains(&params.ocv) {
            let seen = self.ocv_warnings.fetch_add(1, Ordering::Relaxed);
            if seen % OCV_WARN_EVERY == 0 {
                warn!(
                    table = %self.name,
                    soc,
                    temp_c,
                    ocv = params.ocv,
                    occurrences = seen + 1,
                    "OCV outside plausible range"
                );
            }
        }
        params
    }

    /// Number of lookups that produced an implausible OCV.
    pub fn ocv_warning_count(&self) -> u64 {
        self.ocv_warnings.load(Ordering::Relaxed)
    }
}

/// Element-wise equality within float noise.
pub(crate) fn same_axis(a: &[f64], b: &[f64]) -> bool {
    let tol = Tolerances::default();
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| nearly_equal(x, y, tol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TemperatureSlice;

    fn grid(mode: Mode, ocv: [f64; 2]) -> EcmGrid {
        EcmGrid::new(
            mode,
            vec![0.0, 1.0],
            vec![TemperatureSlice {
                temp_c: 25.0,
                ocv: ocv.to_vec(),
                r0: vec![0.02, 0.01],
                r1: vec![0.01, 0.01],
                r2: vec![0.004, 0.004],
                c1: vec![1000.0, 1000.0],
                c2: vec![8000.0, 8000.0],
            }],
        )
        .unwrap()
    }

    #[test]
    fn mode_follows_current_sign() {
        assert_eq!(Mode::for_current(-0.1), Mode::Charge);
        assert_eq!(Mode::for_current(0.0), Mode::Discharge);
        assert_eq!(Mode::for_current(5.0), Mode::Discharge);
    }

    #[test]
    fn aging_scales_only_resistances() {
        let table = EcmTable::new(
            "t",
            grid(Mode::Charge, [3.1, 4.1]),
            grid(Mode::Discharge, [3.0, 4.0]),
        )
        .unwrap();
        let fresh = table.lookup(0.5, 25.0, Mode::Discharge, 1.0);
        let aged = table.lookup(0.5, 25.0, Mode::Discharge, 1.5);
        assert!((aged.r0 - 1.5 * fresh.r0).abs() < 1e-12);
        assert!((aged.r2 - 1.5 * fresh.r2).abs() < 1e-12);
        assert_eq!(aged.c1, fresh.c1);
        assert_eq!(aged.ocv, fresh.ocv);
    }

    #[test]
    fn modes_use_their_own_grid() {
        let table = EcmTable::new(
            "t",
            grid(Mode::Charge, [3.1, 4.1]),
            grid(Mode::Discharge, [3.0, 4.0]),
        )
        .unwrap();
        let c = table.lookup(1.0, 25.0, Mode::Charge, 1.0);
        let d = table.lookup(1.0, 25.0, Mode::Discharge, 1.0);
        assert!((c.ocv - 4.1).abs() < 1e-12);
        assert!((d.ocv - 4.0).abs() < 1e-12);
    }

    #[test]
    fn implausible_ocv_warns_without_failing() {
        let table = EcmTable::new(
            "t",
            grid(Mode::Charge, [2.0, 4.5]),
            grid(Mode::Discharge, [2.0, 4.5]),
        )
        .unwrap();
        let p = table.lookup(0.0, 25.0, Mode::Discharge, 1.0);
        assert!((p.ocv - 2.0).abs() < 1e-12);
        table.lookup(0.5, 25.0, Mode::Discharge, 1.0);
        assert_eq!(table.ocv_warning_count(), 1);
    }

    #[test]
    fn mismatched_mode_soc_grids_rejected() {
        let other = EcmGrid::new(
            Mode::Discharge,
            vec![0.0, 0.5],
            vec![TemperatureSlice {
                temp_c: 25.0,
                ocv: vec![3.0, 3.5],
                r0: vec![0.01; 2],
                r1: vec![0.01; 2],
                r2: vec![0.01; 2],
                c1: vec![1.0; 2],
                c2: vec![1.0; 2],
            }],
        )
        .unwrap();
        let err = EcmTable::new("t", grid(Mode::Charge, [3.0, 4.0]), other).unwrap_err();
        assert!(matches!(err, EcmError::InconsistentSocGrid { .. }));
    }
}
