//! SOC x temperature grid for one current direction.

use pf_core::ensure_finite;

use crate::error::{EcmError, EcmResult};
use crate::table::{EcmParams, Mode};

/// Parameter columns measured at one temperature, indexed like the SOC axis.
#[derive(Clone, Debug, PartialEq)]
pub struct TemperatureSlice {
    pub temp_c: f64,
    pub ocv: Vec<f64>,
    pub r0: Vec<f64>,
    pub r1: Vec<f64>,
    pub r2: Vec<f64>,
    pub c1: Vec<f64>,
    pub c2: Vec<f64>,
}

impl TemperatureSlice {
    fn key(&self) -> String {
        format!("T{}", self.temp_c)
    }

    fn columns(&self) -> [(&'static str, &[f64]); 6] {
        [
            ("ocv", self.ocv.as_slice()),
            ("r0", self.r0.as_slice()),
            ("r1", self.r1.as_slice()),
            ("r2", self.r2.as_slice()),
            ("c1", self.c1.as_slice()),
            ("c2", self.c2.as_slice()),
        ]
    }

    fn at(&self, i: usize) -> EcmParams {
        EcmParams {
            ocv: self.ocv[i],
            r0: self.r0[i],
            r1: self.r1[i],
            r2: self.r2[i],
            c1: self.c1[i],
            c2: self.c2[i],
        }
    }
}

/// Validated grid: a strictly increasing SOC axis shared by every
/// temperature slice, slices sorted by temperature.
#[derive(Clone, Debug)]
pub struct EcmGrid {
    mode: Mode,
    soc: Vec<f64>,
    temps_c: Vec<f64>,
    slices: Vec<TemperatureSlice>,
}

impl EcmGrid {
    pub fn new(mode: Mode, soc: Vec<f64>, mut slices: Vec<TemperatureSlice>) -> EcmResult<Self> {
        if slices.is_empty() {
            return Err(EcmError::MissingMode { mode });
        }
        let first_key = slices[0].key();
        if soc.is_empty() {
            return Err(EcmError::EmptySocGrid {
                mode,
                key: first_key,
            });
        }
        for &x in &soc {
            ensure_finite(x, "soc grid point")?;
        }
        if soc.windows(2).any(|w| w[1] <= w[0]) {
            return Err(EcmError::SocNotIncreasing {
                mode,
                key: first_key,
            });
        }

        for slice in &slices {
            ensure_finite(slice.temp_c, "table temperature")?;
            for (what, column) in slice.columns() {
                if column.len() != soc.len() {
                    return Err(EcmError::RaggedColumns {
                        mode,
                        key: slice.key(),
                    });
                }
                for &v in column {
                    ensure_finite(v, what)?;
                    if what != "ocv" && v < 0.0 {
                        return Err(EcmError::Negative {
                            mode,
                            key: slice.key(),
                            what,
                        });
                    }
                }
            }
        }

        slices.sort_by(|a, b| a.temp_c.total_cmp(&b.temp_c));
        if let Some(w) = slices.windows(2).find(|w| w[0].temp_c == w[1].temp_c) {
            return Err(EcmError::DuplicateTemperature {
                mode,
                temp_c: w[0].temp_c,
            });
        }
        let temps_c = slices.iter().map(|s| s.temp_c).collect();

        Ok(Self {
            mode,
            soc,
            temps_c,
            slices,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn soc_axis(&self) -> &[f64] {
        &self.soc
    }

    pub fn temperature_axis(&self) -> &[f64] {
        &self.temps_c
    }

    /// Bilinear interpolation, clamped to the grid edges.
    pub fn interpolate(&self, soc: f64, temp_c: f64) -> EcmParams {
        let (si, sw) = bracket(&self.soc, soc);
        let (ti, tw) = bracket(&self.temps_c, temp_c);
        let si1 = (si + 1).min(self.soc.len() - 1);
        let ti1 = (ti + 1).min(self.temps_c.len() - 1);

        let lo = self.slices[ti].at(si).lerp(&self.slices[ti].at(si1), sw);
        let hi = self.slices[ti1].at(si).lerp(&self.slices[ti1].at(si1), sw);
        lo.lerp(&hi, tw)
    }
}

/// Lower bracket index and weight of `x` on `axis`. Values outside the axis
/// (and NaN) clamp to the nearest edge.
fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
    let last = axis.len() - 1;
    if last == 0 || x.is_nan() || x <= axis[0] {
        return (0, 0.0);
    }
    if x >= axis[last] {
        return (last - 1, 1.0);
    }
    // axis[i] <= x < axis[i + 1]
    let i = axis.partition_point(|&a| a <= x) - 1;
    (i, (x - axis[i]) / (axis[i + 1] - axis[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(temp_c: f64, ocv: Vec<f64>) -> TemperatureSlice {
        let n = ocv.len();
        TemperatureSlice {
            temp_c,
            ocv,
            r0: vec![0.01; n],
            r1: vec![0.005; n],
            r2: vec![0.002; n],
            c1: vec![1000.0; n],
            c2: vec![5000.0; n],
        }
    }

    #[test]
    fn bracket_interior_and_edges() {
        let axis = [0.0, 0.5, 1.0];
        assert_eq!(bracket(&axis, -1.0), (0, 0.0));
        assert_eq!(bracket(&axis, 2.0), (1, 1.0));
        let (i, w) = bracket(&axis, 0.75);
        assert_eq!(i, 1);
        assert!((w - 0.5).abs() < 1e-12);
        assert_eq!(bracket(&axis, f64::NAN), (0, 0.0));
    }

    #[test]
    fn single_point_axis_degenerates() {
        assert_eq!(bracket(&[25.0], 40.0), (0, 0.0));
        let grid = EcmGrid::new(
            Mode::Discharge,
            vec![0.0, 1.0],
            vec![slice(25.0, vec![3.0, 4.0])],
        )
        .unwrap();
        let p = grid.interpolate(0.25, -20.0);
        assert!((p.ocv - 3.25).abs() < 1e-12);
    }

    #[test]
    fn bilinear_mixes_both_axes() {
        let grid = EcmGrid::new(
            Mode::Charge,
            vec![0.0, 1.0],
            vec![slice(45.0, vec![3.2, 4.2]), slice(5.0, vec![3.0, 4.0])],
        )
        .unwrap();
        assert_eq!(grid.temperature_axis(), &[5.0, 45.0]);
        // Midpoint of all four corners.
        let p = grid.interpolate(0.5, 25.0);
        assert!((p.ocv - 3.6).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_monotonic_soc() {
        let err = EcmGrid::new(
            Mode::Charge,
            vec![0.0, 0.5, 0.5],
            vec![slice(25.0, vec![3.0, 3.5, 4.0])],
        )
        .unwrap_err();
        assert!(matches!(err, EcmError::SocNotIncreasing { .. }));
    }

    #[test]
    fn rejects_negative_resistance() {
        let mut s = slice(25.0, vec![3.0, 4.0]);
        s.r1[1] = -0.1;
        let err = EcmGrid::new(Mode::Discharge, vec![0.0, 1.0], vec![s]).unwrap_err();
        assert!(matches!(err, EcmError::Negative { what: "r1", .. }));
    }

    #[test]
    fn rejects_duplicate_temperature() {
        let err = EcmGrid::new(
            Mode::Discharge,
            vec![0.0, 1.0],
            vec![slice(25.0, vec![3.0, 4.0]), slice(25.0, vec![3.0, 4.0])],
        )
        .unwrap_err();
        assert!(matches!(err, EcmError::DuplicateTemperature { .. }));
    }
}
