//! Hard voltage limits.

use serde::{Deserialize, Serialize};

use crate::error::{PackError, PackResult};

/// Voltage window outside which a run terminates unconditionally.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardLimits {
    pub cell_lower_v: f64,
    pub cell_upper_v: f64,
    pub pack_lower_v: Option<f64>,
    pub pack_upper_v: Option<f64>,
}

impl Default for HardLimits {
    fn default() -> Self {
        Self {
            cell_lower_v: 2.5,
            cell_upper_v: 4.2,
            pack_lower_v: None,
            pack_upper_v: None,
        }
    }
}

impl HardLimits {
    pub fn validate(&self) -> PackResult<()> {
        if !(self.cell_lower_v.is_finite() && self.cell_upper_v.is_finite())
            || self.cell_lower_v >= self.cell_upper_v
        {
            return Err(PackError::InvalidLimits {
                what: format!(
                    "cell window [{}, {}] is empty",
                    self.cell_lower_v, self.cell_upper_v
                ),
            });
        }
        if let (Some(lo), Some(hi)) = (self.pack_lower_v, self.pack_upper_v)
            && lo >= hi
        {
            return Err(PackError::InvalidLimits {
                what: format!("pack window [{lo}, {hi}] is empty"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_windows_rejected() {
        let mut limits = HardLimits::default();
        assert!(limits.validate().is_ok());
        limits.pack_lower_v = Some(40.0);
        limits.pack_upper_v = Some(30.0);
        assert!(limits.validate().is_err());
        let limits = HardLimits {
            cell_lower_v: 4.2,
            cell_upper_v: 2.5,
            ..HardLimits::default()
        };
        assert!(limits.validate().is_err());
    }
}
