//! Equivalent-circuit parameter tables for battery cells.
//!
//! A table maps (SOC, temperature) to OCV, R0, R1, R2, C1 and C2 with
//! separate grids for charge and discharge. Lookups interpolate bilinearly
//! and clamp to the grid edges.

pub mod error;
pub mod grid;
pub mod load;
pub mod table;

pub use error::{EcmError, EcmResult};
pub use grid::{EcmGrid, TemperatureSlice};
pub use load::{load_json, parse_json_str};
pub use table::{EcmParams, EcmTable, Mode, OCV_PLAUSIBLE_RANGE};
