//! pf-pack: cells, parallel groups and the pack topology.
//!
//! Static cell parameters and the series/parallel layout are immutable
//! after [`PackBuilder::build`]. Per-cell dynamic state lives in
//! [`CellState`] and is owned by whoever drives the simulation.

pub mod builder;
pub mod cell;
pub mod error;
pub mod limits;
pub mod topology;

pub use builder::{CellSpec, PackBuilder};
pub use cell::{CellParams, CellState, EntropicCurve, InitialState, ThermalParams};
pub use error::{PackError, PackResult};
pub use limits::HardLimits;
pub use topology::{PackTopology, ParallelGroup};
