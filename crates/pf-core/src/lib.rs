//! pf-core: shared foundation for packflow.
//!
//! Contains:
//! - units (uom SI types + boundary conversions)
//! - numeric (Real + tolerances + float helpers)
//! - ids (typed compact IDs for cells and parallel groups)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{PfError, PfResult};
pub use ids::{CellId, GroupId};
pub use numeric::*;
pub use units::*;
