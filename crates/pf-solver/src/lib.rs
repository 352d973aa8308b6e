//! pf-solver: per-sub-step electrical solve for a battery pack.
//!
//! Provides:
//! - two-RC branch zero-order-hold update ([`rc`])
//! - dense (N+1)x(N+1) parallel-group solve ([`group`])
//! - pack evaluation and state commit ([`pack`])
//! - coulomb counting and heat generation ([`coulomb`], [`heat`])
//! - conversion of voltage/power/C-rate targets to pack current ([`target`])

pub mod coulomb;
pub mod error;
pub mod group;
pub mod heat;
pub mod pack;
pub mod rc;
pub mod root;
pub mod target;

pub use error::{SolverError, SolverResult};
pub use group::{CellBranch, GroupSolution, solve_group};
pub use pack::{CellSolution, PackSolution, commit, evaluate, rest_module_voltage};
pub use root::{BisectConfig, BisectOutcome, bisect};
pub use target::{Fallback, Resolved, Target, resolve_current};
