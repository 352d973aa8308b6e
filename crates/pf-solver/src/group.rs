//! Parallel-group circuit solve.
//!
//! For N cells sharing one node the unknowns are the N branch currents and
//! the group voltage:
//!
//! ```text
//! R_eff_i * I_i + V_group = K_i        i = 0..N
//! sum(I_i)                = I_target
//! ```
//!
//! with `R_eff = R0 + 2 R_p + R1 (1 - e1) + R2 (1 - e2)` and
//! `K = OCV - (V_rc1 e1 + V_rc2 e2)`, `e = exp(-dt / tau)`.

use nalgebra::{DMatrix, DVector};
use pf_core::GroupId;
use pf_ecm::EcmParams;

use crate::error::{SolverError, SolverResult};
use crate::rc::{decay, time_constant};

/// Relative residual above which a solution is rejected.
const RESIDUAL_TOL: f64 = 1e-8;

/// One cell's contribution to the group system.
#[derive(Clone, Copy, Debug)]
pub struct CellBranch {
    pub params: EcmParams,
    pub v_rc1_prev: f64,
    pub v_rc2_prev: f64,
}

impl CellBranch {
    fn coefficients(&self, r_interconnect: f64, dt: f64) -> (f64, f64) {
        let p = &self.params;
        let e1 = decay(dt, time_constant(p.r1, p.c1));
        let e2 = decay(dt, time_constant(p.r2, p.c2));
        let r_eff = p.r0 + 2.0 * r_interconnect + p.r1 * (1.0 - e1) + p.r2 * (1.0 - e2);
        let k = p.ocv - (self.v_rc1_prev * e1 + self.v_rc2_prev * e2);
        (r_eff, k)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupSolution {
    /// Branch currents in member order, positive discharging.
    pub currents: Vec<f64>,
    pub v_group: f64,
}

/// Solve one group with a dense LU factorization.
pub fn solve_group(
    group: GroupId,
    branches: &[CellBranch],
    r_interconnect: f64,
    i_target: f64,
    dt: f64,
) -> SolverResult<GroupSolution> {
    let n = branches.len();
    if n == 0 {
        return Err(SolverError::InvalidInput {
            what: format!("{group} has no cells"),
        });
    }

    let mut a = DMatrix::<f64>::zeros(n + 1, n + 1);
    let mut b = DVector::<f64>::zeros(n + 1);
    for (i, branch) in branches.iter().enumerate() {
        let (r_eff, k) = branch.coefficients(r_interconnect, dt);
        a[(i, i)] = r_eff;
        a[(i, n)] = 1.0;
        a[(n, i)] = 1.0;
        b[i] = k;
    }
    b[n] = i_target;

    let x = a
        .clone()
        .lu()
        .solve(&b)
        .ok_or(SolverError::Singular { group })?;
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::Singular { group });
    }

    let residual = (&a * &x - &b).amax();
    if residual > RESIDUAL_TOL * (1.0 + b.amax()) {
        return Err(SolverError::IllConditioned { group, residual });
    }

    Ok(GroupSolution {
        currents: x.rows(0, n).iter().copied().collect(),
        v_group: x[n],
    })
}
