//! loglik_optimizer::builders — L-BFGS solver construction for MAP estimates.
//!
//! Purpose
//! -------
//! Build L-BFGS solvers with the line search selected in [`MapOptions`] and
//! the optional gradient/cost tolerances applied. Initial parameters and
//! `max_iters` are runtime concerns handled by [`super::run::run_lbfgs`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Memory is `opts.lbfgs_mem` or [`DEFAULT_LBFGS_MEM`].
//! - Tolerances rejected by Argmin surface as [`OptError`](crate::optimization::errors::OptError)
//!   through `From<argmin::core::Error>`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MapOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// L-BFGS with Hager–Zhang line search.
pub fn build_optimizer_hager_zhang(opts: &MapOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More–Thuente line search.
pub fn build_optimizer_more_thuente(opts: &MapOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply the present tolerances; absent ones keep Argmin's defaults.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MapOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Tolerances};

    #[test]
    // Purpose
    // -------
    // Both builders accept default and explicit memory with valid tolerances.
    //
    // Given
    // -----
    // - Tolerances (1e-6, 1e-8, 50) and memory `None` / `Some(11)`.
    //
    // Expect
    // ------
    // - Every builder call returns `Ok(_)`.
    fn builders_accept_default_and_explicit_memory() {
        let tols = Tolerances::new(Some(1e-6), Some(1e-8), Some(50)).unwrap();
        for mem in [None, Some(11)] {
            let hz = MapOptions::new(tols, LineSearcher::HagerZhang, false, mem).unwrap();
            assert!(build_optimizer_hager_zhang(&hz).is_ok());
            let mt = MapOptions::new(tols, LineSearcher::MoreThuente, false, mem).unwrap();
            assert!(build_optimizer_more_thuente(&mt).is_ok());
        }
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` leaves the solver usable when no tolerance is set.
    //
    // Given
    // -----
    // - Tolerances with only `max_iter`.
    //
    // Expect
    // ------
    // - `Ok(_)`.
    fn configure_lbfgs_respects_absent_tolerances() {
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).unwrap();
        let opts = MapOptions::new(tols, LineSearcher::MoreThuente, false, None).unwrap();
        assert!(configure_lbfgs(raw, &opts).is_ok());
    }
}
