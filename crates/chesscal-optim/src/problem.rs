use chesscal_core::Real;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Generic dense nonlinear least-squares problem.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows.
    fn num_residuals(&self) -> usize;

    /// Residual vector for the current parameters.
    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;

    /// Jacobian for the current parameters.
    ///
    /// The default implementation uses forward finite differences; problems
    /// with analytic derivatives can override it.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        let m = self.num_residuals();
        let n = x.len();
        let mut jac = DMatrix::zeros(m, n);

        let base = self.residuals(x);
        let eps = 1e-6;

        for k in 0..n {
            let mut x_pert = x.clone();
            x_pert[k] += eps;
            let r_plus = self.residuals(&x_pert);
            let diff = (r_plus - &base) / eps;
            jac.set_column(k, &diff);
        }
        jac
    }
}

/// Solver termination settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Iteration budget; the LM backend follows the MINPACK patience
    /// convention `max_iters * (n + 1)` function evaluations.
    pub max_iters: usize,
    /// Relative tolerance on cost reduction.
    pub ftol: Real,
    /// Gradient orthogonality tolerance.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            ftol: 1e-12,
            gtol: 1e-12,
            xtol: 1e-12,
        }
    }
}

/// Outcome summary reported next to the refined parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub iterations: usize,
    pub final_cost: Real,
    pub converged: bool,
}

/// A backend able to minimize an [`NllsProblem`].
pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}
