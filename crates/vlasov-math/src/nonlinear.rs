// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Nonlinear Solvers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Root finding for `F(z) = 0`.
//!
//! - [`newton_krylov_solve`]: Jacobian-free Newton-Krylov. Each Newton
//!   correction solves `J δ = -F` with GMRES, where `J v` is a forward
//!   finite difference of `F`. A backtracking line search guards the
//!   full step.
//! - [`picard_solve`]: fixed-point iteration `z ← z - F(z)`, useful when
//!   `I - ∂F/∂z` is a contraction (small implicit time steps).
//!
//! Both stop when `||F||∞ <= max(a_tol, r_tol · ||F(z₀)||∞)` and return
//! [`VlasovError::SolverDiverged`] after `max_iter` iterations without
//! meeting it.

use log::{debug, trace};
use vlasov_types::error::{VlasovError, VlasovResult};

use crate::gmres::{gmres_solve, vec_norm, GmresConfig, LinearOperator};

/// A square nonlinear system `F: R^n → R^n`.
pub trait NonlinearSystem {
    fn dim(&self) -> usize;

    /// `out = F(z)`.
    fn residual(&self, z: &[f64], out: &mut [f64]) -> VlasovResult<()>;
}

/// Newton-Krylov settings.
#[derive(Debug, Clone)]
pub struct NewtonKrylovConfig {
    /// Relative tolerance against the initial residual (default: 1e-8).
    pub r_tol: f64,
    /// Absolute residual tolerance (default: 1e-14).
    pub a_tol: f64,
    /// Maximum outer iterations (default: 100).
    pub max_iter: usize,
    /// Inner linear solve settings (default: relative tol 1e-6).
    pub inner: GmresConfig,
    /// Step halvings tried before accepting the shortest step (default: 10).
    pub max_backtracks: usize,
}

impl Default for NewtonKrylovConfig {
    fn default() -> Self {
        NewtonKrylovConfig {
            r_tol: 1e-8,
            a_tol: 1e-14,
            max_iter: 100,
            inner: GmresConfig {
                restart: 30,
                max_iter: 10,
                tol: 1e-6,
                atol: 0.0,
            },
            max_backtracks: 10,
        }
    }
}

/// Outcome of a converged nonlinear solve.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Outer iterations performed.
    pub iterations: usize,
    /// Final `||F||∞`.
    pub residual: f64,
    /// Evaluations of `F`, including those spent inside Jacobian-vector products.
    pub function_evals: usize,
}

#[inline]
fn max_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

/// Finite-difference Jacobian `J v ≈ (F(z + h v) - F(z)) / h`.
struct JacobianOperator<'a, S: NonlinearSystem + ?Sized> {
    system: &'a S,
    z: &'a [f64],
    fz: &'a [f64],
    z_norm: f64,
    evals: std::cell::Cell<usize>,
}

impl<S: NonlinearSystem + ?Sized> LinearOperator for JacobianOperator<'_, S> {
    fn dim(&self) -> usize {
        self.system.dim()
    }

    fn apply(&self, v: &[f64], out: &mut [f64]) -> VlasovResult<()> {
        let v_norm = vec_norm(v);
        if v_norm == 0.0 {
            out.fill(0.0);
            return Ok(());
        }
        let h = f64::EPSILON.sqrt() * (1.0 + self.z_norm) / v_norm;
        let shifted: Vec<f64> = self
            .z
            .iter()
            .zip(v.iter())
            .map(|(zi, vi)| zi + h * vi)
            .collect();
        self.system.residual(&shifted, out)?;
        self.evals.set(self.evals.get() + 1);
        for (o, &f0) in out.iter_mut().zip(self.fz.iter()) {
            *o = (*o - f0) / h;
        }
        Ok(())
    }
}

fn check_finite(values: &[f64], iteration: usize) -> VlasovResult<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(VlasovError::SolverDiverged {
            iteration,
            message: "residual became non-finite".into(),
        });
    }
    Ok(())
}

/// Solve `F(z) = 0` by Jacobian-free Newton-Krylov, starting from `z`.
///
/// On success `z` holds the root. On failure `z` holds the last iterate.
pub fn newton_krylov_solve<S: NonlinearSystem + ?Sized>(
    system: &S,
    z: &mut [f64],
    config: &NewtonKrylovConfig,
) -> VlasovResult<NewtonResult> {
    let n = system.dim();
    if z.len() != n {
        return Err(VlasovError::LinAlg(format!(
            "initial guess has length {}, system dimension is {n}",
            z.len()
        )));
    }

    let mut fz = vec![0.0; n];
    system.residual(z, &mut fz)?;
    let mut evals = 1;
    check_finite(&fz, 0)?;

    let f0 = max_norm(&fz);
    let target = config.a_tol.max(config.r_tol * f0);
    if f0 <= target {
        return Ok(NewtonResult {
            iterations: 0,
            residual: f0,
            function_evals: evals,
        });
    }

    let mut delta = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    let mut trial = vec![0.0; n];
    let mut f_trial = vec![0.0; n];

    for iter in 1..=config.max_iter {
        // Newton correction: J δ = -F
        for (r, &f) in rhs.iter_mut().zip(fz.iter()) {
            *r = -f;
        }
        delta.fill(0.0);
        let linear = {
            let jac = JacobianOperator {
                system,
                z: &*z,
                fz: &fz,
                z_norm: vec_norm(z),
                evals: std::cell::Cell::new(0),
            };
            let result = gmres_solve(&jac, &rhs, &mut delta, &config.inner)?;
            evals += jac.evals.get();
            result
        };
        trace!(
            "newton {iter}: gmres {} iters, linear residual {:.3e}",
            linear.iterations,
            linear.residual
        );

        // Backtracking on the L2 norm of F
        let f_l2 = vec_norm(&fz);
        let mut lambda = 1.0;
        for attempt in 0..=config.max_backtracks {
            for ((t, &zi), &di) in trial.iter_mut().zip(z.iter()).zip(delta.iter()) {
                *t = zi + lambda * di;
            }
            system.residual(&trial, &mut f_trial)?;
            evals += 1;
            let trial_l2 = vec_norm(&f_trial);
            if trial_l2.is_finite() && trial_l2 <= (1.0 - 1e-4 * lambda) * f_l2 {
                break;
            }
            if attempt < config.max_backtracks {
                lambda *= 0.5;
            }
        }

        z.copy_from_slice(&trial);
        fz.copy_from_slice(&f_trial);
        check_finite(&fz, iter)?;

        let norm = max_norm(&fz);
        debug!("newton {iter}: |F|inf = {norm:.3e} (target {target:.3e}, step {lambda})");
        if norm <= target {
            return Ok(NewtonResult {
                iterations: iter,
                residual: norm,
                function_evals: evals,
            });
        }
    }

    Err(VlasovError::SolverDiverged {
        iteration: config.max_iter,
        message: format!(
            "Newton-Krylov did not reach |F|inf <= {target:.3e}; last |F|inf = {:.3e}",
            max_norm(&fz)
        ),
    })
}

/// Solve `F(z) = 0` by the fixed-point iteration `z ← z - F(z)`.
pub fn picard_solve<S: NonlinearSystem + ?Sized>(
    system: &S,
    z: &mut [f64],
    r_tol: f64,
    a_tol: f64,
    max_iter: usize,
) -> VlasovResult<NewtonResult> {
    let n = system.dim();
    if z.len() != n {
        return Err(VlasovError::LinAlg(format!(
            "initial guess has length {}, system dimension is {n}",
            z.len()
        )));
    }

    let mut fz = vec![0.0; n];
    system.residual(z, &mut fz)?;
    check_finite(&fz, 0)?;
    let f0 = max_norm(&fz);
    let target = a_tol.max(r_tol * f0);
    let mut norm = f0;

    for iter in 0..=max_iter {
        if norm <= target {
            return Ok(NewtonResult {
                iterations: iter,
                residual: norm,
                function_evals: iter + 1,
            });
        }
        if iter == max_iter {
            break;
        }
        for (zi, &fi) in z.iter_mut().zip(fz.iter()) {
            *zi -= fi;
        }
        system.residual(z, &mut fz)?;
        check_finite(&fz, iter + 1)?;
        norm = max_norm(&fz);
        trace!("picard {}: |F|inf = {norm:.3e}", iter + 1);
    }

    Err(VlasovError::SolverDiverged {
        iteration: max_iter,
        message: format!(
            "fixed-point iteration did not reach |F|inf <= {target:.3e}; last |F|inf = {norm:.3e}"
        ),
    })
}
