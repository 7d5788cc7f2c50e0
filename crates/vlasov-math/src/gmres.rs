// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — GMRES
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restarted GMRES(m) Krylov subspace solver.
//!
//! Each cycle grows an Arnoldi basis (modified Gram-Schmidt) up to `m`
//! vectors and keeps the Hessenberg least-squares problem triangular with
//! Givens rotations, so the residual estimate is free at every step. A
//! cycle that ends unconverged restarts from its iterate.
//!
//! The operator is abstract ([`LinearOperator`]): a dense matrix, a
//! matrix-free stencil, or a finite-difference Jacobian-vector product
//! inside Newton-Krylov.  An optional left preconditioner solves
//! `M⁻¹ A x = M⁻¹ b` instead of `A x = b`.
//!
//! Singular but consistent systems (the periodic Laplacian with a
//! zero-mean right-hand side) are handled: the Krylov space never
//! leaves the range of the operator.

use ndarray::Array2;
use vlasov_types::error::{VlasovError, VlasovResult};

// ── Operators ────────────────────────────────────────────────────────

/// A square linear map `x ↦ A x` on vectors of length [`dim`](Self::dim).
pub trait LinearOperator {
    fn dim(&self) -> usize;

    /// `out = A x`. Fallible so that matrix-free operators may propagate
    /// errors from the function they linearize.
    fn apply(&self, x: &[f64], out: &mut [f64]) -> VlasovResult<()>;
}

impl LinearOperator for Array2<f64> {
    fn dim(&self) -> usize {
        self.nrows()
    }

    fn apply(&self, x: &[f64], out: &mut [f64]) -> VlasovResult<()> {
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.row(i).iter().zip(x.iter()).map(|(a, b)| a * b).sum();
        }
        Ok(())
    }
}

/// Approximate inverse `z = M⁻¹ r`.
pub trait Preconditioner {
    fn precondition(&self, r: &[f64], z: &mut [f64]);
}

/// `M = I`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn precondition(&self, r: &[f64], z: &mut [f64]) {
        z.copy_from_slice(r);
    }
}

/// Diagonal (Jacobi) preconditioner.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    /// Build from the diagonal of `a`. Zero diagonal entries fall back to 1.
    pub fn from_matrix(a: &Array2<f64>) -> Self {
        let inv_diag = a
            .diag()
            .iter()
            .map(|&d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 })
            .collect();
        JacobiPreconditioner { inv_diag }
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn precondition(&self, r: &[f64], z: &mut [f64]) {
        for ((zi, &ri), &di) in z.iter_mut().zip(r.iter()).zip(self.inv_diag.iter()) {
            *zi = ri * di;
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────

/// Configuration for the GMRES(m) solver.
#[derive(Debug, Clone)]
pub struct GmresConfig {
    /// Krylov subspace dimension before restart (default: 30).
    pub restart: usize,
    /// Maximum number of outer (restart) iterations (default: 100).
    pub max_iter: usize,
    /// Convergence tolerance on the relative residual norm (default: 1e-8).
    pub tol: f64,
    /// Absolute residual floor (default: 0).
    pub atol: f64,
}

impl Default for GmresConfig {
    fn default() -> Self {
        GmresConfig {
            restart: 30,
            max_iter: 100,
            tol: 1e-8,
            atol: 0.0,
        }
    }
}

/// Result of a GMRES solve.
#[derive(Debug, Clone)]
pub struct GmresResult {
    /// Total number of matrix-vector products (inner iterations summed
    /// over all restarts).
    pub iterations: usize,
    /// Final L2 residual norm of the unpreconditioned system.
    pub residual: f64,
    /// Whether convergence was achieved.
    pub converged: bool,
}

// ── Vector helpers ───────────────────────────────────────────────────

/// `||v||₂`.
#[inline]
pub fn vec_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[inline]
fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// `y += alpha x`.
#[inline]
fn vec_axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, &xi) in y.iter_mut().zip(x.iter()) {
        *yi += alpha * xi;
    }
}

/// `out = b - A x`.
fn residual<A: LinearOperator + ?Sized>(
    op: &A,
    b: &[f64],
    x: &[f64],
    scratch: &mut [f64],
    out: &mut [f64],
) -> VlasovResult<()> {
    op.apply(x, scratch)?;
    for ((oi, &bi), &ai) in out.iter_mut().zip(b.iter()).zip(scratch.iter()) {
        *oi = bi - ai;
    }
    Ok(())
}

// ── Givens rotations ─────────────────────────────────────────────────

/// Plane rotation `(c, s)` mapping `(a, b)` to `(r, 0)`.
#[derive(Clone, Copy)]
struct GivensRotation {
    c: f64,
    s: f64,
}

impl GivensRotation {
    /// Rotation annihilating `b`.
    fn compute(a: f64, b: f64) -> Self {
        if b.abs() < 1e-300 {
            GivensRotation { c: 1.0, s: 0.0 }
        } else if b.abs() > a.abs() {
            let tau = -a / b;
            let s = 1.0 / (1.0 + tau * tau).sqrt();
            let c = s * tau;
            GivensRotation { c, s }
        } else {
            let tau = -b / a;
            let c = 1.0 / (1.0 + tau * tau).sqrt();
            let s = c * tau;
            GivensRotation { c, s }
        }
    }

    #[inline]
    fn apply(&self, a: &mut f64, b: &mut f64) {
        let ta = *a;
        let tb = *b;
        *a = self.c * ta - self.s * tb;
        *b = self.s * ta + self.c * tb;
    }
}

// ── Solver ───────────────────────────────────────────────────────────

/// Solve `A x = b` with unpreconditioned restarted GMRES(m).
///
/// `x` is the initial guess on entry and the solution on exit.
pub fn gmres_solve<A: LinearOperator + ?Sized>(
    op: &A,
    b: &[f64],
    x: &mut [f64],
    config: &GmresConfig,
) -> VlasovResult<GmresResult> {
    gmres_solve_preconditioned(op, &IdentityPreconditioner, b, x, config)
}

/// Solve `A x = b` using restarted GMRES(m) with a left preconditioner.
///
/// The Krylov space is built on `M⁻¹ A` starting from `M⁻¹ (b - A x)`.
///
/// Converged means `||b - A x||₂ <= max(tol · ||b - A x₀||₂, atol)`.
pub fn gmres_solve_preconditioned<A, P>(
    op: &A,
    precond: &P,
    b: &[f64],
    x: &mut [f64],
    config: &GmresConfig,
) -> VlasovResult<GmresResult>
where
    A: LinearOperator + ?Sized,
    P: Preconditioner + ?Sized,
{
    let n = op.dim();
    if b.len() != n || x.len() != n {
        return Err(VlasovError::LinAlg(format!(
            "GMRES dimension mismatch: operator {n}, rhs {}, guess {}",
            b.len(),
            x.len()
        )));
    }
    if n == 0 {
        return Ok(GmresResult {
            iterations: 0,
            residual: 0.0,
            converged: true,
        });
    }

    let m = config.restart.clamp(1, n); // Krylov dimension cannot exceed n

    let mut av = vec![0.0; n];
    let mut r = vec![0.0; n];
    let mut z = vec![0.0; n];

    residual(op, b, x, &mut av, &mut r)?;
    let initial_res_norm = vec_norm(&r);
    if !initial_res_norm.is_finite() {
        return Err(VlasovError::LinAlg(
            "GMRES initial residual is not finite".into(),
        ));
    }
    let abs_tol = (config.tol * initial_res_norm).max(config.atol);

    if initial_res_norm <= abs_tol || initial_res_norm < 1e-300 {
        return Ok(GmresResult {
            iterations: 0,
            residual: initial_res_norm,
            converged: true,
        });
    }

    let mut total_iters: usize = 0;

    // the Arnoldi estimate tracks the preconditioned residual; rescale
    // the target so both norms are compared on the same footing
    precond.precondition(&r, &mut z);
    let precond_ratio = {
        let zn = vec_norm(&z);
        if zn > 1e-300 {
            zn / initial_res_norm
        } else {
            1.0
        }
    };
    let inner_tol = abs_tol * precond_ratio;

    for _restart in 0..config.max_iter {
        residual(op, b, x, &mut av, &mut r)?;
        let true_norm = vec_norm(&r);
        if true_norm <= abs_tol {
            return Ok(GmresResult {
                iterations: total_iters,
                residual: true_norm,
                converged: true,
            });
        }

        precond.precondition(&r, &mut z);
        let beta = vec_norm(&z);
        if beta < 1e-300 {
            return Ok(GmresResult {
                iterations: total_iters,
                residual: true_norm,
                converged: true_norm <= abs_tol,
            });
        }

        let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        v_basis.push(z.iter().map(|v| v / beta).collect());

        // column-major Hessenberg: H[i][j] at h_store[j * (m+1) + i]
        let h_rows = m + 1;
        let mut h_store = vec![0.0; h_rows * m];

        let mut givens: Vec<GivensRotation> = Vec::with_capacity(m);

        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut inner_iters: usize = 0;

        for j in 0..m {
            inner_iters = j + 1;
            total_iters += 1;

            op.apply(&v_basis[j], &mut av)?;
            let mut w = vec![0.0; n];
            precond.precondition(&av, &mut w);

            for i in 0..=j {
                let h_ij = vec_dot(&w, &v_basis[i]);
                h_store[j * h_rows + i] = h_ij;
                vec_axpy(-h_ij, &v_basis[i], &mut w);
            }

            let h_jp1_j = vec_norm(&w);
            h_store[j * h_rows + (j + 1)] = h_jp1_j;

            if h_jp1_j > 1e-300 {
                v_basis.push(w.iter().map(|v| v / h_jp1_j).collect());
            } else {
                // invariant subspace found
                v_basis.push(vec![0.0; n]);
            }

            for (i, rot) in givens.iter().enumerate() {
                let mut ha = h_store[j * h_rows + i];
                let mut hb = h_store[j * h_rows + i + 1];
                rot.apply(&mut ha, &mut hb);
                h_store[j * h_rows + i] = ha;
                h_store[j * h_rows + i + 1] = hb;
            }

            let rot =
                GivensRotation::compute(h_store[j * h_rows + j], h_store[j * h_rows + (j + 1)]);
            {
                let mut ha = h_store[j * h_rows + j];
                let mut hb = h_store[j * h_rows + (j + 1)];
                rot.apply(&mut ha, &mut hb);
                h_store[j * h_rows + j] = ha;
                h_store[j * h_rows + (j + 1)] = hb;
            }
            {
                let mut ga = g[j];
                let mut gb = g[j + 1];
                rot.apply(&mut ga, &mut gb);
                g[j] = ga;
                g[j + 1] = gb;
            }
            givens.push(rot);

            if g[j + 1].abs() <= inner_tol || h_jp1_j < 1e-300 {
                break;
            }
        }

        // back substitution for H y = g
        let k = inner_iters;
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = g[i];
            for jj in (i + 1)..k {
                sum -= h_store[jj * h_rows + i] * y[jj];
            }
            let diag = h_store[i * h_rows + i];
            y[i] = if diag.abs() > 1e-300 { sum / diag } else { 0.0 };
        }

        // x += V y
        for i in 0..k {
            vec_axpy(y[i], &v_basis[i], x);
        }
    }

    // out of restarts
    residual(op, b, x, &mut av, &mut r)?;
    let final_residual = vec_norm(&r);

    Ok(GmresResult {
        iterations: total_iters,
        residual: final_residual,
        converged: final_residual <= abs_tol,
    })
}
