//! Jacobi SVD and the Moore-Penrose pseudo-inverse of the singular
//! periodic derivative operator.

use ndarray::{Array1, Array2};
use vlasov_types::error::{VlasovError, VlasovResult};

const MAX_SWEEPS: usize = 100;

pub type SvdFactors = (Array2<f64>, Array1<f64>, Array2<f64>);

/// Dense SVD by Jacobi rotations on `AᵀA`.
///
/// Returns (U, sigma, Vt) where A ≈ U * diag(sigma) * Vt, singular values
/// descending. Matches `numpy.linalg.svd(A, full_matrices=False)` up to
/// column signs. Columns of U for numerically zero singular values are
/// left at zero.
///
/// Fails with [`VlasovError::LinAlg`] if the off-diagonal part of `AᵀA`
/// has not been driven to rounding level within the sweep budget.
pub fn svd_small(a: &Array2<f64>) -> VlasovResult<SvdFactors> {
    svd_with_sweeps(a, MAX_SWEEPS)
}

fn svd_with_sweeps(a: &Array2<f64>, max_sweeps: usize) -> VlasovResult<SvdFactors> {
    let (m, n) = a.dim();
    let k = m.min(n);

    let mut ata = a.t().dot(a);
    let scale: f64 = ata.iter().map(|v| v * v).sum::<f64>().sqrt();
    let tol = f64::EPSILON * scale.max(f64::MIN_POSITIVE);
    // rounding can park a few entries just above `tol`
    let accept = 1e-8 * scale.max(f64::MIN_POSITIVE);

    let mut v = Array2::eye(n);

    let mut off_diag = 0.0_f64;
    for sweep in 0..=max_sweeps {
        off_diag = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag = off_diag.max(ata[[i, j]].abs());
            }
        }
        if off_diag <= tol || sweep == max_sweeps {
            break;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if ata[[i, j]].abs() <= tol {
                    continue;
                }
                let tau = (ata[[j, j]] - ata[[i, i]]) / (2.0 * ata[[i, j]]);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let cos = 1.0 / (1.0 + t * t).sqrt();
                let sin = t * cos;

                let aii = ata[[i, i]];
                let ajj = ata[[j, j]];
                let aij = ata[[i, j]];
                ata[[i, i]] = cos * cos * aii - 2.0 * sin * cos * aij + sin * sin * ajj;
                ata[[j, j]] = sin * sin * aii + 2.0 * sin * cos * aij + cos * cos * ajj;
                ata[[i, j]] = 0.0;
                ata[[j, i]] = 0.0;

                for r in 0..n {
                    if r == i || r == j {
                        continue;
                    }
                    let ri = ata[[r, i]];
                    let rj = ata[[r, j]];
                    ata[[r, i]] = cos * ri - sin * rj;
                    ata[[i, r]] = ata[[r, i]];
                    ata[[r, j]] = sin * ri + cos * rj;
                    ata[[j, r]] = ata[[r, j]];
                }

                for r in 0..n {
                    let vi = v[[r, i]];
                    let vj = v[[r, j]];
                    v[[r, i]] = cos * vi - sin * vj;
                    v[[r, j]] = sin * vi + cos * vj;
                }
            }
        }
    }
    if off_diag > accept {
        return Err(VlasovError::LinAlg(format!(
            "Jacobi SVD did not converge in {max_sweeps} sweeps (off-diagonal {off_diag:.3e}, scale {scale:.3e})"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| ata[[j, j]].total_cmp(&ata[[i, i]]));

    let mut sigma = Array1::zeros(k);
    let mut vt = Array2::zeros((k, n));
    for (idx, &col) in order.iter().take(k).enumerate() {
        sigma[idx] = ata[[col, col]].max(0.0).sqrt();
        vt.row_mut(idx).assign(&v.column(col));
    }

    // U = A V diag(1/sigma)
    let sigma_floor = sigma.first().copied().unwrap_or(0.0) * 1e-14;
    let mut u = Array2::zeros((m, k));
    for idx in 0..k {
        if sigma[idx] > sigma_floor && sigma[idx] > 0.0 {
            let col = a.dot(&vt.row(idx)) / sigma[idx];
            u.column_mut(idx).assign(&col);
        }
    }

    Ok((u, sigma, vt))
}

/// Moore-Penrose pseudo-inverse.
///
/// Singular values at or below `rcond * sigma_max` are treated as zero,
/// the same convention as `numpy.linalg.pinv`. The result is the
/// minimum-norm least-squares inverse: `A A⁺ A = A` and `A⁺ A A⁺ = A⁺`.
pub fn pinv_svd(a: &Array2<f64>, rcond: f64) -> VlasovResult<Array2<f64>> {
    pinv_with_sweeps(a, rcond, MAX_SWEEPS)
}

fn pinv_with_sweeps(a: &Array2<f64>, rcond: f64, max_sweeps: usize) -> VlasovResult<Array2<f64>> {
    if a.iter().any(|v| !v.is_finite()) {
        return Err(VlasovError::LinAlg(
            "pseudo-inverse of a matrix with non-finite entries".into(),
        ));
    }
    let (u, sigma, vt) = svd_with_sweeps(a, max_sweeps)?;
    let (m, n) = a.dim();
    let cutoff = rcond * sigma.first().copied().unwrap_or(0.0);

    let mut result = Array2::zeros((n, m));
    for idx in 0..sigma.len() {
        if sigma[idx] > cutoff {
            let inv_s = 1.0 / sigma[idx];
            for i in 0..n {
                let vi = vt[[idx, i]] * inv_s;
                for j in 0..m {
                    result[[i, j]] += vi * u[[j, idx]];
                }
            }
        }
    }
    Ok(result)
}
