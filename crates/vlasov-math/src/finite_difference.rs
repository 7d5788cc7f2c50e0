//! Periodic central finite-difference operators.
//!
//! Dense matrices are built for the pseudo-inverse and for tests; the
//! RHS hot path uses the matrix-free `apply_*` variants with the same
//! stencils.

use ndarray::Array2;
use vlasov_types::error::{VlasovError, VlasovResult};

const DDX_ORDER2: [(isize, f64); 2] = [(-1, -0.5), (1, 0.5)];
const DDX_ORDER4: [(isize, f64); 4] = [
    (-2, 1.0 / 12.0),
    (-1, -2.0 / 3.0),
    (1, 2.0 / 3.0),
    (2, -1.0 / 12.0),
];
const D2X_ORDER2: [(isize, f64); 3] = [(-1, 1.0), (0, -2.0), (1, 1.0)];
const D2X_ORDER4: [(isize, f64); 5] = [
    (-2, -1.0 / 12.0),
    (-1, 4.0 / 3.0),
    (0, -5.0 / 2.0),
    (1, 4.0 / 3.0),
    (2, -1.0 / 12.0),
];

/// First-derivative stencil `(offset, weight)`; weights are per unit `dx`.
pub fn derivative_stencil(order: usize) -> VlasovResult<&'static [(isize, f64)]> {
    match order {
        2 => Ok(&DDX_ORDER2),
        4 => Ok(&DDX_ORDER4),
        _ => Err(VlasovError::ConfigError(format!(
            "unsupported finite-difference order {order} (expected 2 or 4)"
        ))),
    }
}

/// Second-derivative stencil `(offset, weight)`; weights are per unit `dx²`.
pub fn laplacian_stencil(order: usize) -> VlasovResult<&'static [(isize, f64)]> {
    match order {
        2 => Ok(&D2X_ORDER2),
        4 => Ok(&D2X_ORDER4),
        _ => Err(VlasovError::ConfigError(format!(
            "unsupported finite-difference order {order} (expected 2 or 4)"
        ))),
    }
}

#[inline]
fn wrap(j: usize, offset: isize, n: usize) -> usize {
    (j as isize + offset).rem_euclid(n as isize) as usize
}

fn dense_periodic(n: usize, stencil: &[(isize, f64)], scale: f64) -> Array2<f64> {
    let mut a = Array2::zeros((n, n));
    for j in 0..n {
        for &(offset, w) in stencil {
            // += so that coinciding wrapped offsets on tiny grids accumulate
            a[[j, wrap(j, offset, n)]] += w * scale;
        }
    }
    a
}

/// Dense `n x n` periodic central first-derivative matrix.
pub fn ddx_central(n: usize, dx: f64, order: usize) -> VlasovResult<Array2<f64>> {
    let stencil = derivative_stencil(order)?;
    Ok(dense_periodic(n, stencil, 1.0 / dx))
}

/// Dense `n x n` periodic second-derivative matrix.
pub fn laplacian_periodic(n: usize, dx: f64, order: usize) -> VlasovResult<Array2<f64>> {
    let stencil = laplacian_stencil(order)?;
    Ok(dense_periodic(n, stencil, 1.0 / (dx * dx)))
}

/// `out = scale * S f` for a periodic stencil `S`.
pub fn apply_stencil(f: &[f64], stencil: &[(isize, f64)], scale: f64, out: &mut [f64]) {
    let n = f.len();
    assert_eq!(out.len(), n, "stencil output length mismatch");
    for (j, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for &(offset, w) in stencil {
            acc += w * f[wrap(j, offset, n)];
        }
        *o = acc * scale;
    }
}

/// Matrix-free `out = D f` with the periodic central derivative.
pub fn apply_ddx(f: &[f64], dx: f64, order: usize, out: &mut [f64]) -> VlasovResult<()> {
    PeriodicDerivative::new(dx, order)?.apply(f, out);
    Ok(())
}

/// Periodic central derivative with the order already resolved, so the
/// hot path applies it without re-validating.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicDerivative {
    stencil: &'static [(isize, f64)],
    inv_dx: f64,
    order: usize,
}

impl PeriodicDerivative {
    pub fn new(dx: f64, order: usize) -> VlasovResult<Self> {
        if !(dx.is_finite() && dx > 0.0) {
            return Err(VlasovError::ConfigError(format!(
                "grid spacing must be finite and > 0, got {dx}"
            )));
        }
        Ok(PeriodicDerivative {
            stencil: derivative_stencil(order)?,
            inv_dx: 1.0 / dx,
            order,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// `out = D f`.
    #[inline]
    pub fn apply(&self, f: &[f64], out: &mut [f64]) {
        apply_stencil(f, self.stencil, self.inv_dx, out);
    }

    /// Dense matrix of this operator on `n` points.
    pub fn matrix(&self, n: usize) -> Array2<f64> {
        dense_periodic(n, self.stencil, self.inv_dx)
    }
}

/// Matrix-free `out = L f` with the periodic Laplacian.
pub fn apply_laplacian(f: &[f64], dx: f64, order: usize, out: &mut [f64]) -> VlasovResult<()> {
    apply_stencil(f, laplacian_stencil(order)?, 1.0 / (dx * dx), out);
    Ok(())
}
