// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Periodic Poisson Field Solve
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Electrostatic field from the Hermite coefficients of all species.
//!
//! Gauss's law on the periodic grid, `dE/dx = rho`, with the charge
//! density taken from mode 0 only:
//!
//! ```text
//! rho_j = sqrt(2 sqrt(pi)) * sum_s q_s alpha_s C_{0,s,j}
//! ```
//!
//! Two methods:
//! - `Gmres`: solve `D E = rho - <rho>` directly with the periodic
//!   central difference `D`. For even `n` the alternating mode
//!   `(-1)^j` lies in the kernel of `D` next to the constants, so it is
//!   projected out of the source as well.
//! - `Fft`: `E_k = rho_k / (i k)`, `E_0 = 0`.

use log::trace;
use ndarray::{Array1, Array2, ArrayView2};
use num_complex::Complex64;
use vlasov_math::fft::{fft_1d, ifft_1d, wavenumbers};
use vlasov_math::finite_difference::ddx_central;
use vlasov_math::gmres::{gmres_solve, vec_norm, GmresConfig};
use vlasov_types::config::{FieldSolverConfig, FieldSolverKind, SpeciesParams};
use vlasov_types::constants::MODE0_DENSITY;
use vlasov_types::error::{VlasovError, VlasovResult};

/// Charge density on the periodic grid from the mode-0 row of each species.
pub fn charge_density(grids: &[ArrayView2<'_, f64>], params: &[SpeciesParams]) -> Array1<f64> {
    assert_eq!(grids.len(), params.len(), "one parameter set per species grid");
    let n = grids.first().map_or(0, |g| g.ncols());
    let mut rho = Array1::zeros(n);
    for (grid, p) in grids.iter().zip(params) {
        assert_eq!(grid.ncols(), n, "species grids disagree on spatial size");
        if grid.nrows() == 0 {
            continue;
        }
        rho.scaled_add(MODE0_DENSITY * p.charge * p.alpha, &grid.row(0));
    }
    rho
}

/// Field solver with grid operators built once per run.
#[derive(Debug, Clone)]
pub struct FieldSolver {
    method: FieldSolverKind,
    n: usize,
    dx: f64,
    /// Dense `D`, skew-symmetric and singular.
    ddx: Array2<f64>,
    gmres: GmresConfig,
}

impl FieldSolver {
    pub fn new(n: usize, dx: f64, config: &FieldSolverConfig) -> VlasovResult<Self> {
        if n < 3 {
            return Err(VlasovError::ConfigError(format!(
                "field solve needs at least 3 periodic points, got {n}"
            )));
        }
        let ddx = ddx_central(n, dx, config.fd_order)?;
        Ok(FieldSolver {
            method: config.method,
            n,
            dx,
            ddx,
            gmres: GmresConfig {
                restart: n,
                max_iter: config.max_iter.max(1),
                tol: config.tol,
                atol: 0.0,
            },
        })
    }

    /// Field for a given charge density of length `n`.
    pub fn solve(&self, rho: &[f64]) -> VlasovResult<Array1<f64>> {
        assert_eq!(rho.len(), self.n, "charge density length mismatch");
        match self.method {
            FieldSolverKind::Gmres => self.solve_gmres(rho),
            FieldSolverKind::Fft => Ok(self.solve_fft(rho)),
        }
    }

    /// Field for the given species grids, each `(Nv, n)`.
    pub fn solve_species(
        &self,
        grids: &[ArrayView2<'_, f64>],
        params: &[SpeciesParams],
    ) -> VlasovResult<Array1<f64>> {
        let rho = charge_density(grids, params).to_vec();
        self.solve(&rho)
    }

    /// Part of `rho` in the range of `D`: the mean is removed and, for
    /// even `n`, the alternating mode too.
    fn gauss_source(&self, rho: &[f64]) -> Vec<f64> {
        let n = self.n as f64;
        let mean = rho.iter().sum::<f64>() / n;
        let alternating = if self.n % 2 == 0 {
            rho.iter().enumerate().map(|(j, r)| sign(j) * r).sum::<f64>() / n
        } else {
            0.0
        };
        rho.iter()
            .enumerate()
            .map(|(j, r)| r - mean - alternating * sign(j))
            .collect()
    }

    fn solve_gmres(&self, rho: &[f64]) -> VlasovResult<Array1<f64>> {
        let source = self.gauss_source(rho);

        // D has a zero diagonal, so GMRES runs unpreconditioned. Starting
        // from zero keeps every iterate in range(D), hence zero-mean.
        let mut e = vec![0.0; self.n];
        let cfg = GmresConfig {
            // rounding floor so a neutral plasma never reports divergence
            atol: 1e-14 * (1.0 + vec_norm(rho)),
            ..self.gmres.clone()
        };
        let result = gmres_solve(&self.ddx, &source, &mut e, &cfg)?;
        trace!(
            "field gmres: {} iters, residual {:.3e}",
            result.iterations,
            result.residual
        );
        if !result.converged {
            return Err(VlasovError::SolverDiverged {
                iteration: result.iterations,
                message: format!(
                    "field GMRES stalled at residual {:.3e} (tol {:.1e})",
                    result.residual, self.gmres.tol
                ),
            });
        }

        let mean = e.iter().sum::<f64>() / self.n as f64;
        Ok(Array1::from_iter(e.into_iter().map(|v| v - mean)))
    }

    fn solve_fft(&self, rho: &[f64]) -> Array1<f64> {
        let n = self.n;
        let k = wavenumbers(n, n as f64 * self.dx);
        let mut spectrum = fft_1d(rho);
        spectrum[0] = Complex64::new(0.0, 0.0);
        for (s, &kk) in spectrum.iter_mut().zip(k.iter()).skip(1) {
            *s /= Complex64::new(0.0, kk);
        }
        if n % 2 == 0 {
            // the Nyquist mode has no real antiderivative on the grid
            spectrum[n / 2] = Complex64::new(0.0, 0.0);
        }
        Array1::from(ifft_1d(&spectrum))
    }
}

fn sign(j: usize) -> f64 {
    if j % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}
