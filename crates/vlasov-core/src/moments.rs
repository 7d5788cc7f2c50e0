//! Discrete velocity moments of the Hermite coefficients.
//!
//! For a species with basis `(alpha, u)` and `v = u + alpha ξ`:
//!
//! ```text
//! mass     = dx alpha Σ_n I0(n) Σ_j C_n,j
//! momentum = m dx alpha Σ_n (alpha I1(n) + u I0(n)) Σ_j C_n,j
//! energy   = m/2 dx alpha Σ_n (alpha² I2(n) + 2 alpha u I1(n) + u² I0(n)) Σ_j C_n,j
//! ```

use ndarray::ArrayView2;
use vlasov_math::hermite::HermiteWeights;
use vlasov_types::config::SpeciesParams;
use vlasov_types::state::CorrectionScalars;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeciesMoments {
    pub mass: f64,
    pub momentum: f64,
    pub kinetic_energy: f64,
}

/// Moments of one species grid `(Nv, Nx-1)`.
pub fn species_moments(
    grid: ArrayView2<'_, f64>,
    params: &SpeciesParams,
    dx: f64,
    weights: &HermiteWeights,
) -> SpeciesMoments {
    assert!(weights.i0.len() >= grid.nrows(), "Hermite weight table too short");
    let (a, u) = (params.alpha, params.u);
    let mut out = SpeciesMoments::default();
    for (n, row) in grid.rows().into_iter().enumerate() {
        let total = row.sum();
        let (i0, i1, i2) = (weights.i0[n], weights.i1[n], weights.i2[n]);
        out.mass += i0 * total;
        out.momentum += (a * i1 + u * i0) * total;
        out.kinetic_energy += (a * a * i2 + 2.0 * a * u * i1 + u * u * i0) * total;
    }
    let scale = dx * a;
    out.mass *= scale;
    out.momentum *= params.mass * scale;
    out.kinetic_energy *= 0.5 * params.mass * scale;
    out
}

/// `dx/2 Σ E²`.
pub fn electric_energy(e: &[f64], dx: f64) -> f64 {
    0.5 * dx * e.iter().map(|v| v * v).sum::<f64>()
}

/// Snapshot of all conserved quantities at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentSummary {
    pub species: [SpeciesMoments; 3],
    pub electric_energy: f64,
    pub corrections: CorrectionScalars,
}

impl MomentSummary {
    pub fn total_mass(&self) -> f64 {
        self.species.iter().map(|s| s.mass).sum()
    }

    pub fn total_momentum(&self) -> f64 {
        self.species.iter().map(|s| s.momentum).sum()
    }

    pub fn total_energy(&self) -> f64 {
        self.species.iter().map(|s| s.kinetic_energy).sum::<f64>() + self.electric_energy
    }

    /// Mass with the truncation leak removed; constant along exact trajectories.
    pub fn corrected_mass(&self) -> f64 {
        self.total_mass() - self.corrections.mass_even
    }
}
