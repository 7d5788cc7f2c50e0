// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Semi-discrete RHS
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Right-hand side of the packed bump-on-tail ODE system.
//!
//! One evaluation: unpack → field solve → per-species advection →
//! correction scalars → pack. The evaluation is a pure function of the
//! packed state; the grid operators (derivative, Laplacian, `D⁺`) are
//! built once in [`VlasovRhs::new`].

use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use vlasov_math::finite_difference::PeriodicDerivative;
use vlasov_math::hermite::HermiteWeights;
use vlasov_math::linalg::pinv_svd;
use vlasov_math::symplectic::OdeRhs;
use vlasov_types::config::{SimulationConfig, SpeciesParams};
use vlasov_types::error::VlasovResult;
use vlasov_types::state::{
    ion_grid, species_view, write_corrections, CorrectionScalars, StateLayout,
};

use crate::advection::rhs_species;
use crate::correction::CorrectionAssembler;
use crate::moments::{electric_energy, species_moments, MomentSummary};
use crate::poisson::FieldSolver;

/// Relative singular-value cutoff for `D⁺`.
pub const PINV_RCOND: f64 = 1e-6;

/// Cached operators and parameters for RHS evaluation.
#[derive(Debug, Clone)]
pub struct VlasovRhs {
    layout: StateLayout,
    dx: f64,
    species: [SpeciesParams; 3],
    derivative: PeriodicDerivative,
    field: FieldSolver,
    corrections: CorrectionAssembler,
    ion: Array2<f64>,
    weights: HermiteWeights,
}

impl VlasovRhs {
    /// Validate `config` and build the grid operators.
    pub fn new(config: &SimulationConfig) -> VlasovResult<Self> {
        config.validate()?;
        let grid = &config.grid;
        let n = grid.n_periodic();
        let dx = grid.dx();
        let order = config.field.fd_order;

        let derivative = PeriodicDerivative::new(dx, order)?;
        let field = FieldSolver::new(n, dx, &config.field)?;
        let ddx_pinv = pinv_svd(&derivative.matrix(n), PINV_RCOND)?;
        debug!("built D+ ({n}x{n}, order {order}, dx = {dx:.4})");

        let layout = grid.layout();
        let s = &config.species;
        Ok(VlasovRhs {
            layout,
            dx,
            species: [s.electron_core, s.electron_beam, s.ion],
            derivative,
            field,
            corrections: CorrectionAssembler::new(grid.nv, dx, ddx_pinv),
            ion: ion_grid(&layout, s.ion.alpha),
            weights: HermiteWeights::new(grid.nv),
        })
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn species(&self) -> &[SpeciesParams; 3] {
        &self.species
    }

    pub fn derivative(&self) -> &PeriodicDerivative {
        &self.derivative
    }

    pub fn corrections(&self) -> &CorrectionAssembler {
        &self.corrections
    }

    fn grids<'a>(&'a self, y: &'a [f64]) -> [ArrayView2<'a, f64>; 3] {
        [
            species_view(y, &self.layout, 0),
            species_view(y, &self.layout, 1),
            self.ion.view(),
        ]
    }

    /// Electric field of the packed state.
    pub fn electric_field(&self, y: &[f64]) -> VlasovResult<Array1<f64>> {
        self.field.solve_species(&self.grids(y), &self.species)
    }

    /// Moments of every species, field energy and the carried scalars.
    pub fn moments(&self, y: &[f64]) -> VlasovResult<MomentSummary> {
        self.layout.check_len(y.len())?;
        let grids = self.grids(y);
        let e = self.field.solve_species(&grids, &self.species)?.to_vec();
        let species = [0, 1, 2].map(|s| {
            species_moments(grids[s], &self.species[s], self.dx, &self.weights)
        });
        Ok(MomentSummary {
            species,
            electric_energy: electric_energy(&e, self.dx),
            corrections: CorrectionScalars::from_slots(&y[self.layout.corrections_offset()..]),
        })
    }

    /// Derivative of the packed state, freshly allocated.
    ///
    /// Panics if `y.len()` differs from the layout; validate with
    /// [`StateLayout::check_len`] first.
    pub fn evaluate(&self, y: &[f64]) -> VlasovResult<Array1<f64>> {
        let mut out = vec![0.0; self.layout.state_len()];
        self.evaluate_into(y, &mut out)?;
        Ok(Array1::from(out))
    }

    /// Write the derivative of `y` into `out` (both of packed length).
    pub fn evaluate_into(&self, y: &[f64], out: &mut [f64]) -> VlasovResult<()> {
        assert_eq!(out.len(), self.layout.state_len(), "packed state length mismatch");
        let grids = self.grids(y);
        let e = self.field.solve_species(&grids, &self.species)?.to_vec();

        let block = self.layout.block_len();
        for s in 0..2 {
            let d = rhs_species(grids[s], &self.species[s], &self.derivative, &e);
            out[s * block..(s + 1) * block]
                .iter_mut()
                .zip(d.iter())
                .for_each(|(o, &v)| *o = v);
        }

        let top = self.layout.nv - 1;
        let tops = [grids[0].row(top), grids[1].row(top), grids[2].row(top)];
        let scalars = self.corrections.compute(&tops, &self.species, &e);
        write_corrections(out, &self.layout, &scalars);
        Ok(())
    }
}

impl OdeRhs for VlasovRhs {
    fn dim(&self) -> usize {
        self.layout.state_len()
    }

    fn eval(&self, _t: f64, y: &[f64], out: &mut [f64]) -> VlasovResult<()> {
        self.evaluate_into(y, out)
    }
}
