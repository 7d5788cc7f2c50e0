//! Initial packed state of the bump-on-tail run.
//!
//! Both electron populations start as Maxwellians in their own Hermite
//! frame with a cosine density perturbation:
//!
//! ```text
//! C_0,s(x) = delta_s N (1 + eps cos(k x)) / alpha_s,   N = 1/sqrt(2 sqrt(pi))
//! ```
//!
//! sampled on `x = linspace(0, L, Nx)` with the periodic endpoint dropped.
//! Higher modes and the correction scalars start at zero.

use ndarray::{Array1, Array2};
use vlasov_types::config::SimulationConfig;
use vlasov_types::constants::MAXWELLIAN_NORM;
use vlasov_types::state::{pack, CorrectionScalars};

/// Spatial nodes `x_j = j dx` for `j = 0..Nx-1` (periodic copy).
pub fn periodic_nodes(config: &SimulationConfig) -> Array1<f64> {
    let dx = config.grid.dx();
    Array1::from_shape_fn(config.grid.n_periodic(), |j| j as f64 * dx)
}

fn perturbed_grid(config: &SimulationConfig, delta: f64, alpha: f64) -> Array2<f64> {
    let ic = &config.initial;
    let x = periodic_nodes(config);
    let mut grid = Array2::zeros((config.grid.nv, x.len()));
    grid.row_mut(0).assign(
        &x.mapv(|xj| delta * MAXWELLIAN_NORM * (1.0 + ic.epsilon * (ic.wavenumber * xj).cos()) / alpha),
    );
    grid
}

/// Packed initial state `y0` of length `2 Nv (Nx-1) + 5`.
pub fn initial_state(config: &SimulationConfig) -> Array1<f64> {
    let s = &config.species;
    let core = perturbed_grid(config, config.initial.delta_core, s.electron_core.alpha);
    let beam = perturbed_grid(config, config.initial.delta_beam, s.electron_beam.alpha);
    pack(&core, &beam, &CorrectionScalars::default(), &config.grid.layout())
}
