// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Packed state vector codec.
//!
//! Layout of the flat ODE state of length `2 * Nv * (Nx-1) + 5`:
//!
//! ```text
//! [ electron core (Nv x (Nx-1), row-major by mode) |
//!   electron beam (Nv x (Nx-1), row-major by mode) |
//!   energy_even, energy_odd, momentum_even, momentum_odd, mass_even ]
//! ```
//!
//! The ion grid is never stored: it is a static Maxwellian rebuilt on unpack.

use ndarray::{Array1, Array2, ArrayView2};

use crate::constants::{MAXWELLIAN_NORM, N_CORRECTIONS};
use crate::error::{VlasovError, VlasovResult};

/// Immutable block sizes of the packed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateLayout {
    /// Physical mesh points including the periodic endpoint.
    pub nx: usize,
    /// Retained Hermite modes.
    pub nv: usize,
}

impl StateLayout {
    pub fn new(nx: usize, nv: usize) -> Self {
        StateLayout { nx, nv }
    }

    /// Spatial points per mode (`Nx - 1`).
    #[inline]
    pub fn n_periodic(&self) -> usize {
        self.nx.saturating_sub(1)
    }

    /// Entries in one species block.
    #[inline]
    pub fn block_len(&self) -> usize {
        self.nv * self.n_periodic()
    }

    /// Total packed length.
    #[inline]
    pub fn state_len(&self) -> usize {
        2 * self.block_len() + N_CORRECTIONS
    }

    /// Offset of the first correction scalar.
    #[inline]
    pub fn corrections_offset(&self) -> usize {
        2 * self.block_len()
    }

    /// Fallible length check used before integration starts.
    pub fn check_len(&self, len: usize) -> VlasovResult<()> {
        if len != self.state_len() {
            return Err(VlasovError::ConfigError(format!(
                "packed state has length {len}, expected 2*{}*{}+{} = {}",
                self.nv,
                self.n_periodic(),
                N_CORRECTIONS,
                self.state_len()
            )));
        }
        Ok(())
    }
}

/// The five conservation-correction scalars.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CorrectionScalars {
    pub mass_even: f64,
    pub momentum_odd: f64,
    pub momentum_even: f64,
    pub energy_odd: f64,
    pub energy_even: f64,
}

impl CorrectionScalars {
    /// Storage order of the trailing slots.
    pub fn to_slots(&self) -> [f64; N_CORRECTIONS] {
        [
            self.energy_even,
            self.energy_odd,
            self.momentum_even,
            self.momentum_odd,
            self.mass_even,
        ]
    }

    pub fn from_slots(slots: &[f64]) -> Self {
        assert_eq!(slots.len(), N_CORRECTIONS, "expected 5 correction slots");
        CorrectionScalars {
            energy_even: slots[0],
            energy_odd: slots[1],
            momentum_even: slots[2],
            momentum_odd: slots[3],
            mass_even: slots[4],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.to_slots().iter().all(|&v| v == 0.0)
    }
}

/// Unpacked state: three coefficient grids `[Nv, Nx-1]` and the corrections.
#[derive(Debug, Clone)]
pub struct SpeciesStates {
    pub electron_core: Array2<f64>,
    pub electron_beam: Array2<f64>,
    pub ion: Array2<f64>,
    pub corrections: CorrectionScalars,
}

/// Static ion background: mode 0 = `MAXWELLIAN_NORM / alpha_i`, others zero.
pub fn ion_grid(layout: &StateLayout, ion_alpha: f64) -> Array2<f64> {
    let mut grid = Array2::zeros((layout.nv, layout.n_periodic()));
    if layout.nv > 0 {
        grid.row_mut(0).fill(MAXWELLIAN_NORM / ion_alpha);
    }
    grid
}

/// Borrow species block `index` (0 = core, 1 = beam) without copying.
pub fn species_view<'a>(y: &'a [f64], layout: &StateLayout, index: usize) -> ArrayView2<'a, f64> {
    assert!(index < 2, "only two evolved species are packed");
    assert_eq!(y.len(), layout.state_len(), "packed state length mismatch");
    let block = layout.block_len();
    let start = index * block;
    ArrayView2::from_shape((layout.nv, layout.n_periodic()), &y[start..start + block])
        .expect("block slice matches (nv, nx-1)")
}

/// Split a packed state into coefficient grids and correction scalars.
///
/// Panics if `y.len()` differs from `layout.state_len()`; use
/// [`StateLayout::check_len`] to validate untrusted input first.
pub fn unpack(y: &[f64], layout: &StateLayout, ion_alpha: f64) -> SpeciesStates {
    assert_eq!(y.len(), layout.state_len(), "packed state length mismatch");
    let offset = layout.corrections_offset();
    SpeciesStates {
        electron_core: species_view(y, layout, 0).to_owned(),
        electron_beam: species_view(y, layout, 1).to_owned(),
        ion: ion_grid(layout, ion_alpha),
        corrections: CorrectionScalars::from_slots(&y[offset..]),
    }
}

/// Inverse of [`unpack`]; the ion grid is not stored.
pub fn pack(
    electron_core: &Array2<f64>,
    electron_beam: &Array2<f64>,
    corrections: &CorrectionScalars,
    layout: &StateLayout,
) -> Array1<f64> {
    let shape = [layout.nv, layout.n_periodic()];
    assert_eq!(electron_core.shape(), &shape, "core grid shape mismatch");
    assert_eq!(electron_beam.shape(), &shape, "beam grid shape mismatch");

    let mut y = Vec::with_capacity(layout.state_len());
    // iter() walks in logical (row-major) order regardless of memory layout
    y.extend(electron_core.iter().copied());
    y.extend(electron_beam.iter().copied());
    y.extend_from_slice(&corrections.to_slots());
    Array1::from_vec(y)
}

/// Write the five correction derivatives into the trailing slots of `out`.
pub fn write_corrections(out: &mut [f64], layout: &StateLayout, corrections: &CorrectionScalars) {
    assert_eq!(out.len(), layout.state_len(), "packed state length mismatch");
    let offset = layout.corrections_offset();
    out[offset..].copy_from_slice(&corrections.to_slots());
}
