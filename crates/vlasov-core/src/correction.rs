// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Conservation Corrections
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Time derivatives of the five conservation-correction scalars.
//!
//! Truncating the Hermite recursion at `Nv` modes lets mass, momentum and
//! energy leak through the top mode whenever the field is nonzero. Each
//! scalar integrates exactly that leak, so moment + scalar is the
//! conserved quantity. Every derivative is a linear functional of the top
//! mode `c_s = C_{Nv-1,s}` of all three species:
//!
//! ```text
//! S = sqrt((Nv-1)/2),  A = I0(Nv-2),  B = (Nv-1) I0(Nv-1)
//!
//! mass_even     = -dx S A Σ (q/m) (E·c)
//! momentum_odd  = -dx B   Σ (alpha q) (E·c)
//! momentum_even = -dx S A Σ (u q) (E·c)
//! energy_odd    = -dx B   Σ (u q) (E·c)
//! energy_even   = -dx S A E·( Σ q ((2Nv-1) alpha² + u²) c + Σ (q²/m) D⁺(E ⊙ c) )
//! ```
//!
//! `D⁺` is the pseudo-inverse of the periodic derivative, supplied by the
//! caller and reused across evaluations.

use ndarray::{Array1, Array2, ArrayView1};
use vlasov_math::hermite::integral_i0;
use vlasov_types::config::SpeciesParams;
use vlasov_types::state::CorrectionScalars;

/// Assembles [`CorrectionScalars`] for a fixed grid and truncation.
#[derive(Debug, Clone)]
pub struct CorrectionAssembler {
    nv: usize,
    dx: f64,
    /// `sqrt((Nv-1)/2) · I0(Nv-2)`.
    even_weight: f64,
    /// `(Nv-1) · I0(Nv-1)`.
    odd_weight: f64,
    ddx_pinv: Array2<f64>,
}

impl CorrectionAssembler {
    pub fn new(nv: usize, dx: f64, ddx_pinv: Array2<f64>) -> Self {
        assert!(nv >= 1, "at least one Hermite mode is required");
        assert!(ddx_pinv.is_square(), "pseudo-inverse must be square");
        let top = nv as isize - 1;
        CorrectionAssembler {
            nv,
            dx,
            even_weight: (top as f64 / 2.0).sqrt() * integral_i0(top - 1),
            odd_weight: top as f64 * integral_i0(top),
            ddx_pinv,
        }
    }

    pub fn ddx_pinv(&self) -> &Array2<f64> {
        &self.ddx_pinv
    }

    /// Correction derivatives from the top modes of all species and the field.
    pub fn compute(
        &self,
        top_modes: &[ArrayView1<'_, f64>],
        params: &[SpeciesParams],
        e: &[f64],
    ) -> CorrectionScalars {
        assert_eq!(top_modes.len(), params.len(), "one parameter set per species");
        let n = self.ddx_pinv.nrows();
        assert_eq!(e.len(), n, "field length mismatch");
        let e_view = ArrayView1::from(e);

        let mut mass = 0.0;
        let mut momentum_odd = 0.0;
        let mut drift = 0.0;
        let mut bracket = Array1::<f64>::zeros(n);
        let thermal = (2 * self.nv - 1) as f64;

        for (c, p) in top_modes.iter().zip(params) {
            assert_eq!(c.len(), n, "top-mode length mismatch");
            let ec = e_view.dot(c);
            mass += p.charge / p.mass * ec;
            momentum_odd += p.alpha * p.charge * ec;
            drift += p.u * p.charge * ec;

            bracket.scaled_add(
                p.charge * (thermal * p.alpha * p.alpha + p.u * p.u),
                c,
            );
            let e_times_c = &e_view * c;
            bracket.scaled_add(p.charge * p.charge / p.mass, &self.ddx_pinv.dot(&e_times_c));
        }

        let even = -self.dx * self.even_weight;
        let odd = -self.dx * self.odd_weight;
        CorrectionScalars {
            mass_even: even * mass,
            momentum_odd: odd * momentum_odd,
            momentum_even: even * drift,
            energy_odd: odd * drift,
            energy_even: even * e_view.dot(&bracket),
        }
    }
}
