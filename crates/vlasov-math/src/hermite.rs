// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Hermite Integrals
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Velocity-space integrals of the symmetrically weighted Hermite basis
//!
//! ```text
//! psi_n(ξ) = (2^n n! sqrt(pi))^{-1/2} H_n(ξ) exp(-ξ²/2)
//! ```
//!
//! - `I0(n) = ∫ psi_n dξ`       (zero for odd n)
//! - `I1(n) = ∫ ξ psi_n dξ`     (zero for even n)
//! - `I2(n) = ∫ ξ² psi_n dξ`    (zero for odd n)
//!
//! The closed form of `I0` involves `n!` and overflows long before the
//! mode counts used in practice, so it is evaluated through the ratio
//! `I0(n) = sqrt((n-1)/n) I0(n-2)`. Negative indices return zero, which
//! is what the truncated recursions expect at the bottom edge.

use vlasov_types::constants::MODE0_DENSITY;

/// `∫ psi_n(ξ) dξ`.
pub fn integral_i0(n: isize) -> f64 {
    if n < 0 || n % 2 == 1 {
        return 0.0;
    }
    let mut value = MODE0_DENSITY;
    let mut k = 2;
    while k <= n {
        value *= ((k - 1) as f64 / k as f64).sqrt();
        k += 2;
    }
    value
}

/// `∫ ξ psi_n(ξ) dξ`, from `ξ psi_n = sqrt((n+1)/2) psi_{n+1} + sqrt(n/2) psi_{n-1}`.
pub fn integral_i1(n: isize) -> f64 {
    if n < 0 {
        return 0.0;
    }
    let nf = n as f64;
    ((nf + 1.0) / 2.0).sqrt() * integral_i0(n + 1) + (nf / 2.0).sqrt() * integral_i0(n - 1)
}

/// `∫ ξ² psi_n(ξ) dξ`.
pub fn integral_i2(n: isize) -> f64 {
    if n < 0 {
        return 0.0;
    }
    let nf = n as f64;
    ((nf + 1.0) / 2.0).sqrt() * integral_i1(n + 1) + (nf / 2.0).sqrt() * integral_i1(n - 1)
}

/// Tabulated weights for modes `0..nv`, built with one pass of the recursion.
#[derive(Debug, Clone)]
pub struct HermiteWeights {
    pub i0: Vec<f64>,
    pub i1: Vec<f64>,
    pub i2: Vec<f64>,
}

impl HermiteWeights {
    pub fn new(nv: usize) -> Self {
        // one extra mode on each side for the I1/I2 neighbour terms
        let mut i0 = vec![0.0; nv + 2];
        if !i0.is_empty() {
            i0[0] = MODE0_DENSITY;
        }
        for n in 2..nv + 2 {
            i0[n] = ((n - 1) as f64 / n as f64).sqrt() * i0[n - 2];
        }
        let at = |v: &[f64], n: isize| -> f64 {
            if n < 0 {
                0.0
            } else {
                v[n as usize]
            }
        };

        let i1_ext: Vec<f64> = (0..nv + 1)
            .map(|n| {
                let nf = n as f64;
                ((nf + 1.0) / 2.0).sqrt() * at(&i0, n as isize + 1)
                    + (nf / 2.0).sqrt() * at(&i0, n as isize - 1)
            })
            .collect();
        let i2: Vec<f64> = (0..nv)
            .map(|n| {
                let nf = n as f64;
                ((nf + 1.0) / 2.0).sqrt() * at(&i1_ext, n as isize + 1)
                    + (nf / 2.0).sqrt() * at(&i1_ext, n as isize - 1)
            })
            .collect();

        i0.truncate(nv);
        let i1 = i1_ext[..nv].to_vec();
        HermiteWeights { i0, i1, i2 }
    }
}

/// Values of `psi_0..psi_{nmax-1}` at `xi`, by the normalized three-term
/// recurrence `psi_{n+1} = sqrt(2/(n+1)) ξ psi_n - sqrt(n/(n+1)) psi_{n-1}`.
pub fn hermite_functions(xi: f64, nmax: usize) -> Vec<f64> {
    let mut psi = vec![0.0; nmax];
    if nmax == 0 {
        return psi;
    }
    psi[0] = std::f64::consts::PI.powf(-0.25) * (-0.5 * xi * xi).exp();
    if nmax > 1 {
        psi[1] = 2.0_f64.sqrt() * xi * psi[0];
    }
    for n in 1..nmax.saturating_sub(1) {
        let nf = n as f64;
        psi[n + 1] =
            (2.0 / (nf + 1.0)).sqrt() * xi * psi[n] - (nf / (nf + 1.0)).sqrt() * psi[n - 1];
    }
    psi
}
