// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Amplitude of mode 0 for a unit-density Maxwellian with unit thermal
/// scale: `1 / sqrt(2 sqrt(pi))`. Divide by alpha for other scales.
pub const MAXWELLIAN_NORM: f64 = 0.531_125_966_013_598_4;

/// `∫ psi_0(ξ) dξ = sqrt(2 sqrt(pi))`, the density carried by a unit
/// mode-0 coefficient (before the alpha scaling).
pub const MODE0_DENSITY: f64 = 1.882_792_527_553_429_6;

/// Number of trailing conservation-correction scalars in the packed state.
pub const N_CORRECTIONS: usize = 5;

/// Ion-to-electron mass ratio used by the reference bump-on-tail run.
pub const ION_MASS_RATIO: f64 = 1863.0;
