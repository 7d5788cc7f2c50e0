//! Numerical primitives for SCPN Vlasov-Hermite.

pub mod fft;
pub mod finite_difference;
pub mod gmres;
pub mod hermite;
pub mod linalg;
pub mod nonlinear;
pub mod symplectic;
