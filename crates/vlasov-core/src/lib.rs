//! Bump-on-tail Vlasov-Poisson system in a symmetrically weighted Hermite basis.
//!
//! The packed state holds the Hermite coefficients of the two electron
//! populations plus five conservation-correction scalars; ions are a
//! static background. [`rhs::VlasovRhs`] evaluates the semi-discrete
//! right-hand side and [`driver`] integrates it with the implicit
//! midpoint rule.

pub mod advection;
pub mod correction;
pub mod driver;
pub mod initial;
pub mod moments;
pub mod poisson;
pub mod rhs;
