// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants::ION_MASS_RATIO;
use crate::error::{VlasovError, VlasovResult};
use crate::state::StateLayout;

/// Top-level run configuration for the bump-on-tail experiment.
/// Maps 1:1 to `configs/bump_on_tail.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub run_name: String,
    pub grid: GridConfig,
    pub time: TimeConfig,
    pub species: SpeciesSet,
    #[serde(default)]
    pub initial: InitialCondition,
    #[serde(default)]
    pub field: FieldSolverConfig,
    #[serde(default)]
    pub solver: NonlinearSolverConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Periodic spatial grid and spectral truncation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of physical mesh points including the periodic endpoint.
    pub nx: usize,
    /// Number of retained Hermite modes.
    pub nv: usize,
    /// Domain length L; x runs over [0, L].
    pub length: f64,
}

impl GridConfig {
    /// Mesh spacing `L / (Nx - 1)`.
    pub fn dx(&self) -> f64 {
        self.length / (self.nx as f64 - 1.0)
    }

    /// Number of distinct periodic points (`Nx - 1`).
    pub fn n_periodic(&self) -> usize {
        self.nx.saturating_sub(1)
    }

    pub fn layout(&self) -> StateLayout {
        StateLayout::new(self.nx, self.nv)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeConfig {
    pub dt: f64,
    pub t_final: f64,
}

impl TimeConfig {
    /// Fixed time grid `linspace(0, T, floor(T/dt) + 1)`.
    pub fn grid(&self) -> Vec<f64> {
        // Guard against 0.03 / 0.01 = 2.9999999999999996.
        let n_steps = (self.t_final / self.dt + 1e-9).floor() as usize;
        if n_steps == 0 {
            return vec![0.0];
        }
        (0..=n_steps)
            .map(|i| self.t_final * i as f64 / n_steps as f64)
            .collect()
    }
}

/// Physical parameters of one species (normalized units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesParams {
    pub charge: f64,
    pub mass: f64,
    /// Thermal-velocity scale of the Hermite basis.
    pub alpha: f64,
    /// Drift velocity of the Hermite basis.
    #[serde(default)]
    pub u: f64,
}

impl SpeciesParams {
    fn validate(&self, name: &str) -> VlasovResult<()> {
        let finite = [self.charge, self.mass, self.alpha, self.u]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(VlasovError::ConfigError(format!(
                "species '{name}' has non-finite parameters"
            )));
        }
        if self.mass <= 0.0 {
            return Err(VlasovError::ConfigError(format!(
                "species '{name}' mass must be > 0, got {}",
                self.mass
            )));
        }
        if self.alpha <= 0.0 {
            return Err(VlasovError::ConfigError(format!(
                "species '{name}' alpha must be > 0, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Two evolved electron populations and the static ion background.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpeciesSet {
    pub electron_core: SpeciesParams,
    pub electron_beam: SpeciesParams,
    pub ion: SpeciesParams,
}

/// Perturbed-Maxwellian initial condition parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitialCondition {
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_wavenumber")]
    pub wavenumber: f64,
    /// Density fraction of the core population.
    #[serde(default = "default_delta_core")]
    pub delta_core: f64,
    /// Density fraction of the beam population.
    #[serde(default = "default_delta_beam")]
    pub delta_beam: f64,
}

fn default_epsilon() -> f64 {
    0.03
}
fn default_wavenumber() -> f64 {
    0.3
}
fn default_delta_core() -> f64 {
    0.9
}
fn default_delta_beam() -> f64 {
    0.1
}

impl Default for InitialCondition {
    fn default() -> Self {
        InitialCondition {
            epsilon: default_epsilon(),
            wavenumber: default_wavenumber(),
            delta_core: default_delta_core(),
            delta_beam: default_delta_beam(),
        }
    }
}

/// Poisson solve method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSolverKind {
    Gmres,
    Fft,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldSolverConfig {
    #[serde(default = "default_field_method")]
    pub method: FieldSolverKind,
    /// Finite-difference order of the derivative/Laplacian (2 or 4).
    #[serde(default = "default_fd_order")]
    pub fd_order: usize,
    #[serde(default = "default_field_tol")]
    pub tol: f64,
    #[serde(default = "default_field_max_iter")]
    pub max_iter: usize,
}

fn default_field_method() -> FieldSolverKind {
    FieldSolverKind::Gmres
}
fn default_fd_order() -> usize {
    2
}
fn default_field_tol() -> f64 {
    1e-12
}
fn default_field_max_iter() -> usize {
    50
}

impl Default for FieldSolverConfig {
    fn default() -> Self {
        FieldSolverConfig {
            method: default_field_method(),
            fd_order: default_fd_order(),
            tol: default_field_tol(),
            max_iter: default_field_max_iter(),
        }
    }
}

/// Nonlinear solver used inside each implicit-midpoint step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonlinearSolverKind {
    NewtonKrylov,
    Picard,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NonlinearSolverConfig {
    #[serde(default = "default_nonlinear_kind")]
    pub kind: NonlinearSolverKind,
    #[serde(default = "default_r_tol")]
    pub r_tol: f64,
    #[serde(default = "default_a_tol")]
    pub a_tol: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

fn default_nonlinear_kind() -> NonlinearSolverKind {
    NonlinearSolverKind::NewtonKrylov
}
fn default_r_tol() -> f64 {
    1e-8
}
fn default_a_tol() -> f64 {
    1e-14
}
fn default_max_iter() -> usize {
    100
}

impl Default for NonlinearSolverConfig {
    fn default() -> Self {
        NonlinearSolverConfig {
            kind: default_nonlinear_kind(),
            r_tol: default_r_tol(),
            a_tol: default_a_tol(),
            max_iter: default_max_iter(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// File prefix; artifacts are `<prefix>_u.npy` and `<prefix>_t.npy`.
    #[serde(default = "default_output_prefix")]
    pub prefix: String,
    /// Log moment diagnostics every this many steps (0 disables).
    #[serde(default = "default_log_every")]
    pub log_every: usize,
}

fn default_output_dir() -> String {
    "data/bump_on_tail".to_string()
}
fn default_output_prefix() -> String {
    "sol_midpoint".to_string()
}
fn default_log_every() -> usize {
    10
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            directory: default_output_dir(),
            prefix: default_output_prefix(),
            log_every: default_log_every(),
        }
    }
}

impl SimulationConfig {
    /// Load from JSON file and validate.
    pub fn from_file(path: &str) -> VlasovResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reference bump-on-tail run: Nx=Nv=101, L=20π, dt=1e-2, T=15.
    pub fn bump_on_tail() -> Self {
        SimulationConfig {
            run_name: "bump-on-tail".to_string(),
            grid: GridConfig {
                nx: 101,
                nv: 101,
                length: 20.0 * PI,
            },
            time: TimeConfig {
                dt: 1e-2,
                t_final: 15.0,
            },
            species: SpeciesSet {
                electron_core: SpeciesParams {
                    charge: -1.0,
                    mass: 1.0,
                    alpha: 1.0,
                    u: 0.0,
                },
                electron_beam: SpeciesParams {
                    charge: -1.0,
                    mass: 1.0,
                    alpha: 0.5,
                    u: 4.5,
                },
                ion: SpeciesParams {
                    charge: 1.0,
                    mass: ION_MASS_RATIO,
                    alpha: (1.0 / ION_MASS_RATIO).sqrt(),
                    u: 0.0,
                },
            },
            initial: InitialCondition::default(),
            field: FieldSolverConfig::default(),
            solver: NonlinearSolverConfig::default(),
            output: OutputConfig::default(),
        }
    }

    /// Same physics on a reduced grid, for tests and smoke runs.
    pub fn small(nx: usize, nv: usize) -> Self {
        let mut cfg = Self::bump_on_tail();
        cfg.run_name = format!("bump-on-tail-{nx}x{nv}");
        cfg.grid.nx = nx;
        cfg.grid.nv = nv;
        cfg
    }

    pub fn validate(&self) -> VlasovResult<()> {
        if self.grid.nx < 4 {
            return Err(VlasovError::ConfigError(format!(
                "grid.nx must be >= 4, got {}",
                self.grid.nx
            )));
        }
        if self.grid.nv < 1 {
            return Err(VlasovError::ConfigError(
                "grid.nv must be >= 1".to_string(),
            ));
        }
        if !self.grid.length.is_finite() || self.grid.length <= 0.0 {
            return Err(VlasovError::ConfigError(format!(
                "grid.length must be finite and > 0, got {}",
                self.grid.length
            )));
        }
        if !self.time.dt.is_finite() || self.time.dt <= 0.0 {
            return Err(VlasovError::ConfigError(format!(
                "time.dt must be finite and > 0, got {}",
                self.time.dt
            )));
        }
        if !self.time.t_final.is_finite() || self.time.t_final < 0.0 {
            return Err(VlasovError::ConfigError(format!(
                "time.t_final must be finite and >= 0, got {}",
                self.time.t_final
            )));
        }
        self.species.electron_core.validate("electron_core")?;
        self.species.electron_beam.validate("electron_beam")?;
        self.species.ion.validate("ion")?;

        if !matches!(self.field.fd_order, 2 | 4) {
            return Err(VlasovError::ConfigError(format!(
                "field.fd_order must be 2 or 4, got {}",
                self.field.fd_order
            )));
        }
        if self.field.fd_order == 4 && self.grid.n_periodic() < 5 {
            return Err(VlasovError::ConfigError(
                "fourth-order stencil needs at least 5 periodic points".to_string(),
            ));
        }
        if !(self.field.tol > 0.0) || self.field.max_iter == 0 {
            return Err(VlasovError::ConfigError(
                "field.tol must be > 0 and field.max_iter >= 1".to_string(),
            ));
        }
        if !(self.solver.r_tol >= 0.0 && self.solver.a_tol >= 0.0) || self.solver.max_iter == 0
        {
            return Err(VlasovError::ConfigError(
                "solver tolerances must be >= 0 and max_iter >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/vlasov-types/ at compile time,
    /// so we go up 2 levels to reach the workspace root.
    fn config_path(relative: &str) -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join(relative)
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_load_reference_config() {
        let cfg = SimulationConfig::from_file(&config_path("configs/bump_on_tail.json")).unwrap();
        assert_eq!(cfg.grid.nx, 101);
        assert_eq!(cfg.grid.nv, 101);
        assert!((cfg.grid.length - 20.0 * PI).abs() < 1e-9);
        assert_eq!(cfg.field.method, FieldSolverKind::Gmres);
        assert_eq!(cfg.solver.kind, NonlinearSolverKind::NewtonKrylov);
        assert!((cfg.species.electron_beam.u - 4.5).abs() < 1e-12);
        assert!((cfg.species.ion.mass - 1863.0).abs() < 1e-12);
    }

    #[test]
    fn test_file_matches_builtin_reference() {
        let file = SimulationConfig::from_file(&config_path("configs/bump_on_tail.json")).unwrap();
        let builtin = SimulationConfig::bump_on_tail();
        assert_eq!(file.species.electron_core, builtin.species.electron_core);
        assert_eq!(file.species.electron_beam, builtin.species.electron_beam);
        assert!((file.species.ion.alpha - builtin.species.ion.alpha).abs() < 1e-12);
        assert!((file.time.dt - builtin.time.dt).abs() < 1e-15);
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = SimulationConfig::bump_on_tail();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg.run_name, cfg2.run_name);
        assert_eq!(cfg.grid.nx, cfg2.grid.nx);
        assert_eq!(cfg.species.ion, cfg2.species.ion);
        assert_eq!(cfg.field.method, cfg2.field.method);
    }

    #[test]
    fn test_optional_sections_default() {
        let json = r#"{
            "run_name": "minimal",
            "grid": { "nx": 11, "nv": 5, "length": 6.283185307179586 },
            "time": { "dt": 0.01, "t_final": 0.05 },
            "species": {
                "electron_core": { "charge": -1.0, "mass": 1.0, "alpha": 1.0 },
                "electron_beam": { "charge": -1.0, "mass": 1.0, "alpha": 0.5, "u": 4.5 },
                "ion": { "charge": 1.0, "mass": 1863.0, "alpha": 0.0231683 }
            }
        }"#;
        let cfg: SimulationConfig = serde_json::from_str(json).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.field.fd_order, 2);
        assert!((cfg.initial.epsilon - 0.03).abs() < 1e-15);
        assert_eq!(cfg.species.electron_core.u, 0.0);
        assert_eq!(cfg.output.prefix, "sol_midpoint");
    }

    #[test]
    fn test_validate_rejects_bad_grid() {
        let mut cfg = SimulationConfig::small(3, 5);
        assert!(cfg.validate().is_err());
        cfg.grid.nx = 11;
        cfg.grid.nv = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_species() {
        let mut cfg = SimulationConfig::small(11, 5);
        cfg.species.ion.alpha = 0.0;
        assert!(cfg.validate().is_err());
        let mut cfg = SimulationConfig::small(11, 5);
        cfg.species.electron_beam.mass = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_order() {
        let mut cfg = SimulationConfig::small(11, 5);
        cfg.field.fd_order = 3;
        match cfg.validate() {
            Err(VlasovError::ConfigError(msg)) => assert!(msg.contains("fd_order")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_time_grid() {
        let t = TimeConfig {
            dt: 1e-2,
            t_final: 15.0,
        }
        .grid();
        assert_eq!(t.len(), 1501);
        assert_eq!(t[0], 0.0);
        assert!((t[1500] - 15.0).abs() < 1e-12);
        assert!((t[1] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_grid_spacing() {
        let cfg = SimulationConfig::bump_on_tail();
        assert!((cfg.grid.dx() - 20.0 * PI / 100.0).abs() < 1e-14);
        assert_eq!(cfg.grid.n_periodic(), 100);
    }
}
