// ─────────────────────────────────────────────────────────────────────
// SCPN Vlasov-Hermite — Run Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! End-to-end bump-on-tail run: build operators, integrate with the
//! implicit midpoint rule, persist the trajectory as `.npy`.

use std::path::{Path, PathBuf};

use log::{info, warn};
use ndarray::{Array1, Array2};
use ndarray_npy::write_npy;
use vlasov_math::nonlinear::NewtonKrylovConfig;
use vlasov_math::symplectic::{integrate_implicit_midpoint, StepSolver};
use vlasov_types::config::{NonlinearSolverConfig, NonlinearSolverKind, OutputConfig, SimulationConfig};
use vlasov_types::error::{VlasovError, VlasovResult};

use crate::initial::initial_state;
use crate::moments::MomentSummary;
use crate::rhs::VlasovRhs;

/// Trajectory of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Packed states, shape `(state_len, Nt)`.
    pub trajectory: Array2<f64>,
    pub times: Array1<f64>,
    pub initial: MomentSummary,
    pub last: MomentSummary,
    /// Nonlinear iterations summed over all steps.
    pub nonlinear_iterations: usize,
}

impl RunOutput {
    pub fn steps(&self) -> usize {
        self.times.len().saturating_sub(1)
    }
}

/// Paths of the written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub solution: PathBuf,
    pub times: PathBuf,
}

impl OutputPaths {
    pub fn new(output: &OutputConfig) -> Self {
        let dir = Path::new(&output.directory);
        OutputPaths {
            solution: dir.join(format!("{}_u.npy", output.prefix)),
            times: dir.join(format!("{}_t.npy", output.prefix)),
        }
    }
}

/// Per-step root finder selected by the configuration.
pub fn step_solver(cfg: &NonlinearSolverConfig) -> StepSolver {
    match cfg.kind {
        NonlinearSolverKind::NewtonKrylov => StepSolver::NewtonKrylov(NewtonKrylovConfig {
            r_tol: cfg.r_tol,
            a_tol: cfg.a_tol,
            max_iter: cfg.max_iter,
            ..NewtonKrylovConfig::default()
        }),
        NonlinearSolverKind::Picard => StepSolver::Picard {
            r_tol: cfg.r_tol,
            a_tol: cfg.a_tol,
            max_iter: cfg.max_iter,
        },
    }
}

fn log_summary(step: usize, t: f64, m: &MomentSummary) {
    info!(
        "step {step:>5} t = {t:8.3}  mass = {:.12e}  momentum = {:.6e}  energy = {:.12e}  E_field = {:.6e}",
        m.total_mass(),
        m.total_momentum(),
        m.total_energy(),
        m.electric_energy,
    );
    let c = &m.corrections;
    info!(
        "             corrections: mass_even = {:.3e} momentum = ({:.3e}, {:.3e}) energy = ({:.3e}, {:.3e})",
        c.mass_even, c.momentum_odd, c.momentum_even, c.energy_odd, c.energy_even,
    );
}

/// Integrate `config` without touching the filesystem.
pub fn simulate(config: &SimulationConfig) -> VlasovResult<RunOutput> {
    let rhs = VlasovRhs::new(config)?;
    let y0 = initial_state(config);
    rhs.layout().check_len(y0.len())?;
    let times = config.time.grid();
    let solver = step_solver(&config.solver);
    info!(
        "{}: Nx = {}, Nv = {}, dt = {}, T = {}, {} steps, state length {}",
        config.run_name,
        config.grid.nx,
        config.grid.nv,
        config.time.dt,
        config.time.t_final,
        times.len() - 1,
        y0.len(),
    );

    let y0 = y0.to_vec();
    let initial = rhs.moments(&y0)?;
    log_summary(0, 0.0, &initial);

    let log_every = config.output.log_every;
    let mut last = initial;
    let mut iterations = 0;
    let trajectory = integrate_implicit_midpoint(&rhs, &y0, &times, &solver, |k, t, y, stats| {
        iterations += stats.iterations;
        let is_final = k + 1 == times.len();
        if (log_every > 0 && k % log_every == 0) || is_final {
            last = rhs.moments(y)?;
            log_summary(k, t, &last);
        }
        Ok(())
    })?;

    let drift = (last.corrected_mass() - initial.corrected_mass()).abs();
    if drift > 1e-8 * initial.total_mass().abs().max(1.0) {
        warn!("corrected mass drifted by {drift:.3e} over the run");
    }

    Ok(RunOutput {
        trajectory,
        times: Array1::from(times),
        initial,
        last,
        nonlinear_iterations: iterations,
    })
}

/// Write `<prefix>_u.npy` and `<prefix>_t.npy`, creating the directory.
pub fn write_outputs(output: &OutputConfig, run: &RunOutput) -> VlasovResult<OutputPaths> {
    std::fs::create_dir_all(&output.directory)?;
    let paths = OutputPaths::new(output);
    write_npy(&paths.solution, &run.trajectory).map_err(|e| VlasovError::Npy(e.to_string()))?;
    write_npy(&paths.times, &run.times).map_err(|e| VlasovError::Npy(e.to_string()))?;
    info!("wrote {} and {}", paths.solution.display(), paths.times.display());
    Ok(paths)
}

/// Simulate and persist.
pub fn run(config: &SimulationConfig) -> VlasovResult<(RunOutput, OutputPaths)> {
    let output = simulate(config)?;
    let paths = write_outputs(&config.output, &output)?;
    Ok((output, paths))
}
