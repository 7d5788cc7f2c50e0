//! Implicit midpoint integration for first-order systems `dy/dt = f(t, y)`.
//!
//! ```text
//! y_{n+1} = y_n + dt · f(t_n + dt/2, (y_n + y_{n+1}) / 2)
//! ```
//!
//! The rule is symplectic and preserves every quadratic invariant of a
//! linear flow up to the tolerance of the per-step nonlinear solve. Each
//! step solves `F(z) = z - y_n - dt f(t_n + dt/2, (y_n + z)/2) = 0`
//! starting from `z = y_n`.

use ndarray::Array2;
use vlasov_types::error::{VlasovError, VlasovResult};

use crate::nonlinear::{
    newton_krylov_solve, picard_solve, NewtonKrylovConfig, NewtonResult, NonlinearSystem,
};

/// Right-hand side of an autonomous or time-dependent ODE system.
pub trait OdeRhs {
    fn dim(&self) -> usize;

    /// `out = f(t, y)`.
    fn eval(&self, t: f64, y: &[f64], out: &mut [f64]) -> VlasovResult<()>;
}

/// Per-step root finder.
#[derive(Debug, Clone)]
pub enum StepSolver {
    NewtonKrylov(NewtonKrylovConfig),
    Picard {
        r_tol: f64,
        a_tol: f64,
        max_iter: usize,
    },
}

impl Default for StepSolver {
    fn default() -> Self {
        StepSolver::NewtonKrylov(NewtonKrylovConfig::default())
    }
}

struct MidpointResidual<'a, R: OdeRhs + ?Sized> {
    rhs: &'a R,
    t_mid: f64,
    dt: f64,
    y_n: &'a [f64],
}

impl<R: OdeRhs + ?Sized> NonlinearSystem for MidpointResidual<'_, R> {
    fn dim(&self) -> usize {
        self.rhs.dim()
    }

    fn residual(&self, z: &[f64], out: &mut [f64]) -> VlasovResult<()> {
        let mid: Vec<f64> = self
            .y_n
            .iter()
            .zip(z.iter())
            .map(|(a, b)| 0.5 * (a + b))
            .collect();
        self.rhs.eval(self.t_mid, &mid, out)?;
        for ((o, &zi), &yi) in out.iter_mut().zip(z.iter()).zip(self.y_n.iter()) {
            *o = zi - yi - self.dt * *o;
        }
        Ok(())
    }
}

/// Advance `y_n` by one implicit midpoint step of size `dt`, writing the
/// new state into `y_next`.
pub fn implicit_midpoint_step<R: OdeRhs + ?Sized>(
    rhs: &R,
    t: f64,
    dt: f64,
    y_n: &[f64],
    y_next: &mut [f64],
    solver: &StepSolver,
) -> VlasovResult<NewtonResult> {
    let n = rhs.dim();
    if y_n.len() != n || y_next.len() != n {
        return Err(VlasovError::LinAlg(format!(
            "midpoint step: state length {} / {}, system dimension {n}",
            y_n.len(),
            y_next.len()
        )));
    }
    let system = MidpointResidual {
        rhs,
        t_mid: t + 0.5 * dt,
        dt,
        y_n,
    };
    y_next.copy_from_slice(y_n);
    match solver {
        StepSolver::NewtonKrylov(cfg) => newton_krylov_solve(&system, y_next, cfg),
        StepSolver::Picard {
            r_tol,
            a_tol,
            max_iter,
        } => picard_solve(&system, y_next, *r_tol, *a_tol, *max_iter),
    }
}

/// Integrate from `y0` over `t_grid`, storing every state.
///
/// Returns an array of shape `(dim, t_grid.len())` whose column `k` is
/// the state at `t_grid[k]`; column 0 is `y0` unchanged. `observer` runs
/// after each completed step with `(step, t, y, solve stats)` and may
/// abort the run by returning an error.
pub fn integrate_implicit_midpoint<R, F>(
    rhs: &R,
    y0: &[f64],
    t_grid: &[f64],
    solver: &StepSolver,
    mut observer: F,
) -> VlasovResult<Array2<f64>>
where
    R: OdeRhs + ?Sized,
    F: FnMut(usize, f64, &[f64], &NewtonResult) -> VlasovResult<()>,
{
    let n = rhs.dim();
    if y0.len() != n {
        return Err(VlasovError::LinAlg(format!(
            "initial state has length {}, system dimension is {n}",
            y0.len()
        )));
    }
    let nt = t_grid.len();
    let mut trajectory = Array2::zeros((n, nt));
    if nt == 0 {
        return Ok(trajectory);
    }
    trajectory.column_mut(0).iter_mut().zip(y0).for_each(|(d, &s)| *d = s);

    let mut y_n = y0.to_vec();
    let mut y_next = vec![0.0; n];
    for k in 1..nt {
        let t = t_grid[k - 1];
        let dt = t_grid[k] - t;
        let stats = implicit_midpoint_step(rhs, t, dt, &y_n, &mut y_next, solver).map_err(
            |err| match err {
                VlasovError::SolverDiverged { iteration, message } => {
                    VlasovError::SolverDiverged {
                        iteration,
                        message: format!("step {k} (t = {t:.6}): {message}"),
                    }
                }
                other => other,
            },
        )?;
        trajectory
            .column_mut(k)
            .iter_mut()
            .zip(y_next.iter())
            .for_each(|(d, &s)| *d = s);
        std::mem::swap(&mut y_n, &mut y_next);
        observer(k, t_grid[k], &y_n, &stats)?;
    }
    Ok(trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `q' = p, p' = -ω² q`.
    struct HarmonicOscillator {
        omega: f64,
    }

    impl OdeRhs for HarmonicOscillator {
        fn dim(&self) -> usize {
            2
        }
        fn eval(&self, _t: f64, y: &[f64], out: &mut [f64]) -> VlasovResult<()> {
            out[0] = y[1];
            out[1] = -self.omega * self.omega * y[0];
            Ok(())
        }
    }

    impl HarmonicOscillator {
        fn energy(&self, q: f64, p: f64) -> f64 {
            0.5 * (p * p + (self.omega * q) * (self.omega * q))
        }
    }

    /// `y' = cos(t)`, exact `y = sin(t)`.
    struct Forced;

    impl OdeRhs for Forced {
        fn dim(&self) -> usize {
            1
        }
        fn eval(&self, t: f64, _y: &[f64], out: &mut [f64]) -> VlasovResult<()> {
            out[0] = t.cos();
            Ok(())
        }
    }

    fn tight() -> StepSolver {
        StepSolver::NewtonKrylov(NewtonKrylovConfig {
            r_tol: 0.0,
            a_tol: 1e-13,
            ..Default::default()
        })
    }

    fn uniform_grid(dt: f64, steps: usize) -> Vec<f64> {
        (0..=steps).map(|k| k as f64 * dt).collect()
    }

    #[test]
    fn test_midpoint_conserves_oscillator_energy() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let grid = uniform_grid(0.3, 1000);
        let traj = integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &tight(), |_, _, _, _| Ok(()))
            .unwrap();
        let e0 = sys.energy(1.0, 0.0);
        let drift = (0..grid.len())
            .map(|k| (sys.energy(traj[[0, k]], traj[[1, k]]) - e0).abs())
            .fold(0.0_f64, f64::max);
        assert!(drift < 1e-9, "midpoint energy drift {drift}");
    }

    #[test]
    fn test_midpoint_second_order() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let err_at = |steps: usize| {
            let grid = uniform_grid(1.0 / steps as f64, steps);
            let traj =
                integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &tight(), |_, _, _, _| Ok(()))
                    .unwrap();
            (traj[[0, steps]] - 1.0_f64.cos()).abs()
        };
        let ratio = err_at(20) / err_at(40);
        assert!((ratio - 4.0).abs() < 0.3, "convergence ratio {ratio}");
    }

    #[test]
    fn test_midpoint_uses_half_step_time() {
        // one step gives dt cos(t + dt/2)
        let grid = vec![0.0, 0.5];
        let traj = integrate_implicit_midpoint(&Forced, &[0.0], &grid, &tight(), |_, _, _, _| Ok(()))
            .unwrap();
        assert!((traj[[0, 1]] - 0.5 * 0.25_f64.cos()).abs() < 1e-12);
    }

    #[test]
    fn test_first_column_is_initial_state() {
        let sys = HarmonicOscillator { omega: 2.0 };
        let grid = uniform_grid(0.1, 3);
        let traj = integrate_implicit_midpoint(&sys, &[0.3, -0.7], &grid, &tight(), |_, _, _, _| Ok(()))
            .unwrap();
        assert_eq!(traj.dim(), (2, 4));
        assert_eq!(traj[[0, 0]], 0.3);
        assert_eq!(traj[[1, 0]], -0.7);
    }

    #[test]
    fn test_picard_matches_newton() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let grid = uniform_grid(0.05, 40);
        let picard = StepSolver::Picard {
            r_tol: 0.0,
            a_tol: 1e-14,
            max_iter: 200,
        };
        let a = integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &tight(), |_, _, _, _| Ok(()))
            .unwrap();
        let b = integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &picard, |_, _, _, _| Ok(()))
            .unwrap();
        for k in 0..grid.len() {
            assert!((a[[0, k]] - b[[0, k]]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_observer_sees_every_step_and_can_abort() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let grid = uniform_grid(0.1, 5);
        let mut seen = Vec::new();
        integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &tight(), |k, _, _, _| {
            seen.push(k);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);

        let result = integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &tight(), |k, _, _, _| {
            if k == 2 {
                Err(VlasovError::ConfigError("stop".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_divergence_names_the_step() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let grid = uniform_grid(0.1, 3);
        let starved = StepSolver::Picard {
            r_tol: 0.0,
            a_tol: 1e-30,
            max_iter: 1,
        };
        let err = integrate_implicit_midpoint(&sys, &[1.0, 0.0], &grid, &starved, |_, _, _, _| Ok(()))
            .unwrap_err();
        match err {
            VlasovError::SolverDiverged { message, .. } => assert!(message.contains("step 1")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
