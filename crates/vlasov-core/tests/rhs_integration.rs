//! End-to-end checks of the packed RHS, the correction scalars and the driver.

use ndarray::{Array1, Array2};
use ndarray_npy::read_npy;
use vlasov_core::advection::rhs_species;
use vlasov_core::driver::{run, simulate};
use vlasov_core::initial::initial_state;
use vlasov_core::rhs::VlasovRhs;
use vlasov_math::hermite::{integral_i0, integral_i1};
use vlasov_types::config::{FieldSolverKind, SimulationConfig};
use vlasov_types::error::VlasovError;
use vlasov_types::state::{pack, species_view, unpack, CorrectionScalars};

fn corrections_of(dy: &[f64], rhs: &VlasovRhs) -> CorrectionScalars {
    CorrectionScalars::from_slots(&dy[rhs.layout().corrections_offset()..])
}

/// Every mode carries the fundamental with its own phase, so the field
/// overlaps the top mode.
fn rich_state(cfg: &SimulationConfig) -> Array1<f64> {
    let layout = cfg.grid.layout();
    let n = layout.n_periodic();
    let x = vlasov_core::initial::periodic_nodes(cfg);
    let k = 2.0 * std::f64::consts::PI / cfg.grid.length;
    let grid = |shift: f64, base: f64| {
        Array2::from_shape_fn((layout.nv, n), |(m, j)| {
            let wave = (k * x[j] + 0.9 * m as f64 + shift).cos();
            if m == 0 {
                base * (1.0 + 0.2 * wave)
            } else {
                0.3 * wave / (m as f64).sqrt()
            }
        })
    };
    pack(&grid(0.1, 0.7), &grid(1.3, 0.2), &CorrectionScalars::default(), &layout)
}

#[test]
fn uniform_density_gives_zero_field() {
    let mut cfg = SimulationConfig::small(11, 5);
    cfg.initial.epsilon = 0.0;
    let rhs = VlasovRhs::new(&cfg).unwrap();
    let y0 = initial_state(&cfg);
    let e = rhs.electric_field(y0.as_slice().unwrap()).unwrap();
    assert_eq!(e.len(), 10);
    assert!(e.iter().all(|v| v.abs() < 1e-12), "{e:?}");

    let dy = rhs.evaluate(y0.as_slice().unwrap()).unwrap();
    let c = corrections_of(dy.as_slice().unwrap(), &rhs);
    for v in c.to_slots() {
        assert!(v.abs() < 1e-12, "{c:?}");
    }
}

#[test]
fn evaluation_is_pure_and_sized() {
    let cfg = SimulationConfig::small(11, 5);
    let rhs = VlasovRhs::new(&cfg).unwrap();
    let y = rich_state(&cfg);
    let before = y.clone();
    let a = rhs.evaluate(y.as_slice().unwrap()).unwrap();
    let b = rhs.evaluate(y.as_slice().unwrap()).unwrap();
    assert_eq!(a.len(), 2 * 5 * 10 + 5);
    assert_eq!(y, before);
    for (p, q) in a.iter().zip(b.iter()) {
        assert_eq!(p.to_bits(), q.to_bits());
    }
}

#[test]
fn corrections_do_not_feed_back() {
    let cfg = SimulationConfig::small(11, 4);
    let rhs = VlasovRhs::new(&cfg).unwrap();
    let y = rich_state(&cfg);
    let mut shifted = y.clone();
    let offset = rhs.layout().corrections_offset();
    for v in shifted.iter_mut().skip(offset) {
        *v += 3.0;
    }
    let a = rhs.evaluate(y.as_slice().unwrap()).unwrap();
    let b = rhs.evaluate(shifted.as_slice().unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn mass_leak_matches_mass_even_scalar() {
    let nv = 6;
    let cfg = SimulationConfig::small(13, nv);
    let rhs = VlasovRhs::new(&cfg).unwrap();
    let y = rich_state(&cfg);
    let dy = rhs.evaluate(y.as_slice().unwrap()).unwrap();
    let dy = dy.as_slice().unwrap();
    let dx = cfg.grid.dx();

    let mut leak = 0.0;
    for s in 0..2 {
        let alpha = rhs.species()[s].alpha;
        let d = species_view(dy, rhs.layout(), s);
        for n in 0..nv {
            leak += dx * alpha * integral_i0(n as isize) * d.row(n).sum();
        }
    }
    let c = corrections_of(dy, &rhs);
    assert!(c.mass_even.abs() > 1e-8, "test state produces no leak");
    assert!((leak - c.mass_even).abs() < 1e-12 * (1.0 + c.mass_even.abs()), "{leak} vs {c:?}");
}

#[test]
fn top_mode_momentum_leak_matches_momentum_odd_scalar() {
    // odd Nv keeps B = (Nv-1) I0(Nv-1) nonzero
    let nv = 5;
    let cfg = SimulationConfig::small(11, nv);
    let rhs = VlasovRhs::new(&cfg).unwrap();
    let n = cfg.grid.n_periodic();
    let dx = cfg.grid.dx();
    let p = rhs.species()[1];

    let mut grid = Array2::zeros((nv, n));
    for j in 0..n {
        grid[[nv - 1, j]] = (0.7 * j as f64).sin() + 0.2;
    }
    let e: Vec<f64> = (0..n).map(|j| 0.05 * (1.1 * j as f64).cos()).collect();
    let d = rhs_species(grid.view(), &p, rhs.derivative(), &e);

    let leak: f64 = (0..nv)
        .map(|m| p.mass * dx * p.alpha * p.alpha * integral_i1(m as isize) * d.row(m).sum())
        .sum();
    let top = [grid.row(nv - 1)];
    let c = rhs.corrections().compute(&top, &[p], &e);
    assert!(c.momentum_odd.abs() > 1e-6);
    assert!(
        (leak - c.momentum_odd).abs() < 1e-12 * (1.0 + leak.abs()),
        "{leak} vs {}",
        c.momentum_odd
    );
}

#[test]
fn odd_nv_routes_field_work_into_odd_scalars() {
    let nv = 5;
    let cfg = SimulationConfig::small(11, nv);
    let rhs = VlasovRhs::new(&cfg).unwrap();
    let y = rich_state(&cfg);
    let y = y.as_slice().unwrap();
    let dy = rhs.evaluate(y).unwrap();
    let c = corrections_of(dy.as_slice().unwrap(), &rhs);

    let e = rhs.electric_field(y).unwrap();
    let dx = cfg.grid.dx();
    let b = (nv - 1) as f64 * integral_i0(nv as isize - 1);
    let mut momentum = 0.0;
    let mut energy = 0.0;
    for s in 0..2 {
        let p = rhs.species()[s];
        let ec = e.dot(&species_view(y, rhs.layout(), s).row(nv - 1));
        momentum += p.alpha * p.charge * ec;
        energy += p.u * p.charge * ec;
    }
    let (momentum, energy) = (-dx * b * momentum, -dx * b * energy);

    // only the beam drifts, so energy_odd is its work alone
    assert!(c.momentum_odd.abs() > 1e-8 && c.energy_odd.abs() > 1e-8, "{c:?}");
    assert!((c.momentum_odd - momentum).abs() < 1e-12 * (1.0 + momentum.abs()));
    assert!((c.energy_odd - energy).abs() < 1e-12 * (1.0 + energy.abs()));
    assert_eq!(c.mass_even, 0.0);
    assert_eq!(c.energy_even, 0.0);
}

#[test]
fn gmres_and_fft_fields_agree() {
    let mut cfg = SimulationConfig::small(101, 3);
    let y0 = initial_state(&cfg);
    let e_gmres = VlasovRhs::new(&cfg)
        .unwrap()
        .electric_field(y0.as_slice().unwrap())
        .unwrap();
    cfg.field.method = FieldSolverKind::Fft;
    let e_fft = VlasovRhs::new(&cfg)
        .unwrap()
        .electric_field(y0.as_slice().unwrap())
        .unwrap();

    // a single resolved mode: central differences see k as sin(k dx) / dx
    let theta = cfg.initial.wavenumber * cfg.grid.dx();
    let symbol_ratio = theta / theta.sin();
    let peak = e_fft.iter().fold(0.0_f64, |a, v| a.max(v.abs()));
    assert!(peak > 0.0);
    for (a, b) in e_gmres.iter().zip(e_fft.iter()) {
        assert!((a - symbol_ratio * b).abs() < 1e-9 * peak, "{a} vs {b}");
    }
}

#[test]
fn moments_reject_wrong_length() {
    let cfg = SimulationConfig::small(11, 3);
    let rhs = VlasovRhs::new(&cfg).unwrap();
    assert!(matches!(rhs.moments(&[0.0; 7]), Err(VlasovError::ConfigError(_))));
}

#[test]
fn invalid_grid_is_rejected() {
    let cfg = SimulationConfig::small(2, 3);
    assert!(matches!(VlasovRhs::new(&cfg), Err(VlasovError::ConfigError(_))));
}

#[test]
fn picard_run_conserves_corrected_mass() {
    let mut cfg = SimulationConfig::small(11, 6);
    cfg.time.dt = 0.05;
    cfg.time.t_final = 0.2;
    cfg.solver.kind = vlasov_types::config::NonlinearSolverKind::Picard;
    cfg.solver.max_iter = 200;
    let out = simulate(&cfg).unwrap();
    assert_eq!(out.steps(), 4);
    let drift = out.last.corrected_mass() - out.initial.corrected_mass();
    assert!(drift.abs() < 1e-8, "drift {drift}");
}

#[test]
fn run_writes_trajectory_and_times() {
    let dir = std::env::temp_dir().join(format!("vlasov-core-run-{}", std::process::id()));
    let mut cfg = SimulationConfig::small(11, 5);
    cfg.time.dt = 0.1;
    cfg.time.t_final = 0.2;
    cfg.output.directory = dir.to_string_lossy().to_string();
    cfg.output.prefix = "sol_test".to_string();
    cfg.output.log_every = 1;

    let (out, paths) = run(&cfg).unwrap();
    let u: Array2<f64> = read_npy(&paths.solution).unwrap();
    let t: Array1<f64> = read_npy(&paths.times).unwrap();
    assert_eq!(u.dim(), (2 * 5 * 10 + 5, 3));
    assert_eq!(t.len(), 3);
    assert!((t[2] - 0.2).abs() < 1e-15);
    assert_eq!(u, out.trajectory);

    // column 0 is the initial state unchanged
    let y0 = initial_state(&cfg);
    assert_eq!(u.column(0).to_owned(), y0);
    let states = unpack(u.column(2).to_vec().as_slice(), &cfg.grid.layout(), cfg.species.ion.alpha);
    assert!(states.electron_core.iter().all(|v| v.is_finite()));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn mass_even_scalar_stays_zero_for_odd_nv() {
    // Nv = 5: I0(Nv-2) = I0(3) = 0, so the scalar has no source
    let mut cfg = SimulationConfig::small(11, 5);
    cfg.time.dt = 0.05;
    cfg.time.t_final = 0.15;
    let out = simulate(&cfg).unwrap();
    let slot = cfg.grid.layout().state_len() - 1;
    for k in 0..out.trajectory.ncols() {
        assert!(out.trajectory[[slot, k]].abs() < 1e-12, "step {k}");
    }
    assert_eq!(out.last.corrections.mass_even, out.trajectory[[slot, 3]]);
}
