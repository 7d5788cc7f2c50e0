//! Spectral advection evaluator.
//!
//! Hermite-mode recursion of the 1D Vlasov equation for one species:
//!
//! ```text
//! dC_m/dt = - alpha ( sqrt(m/2) D C_{m-1} + sqrt((m+1)/2) D C_{m+1} )
//!           - u D C_m
//!           - q / (mass alpha) E ⊙ ( sqrt((m+1)/2) C_{m+1} - sqrt(m/2) C_{m-1} )
//! ```
//!
//! Modes outside `0..Nv` are absent; the recursion is truncated at both ends.

use ndarray::{Array2, ArrayView1, ArrayView2};
use vlasov_math::finite_difference::PeriodicDerivative;
use vlasov_types::config::SpeciesParams;

fn row_vec(grid: &ArrayView2<'_, f64>, m: usize) -> Vec<f64> {
    grid.row(m).to_vec()
}

/// Combine precomputed derivatives into `dC_m/dt`.
///
/// `d_prev`, `d_curr`, `d_next` are `D C_{m-1}`, `D C_m`, `D C_{m+1}`;
/// `c_prev` / `c_next` the raw neighbours. Absent neighbours are `None`.
#[allow(clippy::too_many_arguments)]
fn assemble_mode(
    m: usize,
    params: &SpeciesParams,
    e: &[f64],
    c_prev: Option<ArrayView1<'_, f64>>,
    c_next: Option<ArrayView1<'_, f64>>,
    d_prev: Option<&[f64]>,
    d_curr: &[f64],
    d_next: Option<&[f64]>,
    out: &mut [f64],
) {
    let lower = (m as f64 / 2.0).sqrt();
    let upper = ((m as f64 + 1.0) / 2.0).sqrt();
    let accel = params.charge / (params.mass * params.alpha);

    for (j, o) in out.iter_mut().enumerate() {
        let mut streaming = 0.0;
        let mut field = 0.0;
        if let (Some(dp), Some(cp)) = (d_prev, c_prev.as_ref()) {
            streaming += lower * dp[j];
            field -= lower * cp[j];
        }
        if let (Some(dn), Some(cn)) = (d_next, c_next.as_ref()) {
            streaming += upper * dn[j];
            field += upper * cn[j];
        }
        *o = -params.alpha * streaming - params.u * d_curr[j] - accel * e[j] * field;
    }
}

/// `dC_m/dt` for a single mode `m` of `grid` (`(Nv, Nx-1)`), written to `out`.
pub fn rhs_mode(
    grid: ArrayView2<'_, f64>,
    m: usize,
    params: &SpeciesParams,
    derivative: &PeriodicDerivative,
    e: &[f64],
    out: &mut [f64],
) {
    let (nv, n) = grid.dim();
    assert!(m < nv, "mode {m} out of range for {nv} modes");
    assert_eq!(e.len(), n, "field length mismatch");
    assert_eq!(out.len(), n, "output length mismatch");

    let derive = |k: usize| {
        let mut d = vec![0.0; n];
        derivative.apply(&row_vec(&grid, k), &mut d);
        d
    };
    let d_prev = (m > 0).then(|| derive(m - 1));
    let d_curr = derive(m);
    let d_next = (m + 1 < nv).then(|| derive(m + 1));

    assemble_mode(
        m,
        params,
        e,
        (m > 0).then(|| grid.row(m - 1)),
        (m + 1 < nv).then(|| grid.row(m + 1)),
        d_prev.as_deref(),
        &d_curr,
        d_next.as_deref(),
        out,
    );
}

/// `dC/dt` for every mode of one species; differentiates each row once.
pub fn rhs_species(
    grid: ArrayView2<'_, f64>,
    params: &SpeciesParams,
    derivative: &PeriodicDerivative,
    e: &[f64],
) -> Array2<f64> {
    let (nv, n) = grid.dim();
    assert_eq!(e.len(), n, "field length mismatch");

    let mut d_grid = vec![vec![0.0; n]; nv];
    for (m, d) in d_grid.iter_mut().enumerate() {
        derivative.apply(&row_vec(&grid, m), d);
    }

    let mut out = Array2::zeros((nv, n));
    let mut buf = vec![0.0; n];
    for m in 0..nv {
        assemble_mode(
            m,
            params,
            e,
            (m > 0).then(|| grid.row(m - 1)),
            (m + 1 < nv).then(|| grid.row(m + 1)),
            (m > 0).then(|| d_grid[m - 1].as_slice()),
            &d_grid[m],
            (m + 1 < nv).then(|| d_grid[m + 1].as_slice()),
            &mut buf,
        );
        out.row_mut(m)
            .iter_mut()
            .zip(buf.iter())
            .for_each(|(o, &v)| *o = v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn species() -> SpeciesParams {
        SpeciesParams {
            charge: -1.0,
            mass: 1.0,
            alpha: 0.5,
            u: 1.5,
        }
    }

    fn sample(nv: usize, n: usize, shift: f64) -> Array2<f64> {
        Array2::from_shape_fn((nv, n), |(m, j)| {
            ((m + 1) as f64 * 0.4 + j as f64 * 0.9 + shift).sin() / (m + 1) as f64
        })
    }

    fn field(n: usize) -> Vec<f64> {
        (0..n).map(|j| 0.1 * (j as f64 * 0.6).cos()).collect()
    }

    #[test]
    fn test_mode_matches_species_helper() {
        let grid = sample(6, 12, 0.3);
        let d = PeriodicDerivative::new(0.4, 2).unwrap();
        let e = field(12);
        let all = rhs_species(grid.view(), &species(), &d, &e);
        let mut out = vec![0.0; 12];
        for m in 0..6 {
            rhs_mode(grid.view(), m, &species(), &d, &e, &mut out);
            for j in 0..12 {
                assert_eq!(out[j].to_bits(), all[[m, j]].to_bits(), "m={m} j={j}");
            }
        }
    }

    #[test]
    fn test_linear_in_coefficients() {
        let a = sample(5, 10, 0.0);
        let b = sample(5, 10, 1.7);
        let d = PeriodicDerivative::new(0.3, 2).unwrap();
        let e = field(10);
        let combo = &a * 2.0 - &b * 0.5;

        let ra = rhs_species(a.view(), &species(), &d, &e);
        let rb = rhs_species(b.view(), &species(), &d, &e);
        let rc = rhs_species(combo.view(), &species(), &d, &e);
        for ((x, y), z) in ra.iter().zip(rb.iter()).zip(rc.iter()) {
            assert!((2.0 * x - 0.5 * y - z).abs() < 1e-12);
        }
    }

    #[test]
    fn test_free_streaming_of_single_mode() {
        // zero field, only mode 0 populated, u = 0: dC_1/dt = -alpha sqrt(1/2) D C_0
        let n = 8;
        let mut grid = Array2::zeros((3, n));
        for j in 0..n {
            grid[[0, j]] = (j as f64).sin();
        }
        let p = SpeciesParams {
            u: 0.0,
            ..species()
        };
        let d = PeriodicDerivative::new(0.25, 2).unwrap();
        let out = rhs_species(grid.view(), &p, &d, &vec![0.0; n]);

        let mut dc0 = vec![0.0; n];
        d.apply(grid.row(0).as_slice().unwrap(), &mut dc0);
        for j in 0..n {
            assert_eq!(out[[0, j]], 0.0);
            let expected = -p.alpha * 0.5_f64.sqrt() * dc0[j];
            assert!((out[[1, j]] - expected).abs() < 1e-14);
            assert_eq!(out[[2, j]], 0.0);
        }
    }

    #[test]
    fn test_acceleration_couples_neighbours() {
        // spatially uniform grid: D C = 0, only the field term survives
        let n = 5;
        let grid = Array2::from_shape_fn((3, n), |(m, _)| (m + 1) as f64);
        let p = species();
        let d = PeriodicDerivative::new(1.0, 2).unwrap();
        let e = vec![0.2; n];
        let out = rhs_species(grid.view(), &p, &d, &e);
        let accel = p.charge / (p.mass * p.alpha);
        // m = 1: -accel E (sqrt(1) C_2 - sqrt(1/2) C_0)
        let expected = -accel * 0.2 * (1.0 * 3.0 - 0.5_f64.sqrt() * 1.0);
        assert!((out[[1, 0]] - expected).abs() < 1e-14);
        // top mode has no upper neighbour
        let expected_top = -accel * 0.2 * (-(1.0_f64).sqrt() * 2.0);
        assert!((out[[2, 0]] - expected_top).abs() < 1e-14);
    }

    #[test]
    fn test_single_mode_species() {
        let grid = sample(1, 6, 0.0);
        let d = PeriodicDerivative::new(0.5, 2).unwrap();
        let out = rhs_species(grid.view(), &species(), &d, &field(6));
        let mut dc = vec![0.0; 6];
        d.apply(&grid.row(0).to_vec(), &mut dc);
        for j in 0..6 {
            assert!((out[[0, j]] + species().u * dc[j]).abs() < 1e-14);
        }
    }
}
