//! 1D FFT wrappers around rustfft.
//!
//! Convention matches numpy:
//! - Forward FFT (fft): unnormalized
//! - Inverse FFT (ifft): normalized by 1/n

use num_complex::Complex64;
use rustfft::FftPlanner;

/// Forward FFT of a real signal. Matches `numpy.fft.fft()`.
pub fn fft_1d(input: &[f64]) -> Vec<Complex64> {
    let mut data: Vec<Complex64> = input.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    if data.is_empty() {
        return data;
    }
    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(data.len()).process(&mut data);
    data
}

/// Inverse FFT returning the real part. Matches `numpy.fft.ifft().real`.
pub fn ifft_1d(input: &[Complex64]) -> Vec<f64> {
    if input.is_empty() {
        return Vec::new();
    }
    let n = input.len();
    let mut data = input.to_vec();
    let mut planner = FftPlanner::new();
    planner.plan_fft_inverse(n).process(&mut data);
    let norm = 1.0 / n as f64;
    data.iter().map(|c| c.re * norm).collect()
}

/// Angular wavenumbers for a periodic domain of `length` sampled at `n`
/// points, in FFT order. Matches `2*pi*numpy.fft.fftfreq(n, length/n)`.
pub fn wavenumbers(n: usize, length: f64) -> Vec<f64> {
    let base = 2.0 * std::f64::consts::PI / length;
    (0..n)
        .map(|k| {
            let signed = if k <= (n - 1) / 2 {
                k as f64
            } else {
                k as f64 - n as f64
            };
            base * signed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_roundtrip() {
        let original: Vec<f64> = (0..16).map(|i| (i as f64 * 0.4).sin() + 0.1 * i as f64).collect();
        let recovered = ifft_1d(&fft_1d(&original));
        for (i, (&a, &b)) in original.iter().zip(recovered.iter()).enumerate() {
            assert!((a - b).abs() < 1e-12, "roundtrip failed at {i}: {a} vs {b}");
        }
    }

    #[test]
    fn test_fft_dc_component() {
        let spectrum = fft_1d(&[3.0; 8]);
        assert!((spectrum[0].re - 24.0).abs() < 1e-12);
        assert!(spectrum[0].im.abs() < 1e-12);
        assert!(spectrum[1..].iter().all(|c| c.norm() < 1e-12));
    }

    #[test]
    fn test_fft_single_mode() {
        let n = 10;
        let input: Vec<f64> = (0..n)
            .map(|j| (2.0 * std::f64::consts::PI * 2.0 * j as f64 / n as f64).cos())
            .collect();
        let spectrum = fft_1d(&input);
        assert!((spectrum[2].re - 5.0).abs() < 1e-10);
        assert!((spectrum[8].re - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_wavenumbers_order() {
        let k = wavenumbers(5, 2.0 * std::f64::consts::PI);
        assert_eq!(k, vec![0.0, 1.0, 2.0, -2.0, -1.0]);
        let k = wavenumbers(4, 2.0 * std::f64::consts::PI);
        assert_eq!(k, vec![0.0, 1.0, -2.0, -1.0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(fft_1d(&[]).is_empty());
        assert!(ifft_1d(&[]).is_empty());
    }
}
