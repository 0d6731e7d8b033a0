//! Fourier-mode decomposition along the periodic z direction.
//!
//! `forward`/`inverse` are the half-spectrum real FFT pair used by the
//! standard solve path; `forward_sin`/`inverse_sin` are the DST-I pair used
//! when the z boundary conditions require odd symmetry. The forward FFT is
//! normalized by `1/nz` so mode amplitudes are resolution independent, and
//! the inverse is exact.

use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// Plan cache for all z transforms at a fixed resolution.
pub struct ModeTransform {
    nz: usize,
    fft_forward: Arc<dyn Fft<f64>>,
    fft_inverse: Arc<dyn Fft<f64>>,
    /// Odd-extension plan of length `2*(nz-1)` backing the DST-I pair over
    /// the `nz-2` interior points.
    sin_forward: Arc<dyn Fft<f64>>,
}

impl ModeTransform {
    pub fn new(nz: usize) -> Self {
        assert!(nz >= 2, "z transforms need at least two points");
        let mut planner = FftPlanner::new();
        Self {
            nz,
            fft_forward: planner.plan_fft_forward(nz),
            fft_inverse: planner.plan_fft_inverse(nz),
            sin_forward: planner.plan_fft_forward(2 * (nz - 1)),
        }
    }

    /// Number of distinct Fourier modes, DC and Nyquist included.
    pub fn nmodes(&self) -> usize {
        self.nz / 2 + 1
    }

    /// Half spectrum of a real z row, normalized by `1/nz`.
    pub fn forward(&self, row: &[f64]) -> Vec<Complex64> {
        debug_assert_eq!(row.len(), self.nz);
        let mut buf: Vec<Complex64> = row.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.fft_forward.process(&mut buf);
        let norm = 1.0 / self.nz as f64;
        buf.truncate(self.nmodes());
        for v in &mut buf {
            *v *= norm;
        }
        buf
    }

    /// Real z row from a half spectrum, inverse of [`forward`](Self::forward).
    pub fn inverse(&self, modes: &[Complex64]) -> Vec<f64> {
        let nz = self.nz;
        let mut buf = vec![Complex64::new(0.0, 0.0); nz];
        let nk = modes.len().min(self.nmodes());
        buf[..nk].copy_from_slice(&modes[..nk]);
        // Conjugate symmetry fills the upper half; for even nz the Nyquist
        // bin keeps the value set above.
        for k in 1..nz - nz / 2 {
            if k < nk {
                buf[nz - k] = modes[k].conj();
            }
        }
        self.fft_inverse.process(&mut buf);
        buf.into_iter().map(|v| v.re).collect()
    }

    /// DST-I of the `nz-2` interior points, normalized by `2/(nz-1)`.
    pub fn forward_sin(&self, interior: &[f64]) -> Vec<f64> {
        let n = self.nz - 2;
        debug_assert_eq!(interior.len(), n);
        let raw = self.sin_sums(interior);
        let norm = 2.0 / (n + 1) as f64;
        raw.into_iter().map(|s| s * norm).collect()
    }

    /// Unnormalized sine synthesis, exact inverse of
    /// [`forward_sin`](Self::forward_sin).
    pub fn inverse_sin(&self, coeffs: &[f64]) -> Vec<f64> {
        self.sin_sums(coeffs)
    }

    /// `out[k] = sum_j f[j]·sin(pi·(j+1)·(k+1)/(n+1))` via an odd extension
    /// of length `2*(n+1)`.
    fn sin_sums(&self, f: &[f64]) -> Vec<f64> {
        let n = f.len();
        let m = 2 * (n + 1);
        debug_assert_eq!(self.sin_forward.len(), m);
        let mut buf = vec![Complex64::new(0.0, 0.0); m];
        for (j, &v) in f.iter().enumerate() {
            buf[j + 1] = Complex64::new(v, 0.0);
            buf[m - 1 - j] = Complex64::new(-v, 0.0);
        }
        self.sin_forward.process(&mut buf);
        (1..=n).map(|k| -0.5 * buf[k].im).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn fft_round_trip() {
        let nz = 16;
        let t = ModeTransform::new(nz);
        let row: Vec<f64> = (0..nz)
            .map(|i| {
                let th = 2.0 * PI * i as f64 / nz as f64;
                1.5 + th.cos() - 0.7 * (3.0 * th).sin()
            })
            .collect();
        let back = t.inverse(&t.forward(&row));
        for (a, b) in row.iter().zip(&back) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn forward_isolates_single_mode() {
        let nz = 32;
        let t = ModeTransform::new(nz);
        let row: Vec<f64> = (0..nz)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / nz as f64).cos())
            .collect();
        let modes = t.forward(&row);
        for (k, m) in modes.iter().enumerate() {
            let expect = if k == 5 { 0.5 } else { 0.0 };
            assert_abs_diff_eq!(m.re, expect, epsilon = 1e-12);
            assert_abs_diff_eq!(m.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn dc_mode_is_mean() {
        let nz = 8;
        let t = ModeTransform::new(nz);
        let row: Vec<f64> = (0..nz).map(|i| i as f64).collect();
        let modes = t.forward(&row);
        assert_abs_diff_eq!(modes[0].re, 3.5, epsilon = 1e-12);
    }

    #[test]
    fn sine_round_trip() {
        let nz = 18;
        let n = nz - 2;
        let t = ModeTransform::new(nz);
        let interior: Vec<f64> = (0..n).map(|j| (j as f64 * 0.37).sin() + 0.2).collect();
        let back = t.inverse_sin(&t.forward_sin(&interior));
        for (a, b) in interior.iter().zip(&back) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn sine_matches_direct_sum() {
        let nz = 10;
        let n = nz - 2;
        let t = ModeTransform::new(nz);
        let interior: Vec<f64> = (0..n).map(|j| 1.0 / (j + 1) as f64).collect();
        let coeffs = t.forward_sin(&interior);
        for k in 0..n {
            let direct: f64 = interior
                .iter()
                .enumerate()
                .map(|(j, &v)| {
                    v * (PI * (j + 1) as f64 * (k + 1) as f64 / (n + 1) as f64).sin()
                })
                .sum();
            assert_abs_diff_eq!(coeffs[k], 2.0 * direct / (n + 1) as f64, epsilon = 1e-12);
        }
    }
}
