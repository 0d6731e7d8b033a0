//! Direct solution of one local tridiagonal system.

use num_complex::Complex64;

use crate::error::LapError;

/// Thomas algorithm for `a[i]·x[i-1] + b[i]·x[i] + c[i]·x[i+1] = r[i]`.
///
/// `a[0]` and `c[n-1]` are ignored. Fails with [`LapError::ZeroPivot`] when
/// the elimination hits a vanishing pivot.
pub fn tridag(
    a: &[Complex64],
    b: &[Complex64],
    c: &[Complex64],
    r: &[Complex64],
    x: &mut [Complex64],
) -> Result<(), LapError> {
    let n = b.len();
    debug_assert!(a.len() == n && c.len() == n && r.len() == n && x.len() == n);

    let mut gamma = vec![Complex64::new(0.0, 0.0); n];
    let mut beta = b[0];
    if beta.norm_sqr() == 0.0 {
        return Err(LapError::ZeroPivot(0));
    }
    x[0] = r[0] / beta;
    for i in 1..n {
        gamma[i] = c[i - 1] / beta;
        beta = b[i] - a[i] * gamma[i];
        if beta.norm_sqr() == 0.0 {
            return Err(LapError::ZeroPivot(i));
        }
        x[i] = (r[i] - a[i] * x[i - 1]) / beta;
    }
    for i in (0..n - 1).rev() {
        let correction = gamma[i + 1] * x[i + 1];
        x[i] -= correction;
    }
    Ok(())
}

/// Cyclic Thomas solve via the Sherman-Morrison correction.
///
/// The wraparound couplings are `a[0]` (first row to `x[n-1]`) and `c[n-1]`
/// (last row to `x[0]`).
pub fn cyclic_tridag(
    a: &[Complex64],
    b: &[Complex64],
    c: &[Complex64],
    r: &[Complex64],
    x: &mut [Complex64],
) -> Result<(), LapError> {
    let n = b.len();
    debug_assert!(n >= 3, "cyclic systems need at least three rows");

    let alpha = a[0];
    let beta = c[n - 1];
    let gamma = -b[0];

    let mut bb = b.to_vec();
    bb[0] = b[0] - gamma;
    bb[n - 1] = b[n - 1] - alpha * beta / gamma;

    tridag(a, &bb, c, r, x)?;

    let mut u = vec![Complex64::new(0.0, 0.0); n];
    u[0] = gamma;
    u[n - 1] = beta;
    let mut z = vec![Complex64::new(0.0, 0.0); n];
    tridag(a, &bb, c, &u, &mut z)?;

    let fact = (x[0] + alpha * x[n - 1] / gamma) / (Complex64::new(1.0, 0.0) + z[0] + alpha * z[n - 1] / gamma);
    for i in 0..n {
        let correction = fact * z[i];
        x[i] -= correction;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn residual(
        a: &[Complex64],
        b: &[Complex64],
        c: &[Complex64],
        r: &[Complex64],
        x: &[Complex64],
        cyclic: bool,
    ) -> f64 {
        let n = b.len();
        let mut worst = 0.0_f64;
        for i in 0..n {
            let mut y = b[i] * x[i];
            if i > 0 {
                y += a[i] * x[i - 1];
            } else if cyclic {
                y += a[0] * x[n - 1];
            }
            if i < n - 1 {
                y += c[i] * x[i + 1];
            } else if cyclic {
                y += c[n - 1] * x[0];
            }
            worst = worst.max((y - r[i]).norm());
        }
        worst
    }

    fn random_system(n: usize, seed: u64) -> (Vec<Complex64>, Vec<Complex64>, Vec<Complex64>, Vec<Complex64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut c64 = |scale: f64| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * scale;
        let a: Vec<_> = (0..n).map(|_| c64(1.0)).collect();
        let c: Vec<_> = (0..n).map(|_| c64(1.0)).collect();
        // Diagonally dominant so the solve is well conditioned.
        let b: Vec<_> = (0..n)
            .map(|i| c64(0.5) + Complex64::new(4.0 + i as f64 * 0.1, 0.0))
            .collect();
        let r: Vec<_> = (0..n).map(|_| c64(2.0)).collect();
        (a, b, c, r)
    }

    #[test]
    fn solves_random_dominant_system() {
        let (a, b, c, r) = random_system(24, 7);
        let mut x = vec![Complex64::default(); 24];
        tridag(&a, &b, &c, &r, &mut x).unwrap();
        assert_abs_diff_eq!(residual(&a, &b, &c, &r, &x, false), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn cyclic_satisfies_wrapped_rows() {
        let (a, b, c, r) = random_system(17, 11);
        let mut x = vec![Complex64::default(); 17];
        cyclic_tridag(&a, &b, &c, &r, &mut x).unwrap();
        assert_abs_diff_eq!(residual(&a, &b, &c, &r, &x, true), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn reports_zero_pivot() {
        let n = 4;
        let a = vec![Complex64::new(1.0, 0.0); n];
        let mut b = vec![Complex64::new(2.0, 0.0); n];
        b[0] = Complex64::default();
        let c = vec![Complex64::new(1.0, 0.0); n];
        let r = vec![Complex64::new(1.0, 0.0); n];
        let mut x = vec![Complex64::default(); n];
        match tridag(&a, &b, &c, &r, &mut x) {
            Err(LapError::ZeroPivot(0)) => {}
            other => panic!("expected zero pivot at row 0, got {other:?}"),
        }
    }
}
