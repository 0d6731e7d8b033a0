//! API options for the Laplacian inversion solvers.
//!
//! This module provides the `SolverOptions` struct holding the tunable
//! parameters shared by all inversion variants (tolerances, iteration caps,
//! multigrid depth), and the invert-flag bitmasks controlling boundary
//! treatment and Fourier-mode post-processing.

use bitflags::bitflags;

bitflags! {
    /// Flags applying to the whole inversion.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GlobalFlags: u32 {
        /// Zero the DC (kz = 0) component of the result.
        const ZERO_DC = 0x01;
        /// Subtract the x-mean of the kz = 0 mode from the result.
        const KX_ZERO = 0x02;
        /// Use one guard cell on both boundaries.
        const BOTH_BNDRY_ONE = 0x04;
        /// Use a discrete sine transform in z instead of an FFT.
        const DST = 0x08;
    }
}

bitflags! {
    /// Flags applying to one (inner or outer) radial boundary.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BoundaryFlags: u32 {
        /// Zero-gradient (Neumann) boundary rather than zero-value.
        const AC_GRAD = 0x01;
        /// Set the boundary value from the initial-guess field.
        const SET = 0x02;
        /// Use one guard cell on this boundary only.
        const BNDRY_ONE = 0x04;
    }
}

/// Combined flag set consumed by the row builder and the solve entry points.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertFlags {
    pub global: GlobalFlags,
    pub inner: BoundaryFlags,
    pub outer: BoundaryFlags,
}

impl InvertFlags {
    /// Whether tridiagonal coefficients depend only on A/C/D and may be
    /// cached between calls. `SET` and `AC_GRAD` couple the boundary rows to
    /// the per-call RHS or guess, forcing recomputation every solve.
    pub fn store_coefficients(&self) -> bool {
        !self.inner.intersects(BoundaryFlags::AC_GRAD | BoundaryFlags::SET)
            && !self.outer.intersects(BoundaryFlags::AC_GRAD | BoundaryFlags::SET)
    }
}

/// Tolerances & iteration limits shared by the inversion variants.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Relative convergence tolerance.
    pub rtol: f64,
    /// Absolute convergence tolerance.
    pub atol: f64,
    /// Maximum number of iterations before the solve is abandoned.
    pub maxits: usize,
    /// Maximum number of coarse grids (multigrid variant).
    pub max_level: usize,
    /// Smoothing sweeps per grid before changing level (multigrid variant).
    pub max_cycle: usize,
    /// Predict the converging cycle and skip early convergence checks.
    pub predict_exit: bool,
    /// Reuse the previous solve's solution as the initial guess.
    pub use_previous_timestep: bool,
    /// 0 = no checks, >2 = check solution for non-finite values.
    pub check_level: u8,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            rtol: 1e-7,
            atol: 1e-20,
            maxits: 100,
            max_level: 1,
            max_cycle: 3,
            predict_exit: false,
            use_previous_timestep: false,
            check_level: 0,
        }
    }
}
