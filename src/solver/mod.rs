//! Distributed solvers for the per-mode reduced systems.
//!
//! Each variant consumes fully assembled local tridiagonal systems (one per
//! Fourier mode) and produces the local mode solution, communicating with
//! the x neighbours as needed. Variant selection is a configuration-time
//! choice through [`SolverKind`].

use num_complex::Complex64;

use crate::error::LapError;
use crate::parallel::Comm;

pub mod interface;
pub mod multigrid;
pub mod parallel_tri;
pub mod pcr;
pub mod red_black;

pub use multigrid::MultigridSolver;
pub use parallel_tri::ParallelTriSolver;
pub use pcr::PcrSolver;
pub use red_black::RedBlackSolver;

/// Algorithm used for the distributed tridiagonal solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Guard-vector direct elimination with a Jacobi interface iteration.
    ParallelTri,
    /// Red-black Gauss-Seidel on the reduced interface system.
    RedBlack,
    /// Reduced interface system inside a V-cycle over merged rank groups.
    Multigrid,
    /// Parallel cyclic reduction, direct (non-iterative).
    Pcr,
}

/// One mode's local tridiagonal system and its solution slot.
///
/// Arrays span the full local x extent, guard cells included; internal
/// decomposition guard rows are identity rows by the time a solver sees
/// them.
#[derive(Debug, Clone)]
pub struct ModeSystem {
    pub jy: usize,
    pub kz: usize,
    pub avec: Vec<Complex64>,
    pub bvec: Vec<Complex64>,
    pub cvec: Vec<Complex64>,
    pub rhs: Vec<Complex64>,
    pub x: Vec<Complex64>,
}

impl ModeSystem {
    pub fn new(jy: usize, kz: usize, ncx: usize) -> Self {
        let zeros = vec![Complex64::default(); ncx];
        Self {
            jy,
            kz,
            avec: zeros.clone(),
            bvec: zeros.clone(),
            cvec: zeros.clone(),
            rhs: zeros.clone(),
            x: zeros,
        }
    }

    pub fn len(&self) -> usize {
        self.bvec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvec.is_empty()
    }
}

/// Common contract of the four solver variants.
pub trait ReducedSolver {
    /// Solve every mode system of one y plane (or a batch of planes for the
    /// direct variants), writing solutions into `ModeSystem::x`. Returns the
    /// iteration count consumed.
    fn solve_plane(
        &mut self,
        comm: &dyn Comm,
        systems: &mut [ModeSystem],
    ) -> Result<usize, LapError>;

    /// Running mean of iteration counts since construction or the last
    /// reset.
    fn mean_iterations(&self) -> f64;

    /// Drop cached state (previous solutions, iteration statistics).
    fn reset_solver(&mut self);
}
