//! Red-black Gauss-Seidel on the reduced interface system.
//!
//! All modes iterate together: interface values for every mode travel in one
//! buffer per neighbour link and convergence is judged per mode from
//! globally reduced residual norms, so every rank freezes a mode in the same
//! iteration.

use crate::config::SolverOptions;
use crate::error::LapError;
use crate::mesh::Mesh1D;
use crate::parallel::Comm;
use crate::solver::interface::{LocalElimination, ReducedLevel, solve_serial};
use crate::solver::{ModeSystem, ReducedSolver};
use crate::utils::{IterationStats, Tolerances};

pub struct RedBlackSolver {
    mesh: Mesh1D,
    tol: Tolerances,
    maxits: usize,
    stats: IterationStats,
}

impl RedBlackSolver {
    pub fn new(mesh: Mesh1D, options: &SolverOptions) -> Self {
        Self {
            mesh,
            tol: Tolerances {
                atol: options.atol,
                rtol: options.rtol,
            },
            maxits: options.maxits,
            stats: IterationStats::default(),
        }
    }
}

impl ReducedSolver for RedBlackSolver {
    fn solve_plane(
        &mut self,
        comm: &dyn Comm,
        systems: &mut [ModeSystem],
    ) -> Result<usize, LapError> {
        let mesh = self.mesh.clone();
        if mesh.nxpe == 1 {
            for sys in systems.iter_mut() {
                solve_serial(sys, &mesh)?;
            }
            self.stats.record(0);
            return Ok(0);
        }

        let eliminations = systems
            .iter()
            .map(|sys| LocalElimination::new(sys, &mesh))
            .collect::<Result<Vec<_>, _>>()?;
        let coeffs = eliminations
            .iter()
            .map(|e| e.coeffs(&mesh))
            .collect::<Vec<_>>();
        let mut level = ReducedLevel::new(0, coeffs);

        let nm = systems.len();
        let mut converged = vec![false; nm];
        let mut count = 0_usize;
        loop {
            level.sweep(comm, &mesh, &converged);
            count += 1;
            if level.check_convergence(comm, &self.tol, &mut converged) {
                break;
            }
            if count > self.maxits {
                let jy = systems.first().map(|s| s.jy).unwrap_or(0);
                return Err(if level.all_dominant(comm) {
                    LapError::MaxitsDominant {
                        maxits: self.maxits,
                        rank: comm.rank(),
                        jy,
                    }
                } else {
                    LapError::MaxitsNotDominant {
                        maxits: self.maxits,
                        rank: comm.rank(),
                        jy,
                    }
                });
            }
        }

        // Halos of modes frozen mid-sweep may be stale; refresh both links
        // before reconstruction.
        level.synchronize(comm, &mesh);
        for (sys, (elim, w)) in systems
            .iter_mut()
            .zip(eliminations.iter().zip(&level.windows))
        {
            elim.reconstruct(w[0], w[3], &mut sys.x);
        }
        self.stats.record(count);
        Ok(count)
    }

    fn mean_iterations(&self) -> f64 {
        self.stats.mean_iterations()
    }

    fn reset_solver(&mut self) {
        self.stats.reset();
    }
}
