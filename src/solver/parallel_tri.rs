//! Guard-vector direct elimination with a Jacobi interface iteration.
//!
//! Each rank eliminates its local system once, leaving a 2x2 affine relation
//! between its interface values and the neighbours' halos. The relation is
//! then iterated Jacobi-style, one paired neighbour exchange per mode per
//! iteration, with an in-band convergence handshake: a converged rank
//! announces `done` in its last exchange and both sides retire the link.

use std::collections::HashMap;

use num_complex::Complex64;

use crate::config::SolverOptions;
use crate::error::LapError;
use crate::mesh::Mesh1D;
use crate::parallel::{Comm, HaloMessage, sendrecv_message};
use crate::solver::interface::{LocalElimination, Window, solve_serial};
use crate::solver::{ModeSystem, ReducedSolver};
use crate::utils::{ConvergenceFlags, IterationStats, Tolerances};

fn tag_handshake(kz: usize) -> u16 {
    kz as u16
}

fn tag_guess(kz: usize) -> u16 {
    0x0400 + kz as u16
}

pub struct ParallelTriSolver {
    mesh: Mesh1D,
    tol: Tolerances,
    maxits: usize,
    use_previous_timestep: bool,
    stats: IterationStats,
    /// Converged interface windows, keyed by `(jy, kz)`, reused as the next
    /// solve's starting guess.
    saved_windows: HashMap<(usize, usize), Window>,
}

impl ParallelTriSolver {
    pub fn new(mesh: Mesh1D, options: &SolverOptions) -> Self {
        Self {
            mesh,
            tol: Tolerances {
                atol: options.atol,
                rtol: options.rtol,
            },
            maxits: options.maxits,
            use_previous_timestep: options.use_previous_timestep,
            stats: IterationStats::default(),
            saved_windows: HashMap::new(),
        }
    }

    /// Truncated two-rank elimination across each link: assume the far halo
    /// is zero and solve the remaining 2x2 exactly. All ranks must call this
    /// for the same mode together.
    fn initial_guess(
        &self,
        comm: &dyn Comm,
        kz: usize,
        elim: &LocalElimination,
    ) -> Window {
        let c = elim.coeffs(&self.mesh);
        let zero = Complex64::default();
        let mut w: Window = [zero; 4];

        if let Some(pin) = self.mesh.proc_in() {
            // Trade my lower row for the neighbour's upper row.
            let mut back = [0.0; 4];
            comm.sendrecv(
                pin,
                tag_guess(kz),
                &[c.al.re, c.al.im, c.rl.re, c.rl.im],
                tag_guess(kz),
                &mut back,
            );
            let bu_n = Complex64::new(back[0], back[1]);
            let ru_n = Complex64::new(back[2], back[3]);
            let det = Complex64::new(1.0, 0.0) - c.al * bu_n;
            if det.norm_sqr() > 0.0 {
                w[0] = (ru_n + bu_n * c.rl) / det;
            }
        }
        if let Some(pout) = self.mesh.proc_out() {
            let mut back = [0.0; 4];
            comm.sendrecv(
                pout,
                tag_guess(kz),
                &[c.bu.re, c.bu.im, c.ru.re, c.ru.im],
                tag_guess(kz),
                &mut back,
            );
            let al_n = Complex64::new(back[0], back[1]);
            let rl_n = Complex64::new(back[2], back[3]);
            let det = Complex64::new(1.0, 0.0) - c.bu * al_n;
            if det.norm_sqr() > 0.0 {
                w[3] = (rl_n + al_n * c.ru) / det;
            }
        }
        // Interface values stay at the zero-halo local solve; the first
        // iteration folds the guessed halos in and measures that change.
        w[1] = c.rl;
        w[2] = c.ru;
        w
    }

    /// Iterate one mode's interface relation to convergence.
    ///
    /// A mode that exhausts `maxits` is not reported here: the rank keeps
    /// exchanging with `done` set so the neighbours can retire the link and
    /// the remaining modes of the plane stay paired across ranks. The cap
    /// is reported once the plane completes.
    fn solve_mode(
        &mut self,
        comm: &dyn Comm,
        sys: &mut ModeSystem,
    ) -> Result<ModeOutcome, LapError> {
        let mesh = self.mesh.clone();
        let elim = LocalElimination::new(sys, &mesh)?;
        let coeffs = elim.coeffs(&mesh);
        let key = (sys.jy, sys.kz);

        let mut w = if self.use_previous_timestep {
            match self.saved_windows.get(&key) {
                Some(saved) => *saved,
                None => self.initial_guess(comm, sys.kz, &elim),
            }
        } else {
            self.initial_guess(comm, sys.kz, &elim)
        };

        let mut flags = ConvergenceFlags::new(mesh.first_x(), mesh.last_x());
        let tag = tag_handshake(sys.kz);
        let xs = mesh.xstart;
        let xe = mesh.xend;
        let mut count = 0_usize;
        let mut capped = false;

        loop {
            let wlast = w;

            // Physical-boundary halos follow from the local elimination.
            if mesh.first_x() {
                w[0] = elim.minvb[xs - 1] + elim.upper[xs - 1] * wlast[3];
            }
            if mesh.last_x() {
                w[3] = elim.minvb[xe + 1] + elim.lower[xe + 1] * wlast[0];
            }
            let (x1, x2) = coeffs.update(wlast[0], wlast[3]);
            w[1] = x1;
            w[2] = x2;

            let error_abs = (w[1] - wlast[1]).norm() + (w[2] - wlast[2]).norm();
            let xabs = w[1].norm().min(w[2].norm());
            let error_rel = if xabs > 0.0 { error_abs / xabs } else { error_abs };
            if self.tol.met(error_abs, error_rel) {
                flags.self_in = true;
                flags.self_out = true;
            }

            if !flags.neighbour_in {
                if let Some(pin) = mesh.proc_in() {
                    let reply = sendrecv_message(
                        comm,
                        pin,
                        tag,
                        HaloMessage {
                            value: w[1],
                            done: flags.self_in,
                        },
                    );
                    w[0] = reply.value;
                    flags.neighbour_in |= reply.done;
                }
            }
            if !flags.neighbour_out {
                if let Some(pout) = mesh.proc_out() {
                    let reply = sendrecv_message(
                        comm,
                        pout,
                        tag,
                        HaloMessage {
                            value: w[2],
                            done: flags.self_out,
                        },
                    );
                    w[3] = reply.value;
                    flags.neighbour_out |= reply.done;
                }
            }

            if flags.all_done() {
                break;
            }
            // One extra sweep with the neighbours' final values before
            // stopping on their account.
            flags.absorb_neighbours();

            count += 1;
            if count > self.maxits && !flags.all_done() {
                // Give up refining this mode but stay in the loop,
                // announcing `done`, until the neighbours retire the link.
                capped = true;
                flags.self_in = true;
                flags.self_out = true;
            }
        }

        if !capped {
            if self.use_previous_timestep {
                self.saved_windows.insert(key, w);
            }
            elim.reconstruct(w[0], w[3], &mut sys.x);
        }
        Ok(ModeOutcome {
            count,
            capped,
            dominant: coeffs.is_dominant(),
        })
    }
}

/// Per-mode result of the interface iteration.
struct ModeOutcome {
    count: usize,
    capped: bool,
    /// Local dominance of the mode's interface couplings, used to classify
    /// an iteration-cap failure.
    dominant: bool,
}

impl ReducedSolver for ParallelTriSolver {
    fn solve_plane(
        &mut self,
        comm: &dyn Comm,
        systems: &mut [ModeSystem],
    ) -> Result<usize, LapError> {
        if self.mesh.nxpe == 1 {
            for sys in systems.iter_mut() {
                solve_serial(sys, &self.mesh)?;
            }
            self.stats.record(0);
            return Ok(0);
        }
        let mut max_count = 0;
        let mut capped: Option<(bool, usize)> = None;
        for sys in systems.iter_mut() {
            let outcome = self.solve_mode(comm, sys)?;
            max_count = max_count.max(outcome.count);
            if outcome.capped && capped.is_none() {
                capped = Some((outcome.dominant, sys.jy));
            }
        }
        self.stats.record(max_count);
        if let Some((dominant, jy)) = capped {
            return Err(if dominant {
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
        Ok(max_count)
    }

    fn mean_iterations(&self) -> f64 {
        self.stats.mean_iterations()
    }

    fn reset_solver(&mut self) {
        self.saved_windows.clear();
        self.stats.reset();
    }
}
