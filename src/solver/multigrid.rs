//! Two-level (and deeper) multigrid over the reduced interface system.
//!
//! Coarsening halves the number of active ranks per level: each surviving
//! rank absorbs its outward neighbour's interface relation through the exact
//! pairwise merge, so a coarse level is again a reduced interface system of
//! the same shape spanning twice the radial extent. Coarse levels solve
//! error equations with restricted-residual right-hand sides and red-black
//! smoothing; corrections are back-substituted through the merge on the way
//! up.

use num_complex::Complex64;

use crate::config::SolverOptions;
use crate::error::LapError;
use crate::mesh::Mesh1D;
use crate::parallel::{Comm, recv_complex, send_complex};
use crate::solver::interface::{
    InterfaceCoeffs, LocalElimination, MergeBack, ReducedLevel, solve_serial,
};
use crate::solver::{ModeSystem, ReducedSolver};
use crate::utils::{IterationStats, Tolerances};

fn tag_setup(level: usize) -> u16 {
    0x0500 + level as u16
}

fn tag_restrict(level: usize) -> u16 {
    0x0600 + level as u16
}

fn tag_prolong(level: usize) -> u16 {
    0x0700 + level as u16
}

/// One coarse level as seen by a rank that participates in it.
struct MgLevel {
    reduced: ReducedLevel,
    /// Exact-merge back-substitution data, one per mode, when this level was
    /// built by absorbing a partner. Carry-up levels (partner beyond the
    /// grid edge) have none.
    merge: Option<Vec<MergeBack>>,
    /// Rank of the absorbed partner.
    partner: Option<usize>,
    /// Per-cycle residuals needed by the back-substitution: `(upper of own
    /// fine block, lower of partner block)` per mode.
    cycle_res: Vec<(Complex64, Complex64)>,
}

/// Per-rank view of the level hierarchy for one plane.
struct Hierarchy {
    /// Levels this rank participates in; index equals the level number.
    levels: Vec<MgLevel>,
    /// When the rank stops participating above its top level, the rank that
    /// absorbed it there.
    ceded_to: Option<usize>,
    n_levels: usize,
}

impl Hierarchy {
    /// Exchange interface relations once and merge upward.
    fn build(
        comm: &dyn Comm,
        mesh: &Mesh1D,
        base: Vec<InterfaceCoeffs>,
        n_levels: usize,
    ) -> Result<Self, LapError> {
        let nm = base.len();
        let mut levels = vec![MgLevel {
            reduced: ReducedLevel::new(0, base),
            merge: None,
            partner: None,
            cycle_res: Vec::new(),
        }];
        let mut ceded_to = None;

        for l in 1..=n_levels {
            let stride_prev = 1 << (l - 1);
            let stride = 1 << l;
            if mesh.xproc % stride_prev != 0 {
                break;
            }
            let prev = levels[l - 1].reduced.coeffs.clone();
            if mesh.xproc % stride == 0 {
                let q = mesh.xproc + stride_prev;
                if q < mesh.nxpe {
                    let mut wire = vec![Complex64::default(); 6 * nm];
                    recv_complex(comm, q, tag_setup(l), &mut wire);
                    let mut merged = Vec::with_capacity(nm);
                    let mut backs = Vec::with_capacity(nm);
                    for (m, a) in prev.iter().enumerate() {
                        let b = InterfaceCoeffs {
                            al: wire[6 * m],
                            bl: wire[6 * m + 1],
                            au: wire[6 * m + 2],
                            bu: wire[6 * m + 3],
                            rl: wire[6 * m + 4],
                            ru: wire[6 * m + 5],
                        };
                        let (c, back) = InterfaceCoeffs::merge(a, &b)?;
                        merged.push(c);
                        backs.push(back);
                    }
                    levels.push(MgLevel {
                        reduced: ReducedLevel::new(l, merged),
                        merge: Some(backs),
                        partner: Some(q),
                        cycle_res: vec![Default::default(); nm],
                    });
                } else {
                    // Odd tail of the decomposition: the relation rides up
                    // unchanged.
                    levels.push(MgLevel {
                        reduced: ReducedLevel::new(l, prev.clone()),
                        merge: None,
                        partner: None,
                        cycle_res: Vec::new(),
                    });
                }
            } else {
                let p = mesh.xproc - stride_prev;
                let mut wire = Vec::with_capacity(6 * nm);
                for c in prev {
                    wire.extend_from_slice(&[c.al, c.bl, c.au, c.bu, c.rl, c.ru]);
                }
                send_complex(comm, p, tag_setup(l), &wire);
                ceded_to = Some(p);
                break;
            }
        }

        Ok(Self {
            levels,
            ceded_to,
            n_levels,
        })
    }

    fn top(&self) -> usize {
        self.levels.len() - 1
    }

    /// Move the defect of level `l` into the right-hand side of level
    /// `l + 1`, zeroing the coarse error estimate.
    fn restrict(&mut self, comm: &dyn Comm, l: usize) {
        let res = self.levels[l].reduced.residuals();
        if l == self.top() {
            if let Some(p) = self.ceded_to {
                if l + 1 <= self.n_levels {
                    let mut wire = Vec::with_capacity(2 * res.len());
                    for (rl, ru) in &res {
                        wire.extend_from_slice(&[*rl, *ru]);
                    }
                    send_complex(comm, p, tag_restrict(l + 1), &wire);
                }
            }
            return;
        }

        let coarse = &mut self.levels[l + 1];
        match (&coarse.merge, coarse.partner) {
            (Some(backs), Some(q)) => {
                let nm = res.len();
                let mut wire = vec![Complex64::default(); 2 * nm];
                recv_complex(comm, q, tag_restrict(l + 1), &mut wire);
                for m in 0..nm {
                    let (res_la, res_ua) = res[m];
                    let (res_lb, res_ub) = (wire[2 * m], wire[2 * m + 1]);
                    coarse.cycle_res[m] = (res_ua, res_lb);
                    let (crl, cru) = backs[m].restrict(res_la, res_ua, res_lb, res_ub);
                    coarse.reduced.coeffs[m].rl = crl;
                    coarse.reduced.coeffs[m].ru = cru;
                }
            }
            _ => {
                for (c, (rl, ru)) in coarse.reduced.coeffs.iter_mut().zip(&res) {
                    c.rl = *rl;
                    c.ru = *ru;
                }
            }
        }
        coarse.reduced.zero_windows();
    }

    /// Add the coarse error estimate of level `l + 1` into the interface
    /// values of level `l`.
    fn prolong(&mut self, comm: &dyn Comm, mesh: &Mesh1D, l: usize, frozen: &[bool]) {
        let nm = self.levels[l].reduced.windows.len();
        if l == self.top() {
            if let Some(p) = self.ceded_to {
                if l + 1 <= self.n_levels {
                    let mut wire = vec![Complex64::default(); 2 * nm];
                    recv_complex(comm, p, tag_prolong(l + 1), &mut wire);
                    for (m, w) in self.levels[l].reduced.windows.iter_mut().enumerate() {
                        if frozen.get(m).copied().unwrap_or(false) {
                            continue;
                        }
                        w[1] += wire[2 * m];
                        w[2] += wire[2 * m + 1];
                    }
                }
            }
            self.levels[l].reduced.synchronize(comm, mesh);
            return;
        }

        let (fine_levels, coarse_levels) = self.levels.split_at_mut(l + 1);
        let fine = &mut fine_levels[l];
        let coarse = &coarse_levels[0];
        match (&coarse.merge, coarse.partner) {
            (Some(backs), Some(q)) => {
                let mut wire = Vec::with_capacity(2 * nm);
                for m in 0..nm {
                    let cw = &coarse.reduced.windows[m];
                    let (res_ua, res_lb) = coarse.cycle_res[m];
                    let (e2a, e1b) = backs[m].inner(res_ua, res_lb, cw[0], cw[3]);
                    wire.extend_from_slice(&[e1b, cw[2]]);
                    if frozen.get(m).copied().unwrap_or(false) {
                        continue;
                    }
                    let w = &mut fine.reduced.windows[m];
                    w[1] += cw[1];
                    w[2] += e2a;
                }
                send_complex(comm, q, tag_prolong(l + 1), &wire);
            }
            _ => {
                for (m, w) in fine.reduced.windows.iter_mut().enumerate() {
                    if frozen.get(m).copied().unwrap_or(false) {
                        continue;
                    }
                    let cw = &coarse.reduced.windows[m];
                    w[1] += cw[1];
                    w[2] += cw[2];
                }
            }
        }
        fine.reduced.synchronize(comm, mesh);
    }
}

pub struct MultigridSolver {
    mesh: Mesh1D,
    tol: Tolerances,
    maxits: usize,
    max_level: usize,
    max_cycle: usize,
    predict_exit: bool,
    stats: IterationStats,
}

impl MultigridSolver {
    pub fn new(mesh: Mesh1D, options: &SolverOptions) -> Self {
        Self {
            mesh,
            tol: Tolerances {
                atol: options.atol,
                rtol: options.rtol,
            },
            maxits: options.maxits,
            max_level: options.max_level,
            max_cycle: options.max_cycle,
            predict_exit: options.predict_exit,
            stats: IterationStats::default(),
        }
    }

    /// Deepest level the decomposition supports, capped by configuration.
    fn levels_for(&self) -> usize {
        let mut l = 0;
        while (2 << l) <= self.mesh.nxpe && l < self.max_level {
            l += 1;
        }
        l
    }

    /// One V-cycle over the hierarchy. Frozen modes keep their values at
    /// every level.
    fn cycle(&self, comm: &dyn Comm, h: &mut Hierarchy, frozen: &[bool]) {
        let mesh = &self.mesh;
        let top = h.top();

        for l in 0..h.n_levels {
            if l <= top {
                for _ in 0..self.max_cycle {
                    h.levels[l].reduced.sweep(comm, mesh, frozen);
                }
                h.restrict(comm, l);
            }
        }
        // Coarsest-level solve: smoothing only, but on a system a factor
        // 2^n_levels smaller in rank count.
        if top == h.n_levels {
            for _ in 0..2 * self.max_cycle {
                h.levels[top].reduced.sweep(comm, mesh, frozen);
            }
        }
        for l in (0..h.n_levels).rev() {
            if l <= top {
                h.prolong(comm, mesh, l, frozen);
                for _ in 0..self.max_cycle {
                    h.levels[l].reduced.sweep(comm, mesh, frozen);
                }
            }
        }
    }
}

impl ReducedSolver for MultigridSolver {
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
        let base = eliminations
            .iter()
            .map(|e| e.coeffs(&mesh))
            .collect::<Vec<_>>();
        let n_levels = self.levels_for();
        let mut h = Hierarchy::build(comm, &mesh, base, n_levels)?;

        let nm = systems.len();
        let mut converged = vec![false; nm];
        let mut count = 0_usize;
        // Error history for the convergence-cycle prediction.
        let mut err_prev = 0.0_f64;
        let mut eta = 0.0_f64;

        loop {
            self.cycle(comm, &mut h, &converged);
            count += 1;

            let skip_check = self.predict_exit && count > 3 && (count as f64) < eta;
            if !skip_check {
                if h.levels[0]
                    .reduced
                    .check_convergence(comm, &self.tol, &mut converged)
                {
                    break;
                }
                if self.predict_exit && count <= 3 {
                    let (abs, _) = h.levels[0].reduced.global_errors(comm);
                    let err = abs.iter().cloned().fold(0.0_f64, f64::max);
                    if count == 3 && err_prev > 0.0 && err > 0.0 && err < err_prev {
                        // Extrapolate the contraction rate to the cycle that
                        // reaches atol and skip the collectives until then.
                        let ratio = err / err_prev;
                        eta = 3.0 + (self.tol.atol / err).ln() / ratio.ln();
                        eta = eta.min(self.maxits as f64);
                    }
                    err_prev = err;
                }
            }

            if count > self.maxits {
                let jy = systems.first().map(|s| s.jy).unwrap_or(0);
                return Err(if h.levels[0].reduced.all_dominant(comm) {
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

        h.levels[0].reduced.synchronize(comm, &mesh);
        for (sys, (elim, w)) in systems
            .iter_mut()
            .zip(eliminations.iter().zip(&h.levels[0].reduced.windows))
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
