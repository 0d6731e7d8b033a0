//! Parallel cyclic reduction: a direct, non-iterative distributed solve.
//!
//! Local rows are first reduced by cyclic reduction until one row per rank
//! remains, the rank-level system is then solved by parallel cyclic
//! reduction with hypercube exchanges, and the local rows are recovered by
//! back substitution. The decomposition must be a power of two in both rank
//! count and global interior size so every reduction level is exact.

use num_complex::Complex64;

use crate::config::SolverOptions;
use crate::error::LapError;
use crate::mesh::Mesh1D;
use crate::parallel::{Comm, pack_complex, recv_complex, send_complex, unpack_complex};
use crate::solver::{ModeSystem, ReducedSolver};
use crate::utils::IterationStats;

fn tag_cr(level: usize) -> u16 {
    0x0300 + level as u16
}

fn tag_pcr_down(level: usize) -> u16 {
    0x0310 + level as u16
}

fn tag_pcr_up(level: usize) -> u16 {
    0x0330 + level as u16
}

const TAG_FINAL_DOWN: u16 = 0x0350;
const TAG_FINAL_UP: u16 = 0x0351;
const TAG_BACKWARD: u16 = 0x0352;
const TAG_GUARD_IN: u16 = 0x0353;
const TAG_GUARD_OUT: u16 = 0x0354;

/// Reduction workspace: per system, the interior rows padded with an
/// identity row on either end for the neighbour couplings.
struct Padded {
    a: Vec<Complex64>,
    b: Vec<Complex64>,
    c: Vec<Complex64>,
    r: Vec<Complex64>,
    x: Vec<Complex64>,
    /// Row stride, `n_mpi + 2`.
    w: usize,
    nsys: usize,
}

impl Padded {
    fn new(nsys: usize, n_mpi: usize) -> Self {
        let w = n_mpi + 2;
        let zero = Complex64::default();
        let one = Complex64::new(1.0, 0.0);
        let mut b = vec![zero; nsys * w];
        for s in 0..nsys {
            b[s * w] = one;
            b[s * w + w - 1] = one;
        }
        Self {
            a: vec![zero; nsys * w],
            b,
            c: vec![zero; nsys * w],
            r: vec![zero; nsys * w],
            x: vec![zero; nsys * w],
            w,
            nsys,
        }
    }

    fn idx(&self, s: usize, i: usize) -> usize {
        s * self.w + i
    }
}

pub struct PcrSolver {
    mesh: Mesh1D,
    /// Interior rows per rank.
    n_mpi: usize,
    /// Local cyclic-reduction levels, `log2(n_mpi)`.
    nlevel_local: usize,
    /// Rank-level reduction levels, `log2(nxpe)`.
    nlevel_rank: usize,
    check_level: u8,
    /// Residual measured after the last solve, when `check_level > 1`.
    last_residual: Option<f64>,
    stats: IterationStats,
}

impl PcrSolver {
    /// All preconditions are checked here, before any communication.
    pub fn new(mesh: Mesh1D, options: &SolverOptions) -> Result<Self, LapError> {
        if mesh.periodic_x {
            return Err(LapError::Unsupported(
                "cyclic reduction does not handle a periodic x direction",
            ));
        }
        if mesh.nxpe == 1 {
            return Err(LapError::Unsupported(
                "cyclic reduction needs more than one x rank; use the serial Thomas path",
            ));
        }
        if !mesh.nxpe.is_power_of_two() {
            return Err(LapError::Unsupported(
                "cyclic reduction needs a power-of-two x rank count",
            ));
        }
        let n_mpi = mesh.interior_len();
        if !(n_mpi * mesh.nxpe).is_power_of_two() {
            return Err(LapError::Unsupported(
                "cyclic reduction needs a power-of-two global interior size",
            ));
        }
        let nlevel_local = n_mpi.trailing_zeros() as usize;
        let nlevel_rank = mesh.nxpe.trailing_zeros() as usize;
        Ok(Self {
            mesh,
            n_mpi,
            nlevel_local,
            nlevel_rank,
            check_level: options.check_level,
            last_residual: None,
            stats: IterationStats::default(),
        })
    }

    /// Fold the physical boundary rows adjacent to the interior into the
    /// first/last interior row, so the reduction only sees interior rows.
    /// Boundary rows have no coupling past themselves, which keeps the fold
    /// a single elimination per side.
    fn eliminate_boundary_rows(&self, sys: &ModeSystem) -> (Vec<Complex64>, Vec<Complex64>, Vec<Complex64>, Vec<Complex64>) {
        let mut a = sys.avec.clone();
        let mut b = sys.bvec.clone();
        let mut c = sys.cvec.clone();
        let mut r = sys.rhs.clone();
        let xs = self.mesh.xstart;
        let xe = self.mesh.xend;
        if self.mesh.first_x() {
            let f = a[xs] / b[xs - 1];
            let folded = f * r[xs - 1];
            b[xs] -= f * c[xs - 1];
            r[xs] -= folded;
            a[xs] = Complex64::default();
        }
        if self.mesh.last_x() {
            let f = c[xe] / b[xe + 1];
            let folded = f * r[xe + 1];
            b[xe] -= f * a[xe + 1];
            r[xe] -= folded;
            c[xe] = Complex64::default();
        }
        (a, b, c, r)
    }

    /// Reduce the local rows until a single row per rank remains.
    fn cr_forward_multiple_row(&self, comm: &dyn Comm, p: &mut Padded) {
        let n = self.n_mpi;
        let mut dist_row = 1_usize;
        let mut dist2_row = 2_usize;
        for level in 0..self.nlevel_local {
            // Ship the lowest active row inward; it becomes the upper
            // coupling row of the inner neighbour.
            if self.mesh.xproc > 0 {
                let mut buf = Vec::with_capacity(4 * p.nsys);
                for s in 0..p.nsys {
                    let i = p.idx(s, dist_row);
                    buf.extend_from_slice(&[p.a[i], p.b[i], p.c[i], p.r[i]]);
                }
                send_complex(comm, self.mesh.xproc - 1, tag_cr(level), &buf);
            }
            if self.mesh.xproc < self.mesh.nxpe - 1 {
                let mut buf = vec![Complex64::default(); 4 * p.nsys];
                recv_complex(comm, self.mesh.xproc + 1, tag_cr(level), &mut buf);
                for s in 0..p.nsys {
                    let i = p.idx(s, n + 1);
                    p.a[i] = buf[4 * s];
                    p.b[i] = buf[4 * s + 1];
                    p.c[i] = buf[4 * s + 2];
                    p.r[i] = buf[4 * s + 3];
                }
            }
            for s in 0..p.nsys {
                let mut i = dist2_row;
                while i <= n {
                    let ip = p.idx(s, i - dist_row);
                    let inn = p.idx(s, (i + dist_row).min(n + 1));
                    let ii = p.idx(s, i);
                    let alpha = -p.a[ii] / p.b[ip];
                    let gamma = -p.c[ii] / p.b[inn];
                    let folded = alpha * p.r[ip] + gamma * p.r[inn];
                    p.b[ii] += alpha * p.c[ip] + gamma * p.a[inn];
                    p.r[ii] += folded;
                    p.a[ii] = alpha * p.a[ip];
                    p.c[ii] = gamma * p.c[inn];
                    i += dist2_row;
                }
            }
            dist_row = dist2_row;
            dist2_row *= 2;
        }
    }

    /// Parallel cyclic reduction over the one-row-per-rank system; solves
    /// row `n_mpi` of every system.
    fn pcr_forward_single_row(&self, comm: &dyn Comm, p: &mut Padded) -> Result<(), LapError> {
        let n = self.n_mpi;
        let rank = self.mesh.xproc;
        let nprocs = self.mesh.nxpe;

        let gather = |p: &Padded, row: usize| {
            let mut buf = Vec::with_capacity(4 * p.nsys);
            for s in 0..p.nsys {
                let i = p.idx(s, row);
                buf.extend_from_slice(&[p.a[i], p.b[i], p.c[i], p.r[i]]);
            }
            buf
        };
        let scatter = |p: &mut Padded, row: usize, buf: &[Complex64]| {
            for s in 0..p.nsys {
                let i = p.idx(s, row);
                p.a[i] = buf[4 * s];
                p.b[i] = buf[4 * s + 1];
                p.c[i] = buf[4 * s + 2];
                p.r[i] = buf[4 * s + 3];
            }
        };
        let exchange = |p: &mut Padded,
                        peer: usize,
                        send_tag: u16,
                        recv_tag: u16,
                        into_row: usize| {
            let send = pack_complex(&gather(p, n));
            let mut wire = vec![0.0; 8 * p.nsys];
            comm.sendrecv(peer, send_tag, &send, recv_tag, &mut wire);
            let mut buf = vec![Complex64::default(); 4 * p.nsys];
            unpack_complex(&wire, &mut buf);
            scatter(p, into_row, &buf);
        };

        for level in 0..self.nlevel_rank.saturating_sub(1) {
            let d = 1 << level;
            let lower = rank >= d;
            let upper = rank + d < nprocs;
            if lower {
                exchange(p, rank - d, tag_pcr_down(level), tag_pcr_up(level), 0);
            }
            if upper {
                exchange(p, rank + d, tag_pcr_up(level), tag_pcr_down(level), n + 1);
            }
            for s in 0..p.nsys {
                let i0 = p.idx(s, 0);
                let ii = p.idx(s, n);
                let it = p.idx(s, n + 1);
                let alpha = if lower {
                    -p.a[ii] / p.b[i0]
                } else {
                    Complex64::default()
                };
                let gamma = if upper {
                    -p.c[ii] / p.b[it]
                } else {
                    Complex64::default()
                };
                let folded = alpha * p.r[i0] + gamma * p.r[it];
                p.b[ii] += alpha * p.c[i0] + gamma * p.a[it];
                p.r[ii] += folded;
                p.a[ii] = alpha * p.a[i0];
                p.c[ii] = gamma * p.c[it];
            }
        }

        // Closing 2x2 with the hypercube partner across the halves.
        let nh = nprocs / 2;
        if rank < nh {
            exchange(p, rank + nh, TAG_FINAL_UP, TAG_FINAL_DOWN, n + 1);
            for s in 0..p.nsys {
                let ii = p.idx(s, n);
                let it = p.idx(s, n + 1);
                let det = p.b[ii] * p.b[it] - p.c[ii] * p.a[it];
                if det.norm_sqr() == 0.0 {
                    return Err(LapError::ZeroPivot(n));
                }
                p.x[ii] = (p.r[ii] * p.b[it] - p.r[it] * p.c[ii]) / det;
            }
        } else {
            exchange(p, rank - nh, TAG_FINAL_DOWN, TAG_FINAL_UP, 0);
            for s in 0..p.nsys {
                let i0 = p.idx(s, 0);
                let ii = p.idx(s, n);
                let det = p.b[i0] * p.b[ii] - p.c[i0] * p.a[ii];
                if det.norm_sqr() == 0.0 {
                    return Err(LapError::ZeroPivot(n));
                }
                p.x[ii] = (p.r[ii] * p.b[i0] - p.r[i0] * p.a[ii]) / det;
            }
        }
        Ok(())
    }

    /// Back-substitute the remaining local rows, level by level.
    fn cr_backward_multiple_row(&self, comm: &dyn Comm, p: &mut Padded) -> Result<(), LapError> {
        let n = self.n_mpi;
        // The solved row travels outward to seed the neighbour's row 0.
        if self.mesh.xproc < self.mesh.nxpe - 1 {
            let buf: Vec<Complex64> = (0..p.nsys).map(|s| p.x[p.idx(s, n)]).collect();
            send_complex(comm, self.mesh.xproc + 1, TAG_BACKWARD, &buf);
        }
        if self.mesh.xproc > 0 {
            let mut buf = vec![Complex64::default(); p.nsys];
            recv_complex(comm, self.mesh.xproc - 1, TAG_BACKWARD, &mut buf);
            for (s, v) in buf.into_iter().enumerate() {
                let i = p.idx(s, 0);
                p.x[i] = v;
            }
        }

        let mut dist_row = n / 2;
        while dist_row >= 1 {
            for s in 0..p.nsys {
                let mut i = dist_row;
                while i <= n - dist_row {
                    let ii = p.idx(s, i);
                    if p.b[ii].norm_sqr() == 0.0 {
                        return Err(LapError::ZeroPivot(i));
                    }
                    p.x[ii] = (p.r[ii]
                        - p.a[ii] * p.x[p.idx(s, i - dist_row)]
                        - p.c[ii] * p.x[p.idx(s, i + dist_row)])
                        / p.b[ii];
                    i += 2 * dist_row;
                }
            }
            dist_row /= 2;
        }
        Ok(())
    }

    /// Recover physical boundary cells from the original boundary rows.
    fn apply_boundary_conditions(&self, sys: &mut ModeSystem) {
        let xs = self.mesh.xstart;
        let xe = self.mesh.xend;
        let ncx = sys.len();
        if self.mesh.first_x() {
            for ix in (0..xs).rev() {
                sys.x[ix] = (sys.rhs[ix] - sys.cvec[ix] * sys.x[ix + 1]) / sys.bvec[ix];
            }
        }
        if self.mesh.last_x() {
            for ix in xe + 1..ncx {
                sys.x[ix] = (sys.rhs[ix] - sys.avec[ix] * sys.x[ix - 1]) / sys.bvec[ix];
            }
        }
    }

    /// Fill internal-boundary guard cells with the neighbours' edge values.
    fn fill_guards(&self, comm: &dyn Comm, systems: &mut [ModeSystem]) {
        let g = self.mesh.xstart;
        let xs = self.mesh.xstart;
        let xe = self.mesh.xend;
        if let Some(pin) = self.mesh.proc_in() {
            let mut send = Vec::with_capacity(g * systems.len());
            for sys in systems.iter() {
                send.extend_from_slice(&sys.x[xs..xs + g]);
            }
            let send = pack_complex(&send);
            let mut wire = vec![0.0; send.len()];
            comm.sendrecv(pin, TAG_GUARD_IN, &send, TAG_GUARD_OUT, &mut wire);
            let mut recv = vec![Complex64::default(); wire.len() / 2];
            unpack_complex(&wire, &mut recv);
            for (s, sys) in systems.iter_mut().enumerate() {
                sys.x[..g].copy_from_slice(&recv[s * g..(s + 1) * g]);
            }
        }
        if let Some(pout) = self.mesh.proc_out() {
            let mut send = Vec::with_capacity(g * systems.len());
            for sys in systems.iter() {
                send.extend_from_slice(&sys.x[xe + 1 - g..=xe]);
            }
            let send = pack_complex(&send);
            let mut wire = vec![0.0; send.len()];
            comm.sendrecv(pout, TAG_GUARD_OUT, &send, TAG_GUARD_IN, &mut wire);
            let mut recv = vec![Complex64::default(); wire.len() / 2];
            unpack_complex(&wire, &mut recv);
            for (s, sys) in systems.iter_mut().enumerate() {
                sys.x[xe + 1..xe + 1 + g].copy_from_slice(&recv[s * g..(s + 1) * g]);
            }
        }
    }

    /// Residual of the last solve, measured when `check_level > 1`.
    pub fn last_residual(&self) -> Option<f64> {
        self.last_residual
    }

    /// Largest absolute residual of the solved systems on this rank,
    /// physical boundary rows included and decomposition guard rows skipped.
    /// Guard cells must already be filled.
    pub fn verify_solution(&self, systems: &[ModeSystem]) -> f64 {
        let ncx = systems.first().map(ModeSystem::len).unwrap_or(0);
        let start = if self.mesh.first_x() { 0 } else { self.mesh.xstart };
        let end = if self.mesh.last_x() {
            ncx.saturating_sub(1)
        } else {
            self.mesh.xend
        };
        let mut worst = 0.0_f64;
        for sys in systems {
            for ix in start..=end {
                let xm = if ix > 0 { sys.x[ix - 1] } else { Complex64::default() };
                let xp = if ix + 1 < ncx { sys.x[ix + 1] } else { Complex64::default() };
                let lhs = sys.avec[ix] * xm + sys.bvec[ix] * sys.x[ix] + sys.cvec[ix] * xp;
                worst = worst.max((lhs - sys.rhs[ix]).norm());
            }
        }
        worst
    }
}

impl ReducedSolver for PcrSolver {
    fn solve_plane(
        &mut self,
        comm: &dyn Comm,
        systems: &mut [ModeSystem],
    ) -> Result<usize, LapError> {
        if systems.is_empty() {
            return Ok(0);
        }
        let n = self.n_mpi;
        let xs = self.mesh.xstart;
        let mut p = Padded::new(systems.len(), n);
        for (s, sys) in systems.iter().enumerate() {
            let (a, b, c, r) = self.eliminate_boundary_rows(sys);
            for i in 1..=n {
                let ix = xs + i - 1;
                let k = p.idx(s, i);
                p.a[k] = a[ix];
                p.b[k] = b[ix];
                p.c[k] = c[ix];
                p.r[k] = r[ix];
            }
        }

        self.cr_forward_multiple_row(comm, &mut p);
        self.pcr_forward_single_row(comm, &mut p)?;
        self.cr_backward_multiple_row(comm, &mut p)?;

        for (s, sys) in systems.iter_mut().enumerate() {
            for i in 1..=n {
                sys.x[xs + i - 1] = p.x[p.idx(s, i)];
            }
        }
        for sys in systems.iter_mut() {
            self.apply_boundary_conditions(sys);
        }
        self.fill_guards(comm, systems);
        if self.check_level > 1 {
            self.last_residual = Some(self.verify_solution(systems));
        }

        self.stats.record(0);
        Ok(0)
    }

    fn mean_iterations(&self) -> f64 {
        self.stats.mean_iterations()
    }

    fn reset_solver(&mut self) {
        self.stats.reset();
    }
}
