//! Guard-vector elimination and the reduced interface system.
//!
//! Solving the full local system once against the RHS and once against unit
//! impulses just outside each edge turns the local subdomain into an affine
//! relation: the two interface values respond to the neighbours' interface
//! values through four coupling coefficients. The iterative variants all
//! operate on this reduced representation; two adjacent relations can also
//! be merged exactly into one spanning both subdomains, which is how the
//! multigrid variant builds its coarse levels.

use num_complex::Complex64;

use crate::error::LapError;
use crate::mesh::Mesh1D;
use crate::parallel::{Comm, pack_complex, unpack_complex};
use crate::solver::ModeSystem;
use crate::tridiagonal::{cyclic_tridag, tridag};
use crate::utils::Tolerances;

/// Interface window: `[x at xs-1, x at xs, x at xe, x at xe+1]`. The outer
/// two entries mirror the neighbours' interface unknowns.
pub type Window = [Complex64; 4];

const fn zero() -> Complex64 {
    Complex64::new(0.0, 0.0)
}

/// Affine relation of one subdomain's interface values to its halos:
/// `x1 = rl + al·x0 + bl·x3`, `x2 = ru + au·x0 + bu·x3`.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceCoeffs {
    pub al: Complex64,
    pub bl: Complex64,
    pub au: Complex64,
    pub bu: Complex64,
    pub rl: Complex64,
    pub ru: Complex64,
}

impl Default for InterfaceCoeffs {
    fn default() -> Self {
        Self {
            al: zero(),
            bl: zero(),
            au: zero(),
            bu: zero(),
            rl: zero(),
            ru: zero(),
        }
    }
}

impl InterfaceCoeffs {
    /// New interface values from the current halos.
    pub fn update(&self, x0: Complex64, x3: Complex64) -> (Complex64, Complex64) {
        (
            self.rl + self.al * x0 + self.bl * x3,
            self.ru + self.au * x0 + self.bu * x3,
        )
    }

    /// Defect of the two interface rows for a given window.
    pub fn residual(&self, w: &Window) -> (Complex64, Complex64) {
        let (x1, x2) = self.update(w[0], w[3]);
        (x1 - w[1], x2 - w[2])
    }

    /// Contraction test for the interface Jacobi iteration.
    pub fn is_dominant(&self) -> bool {
        self.al.norm() + self.bl.norm() <= 1.0 && self.au.norm() + self.bu.norm() <= 1.0
    }

    /// Exact merge of two adjacent relations (`a` radially inside `b`) by
    /// eliminating the shared pair of inner interface unknowns.
    pub fn merge(a: &Self, b: &Self) -> Result<(Self, MergeBack), LapError> {
        let denom = Complex64::new(1.0, 0.0) - b.al * a.bu;
        if denom.norm_sqr() == 0.0 {
            return Err(LapError::Config(
                "singular interface merge between adjacent subdomains".into(),
            ));
        }
        let merged = Self {
            al: a.al + a.bl * b.al * a.au / denom,
            bl: a.bl * b.bl / denom,
            au: b.au * a.au / denom,
            bu: b.bu + b.au * a.bu * b.bl / denom,
            rl: a.rl + a.bl * (b.rl + b.al * a.ru) / denom,
            ru: b.ru + b.au * (a.ru + a.bu * b.rl) / denom,
        };
        let back = MergeBack {
            a: *a,
            b: *b,
            denom,
        };
        Ok((merged, back))
    }
}

/// Everything needed to restrict residuals onto a merged relation and to
/// back-substitute the eliminated inner pair afterwards.
#[derive(Debug, Clone, Copy)]
pub struct MergeBack {
    a: InterfaceCoeffs,
    b: InterfaceCoeffs,
    denom: Complex64,
}

impl MergeBack {
    /// Merged-row residuals from the four fine residuals
    /// `(lower/upper of a, lower/upper of b)`.
    pub fn restrict(
        &self,
        res_la: Complex64,
        res_ua: Complex64,
        res_lb: Complex64,
        res_ub: Complex64,
    ) -> (Complex64, Complex64) {
        (
            res_la + self.a.bl * (res_lb + self.b.al * res_ua) / self.denom,
            res_ub + self.b.au * (res_ua + self.a.bu * res_lb) / self.denom,
        )
    }

    /// Recover the eliminated inner pair `(upper error of a, lower error of
    /// b)` from the merged halo errors and the fine residuals used in
    /// [`restrict`](Self::restrict).
    pub fn inner(
        &self,
        res_ua: Complex64,
        res_lb: Complex64,
        e0: Complex64,
        e3: Complex64,
    ) -> (Complex64, Complex64) {
        let e1b =
            (res_lb + self.b.al * res_ua + self.b.al * self.a.au * e0 + self.b.bl * e3)
                / self.denom;
        let e2a = res_ua + self.a.au * e0 + self.a.bu * e1b;
        (e2a, e1b)
    }
}

/// Guard-vector decomposition of one local mode system.
pub struct LocalElimination {
    /// Local solve against the RHS with halos forced to zero.
    pub minvb: Vec<Complex64>,
    /// Response to a unit value at `xs-1` (zero on the first rank).
    pub lower: Vec<Complex64>,
    /// Response to a unit value at `xe+1` (zero on the last rank).
    pub upper: Vec<Complex64>,
}

impl LocalElimination {
    pub fn new(sys: &ModeSystem, mesh: &Mesh1D) -> Result<Self, LapError> {
        let ncx = sys.len();
        let mut minvb = vec![zero(); ncx];
        tridag(&sys.avec, &sys.bvec, &sys.cvec, &sys.rhs, &mut minvb)?;

        let mut lower = vec![zero(); ncx];
        if !mesh.first_x() {
            let mut impulse = vec![zero(); ncx];
            impulse[mesh.xstart - 1] = Complex64::new(1.0, 0.0);
            tridag(&sys.avec, &sys.bvec, &sys.cvec, &impulse, &mut lower)?;
        }

        let mut upper = vec![zero(); ncx];
        if !mesh.last_x() {
            let mut impulse = vec![zero(); ncx];
            impulse[mesh.xend + 1] = Complex64::new(1.0, 0.0);
            tridag(&sys.avec, &sys.bvec, &sys.cvec, &impulse, &mut upper)?;
        }

        Ok(Self {
            minvb,
            lower,
            upper,
        })
    }

    /// Interface relation of this subdomain.
    pub fn coeffs(&self, mesh: &Mesh1D) -> InterfaceCoeffs {
        let xs = mesh.xstart;
        let xe = mesh.xend;
        InterfaceCoeffs {
            al: self.lower[xs],
            bl: self.upper[xs],
            au: self.lower[xe],
            bu: self.upper[xe],
            rl: self.minvb[xs],
            ru: self.minvb[xe],
        }
    }

    /// Full local solution for converged halo values, by linearity.
    pub fn reconstruct(&self, x_in: Complex64, x_out: Complex64, x: &mut [Complex64]) {
        for (ix, slot) in x.iter_mut().enumerate() {
            *slot = self.minvb[ix] + self.lower[ix] * x_in + self.upper[ix] * x_out;
        }
    }
}

/// Single-rank solve: plain Thomas, or the cyclic variant over the interior
/// with the wraparound guard copy when x is periodic.
pub fn solve_serial(sys: &mut ModeSystem, mesh: &Mesh1D) -> Result<(), LapError> {
    if mesh.periodic_x {
        let xs = mesh.xstart;
        let xe = mesh.xend;
        let ncx = sys.len();
        let n = xe - xs + 1;
        let mut xi = vec![zero(); n];
        cyclic_tridag(
            &sys.avec[xs..=xe],
            &sys.bvec[xs..=xe],
            &sys.cvec[xs..=xe],
            &sys.rhs[xs..=xe],
            &mut xi,
        )?;
        sys.x[xs..=xe].copy_from_slice(&xi);
        for ix in 0..xs {
            sys.x[ix] = sys.x[ncx - 2 * xs + ix];
            sys.x[ncx - xs + ix] = sys.x[xs + ix];
        }
        Ok(())
    } else {
        let (avec, bvec, cvec, rhs) = (&sys.avec, &sys.bvec, &sys.cvec, &sys.rhs);
        tridag(avec, bvec, cvec, rhs, &mut sys.x)
    }
}

/// Message tags for the reduced-system exchanges; the level index keeps
/// concurrent levels of the V-cycle apart.
fn tag_inward(level: usize) -> u16 {
    0x0100 + 2 * level as u16
}

fn tag_outward(level: usize) -> u16 {
    0x0101 + 2 * level as u16
}

/// One level of the reduced interface system, stride `2^level` in ranks.
///
/// Level 0 holds the actual interface solution; coarser levels hold error
/// estimates with restricted-residual right-hand sides.
pub struct ReducedLevel {
    pub level: usize,
    pub coeffs: Vec<InterfaceCoeffs>,
    pub windows: Vec<Window>,
}

impl ReducedLevel {
    pub fn new(level: usize, coeffs: Vec<InterfaceCoeffs>) -> Self {
        let windows = vec![[zero(); 4]; coeffs.len()];
        Self {
            level,
            coeffs,
            windows,
        }
    }

    pub fn stride(&self) -> usize {
        1 << self.level
    }

    pub fn participates(&self, mesh: &Mesh1D) -> bool {
        mesh.xproc % self.stride() == 0
    }

    pub fn proc_in(&self, mesh: &Mesh1D) -> Option<usize> {
        (mesh.xproc >= self.stride()).then(|| mesh.xproc - self.stride())
    }

    pub fn proc_out(&self, mesh: &Mesh1D) -> Option<usize> {
        (mesh.xproc + self.stride() < mesh.nxpe).then(|| mesh.xproc + self.stride())
    }

    /// Rank colour at this level; neighbours always differ.
    pub fn is_red(&self, mesh: &Mesh1D) -> bool {
        (mesh.xproc / self.stride()) % 2 == 0
    }

    pub fn zero_windows(&mut self) {
        for w in &mut self.windows {
            *w = [zero(); 4];
        }
    }

    fn gather_side(&self, lower: bool) -> Vec<Complex64> {
        self.windows
            .iter()
            .map(|w| if lower { w[1] } else { w[2] })
            .collect()
    }

    /// Paired halo refresh: lower values travel inward, upper values travel
    /// outward, every participating rank does both links.
    pub fn synchronize(&mut self, comm: &dyn Comm, mesh: &Mesh1D) {
        if !self.participates(mesh) {
            return;
        }
        let nm = self.windows.len();
        // The in link carries lower values inward and upper values back;
        // tags must cross-match the neighbour's out link.
        if let Some(pin) = self.proc_in(mesh) {
            let send = pack_complex(&self.gather_side(true));
            let mut wire = vec![0.0; 2 * nm];
            comm.sendrecv(
                pin,
                tag_inward(self.level),
                &send,
                tag_outward(self.level),
                &mut wire,
            );
            let mut recv = vec![zero(); nm];
            unpack_complex(&wire, &mut recv);
            for (w, v) in self.windows.iter_mut().zip(recv) {
                w[0] = v;
            }
        }
        if let Some(pout) = self.proc_out(mesh) {
            let send = pack_complex(&self.gather_side(false));
            let mut wire = vec![0.0; 2 * nm];
            comm.sendrecv(
                pout,
                tag_outward(self.level),
                &send,
                tag_inward(self.level),
                &mut wire,
            );
            let mut recv = vec![zero(); nm];
            unpack_complex(&wire, &mut recv);
            for (w, v) in self.windows.iter_mut().zip(recv) {
                w[3] = v;
            }
        }
    }

    fn update(&mut self, frozen: &[bool]) {
        for (m, w) in self.windows.iter_mut().enumerate() {
            if frozen.get(m).copied().unwrap_or(false) {
                continue;
            }
            let (x1, x2) = self.coeffs[m].update(w[0], w[3]);
            w[1] = x1;
            w[2] = x2;
        }
    }

    fn push(&self, comm: &dyn Comm, mesh: &Mesh1D) {
        if let Some(pin) = self.proc_in(mesh) {
            crate::parallel::send_complex(comm, pin, tag_inward(self.level), &self.gather_side(true));
        }
        if let Some(pout) = self.proc_out(mesh) {
            crate::parallel::send_complex(
                comm,
                pout,
                tag_outward(self.level),
                &self.gather_side(false),
            );
        }
    }

    fn pull(&mut self, comm: &dyn Comm, mesh: &Mesh1D) {
        let nm = self.windows.len();
        if let Some(pin) = self.proc_in(mesh) {
            let mut recv = vec![zero(); nm];
            crate::parallel::recv_complex(comm, pin, tag_outward(self.level), &mut recv);
            for (w, v) in self.windows.iter_mut().zip(recv) {
                w[0] = v;
            }
        }
        if let Some(pout) = self.proc_out(mesh) {
            let mut recv = vec![zero(); nm];
            crate::parallel::recv_complex(comm, pout, tag_inward(self.level), &mut recv);
            for (w, v) in self.windows.iter_mut().zip(recv) {
                w[3] = v;
            }
        }
    }

    /// One red-black Gauss-Seidel sweep: black ranks relax and publish, red
    /// ranks absorb, then the colours swap roles.
    pub fn sweep(&mut self, comm: &dyn Comm, mesh: &Mesh1D, frozen: &[bool]) {
        if !self.participates(mesh) {
            return;
        }
        let red = self.is_red(mesh);
        for black_phase in [true, false] {
            let my_turn = red != black_phase;
            if my_turn {
                self.update(frozen);
                self.push(comm, mesh);
            } else {
                self.pull(comm, mesh);
            }
        }
    }

    /// Per-mode interface residuals on this rank.
    pub fn residuals(&self) -> Vec<(Complex64, Complex64)> {
        self.coeffs
            .iter()
            .zip(&self.windows)
            .map(|(c, w)| c.residual(w))
            .collect()
    }

    /// Collective convergence check at the finest level. Marks newly
    /// converged modes in `converged` and returns whether all modes are
    /// done. Every rank must call this; the result is identical everywhere.
    pub fn check_convergence(
        &self,
        comm: &dyn Comm,
        tol: &Tolerances,
        converged: &mut [bool],
    ) -> bool {
        let nm = self.windows.len();
        let mut totals = vec![0.0; 2 * nm];
        for (m, ((c, w), flag)) in self
            .coeffs
            .iter()
            .zip(&self.windows)
            .zip(converged.iter())
            .enumerate()
        {
            if *flag {
                continue;
            }
            let (r1, r2) = c.residual(w);
            totals[2 * m] = r1.norm_sqr() + r2.norm_sqr();
            totals[2 * m + 1] = w[1].norm_sqr() + w[2].norm_sqr();
        }
        comm.allreduce_sum(&mut totals);
        let mut all = true;
        for (m, flag) in converged.iter_mut().enumerate() {
            if *flag {
                continue;
            }
            let error_abs = totals[2 * m].sqrt();
            let xnorm = totals[2 * m + 1].sqrt();
            let error_rel = if xnorm > 0.0 { error_abs / xnorm } else { error_abs };
            if tol.met(error_abs, error_rel) {
                *flag = true;
            } else {
                all = false;
            }
        }
        all
    }

    /// Finest-level absolute and relative errors for every mode, collective.
    pub fn global_errors(&self, comm: &dyn Comm) -> (Vec<f64>, Vec<f64>) {
        let nm = self.windows.len();
        let mut totals = vec![0.0; 2 * nm];
        for (m, (c, w)) in self.coeffs.iter().zip(&self.windows).enumerate() {
            let (r1, r2) = c.residual(w);
            totals[2 * m] = r1.norm_sqr() + r2.norm_sqr();
            totals[2 * m + 1] = w[1].norm_sqr() + w[2].norm_sqr();
        }
        comm.allreduce_sum(&mut totals);
        let mut abs = vec![0.0; nm];
        let mut rel = vec![0.0; nm];
        for m in 0..nm {
            abs[m] = totals[2 * m].sqrt();
            let xnorm = totals[2 * m + 1].sqrt();
            rel[m] = if xnorm > 0.0 { abs[m] / xnorm } else { abs[m] };
        }
        (abs, rel)
    }

    /// Collective dominance test over every mode's couplings on every rank.
    pub fn all_dominant(&self, comm: &dyn Comm) -> bool {
        let local = self.coeffs.iter().all(InterfaceCoeffs::is_dominant);
        comm.allreduce_and(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Coordinates;
    use crate::tridiagonal::tridag_matrix;
    use approx::assert_abs_diff_eq;

    /// Middle-rank system with identity guard rows and smooth coefficients.
    fn middle_rank_system() -> (ModeSystem, Mesh1D) {
        let mesh = Mesh1D::new(6, 1, 8, 2, 3, 1).unwrap();
        let coords = Coordinates::uniform(0.1, 0.3, 8);
        let ncx = mesh.local_nx;
        let a = crate::core::Field2D::constant(ncx, 1, 0.3);
        let c = crate::core::Field2D::from_fn(ncx, 1, |ix, _| 1.0 + 0.05 * ix as f64);
        let d = crate::core::Field2D::constant(ncx, 1, 1.0);
        let mut sys = ModeSystem::new(0, 1, ncx);
        for (ix, r) in sys.rhs.iter_mut().enumerate() {
            *r = Complex64::new((ix as f64 * 0.7).sin(), 0.1 * ix as f64);
        }
        let flags = crate::config::InvertFlags::default();
        let mut rhs = sys.rhs.clone();
        tridag_matrix(
            &mut sys.avec,
            &mut sys.bvec,
            &mut sys.cvec,
            &mut rhs,
            0,
            2.0,
            &flags,
            2,
            2,
            &a,
            &c,
            &d,
            &mesh,
            &coords,
        );
        sys.rhs = rhs;
        (sys, mesh)
    }

    #[test]
    fn reconstruction_satisfies_interior_rows() {
        let (sys, mesh) = middle_rank_system();
        let elim = LocalElimination::new(&sys, &mesh).unwrap();
        let x_in = Complex64::new(0.4, -0.2);
        let x_out = Complex64::new(-1.1, 0.6);
        let mut x = vec![Complex64::default(); sys.len()];
        elim.reconstruct(x_in, x_out, &mut x);

        // Halo rows reproduce the imposed values.
        assert_abs_diff_eq!((x[mesh.xstart - 1] - x_in).norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!((x[mesh.xend + 1] - x_out).norm(), 0.0, epsilon = 1e-12);
        // Interior rows are satisfied exactly.
        for ix in mesh.xstart..=mesh.xend {
            let lhs = sys.avec[ix] * x[ix - 1] + sys.bvec[ix] * x[ix] + sys.cvec[ix] * x[ix + 1];
            assert_abs_diff_eq!((lhs - sys.rhs[ix]).norm(), 0.0, epsilon = 1e-9);
        }
        // The extracted coefficients agree with the reconstruction.
        let c = elim.coeffs(&mesh);
        let (x1, x2) = c.update(x_in, x_out);
        assert_abs_diff_eq!((x1 - x[mesh.xstart]).norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!((x2 - x[mesh.xend]).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn merge_is_exact_elimination() {
        // Two coupled relations with arbitrary coefficients.
        let a = InterfaceCoeffs {
            al: Complex64::new(0.2, 0.1),
            bl: Complex64::new(0.3, -0.05),
            au: Complex64::new(0.15, 0.0),
            bu: Complex64::new(0.25, 0.1),
            rl: Complex64::new(1.0, -0.4),
            ru: Complex64::new(-0.7, 0.2),
        };
        let b = InterfaceCoeffs {
            al: Complex64::new(0.1, -0.2),
            bl: Complex64::new(0.35, 0.0),
            au: Complex64::new(0.05, 0.1),
            bu: Complex64::new(0.2, -0.1),
            rl: Complex64::new(0.3, 0.3),
            ru: Complex64::new(0.9, 0.0),
        };
        let (merged, back) = InterfaceCoeffs::merge(&a, &b).unwrap();

        let x0 = Complex64::new(0.6, -0.3);
        let x3 = Complex64::new(-0.2, 0.8);

        // Reference: solve the inner pair (x2a, x1b) directly.
        // x2a = a.ru + a.au*x0 + a.bu*x1b; x1b = b.rl + b.al*x2a + b.bl*x3
        let denom = Complex64::new(1.0, 0.0) - b.al * a.bu;
        let x1b = (b.rl + b.al * (a.ru + a.au * x0) + b.bl * x3) / denom;
        let x2a = a.ru + a.au * x0 + a.bu * x1b;
        let x1a = a.rl + a.al * x0 + a.bl * x1b;
        let x2b = b.ru + b.au * x2a + b.bu * x3;

        let (m1, m2) = merged.update(x0, x3);
        assert_abs_diff_eq!((m1 - x1a).norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!((m2 - x2b).norm(), 0.0, epsilon = 1e-12);

        // Back-substitution with the affine parts as residuals recovers the
        // eliminated inner pair.
        let (e2a, e1b) = back.inner(a.ru, b.rl, x0, x3);
        assert_abs_diff_eq!((e1b - x1b).norm(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!((e2a - x2a).norm(), 0.0, epsilon = 1e-12);
    }

    /// Jacobi iteration of two coupled dominant relations: the error
    /// against the exact fixed point never grows.
    #[test]
    fn dominant_interface_iteration_contracts() {
        let a = InterfaceCoeffs {
            al: Complex64::new(0.3, 0.05),
            bl: Complex64::new(0.25, 0.0),
            au: Complex64::new(0.2, -0.1),
            bu: Complex64::new(0.35, 0.1),
            rl: Complex64::new(0.8, -0.2),
            ru: Complex64::new(-0.5, 0.4),
        };
        let b = InterfaceCoeffs {
            al: Complex64::new(0.4, 0.0),
            bl: Complex64::new(0.3, -0.05),
            au: Complex64::new(0.15, 0.1),
            bu: Complex64::new(0.25, 0.0),
            rl: Complex64::new(0.6, 0.1),
            ru: Complex64::new(1.1, -0.3),
        };
        assert!(a.is_dominant() && b.is_dominant());

        // Physical halos are zero; a's out halo is b's lower interface and
        // b's in halo is a's upper interface. Exact fixed point from the
        // inner 2x2.
        let zero = Complex64::default();
        let denom = Complex64::new(1.0, 0.0) - b.al * a.bu;
        let x1b = (b.rl + b.al * a.ru) / denom;
        let x2a = a.ru + a.bu * x1b;
        let x1a = a.rl + a.bl * x1b;
        let x2b = b.ru + b.au * x2a;
        let exact = [x1a, x2a, x1b, x2b];

        let mut cur = [zero; 4];
        let mut last_err = f64::INFINITY;
        for _ in 0..40 {
            let next = [
                a.rl + a.bl * cur[2],
                a.ru + a.bu * cur[2],
                b.rl + b.al * cur[1],
                b.ru + b.au * cur[1],
            ];
            let err = next
                .iter()
                .zip(&exact)
                .map(|(x, e)| (x - e).norm())
                .fold(0.0_f64, f64::max);
            assert!(err <= last_err + 1e-14, "error grew: {err} > {last_err}");
            last_err = err;
            cur = next;
        }
        assert!(last_err < 1e-10);
    }

    #[test]
    fn serial_solve_handles_periodic_wrap() {
        let mut mesh = Mesh1D::new(8, 1, 8, 2, 1, 0).unwrap();
        mesh.periodic_x = true;
        let ncx = mesh.local_nx;
        let mut sys = ModeSystem::new(0, 1, ncx);
        for ix in 0..ncx {
            sys.avec[ix] = Complex64::new(1.0, 0.0);
            sys.bvec[ix] = Complex64::new(-4.0, 0.0);
            sys.cvec[ix] = Complex64::new(1.0, 0.0);
            sys.rhs[ix] = Complex64::new((ix as f64).cos(), 0.0);
        }
        solve_serial(&mut sys, &mesh).unwrap();
        // Wraparound guard copies.
        let xs = mesh.xstart;
        for ix in 0..xs {
            assert_eq!(sys.x[ix], sys.x[ncx - 2 * xs + ix]);
            assert_eq!(sys.x[ncx - xs + ix], sys.x[xs + ix]);
        }
    }

    #[test]
    fn dominance_test_uses_coupling_magnitudes() {
        let mut c = InterfaceCoeffs::default();
        c.al = Complex64::new(0.4, 0.0);
        c.bl = Complex64::new(0.5, 0.0);
        c.au = Complex64::new(0.1, 0.0);
        c.bu = Complex64::new(0.2, 0.0);
        assert!(c.is_dominant());
        c.bl = Complex64::new(0.7, 0.0);
        assert!(!c.is_dominant());
    }
}
