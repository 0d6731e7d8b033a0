//! Perpendicular Laplacian inversion facade.
//!
//! Solves `D·∇⊥²x + (1/C)·∇⊥C·∇⊥x + A·x = b` one y plane at a time:
//! decompose the right-hand side into z Fourier modes, solve one complex
//! tridiagonal system per mode across the x decomposition, and transform
//! back. The distributed solve is delegated to one of the [`SolverKind`]
//! variants.

use std::collections::HashMap;

use num_complex::Complex64;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::{BoundaryFlags, GlobalFlags, InvertFlags, SolverOptions};
use crate::core::{Field2D, Field3D, FieldPerp};
use crate::error::LapError;
use crate::mesh::{Coordinates, Mesh1D};
use crate::parallel::Comm;
use crate::solver::{
    ModeSystem, MultigridSolver, ParallelTriSolver, PcrSolver, RedBlackSolver, ReducedSolver,
    SolverKind,
};
use crate::transform::ModeTransform;
use crate::tridiagonal::{boundary_widths, tridag_matrix};

enum Backend {
    ParallelTri(ParallelTriSolver),
    RedBlack(RedBlackSolver),
    Multigrid(MultigridSolver),
    Pcr(PcrSolver),
}

impl Backend {
    fn as_solver(&mut self) -> &mut dyn ReducedSolver {
        match self {
            Backend::ParallelTri(s) => s,
            Backend::RedBlack(s) => s,
            Backend::Multigrid(s) => s,
            Backend::Pcr(s) => s,
        }
    }

    fn solver(&self) -> &dyn ReducedSolver {
        match self {
            Backend::ParallelTri(s) => s,
            Backend::RedBlack(s) => s,
            Backend::Multigrid(s) => s,
            Backend::Pcr(s) => s,
        }
    }
}

type CachedRows = (Vec<Complex64>, Vec<Complex64>, Vec<Complex64>);

pub struct Laplacian {
    mesh: Mesh1D,
    coords: Coordinates,
    flags: InvertFlags,
    options: SolverOptions,
    acoef: Field2D,
    ccoef: Field2D,
    dcoef: Field2D,
    /// Highest z mode index solved; higher modes are filtered to zero.
    maxmode: usize,
    backend: Backend,
    transform: ModeTransform,
    /// Cached tridiagonal rows keyed by `(jy, kz)`; only valid while the
    /// flag set keeps the rows independent of the per-call RHS.
    row_cache: HashMap<(usize, usize), CachedRows>,
}

impl Laplacian {
    pub fn new(
        mesh: Mesh1D,
        coords: Coordinates,
        kind: SolverKind,
        options: SolverOptions,
    ) -> Result<Self, LapError> {
        if mesh.periodic_x && mesh.nxpe > 1 {
            return Err(LapError::Unsupported(
                "periodic x is only handled on a single-rank decomposition",
            ));
        }
        let backend = match kind {
            SolverKind::ParallelTri => {
                Backend::ParallelTri(ParallelTriSolver::new(mesh.clone(), &options))
            }
            SolverKind::RedBlack => Backend::RedBlack(RedBlackSolver::new(mesh.clone(), &options)),
            SolverKind::Multigrid => {
                Backend::Multigrid(MultigridSolver::new(mesh.clone(), &options))
            }
            SolverKind::Pcr => Backend::Pcr(PcrSolver::new(mesh.clone(), &options)?),
        };
        let ncx = mesh.local_nx;
        let ny = mesh.local_ny;
        let transform = ModeTransform::new(mesh.local_nz);
        let maxmode = mesh.local_nz / 2;
        Ok(Self {
            mesh,
            coords,
            flags: InvertFlags::default(),
            options,
            acoef: Field2D::zeros(ncx, ny),
            ccoef: Field2D::constant(ncx, ny, 1.0),
            dcoef: Field2D::constant(ncx, ny, 1.0),
            maxmode,
            backend,
            transform,
            row_cache: HashMap::new(),
        })
    }

    pub fn set_coef_a(&mut self, a: Field2D) {
        self.acoef = a;
        self.row_cache.clear();
    }

    pub fn set_coef_c(&mut self, c: Field2D) {
        self.ccoef = c;
        self.row_cache.clear();
    }

    pub fn set_coef_d(&mut self, d: Field2D) {
        self.dcoef = d;
        self.row_cache.clear();
    }

    pub fn set_global_flags(&mut self, flags: GlobalFlags) {
        self.flags.global = flags;
        self.row_cache.clear();
    }

    pub fn set_inner_boundary_flags(&mut self, flags: BoundaryFlags) {
        self.flags.inner = flags;
        self.row_cache.clear();
    }

    pub fn set_outer_boundary_flags(&mut self, flags: BoundaryFlags) {
        self.flags.outer = flags;
        self.row_cache.clear();
    }

    /// Filter out z modes above `maxmode`.
    pub fn set_maxmode(&mut self, maxmode: usize) {
        self.maxmode = maxmode.min(self.mesh.local_nz / 2);
    }

    pub fn flags(&self) -> &InvertFlags {
        &self.flags
    }

    pub fn mean_iterations(&self) -> f64 {
        self.backend.solver().mean_iterations()
    }

    /// Drop cached rows, saved interface guesses and iteration statistics.
    pub fn reset_solver(&mut self) {
        self.row_cache.clear();
        self.backend.as_solver().reset_solver();
    }

    fn use_dst(&self) -> bool {
        self.flags.global.contains(GlobalFlags::DST)
    }

    /// Number of mode systems solved per plane.
    fn nmode(&self) -> usize {
        if self.use_dst() {
            self.mesh.local_nz - 2
        } else {
            (self.maxmode + 1).min(self.transform.nmodes())
        }
    }

    fn kwave(&self, kz: usize) -> f64 {
        if self.use_dst() {
            // Sine modes vanish at both z endpoints.
            let zlen = self.coords.dz * (self.mesh.local_nz - 1) as f64;
            (kz + 1) as f64 * std::f64::consts::PI / zlen
        } else {
            kz as f64 * 2.0 * std::f64::consts::PI / self.coords.zlength()
        }
    }

    /// Forward transform of every local x row.
    fn forward_rows(&self, field: &FieldPerp) -> Vec<Vec<Complex64>> {
        let rows: Vec<&[f64]> = (0..field.nx()).map(|ix| field.row(ix)).collect();
        let nz = self.mesh.local_nz;
        let dst = self.use_dst();
        let per_row = |r: &&[f64]| -> Vec<Complex64> {
            if dst {
                self.transform
                    .forward_sin(&r[1..nz - 1])
                    .into_iter()
                    .map(|v| Complex64::new(v, 0.0))
                    .collect()
            } else {
                self.transform.forward(r)
            }
        };
        #[cfg(feature = "rayon")]
        {
            rows.par_iter().map(per_row).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            rows.iter().map(per_row).collect()
        }
    }

    /// Inverse transform into an output plane. `modes` is indexed
    /// `[ix][mode]` and may be truncated below the full mode count.
    fn inverse_rows(&self, modes: &[Vec<Complex64>], out: &mut FieldPerp) {
        let nz = self.mesh.local_nz;
        let dst = self.use_dst();
        let rows: Vec<Vec<f64>> = {
            let per_row = |row: &Vec<Complex64>| -> Vec<f64> {
                if dst {
                    let coefs: Vec<f64> = row.iter().map(|v| v.re).collect();
                    let interior = self.transform.inverse_sin(&coefs);
                    let mut z = vec![0.0; nz];
                    z[1..nz - 1].copy_from_slice(&interior);
                    z[0] = -z[2];
                    z[nz - 1] = -z[nz - 3];
                    z
                } else {
                    let mut full = vec![Complex64::default(); self.transform.nmodes()];
                    full[..row.len()].copy_from_slice(row);
                    self.transform.inverse(&full)
                }
            };
            #[cfg(feature = "rayon")]
            {
                modes.par_iter().map(per_row).collect()
            }
            #[cfg(not(feature = "rayon"))]
            {
                modes.iter().map(per_row).collect()
            }
        };
        for (ix, row) in rows.into_iter().enumerate() {
            out.row_mut(ix).copy_from_slice(&row);
        }
    }

    /// Re-apply the RHS zeroing of the row builder without rebuilding rows.
    fn patch_rhs(&self, rhs: &mut [Complex64], inbndry: usize, outbndry: usize) {
        let zero = Complex64::default();
        let mesh = &self.mesh;
        let ncx = mesh.local_nx;
        for (ix, slot) in rhs.iter_mut().enumerate() {
            if (!mesh.first_x() || mesh.periodic_x) && ix < mesh.xstart {
                *slot = zero;
            } else if (!mesh.last_x() || mesh.periodic_x) && ix > mesh.xend {
                *slot = zero;
            } else if mesh.first_x() && ix < inbndry && !mesh.periodic_x {
                if !self.flags.inner.contains(BoundaryFlags::SET) {
                    *slot = zero;
                }
            } else if mesh.last_x() && ix + outbndry >= ncx && !mesh.periodic_x {
                if !self.flags.outer.contains(BoundaryFlags::SET) {
                    *slot = zero;
                }
            }
        }
    }

    /// Assemble the per-mode systems of one plane.
    fn build_plane(
        &mut self,
        rhs: &FieldPerp,
        x0: &FieldPerp,
        jy: usize,
    ) -> Result<Vec<ModeSystem>, LapError> {
        let ncx = self.mesh.local_nx;
        let nz = self.mesh.local_nz;
        if rhs.nx() != ncx || rhs.nz() != nz || x0.nx() != ncx || x0.nz() != nz {
            return Err(LapError::Config(format!(
                "field shape ({}, {}) does not match the mesh ({ncx}, {nz})",
                rhs.nx(),
                rhs.nz()
            )));
        }

        let rhs_k = self.forward_rows(rhs);
        let set_inner = self.mesh.first_x() && self.flags.inner.contains(BoundaryFlags::SET);
        let set_outer = self.mesh.last_x() && self.flags.outer.contains(BoundaryFlags::SET);
        let x0_k = if set_inner || set_outer {
            Some(self.forward_rows(x0))
        } else {
            None
        };

        let (inbndry, outbndry) = boundary_widths(&self.flags, &self.mesh);
        let cacheable = self.flags.store_coefficients();
        let nmode = self.nmode();
        let mut systems = Vec::with_capacity(nmode);
        for kz in 0..nmode {
            let mut sys = ModeSystem::new(jy, kz, ncx);
            for ix in 0..ncx {
                sys.rhs[ix] = rhs_k[ix][kz];
            }
            if let Some(x0_k) = &x0_k {
                if set_inner {
                    for ix in 0..inbndry {
                        sys.rhs[ix] = x0_k[ix][kz];
                    }
                }
                if set_outer {
                    for ix in ncx - outbndry..ncx {
                        sys.rhs[ix] = x0_k[ix][kz];
                    }
                }
            }

            let key = (jy, kz);
            let cached = if cacheable {
                self.row_cache.get(&key).cloned()
            } else {
                None
            };
            match cached {
                Some((a, b, c)) => {
                    sys.avec = a;
                    sys.bvec = b;
                    sys.cvec = c;
                    let mut rhs_rows = std::mem::take(&mut sys.rhs);
                    self.patch_rhs(&mut rhs_rows, inbndry, outbndry);
                    sys.rhs = rhs_rows;
                }
                None => {
                    let kwave = self.kwave(kz);
                    let mut rhs_rows = std::mem::take(&mut sys.rhs);
                    tridag_matrix(
                        &mut sys.avec,
                        &mut sys.bvec,
                        &mut sys.cvec,
                        &mut rhs_rows,
                        jy,
                        kwave,
                        &self.flags,
                        inbndry,
                        outbndry,
                        &self.acoef,
                        &self.ccoef,
                        &self.dcoef,
                        &self.mesh,
                        &self.coords,
                    );
                    sys.rhs = rhs_rows;
                    if cacheable {
                        self.row_cache
                            .insert(key, (sys.avec.clone(), sys.bvec.clone(), sys.cvec.clone()));
                    }
                }
            }
            systems.push(sys);
        }
        Ok(systems)
    }

    /// Mode post-processing and the transform back to z space.
    fn finish_plane(
        &self,
        comm: &dyn Comm,
        systems: &mut [ModeSystem],
        jy: usize,
        out: &mut FieldPerp,
    ) -> Result<(), LapError> {
        let ncx = self.mesh.local_nx;

        if !self.use_dst() {
            if self.flags.global.contains(GlobalFlags::KX_ZERO) {
                // Remove the global x mean of the DC mode.
                let mut acc = [0.0_f64; 3];
                if let Some(dc) = systems.first() {
                    for ix in self.mesh.xstart..=self.mesh.xend {
                        acc[0] += dc.x[ix].re;
                        acc[1] += dc.x[ix].im;
                        acc[2] += 1.0;
                    }
                }
                comm.allreduce_sum(&mut acc);
                if acc[2] > 0.0 {
                    let mean = Complex64::new(acc[0] / acc[2], acc[1] / acc[2]);
                    if let Some(dc) = systems.first_mut() {
                        for v in dc.x.iter_mut() {
                            *v -= mean;
                        }
                    }
                }
            }
            if self.flags.global.contains(GlobalFlags::ZERO_DC) {
                if let Some(dc) = systems.first_mut() {
                    for v in dc.x.iter_mut() {
                        *v = Complex64::default();
                    }
                }
            }
        }

        if self.options.check_level > 2 {
            for sys in systems.iter() {
                for (ix, v) in sys.x.iter().enumerate() {
                    if !v.re.is_finite() || !v.im.is_finite() {
                        return Err(LapError::NonFinite {
                            ix,
                            jy,
                            kz: sys.kz,
                        });
                    }
                }
            }
        }

        let nmode = systems.len();
        let mut modes = vec![vec![Complex64::default(); nmode]; ncx];
        for (m, sys) in systems.iter().enumerate() {
            for ix in 0..ncx {
                modes[ix][m] = sys.x[ix];
            }
        }
        self.inverse_rows(&modes, out);
        out.set_yindex(jy);
        Ok(())
    }

    /// Invert one y plane. `x0` supplies boundary values when a `SET` flag
    /// is active (and the initial guess where the variant uses one).
    pub fn solve_perp(
        &mut self,
        comm: &dyn Comm,
        rhs: &FieldPerp,
        x0: &FieldPerp,
    ) -> Result<FieldPerp, LapError> {
        let jy = rhs.yindex();
        let mut systems = self.build_plane(rhs, x0, jy)?;
        self.backend.as_solver().solve_plane(comm, &mut systems)?;
        let mut out = FieldPerp::empty_from(rhs);
        self.finish_plane(comm, &mut systems, jy, &mut out)?;
        Ok(out)
    }

    /// Invert every y plane of a 3D field. The direct cyclic-reduction
    /// variant batches all planes into one reduction; the iterative variants
    /// solve plane by plane.
    pub fn solve(
        &mut self,
        comm: &dyn Comm,
        rhs: &Field3D,
        x0: &Field3D,
    ) -> Result<Field3D, LapError> {
        let ny = self.mesh.local_ny;
        let mut out = Field3D::zeros(rhs.nx(), ny, rhs.nz());
        if matches!(self.backend, Backend::Pcr(_)) {
            let mut all = Vec::new();
            let mut counts = Vec::with_capacity(ny);
            for jy in 0..ny {
                let plane = self.build_plane(&rhs.slice_perp(jy), &x0.slice_perp(jy), jy)?;
                counts.push(plane.len());
                all.extend(plane);
            }
            self.backend.as_solver().solve_plane(comm, &mut all)?;
            let mut offset = 0;
            for (jy, nmode) in counts.into_iter().enumerate() {
                let mut plane = FieldPerp::zeros(rhs.nx(), rhs.nz(), jy);
                self.finish_plane(comm, &mut all[offset..offset + nmode], jy, &mut plane)?;
                out.set_perp(&plane);
                offset += nmode;
            }
        } else {
            for jy in 0..ny {
                let plane = self.solve_perp(comm, &rhs.slice_perp(jy), &x0.slice_perp(jy))?;
                out.set_perp(&plane);
            }
        }
        Ok(out)
    }
}
