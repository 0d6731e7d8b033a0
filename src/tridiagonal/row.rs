//! Assembly of the tridiagonal rows for one Fourier mode.
//!
//! Discretizes `D·∇⊥² + (1/C)·∇⊥C·∇⊥ + A` at fixed z wavenumber with
//! second-order central differences in x and the spectral `-k²` term in z.

use num_complex::Complex64;

use crate::config::{BoundaryFlags, GlobalFlags, InvertFlags};
use crate::core::Field2D;
use crate::mesh::{Coordinates, Mesh1D};

/// Boundary widths (inner, outer) implied by the flag set.
///
/// The full guard width is used unless a one-cell boundary is requested or
/// there is only a single guard cell to begin with.
pub fn boundary_widths(flags: &InvertFlags, mesh: &Mesh1D) -> (usize, usize) {
    let mut inbndry = mesh.xstart;
    let mut outbndry = mesh.xstart;
    if flags.global.contains(GlobalFlags::BOTH_BNDRY_ONE) || mesh.xstart < 2 {
        inbndry = 1;
        outbndry = 1;
    }
    if flags.inner.contains(BoundaryFlags::BNDRY_ONE) {
        inbndry = 1;
    }
    if flags.outer.contains(BoundaryFlags::BNDRY_ONE) {
        outbndry = 1;
    }
    (inbndry, outbndry)
}

/// Interior stencil coefficients at one grid point.
pub fn tridag_coefs(
    ix: usize,
    jy: usize,
    kwave: f64,
    coords: &Coordinates,
    acoef: &Field2D,
    ccoef: &Field2D,
    dcoef: &Field2D,
) -> (Complex64, Complex64, Complex64) {
    let dx2 = coords.dx * coords.dx;
    let ddx = dcoef[(ix, jy)] / dx2;
    // First-derivative coupling from the radial variation of C.
    let cdc = (ccoef[(ix + 1, jy)] - ccoef[(ix - 1, jy)]) / (4.0 * dx2 * ccoef[(ix, jy)]);
    let a = ddx - cdc;
    let b = -2.0 * ddx - dcoef[(ix, jy)] * kwave * kwave + acoef[(ix, jy)];
    let c = ddx + cdc;
    (
        Complex64::new(a, 0.0),
        Complex64::new(b, 0.0),
        Complex64::new(c, 0.0),
    )
}

/// Fill the full local rows `(avec, bvec, cvec)` and patch `rhs` for one mode.
///
/// On entry `rhs` holds the mode's transformed right-hand side, with the
/// initial-guess transform already substituted into physical boundary rows
/// when `SET` is active; those rows are left untouched here. Non-`SET`
/// physical boundary rows and internal decomposition guard rows get their
/// `rhs` zeroed.
#[allow(clippy::too_many_arguments)]
pub fn tridag_matrix(
    avec: &mut [Complex64],
    bvec: &mut [Complex64],
    cvec: &mut [Complex64],
    rhs: &mut [Complex64],
    jy: usize,
    kwave: f64,
    flags: &InvertFlags,
    inbndry: usize,
    outbndry: usize,
    acoef: &Field2D,
    ccoef: &Field2D,
    dcoef: &Field2D,
    mesh: &Mesh1D,
    coords: &Coordinates,
) {
    let ncx = mesh.local_nx;
    let zero = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let half = Complex64::new(0.5, 0.0);

    for ix in 0..ncx {
        if (!mesh.first_x() || mesh.periodic_x) && ix < mesh.xstart {
            // Internal decomposition boundary (or periodic wrap): decouple
            // from the local solve.
            avec[ix] = zero;
            bvec[ix] = one;
            cvec[ix] = zero;
            rhs[ix] = zero;
        } else if (!mesh.last_x() || mesh.periodic_x) && ix > mesh.xend {
            avec[ix] = zero;
            bvec[ix] = one;
            cvec[ix] = zero;
            rhs[ix] = zero;
        } else if mesh.first_x() && ix < inbndry && !mesh.periodic_x {
            if flags.inner.contains(BoundaryFlags::SET) {
                avec[ix] = zero;
                bvec[ix] = one;
                cvec[ix] = zero;
            } else if flags.inner.contains(BoundaryFlags::AC_GRAD) {
                avec[ix] = zero;
                bvec[ix] = one;
                cvec[ix] = -one;
                rhs[ix] = zero;
            } else {
                // Zero value at the cell face.
                avec[ix] = zero;
                bvec[ix] = half;
                cvec[ix] = half;
                rhs[ix] = zero;
            }
        } else if mesh.last_x() && ix + outbndry >= ncx && !mesh.periodic_x {
            if flags.outer.contains(BoundaryFlags::SET) {
                avec[ix] = zero;
                bvec[ix] = one;
                cvec[ix] = zero;
            } else if flags.outer.contains(BoundaryFlags::AC_GRAD) {
                avec[ix] = -one;
                bvec[ix] = one;
                cvec[ix] = zero;
                rhs[ix] = zero;
            } else {
                avec[ix] = half;
                bvec[ix] = half;
                cvec[ix] = zero;
                rhs[ix] = zero;
            }
        } else {
            let (a, b, c) = tridag_coefs(ix, jy, kwave, coords, acoef, ccoef, dcoef);
            avec[ix] = a;
            bvec[ix] = b;
            cvec[ix] = c;
        }
    }
}
