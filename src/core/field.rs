//! Owned field arrays over the local mesh block.
//!
//! Layout is row-major with z fastest, so the z rows handed to the FFT are
//! contiguous slices.

use std::ops::{Index, IndexMut};

/// Axisymmetric scalar, one value per (x, y) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2D {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

impl Field2D {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self::constant(nx, ny, 0.0)
    }

    pub fn constant(nx: usize, ny: usize, value: f64) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; nx * ny],
        }
    }

    pub fn from_fn(nx: usize, ny: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut out = Self::zeros(nx, ny);
        for ix in 0..nx {
            for jy in 0..ny {
                out[(ix, jy)] = f(ix, jy);
            }
        }
        out
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }
}

impl Index<(usize, usize)> for Field2D {
    type Output = f64;
    fn index(&self, (ix, jy): (usize, usize)) -> &f64 {
        &self.data[ix * self.ny + jy]
    }
}

impl IndexMut<(usize, usize)> for Field2D {
    fn index_mut(&mut self, (ix, jy): (usize, usize)) -> &mut f64 {
        &mut self.data[ix * self.ny + jy]
    }
}

/// Scalar on a single perpendicular (x, z) plane, tagged with the y index it
/// was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPerp {
    nx: usize,
    nz: usize,
    yindex: usize,
    data: Vec<f64>,
}

impl FieldPerp {
    pub fn zeros(nx: usize, nz: usize, yindex: usize) -> Self {
        Self {
            nx,
            nz,
            yindex,
            data: vec![0.0; nx * nz],
        }
    }

    /// An all-zero plane with the same shape and y index as `other`.
    pub fn empty_from(other: &FieldPerp) -> Self {
        Self::zeros(other.nx, other.nz, other.yindex)
    }

    pub fn from_fn(
        nx: usize,
        nz: usize,
        yindex: usize,
        mut f: impl FnMut(usize, usize) -> f64,
    ) -> Self {
        let mut out = Self::zeros(nx, nz, yindex);
        for ix in 0..nx {
            for iz in 0..nz {
                out[(ix, iz)] = f(ix, iz);
            }
        }
        out
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    pub fn yindex(&self) -> usize {
        self.yindex
    }

    pub fn set_yindex(&mut self, yindex: usize) {
        self.yindex = yindex;
    }

    /// Contiguous z row at radial index `ix`.
    pub fn row(&self, ix: usize) -> &[f64] {
        &self.data[ix * self.nz..(ix + 1) * self.nz]
    }

    pub fn row_mut(&mut self, ix: usize) -> &mut [f64] {
        &mut self.data[ix * self.nz..(ix + 1) * self.nz]
    }
}

impl Index<(usize, usize)> for FieldPerp {
    type Output = f64;
    fn index(&self, (ix, iz): (usize, usize)) -> &f64 {
        &self.data[ix * self.nz + iz]
    }
}

impl IndexMut<(usize, usize)> for FieldPerp {
    fn index_mut(&mut self, (ix, iz): (usize, usize)) -> &mut f64 {
        &mut self.data[ix * self.nz + iz]
    }
}

/// Full local scalar field over (x, y, z).
#[derive(Debug, Clone, PartialEq)]
pub struct Field3D {
    nx: usize,
    ny: usize,
    nz: usize,
    data: Vec<f64>,
}

impl Field3D {
    pub fn zeros(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            data: vec![0.0; nx * ny * nz],
        }
    }

    pub fn from_fn(
        nx: usize,
        ny: usize,
        nz: usize,
        mut f: impl FnMut(usize, usize, usize) -> f64,
    ) -> Self {
        let mut out = Self::zeros(nx, ny, nz);
        for ix in 0..nx {
            for jy in 0..ny {
                for iz in 0..nz {
                    out[(ix, jy, iz)] = f(ix, jy, iz);
                }
            }
        }
        out
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Contiguous z row at (ix, jy).
    pub fn row(&self, ix: usize, jy: usize) -> &[f64] {
        let base = (ix * self.ny + jy) * self.nz;
        &self.data[base..base + self.nz]
    }

    pub fn row_mut(&mut self, ix: usize, jy: usize) -> &mut [f64] {
        let base = (ix * self.ny + jy) * self.nz;
        &mut self.data[base..base + self.nz]
    }

    /// Copy of the perpendicular plane at `jy`.
    pub fn slice_perp(&self, jy: usize) -> FieldPerp {
        FieldPerp::from_fn(self.nx, self.nz, jy, |ix, iz| self[(ix, jy, iz)])
    }

    /// Overwrite the plane at `plane.yindex()`.
    pub fn set_perp(&mut self, plane: &FieldPerp) {
        let jy = plane.yindex();
        for ix in 0..self.nx {
            self.row_mut(ix, jy).copy_from_slice(plane.row(ix));
        }
    }
}

impl Index<(usize, usize, usize)> for Field3D {
    type Output = f64;
    fn index(&self, (ix, jy, iz): (usize, usize, usize)) -> &f64 {
        &self.data[(ix * self.ny + jy) * self.nz + iz]
    }
}

impl IndexMut<(usize, usize, usize)> for Field3D {
    fn index_mut(&mut self, (ix, jy, iz): (usize, usize, usize)) -> &mut f64 {
        &mut self.data[(ix * self.ny + jy) * self.nz + iz]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perp_rows_are_contiguous() {
        let f = FieldPerp::from_fn(3, 4, 2, |ix, iz| (ix * 10 + iz) as f64);
        assert_eq!(f.row(1), &[10.0, 11.0, 12.0, 13.0]);
        assert_eq!(f.yindex(), 2);
        let g = FieldPerp::empty_from(&f);
        assert_eq!(g.yindex(), 2);
        assert_eq!(g.row(2), &[0.0; 4]);
    }

    #[test]
    fn slice_and_set_perp_round_trip() {
        let f = Field3D::from_fn(2, 3, 4, |ix, jy, iz| (100 * ix + 10 * jy + iz) as f64);
        let plane = f.slice_perp(1);
        let mut g = Field3D::zeros(2, 3, 4);
        g.set_perp(&plane);
        assert_eq!(g[(1, 1, 3)], 113.0);
        assert_eq!(g[(1, 0, 3)], 0.0);
    }
}
