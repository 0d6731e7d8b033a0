//! Radial domain decomposition and grid geometry.
//!
//! The global x index space is split contiguously across `nxpe` ranks. Each
//! rank owns `[xstart, xend]` interior points plus `xstart` guard cells on
//! either side. Guard cells on internal decomposition boundaries mirror the
//! neighbouring rank's edge values; guard cells on the physical boundaries
//! hold boundary-condition rows.

use crate::error::LapError;

/// Local view of a 1D block-distributed grid.
#[derive(Debug, Clone)]
pub struct Mesh1D {
    /// Local number of x points, guard cells included.
    pub local_nx: usize,
    /// Number of y planes held locally.
    pub local_ny: usize,
    /// Number of z points (periodic direction).
    pub local_nz: usize,
    /// First interior x index (also the guard width).
    pub xstart: usize,
    /// Last interior x index.
    pub xend: usize,
    /// Number of ranks in the x direction.
    pub nxpe: usize,
    /// This rank's position in the x decomposition.
    pub xproc: usize,
    /// Whether the x direction wraps around.
    pub periodic_x: bool,
}

impl Mesh1D {
    /// A mesh with `nx_interior` owned points per rank and `guards` guard
    /// cells on each side.
    pub fn new(
        nx_interior: usize,
        ny: usize,
        nz: usize,
        guards: usize,
        nxpe: usize,
        xproc: usize,
    ) -> Result<Self, LapError> {
        if nx_interior == 0 || nz < 2 {
            return Err(LapError::Config(format!(
                "invalid mesh extents: nx_interior={nx_interior}, nz={nz}"
            )));
        }
        if xproc >= nxpe {
            return Err(LapError::Config(format!(
                "xproc={xproc} out of range for nxpe={nxpe}"
            )));
        }
        Ok(Self {
            local_nx: nx_interior + 2 * guards,
            local_ny: ny,
            local_nz: nz,
            xstart: guards,
            xend: guards + nx_interior - 1,
            nxpe,
            xproc,
            periodic_x: false,
        })
    }

    /// Whether this rank touches the inner physical boundary.
    pub fn first_x(&self) -> bool {
        self.xproc == 0
    }

    /// Whether this rank touches the outer physical boundary.
    pub fn last_x(&self) -> bool {
        self.xproc == self.nxpe - 1
    }

    /// Rank of the inward x neighbour, wrapping when periodic.
    pub fn proc_in(&self) -> Option<usize> {
        if !self.first_x() {
            Some(self.xproc - 1)
        } else if self.periodic_x {
            Some(self.nxpe - 1)
        } else {
            None
        }
    }

    /// Rank of the outward x neighbour, wrapping when periodic.
    pub fn proc_out(&self) -> Option<usize> {
        if !self.last_x() {
            Some(self.xproc + 1)
        } else if self.periodic_x {
            Some(0)
        } else {
            None
        }
    }

    /// Number of interior points owned by this rank.
    pub fn interior_len(&self) -> usize {
        self.xend - self.xstart + 1
    }
}

/// Uniform grid spacings.
#[derive(Debug, Clone, Copy)]
pub struct Coordinates {
    /// Radial cell width.
    pub dx: f64,
    /// Toroidal cell width.
    pub dz: f64,
    nz: usize,
}

impl Coordinates {
    pub fn uniform(dx: f64, dz: f64, nz: usize) -> Self {
        Self { dx, dz, nz }
    }

    /// Length of the periodic z domain.
    pub fn zlength(&self) -> f64 {
        self.dz * self.nz as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbours_on_open_boundaries() {
        let m = Mesh1D::new(8, 1, 16, 2, 4, 0).unwrap();
        assert!(m.first_x());
        assert!(!m.last_x());
        assert_eq!(m.proc_in(), None);
        assert_eq!(m.proc_out(), Some(1));
        assert_eq!(m.local_nx, 12);
        assert_eq!(m.xstart, 2);
        assert_eq!(m.xend, 9);
    }

    #[test]
    fn periodic_wraparound() {
        let mut m = Mesh1D::new(8, 1, 16, 2, 4, 3).unwrap();
        m.periodic_x = true;
        assert_eq!(m.proc_out(), Some(0));
        assert_eq!(m.proc_in(), Some(2));
    }

    #[test]
    fn rejects_bad_extents() {
        assert!(Mesh1D::new(0, 1, 16, 2, 1, 0).is_err());
        assert!(Mesh1D::new(8, 1, 16, 2, 2, 2).is_err());
    }
}
