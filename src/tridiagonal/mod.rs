//! Complex tridiagonal systems: per-mode row assembly and direct solves.

pub mod row;
pub mod thomas;

pub use row::{boundary_widths, tridag_coefs, tridag_matrix};
pub use thomas::{cyclic_tridag, tridag};
