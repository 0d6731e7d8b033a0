//! lapinv: parallel perpendicular Laplacian inversion
//!
//! This crate inverts `D·∇⊥²x + (1/C)·∇⊥C·∇⊥x + A·x = b` on field-aligned
//! plasma grids: Fourier decomposition along the periodic z direction and
//! distributed complex tridiagonal solves across the radial decomposition,
//! with a choice of direct and iterative distributed algorithms.

pub mod parallel;

pub mod config;
pub mod core;
pub mod error;
pub mod laplace;
pub mod mesh;
pub mod solver;
pub mod transform;
pub mod tridiagonal;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use core::*;
pub use error::*;
pub use laplace::*;
pub use mesh::*;
pub use solver::*;
pub use transform::*;
pub use tridiagonal::*;
pub use utils::*;
