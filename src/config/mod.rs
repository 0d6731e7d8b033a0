pub mod options;

pub use options::{BoundaryFlags, GlobalFlags, InvertFlags, SolverOptions};
