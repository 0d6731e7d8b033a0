pub mod convergence;

pub use convergence::{ConvergenceFlags, IterationStats, Tolerances};
