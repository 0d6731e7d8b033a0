use thiserror::Error;

// Unified error type for lapinv

#[derive(Error, Debug)]
pub enum LapError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(
        "not converged within maxits={maxits} iterations on rank {rank} (jy={jy}): the \
         iteration matrix is diagonally dominant and convergence is guaranteed; increase \
         maxits and retry"
    )]
    MaxitsDominant { maxits: usize, rank: usize, jy: usize },
    #[error(
        "not converged within maxits={maxits} iterations on rank {rank} (jy={jy}): the \
         iteration matrix is not diagonally dominant so there is no guarantee this method \
         converges; increase maxits, use a different solver, or use more levels"
    )]
    MaxitsNotDominant { maxits: usize, rank: usize, jy: usize },
    #[error("non-finite value in solution at ix={ix}, jy={jy}, kz={kz}")]
    NonFinite { ix: usize, jy: usize, kz: usize },
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}
