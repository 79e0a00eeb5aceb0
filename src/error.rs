use thiserror::Error;

/// Errors surfaced by the solver core.
///
/// Planner outcomes that are part of normal operation (no solution exists,
/// a cap was hit) are not errors; they are reported in the result envelope
/// with `success = false`.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("mip backend not compiled in (enable the `mip` feature)")]
    MipUnavailable,
}

pub type Result<T> = std::result::Result<T, SolverError>;
