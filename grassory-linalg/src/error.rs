use ndarray::ShapeError;
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlockError {
    /// every singular value or eigenvalue vanished
    #[error("decomposition produced an all-zero spectrum")]
    Degenerate,
    #[error("matrix is not grading-conserving: odd-checkerboard weight {weight:e} exceeds {tolerance:e}")]
    GradingViolation { weight: f64, tolerance: f64 },
    #[error("block decomposition received invalid input")]
    InvalidInput,
    #[error("linalg returned invalid result")]
    InvalidResult,
    #[error("linalg failed: {0}")]
    Linalg(#[from] LinalgError),
}

impl From<ShapeError> for BlockError {
    fn from(source: ShapeError) -> Self {
        BlockError::Linalg(source.into())
    }
}
