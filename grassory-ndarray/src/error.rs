use grassory_core::error::{ExprError, ParityError, ValidationError};
use grassory_linalg::BlockError;
use ndarray::ShapeError;
use thiserror::Error;

use crate::tenalg::error::TenalgError;

/// Failure of a graded tensor operation.
#[derive(Debug, Error)]
pub enum GradedError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Parity(#[from] ParityError),
    /// every singular value or eigenvalue vanished
    #[error("decomposition produced an all-zero spectrum")]
    NumericDegeneracy,
    #[error("matrix is not grading-conserving: odd-checkerboard weight {weight:e} exceeds {tolerance:e}")]
    GradingViolation { weight: f64, tolerance: f64 },
    #[error("block decomposition failed: {0}")]
    Block(BlockError),
    #[error("tensor algebra failed: {0}")]
    Tenalg(#[from] TenalgError),
}

impl From<BlockError> for GradedError {
    fn from(source: BlockError) -> Self {
        match source {
            BlockError::Degenerate => GradedError::NumericDegeneracy,
            BlockError::GradingViolation { weight, tolerance } => {
                GradedError::GradingViolation { weight, tolerance }
            }
            other => GradedError::Block(other),
        }
    }
}

impl From<ExprError> for GradedError {
    fn from(source: ExprError) -> Self {
        GradedError::Validation(source.into())
    }
}

impl From<ShapeError> for GradedError {
    fn from(source: ShapeError) -> Self {
        GradedError::Tenalg(source.into())
    }
}
