use ndarray::{ArrayBase, Data, Ix, Ix1};
use num_traits::Float;

use crate::error::BlockError;

/// Truncation policy of a sorted spectrum.
///
/// A value survives if its magnitude relative to the leading one exceeds `rel_cutoff`; at most
/// `max_ix` values survive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CutFilter<R> {
    pub max_ix: Option<Ix>,
    pub rel_cutoff: Option<R>,
}
impl<R> Default for CutFilter<R> {
    fn default() -> Self {
        CutFilter {
            max_ix: None,
            rel_cutoff: None,
        }
    }
}

pub fn max_ix<R>(max_ix: Ix) -> CutFilter<R> {
    CutFilter {
        max_ix: Some(max_ix),
        rel_cutoff: None,
    }
}
pub fn rel_cutoff<R>(cutoff: R) -> CutFilter<R> {
    CutFilter {
        max_ix: None,
        rel_cutoff: Some(cutoff),
    }
}

impl<R: Float> CutFilter<R> {
    pub fn with_max_ix(self, max_ix: Option<Ix>) -> Self {
        CutFilter { max_ix, ..self }
    }

    /// Number of leading entries of a descending magnitude vector to keep.
    ///
    /// A vanishing leading entry keeps nothing.
    pub fn rank<S: Data<Elem = R>>(&self, magnitudes: &ArrayBase<S, Ix1>) -> Result<Ix, BlockError> {
        let mut pre = R::infinity();
        for &m in magnitudes.iter() {
            if !(m >= R::zero()) {
                // negative or nan
                return Err(BlockError::InvalidResult);
            }
            if m > pre {
                // not ordered
                return Err(BlockError::InvalidResult);
            }
            pre = m;
        }

        let Some(&lead) = magnitudes.iter().next() else {
            return Ok(0);
        };
        if lead == R::zero() {
            return Ok(0);
        }
        let cutoff = self.rel_cutoff.unwrap_or(R::zero());
        let kept = magnitudes.iter().take_while(|&&m| m / lead > cutoff).count();
        Ok(match self.max_ix {
            Some(max) => kept.min(max),
            None => kept,
        })
    }
}
