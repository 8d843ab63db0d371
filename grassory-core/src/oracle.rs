//! Per-index grading data of fermionic basis indices.

use crate::parity::Sign;

/// Source of the per-index combinatorics every sign computation funnels through.
///
/// Implementors must make [`ParityOracle::reencode_index`] an involution on `[0, dim)` for every
/// power-of-two `dim`, and must make the reencoded position of a canonical index `i` have index
/// parity equal to `grading_parity(i)`.
pub trait ParityOracle {
    /// Grading parity of the canonical basis index, `true` for odd.
    fn grading_parity(&self, index: usize) -> bool;
    /// Sign picked up by the index under a format switch or when its pair is integrated out.
    fn sign_value(&self, index: usize) -> Sign;
    /// Position of a canonical index in the parity-preserving encoding, and back.
    fn reencode_index(&self, index: usize) -> usize;
}

/// Oracle reading a basis index as a bit pattern over the generators.
///
/// With `p` set bits, the grading parity is `p mod 2` and the sign is `(-1)^(p(p-1)/2)`, the sign of
/// reversing a product of `p` generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryOracle;

impl ParityOracle for BinaryOracle {
    fn grading_parity(&self, index: usize) -> bool {
        index.count_ones() % 2 == 1
    }

    fn sign_value(&self, index: usize) -> Sign {
        let p = index.count_ones() as usize;
        Sign::from_parity((p * p.saturating_sub(1) / 2) % 2 == 1)
    }

    fn reencode_index(&self, index: usize) -> usize {
        // the lowest bit carries the total parity, the others are untouched
        index ^ ((index >> 1).count_ones() as usize & 1)
    }
}
