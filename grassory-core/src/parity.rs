//! Sign of permutations over mixed commuting/anticommuting index sets.
//!
//! Only inversions between two anticommuting (odd) elements contribute; even elements commute with
//! everything and are ignored.

use alloc::vec::Vec;
use core::ops::{Mul, MulAssign, Neg};

use num_traits::One;

use crate::{error::ParityError, expr::tokenize_chars};

/// A `+1` or `-1` factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sign {
    /// `+1`
    #[default]
    Plus,
    /// `-1`
    Minus,
}

impl Sign {
    /// `(-1)^odd`
    pub fn from_parity(odd: bool) -> Self {
        if odd { Sign::Minus } else { Sign::Plus }
    }
    /// Returns true for `Minus`.
    pub fn is_minus(self) -> bool {
        self == Sign::Minus
    }
    /// Applies the sign to a value.
    pub fn apply<T: Neg<Output = T>>(self, value: T) -> T {
        match self {
            Sign::Plus => value,
            Sign::Minus => -value,
        }
    }
    /// The sign as `1` or `-1` of a primitive number type.
    pub fn value<T: One + Neg<Output = T>>(self) -> T {
        self.apply(T::one())
    }
}

impl Mul for Sign {
    type Output = Sign;
    fn mul(self, rhs: Sign) -> Sign {
        Sign::from_parity(self.is_minus() ^ rhs.is_minus())
    }
}

impl MulAssign for Sign {
    fn mul_assign(&mut self, rhs: Sign) {
        *self = *self * rhs;
    }
}

impl Neg for Sign {
    type Output = Sign;
    fn neg(self) -> Sign {
        self * Sign::Minus
    }
}

impl core::iter::Product for Sign {
    fn product<I: Iterator<Item = Sign>>(iter: I) -> Sign {
        iter.fold(Sign::Plus, |acc, s| acc * s)
    }
}

/// Sign of sorting the odd-parity labels of `labels` into ascending order.
///
/// `odd[i]` is the grading parity of `labels[i]`. Labels are assumed distinct.
pub fn absolute_parity<L: Ord>(labels: &[L], odd: &[bool]) -> Result<Sign, ParityError> {
    if labels.len() != odd.len() {
        return Err(ParityError::LengthMismatch {
            labels: labels.len(),
            parities: odd.len(),
        });
    }
    let anticommuting: Vec<&L> = labels
        .iter()
        .zip(odd)
        .filter_map(|(l, &o)| o.then_some(l))
        .collect();

    let mut inversions = 0usize;
    for (i, a) in anticommuting.iter().enumerate() {
        inversions += anticommuting[i + 1..].iter().filter(|b| *b < a).count();
    }
    Ok(Sign::from_parity(inversions % 2 == 1))
}

/// Sign of reordering `input` into `output`.
///
/// The parity of each output label is looked up from its position in `input`. Even input labels
/// may be absent from `output`, but the anticommuting labels of both sides must coincide.
pub fn relative_parity<L: Ord + Copy>(
    input: &[L],
    output: &[L],
    input_odd: &[bool],
) -> Result<Sign, ParityError> {
    if input.len() != input_odd.len() {
        return Err(ParityError::LengthMismatch {
            labels: input.len(),
            parities: input_odd.len(),
        });
    }
    let output_odd = output
        .iter()
        .map(|l| {
            input
                .iter()
                .position(|x| x == l)
                .map(|p| input_odd[p])
                .ok_or(ParityError::UnknownLabel)
        })
        .collect::<Result<Vec<bool>, _>>()?;

    let odd_labels = |labels: &[L], odd: &[bool]| {
        let mut v: Vec<L> = labels
            .iter()
            .zip(odd)
            .filter_map(|(l, &o)| o.then_some(*l))
            .collect();
        v.sort();
        v
    };
    if odd_labels(input, input_odd) != odd_labels(output, &output_odd) {
        return Err(ParityError::OddMismatch);
    }

    Ok(absolute_parity(input, input_odd)? * absolute_parity(output, &output_odd)?)
}

/// Relative parity written as an expression `"in1,in2,...->out"` over single-character labels.
///
/// Labels shared by several input positions are contracted and removed, together with their parity
/// bits, before comparing against the output.
pub fn relative_parity_str(expr: &str, parity: &[bool]) -> Result<Sign, ParityError> {
    let (inputs, output) = match expr.split_once("->") {
        Some((i, o)) => (i, o),
        None => (expr, ""),
    };
    let input: Vec<char> = tokenize_chars(&inputs.replace(',', ""))?;
    let output: Vec<char> = tokenize_chars(output)?;
    if input.len() != parity.len() {
        return Err(ParityError::LengthMismatch {
            labels: input.len(),
            parities: parity.len(),
        });
    }

    let (kept, kept_parity): (Vec<char>, Vec<bool>) = input
        .iter()
        .zip(parity)
        .filter(|(c, _)| input.iter().filter(|x| x == c).count() == 1)
        .map(|(c, p)| (*c, *p))
        .unzip();

    relative_parity(&kept, &output, &kept_parity)
}
