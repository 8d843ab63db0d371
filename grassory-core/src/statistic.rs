//! Grading labels, basis encoders and sign-absorption formats.

use alloc::string::ToString;
use core::{fmt, str::FromStr};

use crate::{config::GradedConfig, error::ValidationError};

/// Grading label carried by a single tensor axis.
///
/// `Fermi` and `ConjFermi` are the two fermionic labels (written `+1` and `-1`), a `Hybrid` axis is
/// the product of a bosonic and a fermionic axis produced by leg grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Statistic {
    /// Commuting axis, written `0`.
    Bose,
    /// Fermionic axis carrying the generators `θ`, written `+1`.
    Fermi,
    /// Fermionic axis carrying the conjugate generators `θ̄`, written `-1`.
    ConjFermi,
    /// Merged bosonic and fermionic axis, written `*`.
    Hybrid,
}

impl Statistic {
    /// Returns true for `Fermi` and `ConjFermi`.
    pub fn is_fermionic(self) -> bool {
        matches!(self, Statistic::Fermi | Statistic::ConjFermi)
    }

    /// Returns true for `Bose` and `Hybrid`, the labels which are not reindexed by an encoder switch.
    pub fn is_bose_like(self) -> bool {
        !self.is_fermionic()
    }

    /// Exchanges `Fermi` and `ConjFermi`. Other labels pass through.
    pub fn flipped(self) -> Self {
        match self {
            Statistic::Fermi => Statistic::ConjFermi,
            Statistic::ConjFermi => Statistic::Fermi,
            other => other,
        }
    }

    /// Returns true if the two labels form a contractible fermionic pair.
    ///
    /// Two `Hybrid` labels also pair. This is label vocabulary only: contraction rejects `Hybrid`
    /// operands before any pairing happens.
    pub fn pairs_with(self, other: Statistic) -> bool {
        matches!(
            (self, other),
            (Statistic::Fermi, Statistic::ConjFermi)
                | (Statistic::ConjFermi, Statistic::Fermi)
                | (Statistic::Hybrid, Statistic::Hybrid)
        )
    }

    /// Numeric form of the label, `None` for `Hybrid`.
    pub fn as_int(self) -> Option<i8> {
        match self {
            Statistic::Bose => Some(0),
            Statistic::Fermi => Some(1),
            Statistic::ConjFermi => Some(-1),
            Statistic::Hybrid => None,
        }
    }

    /// Parses the numeric form of the label.
    pub fn from_int(value: i8) -> Result<Self, ValidationError> {
        match value {
            0 => Ok(Statistic::Bose),
            1 => Ok(Statistic::Fermi),
            -1 => Ok(Statistic::ConjFermi),
            other => Err(ValidationError::UnknownStatistic(other.to_string())),
        }
    }

    /// `Bose` if every label is `Bose`, otherwise `prefer`.
    pub fn bose_or(stats: &[Statistic], prefer: Statistic) -> Statistic {
        if stats.iter().all(|s| *s == Statistic::Bose) {
            Statistic::Bose
        } else {
            prefer
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Bose => write!(f, "0"),
            Statistic::Fermi => write!(f, "1"),
            Statistic::ConjFermi => write!(f, "-1"),
            Statistic::Hybrid => write!(f, "*"),
        }
    }
}

impl FromStr for Statistic {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Statistic::Bose),
            "1" | "+1" => Ok(Statistic::Fermi),
            "-1" => Ok(Statistic::ConjFermi),
            "*" => Ok(Statistic::Hybrid),
            other => Err(ValidationError::UnknownStatistic(other.to_string())),
        }
    }
}

/// Basis ordering used on fermionic axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoder {
    /// Basis index read as a bit pattern over the generators.
    #[default]
    Canonical,
    /// Basis reordered so that index parity equals grading parity.
    ParityPreserving,
}

impl Encoder {
    /// The other encoder.
    pub fn toggled(self) -> Self {
        match self {
            Encoder::Canonical => Encoder::ParityPreserving,
            Encoder::ParityPreserving => Encoder::Canonical,
        }
    }
}

impl fmt::Display for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoder::Canonical => write!(f, "canonical"),
            Encoder::ParityPreserving => write!(f, "parity-preserving"),
        }
    }
}

impl FromStr for Encoder {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "canonical" => Ok(Encoder::Canonical),
            "parity-preserving" => Ok(Encoder::ParityPreserving),
            other => Err(ValidationError::UnknownEncoder(other.to_string())),
        }
    }
}

/// Sign-absorption convention for conjugated axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Coefficients as they multiply the Grassmann monomials.
    #[default]
    Standard,
    /// Coefficients with the per-index sign of every `ConjFermi` axis absorbed.
    Matrix,
}

impl Format {
    /// The other format.
    pub fn toggled(self) -> Self {
        match self {
            Format::Standard => Format::Matrix,
            Format::Matrix => Format::Standard,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Standard => write!(f, "standard"),
            Format::Matrix => write!(f, "matrix"),
        }
    }
}

impl FromStr for Format {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "standard" => Ok(Format::Standard),
            "matrix" => Ok(Format::Matrix),
            other => Err(ValidationError::UnknownFormat(other.to_string())),
        }
    }
}

/// Checks that a shape and a statistic sequence describe a valid graded tensor.
///
/// Lengths must agree, every dimension must be positive, and fermionic axes must have a power of
/// two dimension unless `config.skip_power_of_two_check` is set.
pub fn validate_axes(
    shape: &[usize],
    statistic: &[Statistic],
    config: &GradedConfig,
) -> Result<(), ValidationError> {
    if shape.len() != statistic.len() {
        return Err(ValidationError::RankMismatch {
            shape: shape.len(),
            statistic: statistic.len(),
        });
    }
    for (axis, (&dim, stat)) in shape.iter().zip(statistic).enumerate() {
        if dim == 0 {
            return Err(ValidationError::ZeroDimension { axis });
        }
        if stat.is_fermionic() && !config.skip_power_of_two_check && !dim.is_power_of_two() {
            return Err(ValidationError::NonPowerOfTwo { axis, dim });
        }
    }
    Ok(())
}
