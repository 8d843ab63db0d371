//! Error types of the core crate.

use alloc::string::String;
use thiserror::Error;

/// Malformed index expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// A digit suffix with no label character in front of it.
    #[error("digit at position {0} does not follow a label character")]
    LeadingDigit(usize),
    /// Character which has no meaning at its position.
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    /// More than one `->`.
    #[error("expression contains {0} arrows, at most one is allowed")]
    MultipleArrows(usize),
    /// Comma inside the output segment.
    #[error("output segment must not contain commas")]
    OutputComma,
    /// Parenthesized and separator-delimited groups in one expression.
    #[error("parenthesized and separator-delimited groups cannot be mixed")]
    MixedForms,
    /// `(` inside a group.
    #[error("nested parentheses are not allowed")]
    NestedParentheses,
    /// Unbalanced parentheses.
    #[error("parentheses do not match")]
    UnmatchedParenthesis,
    /// A group with no labels.
    #[error("group {0} is empty")]
    EmptyGroup(usize),
    /// The same label twice in a grouping expression.
    #[error("label '{0}' appears more than once")]
    DuplicateLabel(String),
    /// A partition expression without exactly two groups.
    #[error("partition must split the axes into exactly two groups, found {0}")]
    PartitionCount(usize),
}

/// Invalid input of a graded operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Statistic label outside `0`, `+1`, `-1`, `*`.
    #[error("unknown statistic label '{0}'")]
    UnknownStatistic(String),
    /// Encoder name outside `canonical`, `parity-preserving`.
    #[error("unknown encoder '{0}'")]
    UnknownEncoder(String),
    /// Format name outside `standard`, `matrix`.
    #[error("unknown format '{0}'")]
    UnknownFormat(String),
    /// Shape and statistic sequences of different length.
    #[error("shape has {shape} axes but statistic has {statistic}")]
    RankMismatch {
        /// number of dimensions
        shape: usize,
        /// number of labels
        statistic: usize,
    },
    /// Axis of dimension zero.
    #[error("axis {axis} has dimension zero")]
    ZeroDimension {
        /// offending axis
        axis: usize,
    },
    /// Fermionic axis whose dimension is not a power of two.
    #[error("fermionic axis {axis} has dimension {dim}, which is not a power of two")]
    NonPowerOfTwo {
        /// offending axis
        axis: usize,
        /// its dimension
        dim: usize,
    },
    /// Operands of a binary operation disagree.
    #[error("operands disagree in {what}")]
    Mismatch {
        /// the property that differs
        what: &'static str,
    },
    /// Hybrid axis reaching an operation that needs pure axes.
    #[error("hybrid axis cannot be used in {operation}; split it first")]
    HybridAxis {
        /// operation that rejected the axis
        operation: &'static str,
    },
    /// Malformed expression.
    #[error(transparent)]
    Expression(#[from] ExprError),
    /// Number of labels does not match the number of axes.
    #[error("expression names {labels} axes but the tensor has {axes}")]
    AxisCount {
        /// labels in the expression
        labels: usize,
        /// axes of the tensor
        axes: usize,
    },
    /// Number of operands does not match the expression.
    #[error("expression has {expected} operands but {found} were given")]
    OperandCount {
        /// operand segments in the expression
        expected: usize,
        /// tensors given
        found: usize,
    },
    /// A label bound to axes of different dimension.
    #[error("label '{label}' is bound to axes of different dimension")]
    DimensionMismatch {
        /// offending label
        label: String,
    },
    /// An output label that no operand carries.
    #[error("output label '{label}' does not appear in any operand")]
    UnknownOutputLabel {
        /// offending label
        label: String,
    },
    /// A sparse entry that does not fit the shape, or is given twice.
    #[error("sparse entry {reason}")]
    InvalidEntry {
        /// what is wrong with the entry
        reason: &'static str,
    },
    /// A fermionic label that cannot be paired.
    #[error("unmatched fermionic index '{label}'")]
    UnmatchedFermion {
        /// offending label
        label: String,
    },
    /// A contracted pair whose statistics are not opposite.
    #[error("contracted index '{label}' joins statistics {left} and {right}")]
    InconsistentPair {
        /// offending label
        label: String,
        /// first statistic
        left: crate::statistic::Statistic,
        /// second statistic
        right: crate::statistic::Statistic,
    },
}

/// Internal inconsistency of a permutation parity computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParityError {
    /// Parity bits and labels of different length.
    #[error("{labels} labels but {parities} parity bits")]
    LengthMismatch {
        /// number of labels
        labels: usize,
        /// number of parity bits
        parities: usize,
    },
    /// Output label that is not among the input labels.
    #[error("output label is not present in the input")]
    UnknownLabel,
    /// Anticommuting labels of input and output differ.
    #[error("anticommuting labels of input and output differ")]
    OddMismatch,
    /// Malformed relative-parity expression.
    #[error(transparent)]
    Expression(#[from] ExprError),
}
