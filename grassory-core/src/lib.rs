//! Core crate of grassory.
//!
//! This crate holds everything about Grassmann grading that does not depend on a storage backend:
//! the per-axis statistic vocabulary, the sign of permutations over mixed commuting/anticommuting
//! index sets, the parity oracle, and the index-expression mini-language shared by contraction,
//! leg grouping, decomposition and conjugation.

#![warn(missing_docs)]
#![no_std]
extern crate alloc;
#[cfg(test)]
extern crate std;

// grading vocabulary

pub mod statistic;

pub mod oracle;

pub mod parity;

// expressions and options

pub mod expr;

pub mod config;

pub mod error;

pub mod prelude {
    //! A prelude module re-exporting commonly used items.

    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::expr::*;
    pub use crate::oracle::*;
    pub use crate::parity::*;
    pub use crate::statistic::*;
}
