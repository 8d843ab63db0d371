//! Grassmann-graded tensor algebra.
//!
//! Tensors whose axes are bosonic or fermionic, contracted with the signs of anticommuting
//! indices taken into account.
//!
//! ```no_run
//! use grassory::prelude::*;
//! use grassory::core::statistic::Statistic::{ConjFermi, Fermi};
//! use rand::{SeedableRng, rngs::SmallRng};
//!
//! # fn main() -> anyhow::Result<()> {
//! let rt = GradedRuntime::new();
//! let mut rng = SmallRng::seed_from_u64(0);
//! let t: GradedTensor<f64> = GradedTensor::random(
//!     &[4, 4, 4, 4],
//!     vec![Fermi, Fermi, ConjFermi, ConjFermi],
//!     &mut rng,
//!     rt.oracle(),
//!     rt.config(),
//! )?;
//! let (u, s, v) = rt.svd(&t, "ij,kl", None)?;
//! let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
//! assert!((&back - &t)?.norm() < 1e-10);
//! # Ok(())
//! # }
//! ```

/// statistic vocabulary, permutation parity, oracle and index expressions
pub use grassory_core as core;

/// spectrum truncation and parity-block decompositions of plain matrices
pub use grassory_linalg as linalg;

/// graded tensors stored with ndarray
pub use grassory_ndarray as ndarray;

pub mod prelude {
    //! A prelude module re-exporting commonly used items.

    pub use grassory_core::prelude::*;
    pub use grassory_ndarray::{GradedError, GradedRepr, GradedRuntime, GradedTensor, Storage};
}
