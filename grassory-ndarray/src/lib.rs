//! Grassmann-graded tensors over `ndarray`.
//!
//! [`GradedTensor`] stores its data densely or sparsely together with one [`Statistic`] per
//! axis and the encoder/format tags of its fermionic axes. The sign-aware operations live on
//! [`GradedRuntime`], which carries the configuration, the parity oracle and the expression cache:
//!
//! - [`GradedRuntime::einsum`]: graded contraction,
//! - [`GradedRuntime::join_legs`] and [`GradedRuntime::split_legs`]: leg grouping,
//! - [`GradedRuntime::svd`] and [`GradedRuntime::eig`]: parity-block decompositions,
//! - [`GradedRuntime::hconjugate`]: Hermitian conjugation.
//!
//! [`Statistic`]: grassory_core::statistic::Statistic

#![no_std]
extern crate alloc;
#[cfg(test)]
extern crate std;

extern crate blas_src;

mod arith;
mod conj;
mod decomp;
mod einsum;
mod encoding;
pub mod error;
mod grading;
mod legs;
pub mod repr;
mod runtime;
pub mod tenalg;
mod tensor;

pub use error::GradedError;
pub use legs::GroupInfo;
pub use repr::{GradedRepr, NdDenseRepr, NdSparseRepr, Storage};
pub use runtime::GradedRuntime;
pub use tensor::GradedTensor;
