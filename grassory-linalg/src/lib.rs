#![no_std]
extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod cut_filter;

pub mod error;

pub mod sorted;

pub mod block;

pub use block::{block_eig, block_svd, check_grading, odd_checkerboard_weight};
pub use cut_filter::CutFilter;
pub use error::BlockError;
pub use sorted::{sorted_eig, sorted_svd};
