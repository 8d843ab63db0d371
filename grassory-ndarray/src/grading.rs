//! Grassmann parity of entries, random even tensors and elementwise powers.

use alloc::vec::Vec;

use grassory_core::{
    config::GradedConfig,
    error::ValidationError,
    oracle::ParityOracle,
    statistic::{Encoder, Format, Statistic},
};
use ndarray::IxDyn;
use ndarray_linalg::{Scalar, random_using};
use rand::Rng;

use crate::{
    GradedTensor,
    repr::{GradedRepr, Storage},
};

impl<E: Scalar> GradedTensor<E> {
    /// Grassmann parity of the basis state at `coords`: the sum of the per-axis parities over
    /// fermionic axes.
    fn entry_is_odd<O: ParityOracle>(&self, coords: &[usize], oracle: &O) -> bool {
        let odd_of = |c: usize| match self.encoder() {
            Encoder::Canonical => oracle.grading_parity(c),
            Encoder::ParityPreserving => c % 2 == 1,
        };
        self.statistic()
            .iter()
            .zip(coords)
            .filter(|(s, _)| s.is_fermionic())
            .fold(false, |acc, (_, &c)| acc ^ odd_of(c))
    }

    /// Zeroes every Grassmann-odd entry.
    pub fn trim_grassmann_odd<O: ParityOracle>(&self, oracle: &O) -> Self {
        let mut out = self.clone();
        match out.storage_mut() {
            Storage::Sparse(s) => {
                s.entries_mut()
                    .retain(|coords, _| !self.entry_is_odd(coords, oracle));
            }
            dense => dense.map_indexed(|coords, v| {
                if self.entry_is_odd(coords, oracle) {
                    *v = E::zero();
                }
            }),
        }
        out
    }

    /// Returns true if no Grassmann-odd entry exceeds `config.numeric_cutoff` in magnitude.
    pub fn is_grassmann_even<O: ParityOracle>(&self, oracle: &O, config: &GradedConfig) -> bool {
        let cutoff = crate::tensor::real_cutoff::<E>(config.numeric_cutoff);
        let mut even = true;
        self.storage().for_each_indexed(|coords, v| {
            if v.abs() > cutoff && self.entry_is_odd(coords, oracle) {
                even = false;
            }
        });
        even
    }

    /// Random Grassmann-even dense tensor in the canonical encoding and standard format.
    pub fn random<O: ParityOracle, R: Rng>(
        shape: &[usize],
        statistic: Vec<Statistic>,
        rng: &mut R,
        oracle: &O,
        config: &GradedConfig,
    ) -> Result<Self, ValidationError> {
        let data = random_using(IxDyn(shape), rng);
        Ok(GradedTensor::new(data, statistic, config)?.trim_grassmann_odd(oracle))
    }

    /// Raises every entry to `exponent` in the matrix format and canonical encoding, returning
    /// the result in the original layout.
    ///
    /// Intended for diagonal tensors such as singular values, where the entrywise power is the
    /// matrix power.
    pub fn powf<O: ParityOracle>(&self, exponent: E::Real, oracle: &O) -> Result<Self, ValidationError> {
        let (encoder, format) = (self.encoder(), self.format());
        let work = self
            .force_format(Format::Matrix, oracle)?
            .force_encoder(Encoder::Canonical, oracle);
        let powered = GradedTensor::from_parts(
            work.storage().mapv(|v| if v == E::zero() { v } else { v.powf(exponent) }),
            work.statistic().to_vec(),
            work.encoder(),
            work.format(),
        );
        powered.restored(encoder, format, oracle)
    }

    /// Entrywise square root, see [`GradedTensor::powf`].
    pub fn sqrt<O: ParityOracle>(&self, oracle: &O) -> Result<Self, ValidationError> {
        let half = crate::tensor::real_cutoff::<E>(0.5);
        self.powf(half, oracle)
    }
}
