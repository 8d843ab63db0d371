use alloc::vec::Vec;

use grassory_core::{
    error::ValidationError,
    oracle::ParityOracle,
    statistic::{Encoder, Format, Statistic},
};
use ndarray::{Array2, Ix2};
use ndarray_linalg::{Scalar, conjugate};

use crate::{GradedTensor, error::GradedError, runtime::GradedRuntime};

impl<O: ParityOracle> GradedRuntime<O> {
    /// Hermitian conjugate across the two groups of `partition`.
    ///
    /// The result carries the right group's axes first, then the left group's, every fermionic
    /// statistic flipped. Conjugating twice with the swapped partition returns the input.
    #[tracing::instrument(skip_all, fields(partition = partition))]
    pub fn hconjugate<E: Scalar>(
        &self,
        t: &GradedTensor<E>,
        partition: &str,
    ) -> Result<GradedTensor<E>, GradedError> {
        let oracle = self.oracle();
        let p = self.partition_expr(partition)?;
        let (nl, nr) = (p.left().len(), p.right().len());
        if nl + nr != t.ndim() {
            return Err(ValidationError::AxisCount {
                labels: nl + nr,
                axes: t.ndim(),
            }
            .into());
        }
        let (left_stats, right_stats) = t.statistic().split_at(nl);
        let (left_shape, right_shape) = t.shape().split_at(nl);

        let m = self.join_legs_sized(
            t,
            &[nl, nr],
            Format::Matrix,
            &[
                Statistic::bose_or(left_stats, Statistic::ConjFermi),
                Statistic::bose_or(right_stats, Statistic::Fermi),
            ],
        )?;
        let data: Array2<E> = m.data().into_dimensionality::<Ix2>()?;
        let mh: Array2<E> = conjugate(&data);
        let mh = GradedTensor::dense(
            mh.into_dyn(),
            alloc::vec![m.statistic()[1].flipped(), m.statistic()[0].flipped()],
            Encoder::ParityPreserving,
            Format::Matrix,
        );

        let flip = |s: &[Statistic]| s.iter().map(|x| x.flipped()).collect::<Vec<_>>();
        let (new_left, new_right) = (flip(right_stats), flip(left_stats));
        let statistic = [new_left.as_slice(), new_right.as_slice()].concat();
        let shape = [right_shape, left_shape].concat();
        let split = self.split_legs_sized(
            &mh,
            &[nr, nl],
            &statistic,
            &shape,
            &[
                Statistic::bose_or(&new_left, Statistic::ConjFermi),
                Statistic::bose_or(&new_right, Statistic::Fermi),
            ],
        )?;
        Ok(split
            .restored(t.encoder(), t.format(), oracle)?
            .with_storage_of(t, self.config()))
    }
}
