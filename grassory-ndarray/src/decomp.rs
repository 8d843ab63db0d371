//! Graded SVD and eigendecomposition.

use alloc::vec::Vec;

use grassory_core::{
    error::ValidationError,
    oracle::ParityOracle,
    statistic::{Encoder, Format, Statistic},
};
use grassory_linalg::{CutFilter, block_eig, block_svd, sorted_eig, sorted_svd};
use ndarray::{Array1, Array2, Ix2};
use ndarray_linalg::{Lapack, Scalar};

use crate::{
    GradedTensor,
    error::GradedError,
    runtime::GradedRuntime,
    tensor::real_cutoff,
};

type Result<T> = core::result::Result<T, GradedError>;

/// Partition of a tensor's axes into a row group and a column group.
struct Bipartition {
    left_stats: Vec<Statistic>,
    right_stats: Vec<Statistic>,
    left_shape: Vec<usize>,
    right_shape: Vec<usize>,
}

impl Bipartition {
    fn new<E: Scalar>(t: &GradedTensor<E>, left: usize, right: usize) -> Result<Self> {
        if left + right != t.ndim() {
            return Err(ValidationError::AxisCount {
                labels: left + right,
                axes: t.ndim(),
            }
            .into());
        }
        let (ls, rs) = t.statistic().split_at(left);
        let (lsh, rsh) = t.shape().split_at(left);
        Ok(Bipartition {
            left_stats: ls.to_vec(),
            right_stats: rs.to_vec(),
            left_shape: lsh.to_vec(),
            right_shape: rsh.to_vec(),
        })
    }

    fn sizes(&self) -> [usize; 2] {
        [self.left_stats.len(), self.right_stats.len()]
    }

    /// Row axis merges as `ConjFermi`, column axis as `Fermi`, unless purely bosonic.
    fn intermediate(&self) -> [Statistic; 2] {
        [
            Statistic::bose_or(&self.left_stats, Statistic::ConjFermi),
            Statistic::bose_or(&self.right_stats, Statistic::Fermi),
        ]
    }
}

fn diag<E: Scalar>(values: &Array1<E>) -> Array2<E> {
    let mut m = Array2::zeros((values.len(), values.len()));
    m.diag_mut().assign(values);
    m
}

impl<O: ParityOracle> GradedRuntime<O> {
    fn matrix_of<E: Scalar>(
        &self,
        t: &GradedTensor<E>,
        parts: &Bipartition,
    ) -> Result<(Array2<E>, [Statistic; 2])> {
        let m = self.join_legs_sized(t, &parts.sizes(), Format::Matrix, &parts.intermediate())?;
        let stats = [m.statistic()[0], m.statistic()[1]];
        Ok((m.data().into_dimensionality::<Ix2>()?, stats))
    }

    /// Splits the row factor back into the left axes plus the new shared axis.
    fn split_left<E: Scalar>(
        &self,
        u: Array2<E>,
        stats: [Statistic; 2],
        parts: &Bipartition,
    ) -> Result<GradedTensor<E>> {
        let k = u.ncols();
        let u = GradedTensor::dense(
            u.into_dyn(),
            stats.to_vec(),
            Encoder::ParityPreserving,
            Format::Matrix,
        );
        let mut statistic = parts.left_stats.clone();
        statistic.push(stats[1]);
        let mut shape = parts.left_shape.clone();
        shape.push(k);
        let intermediate = [
            Statistic::bose_or(&parts.left_stats, Statistic::ConjFermi),
            stats[1],
        ];
        self.split_legs_sized(
            &u,
            &[parts.left_stats.len(), 1],
            &statistic,
            &shape,
            &intermediate,
        )
    }

    /// Splits the column factor back into the new shared axis plus the right axes.
    fn split_right<E: Scalar>(
        &self,
        v: Array2<E>,
        stats: [Statistic; 2],
        parts: &Bipartition,
    ) -> Result<GradedTensor<E>> {
        let k = v.nrows();
        let v = GradedTensor::dense(
            v.into_dyn(),
            stats.to_vec(),
            Encoder::ParityPreserving,
            Format::Matrix,
        );
        let mut statistic = alloc::vec![stats[0]];
        statistic.extend_from_slice(&parts.right_stats);
        let mut shape = alloc::vec![k];
        shape.extend_from_slice(&parts.right_shape);
        let intermediate = [
            stats[0],
            Statistic::bose_or(&parts.right_stats, Statistic::Fermi),
        ];
        self.split_legs_sized(
            &v,
            &[1, parts.right_stats.len()],
            &statistic,
            &shape,
            &intermediate,
        )
    }

    /// Singular value decomposition `T = U Λ V` across the two groups of `partition`.
    ///
    /// `U` carries the left axes plus a new `Fermi` axis, `Λ` is diagonal with statistic
    /// `(ConjFermi, Fermi)`, `V` carries a new `ConjFermi` axis plus the right axes, so that
    /// `einsum("ija,ab,bkl->ijkl", U, Λ, V)` reproduces `T`. If either side is purely bosonic the
    /// new axes are bosonic and an ordinary SVD is used. `cutoff` bounds the retained rank.
    #[tracing::instrument(skip_all, fields(partition = partition, cutoff = ?cutoff))]
    pub fn svd<E: Scalar + Lapack>(
        &self,
        t: &GradedTensor<E>,
        partition: &str,
        cutoff: Option<usize>,
    ) -> Result<(GradedTensor<E>, GradedTensor<E>, GradedTensor<E>)> {
        let p = self.partition_expr(partition)?;
        let parts = Bipartition::new(t, p.left().len(), p.right().len())?;
        let (m, [s0, s1]) = self.matrix_of(t, &parts)?;

        let (u, sigma, v, lambda_stats) = if s0 == Statistic::Bose || s1 == Statistic::Bose {
            let filter = CutFilter {
                max_ix: cutoff,
                rel_cutoff: Some(real_cutoff::<E>(self.config().numeric_cutoff)),
            };
            let (u, sigma, v) = sorted_svd(&m, filter)?;
            if sigma.is_empty() {
                return Err(GradedError::NumericDegeneracy);
            }
            (u, sigma, v, [Statistic::Bose, Statistic::Bose])
        } else {
            let (u, sigma, v) = block_svd(&m, cutoff, self.config())?;
            (u, sigma, v, [Statistic::ConjFermi, Statistic::Fermi])
        };
        tracing::debug!(rank = sigma.len(), "svd");

        let sigma: Array1<E> = sigma.mapv(E::from_real);
        let u = self.split_left(u, [s0, lambda_stats[0].flipped()], &parts)?;
        let v = self.split_right(v, [lambda_stats[1].flipped(), s1], &parts)?;
        let lambda = GradedTensor::dense(
            diag(&sigma).into_dyn(),
            lambda_stats.to_vec(),
            Encoder::ParityPreserving,
            Format::Matrix,
        )
        .switch_encoder(self.oracle());

        let (encoder, format) = (t.encoder(), t.format());
        let oracle = self.oracle();
        Ok((
            u.restored(encoder, format, oracle)?
                .with_storage_of(t, self.config()),
            lambda
                .restored(encoder, format, oracle)?
                .with_storage_of(t, self.config()),
            v.restored(encoder, format, oracle)?
                .with_storage_of(t, self.config()),
        ))
    }

    /// Eigendecomposition `T U = U Λ` across the two groups of `partition`.
    ///
    /// Both groups must merge to the same dimension. Returns `(Λ, U)` over the complex field of
    /// `E`, with the axes of `U` and `Λ` laid out as in [`GradedRuntime::svd`]; eigenvalues are
    /// sorted by descending magnitude.
    #[tracing::instrument(skip_all, fields(partition = partition, cutoff = ?cutoff))]
    pub fn eig<E: Scalar + Lapack>(
        &self,
        t: &GradedTensor<E>,
        partition: &str,
        cutoff: Option<usize>,
    ) -> Result<(GradedTensor<E::Complex>, GradedTensor<E::Complex>)> {
        let p = self.partition_expr(partition)?;
        let parts = Bipartition::new(t, p.left().len(), p.right().len())?;
        let (m, [s0, s1]) = self.matrix_of(t, &parts)?;
        if m.nrows() != m.ncols() {
            return Err(ValidationError::Mismatch {
                what: "row and column dimension",
            }
            .into());
        }

        let (lambda, u, lambda_stats) = if s0 == Statistic::Bose || s1 == Statistic::Bose {
            let filter = CutFilter {
                max_ix: cutoff,
                rel_cutoff: Some(real_cutoff::<E>(self.config().numeric_cutoff)),
            };
            let (lambda, u) = sorted_eig(&m, filter)?;
            if lambda.is_empty() {
                return Err(GradedError::NumericDegeneracy);
            }
            (lambda, u, [Statistic::Bose, Statistic::Bose])
        } else {
            let (lambda, u) = block_eig(&m, cutoff, self.config())?;
            (lambda, u, [Statistic::ConjFermi, Statistic::Fermi])
        };
        tracing::debug!(rank = lambda.len(), "eig");

        let u = self.split_left(u, [s0, lambda_stats[0].flipped()], &parts)?;
        let lambda = GradedTensor::dense(
            diag(&lambda).into_dyn(),
            lambda_stats.to_vec(),
            Encoder::ParityPreserving,
            Format::Matrix,
        )
        .switch_encoder(self.oracle());

        let (encoder, format) = (t.encoder(), t.format());
        let oracle = self.oracle();
        let sparse = t.is_sparse();
        let finish = |x: GradedTensor<E::Complex>| -> Result<GradedTensor<E::Complex>> {
            let x = x.restored(encoder, format, oracle)?;
            Ok(if sparse { x.to_sparse(self.config()) } else { x })
        };
        Ok((finish(lambda)?, finish(u)?))
    }
}
