use alloc::vec::Vec;

use grassory_core::{
    config::GradedConfig,
    error::ValidationError,
    statistic::{Encoder, Format, Statistic, validate_axes},
};
use ndarray::ArrayD;
use ndarray_linalg::Scalar;
use num_traits::NumCast;

use crate::repr::{GradedRepr, NdDenseRepr, NdSparseRepr, Storage};

/// A multi-dimensional array whose axes carry a grading label.
///
/// Besides the data, a tensor records which basis ordering its fermionic axes use
/// ([`Encoder`]) and whether the `ConjFermi` sign factors are absorbed into the entries
/// ([`Format`]). Operations keep data and tags consistent: every switch that rewrites the data
/// also flips the tag.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedTensor<E> {
    storage: Storage<E>,
    statistic: Vec<Statistic>,
    encoder: Encoder,
    format: Format,
}

impl<E: Scalar> GradedTensor<E> {
    /// Dense tensor in the canonical encoding and standard format.
    pub fn new(
        data: ArrayD<E>,
        statistic: Vec<Statistic>,
        config: &GradedConfig,
    ) -> Result<Self, ValidationError> {
        Self::from_storage(
            Storage::Dense(NdDenseRepr::new(data)),
            statistic,
            Encoder::Canonical,
            Format::Standard,
            config,
        )
    }

    /// Sparse tensor in the canonical encoding and standard format.
    pub fn from_entries(
        shape: Vec<usize>,
        entries: impl IntoIterator<Item = (Vec<usize>, E)>,
        statistic: Vec<Statistic>,
        config: &GradedConfig,
    ) -> Result<Self, ValidationError> {
        let sparse = NdSparseRepr::new(shape, entries)?;
        Self::from_storage(
            Storage::Sparse(sparse),
            statistic,
            Encoder::Canonical,
            Format::Standard,
            config,
        )
    }

    /// Tensor whose data is already laid out in `encoder` and `format`.
    pub fn from_storage(
        storage: Storage<E>,
        statistic: Vec<Statistic>,
        encoder: Encoder,
        format: Format,
        config: &GradedConfig,
    ) -> Result<Self, ValidationError> {
        validate_axes(storage.shape(), &statistic, config)?;
        Ok(GradedTensor {
            storage,
            statistic,
            encoder,
            format,
        })
    }

    pub(crate) fn from_parts(
        storage: Storage<E>,
        statistic: Vec<Statistic>,
        encoder: Encoder,
        format: Format,
    ) -> Self {
        GradedTensor {
            storage,
            statistic,
            encoder,
            format,
        }
    }

    pub(crate) fn dense(
        data: ArrayD<E>,
        statistic: Vec<Statistic>,
        encoder: Encoder,
        format: Format,
    ) -> Self {
        Self::from_parts(
            Storage::Dense(NdDenseRepr::new(data)),
            statistic,
            encoder,
            format,
        )
    }

    pub fn shape(&self) -> &[usize] {
        self.storage.shape()
    }
    pub fn ndim(&self) -> usize {
        self.statistic.len()
    }
    /// Number of entries, zeros included.
    pub fn size(&self) -> usize {
        self.shape().iter().product()
    }
    pub fn statistic(&self) -> &[Statistic] {
        &self.statistic
    }
    pub fn encoder(&self) -> Encoder {
        self.encoder
    }
    pub fn format(&self) -> Format {
        self.format
    }
    pub fn storage(&self) -> &Storage<E> {
        &self.storage
    }
    pub fn is_sparse(&self) -> bool {
        self.storage.is_sparse()
    }

    /// Entry at `coords` in the current encoding and format, `None` out of range.
    pub fn get(&self, coords: &[usize]) -> Option<E> {
        self.storage.get(coords)
    }

    /// Number of entries whose magnitude exceeds `config.numeric_cutoff`.
    pub fn nnz(&self, config: &GradedConfig) -> usize {
        self.storage.nnz(real_cutoff::<E>(config.numeric_cutoff))
    }

    pub fn norm(&self) -> E::Real {
        self.storage.norm()
    }

    /// Dense copy of the data in the current encoding and format.
    pub fn data(&self) -> ArrayD<E> {
        self.storage.to_dense()
    }

    /// Same tensor with dense storage.
    pub fn to_dense(&self) -> Self {
        Self::from_parts(
            self.storage.densified(),
            self.statistic.clone(),
            self.encoder,
            self.format,
        )
    }

    /// Same tensor with sparse storage; entries at most `config.numeric_cutoff` are dropped.
    pub fn to_sparse(&self, config: &GradedConfig) -> Self {
        Self::from_parts(
            self.storage
                .sparsified(real_cutoff::<E>(config.numeric_cutoff)),
            self.statistic.clone(),
            self.encoder,
            self.format,
        )
    }

    /// Drops negligible stored entries of sparse storage. Dense storage is left as is.
    pub fn remove_zeros(&mut self, config: &GradedConfig) {
        if let Storage::Sparse(s) = &mut self.storage {
            s.remove_zeros(real_cutoff::<E>(config.numeric_cutoff));
        }
    }

    /// Converts the storage variant to match `like`.
    pub(crate) fn with_storage_of(self, like: &Self, config: &GradedConfig) -> Self {
        if like.is_sparse() && !self.is_sparse() {
            self.to_sparse(config)
        } else {
            self
        }
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage<E> {
        &mut self.storage
    }

    pub(crate) fn with_tags(self, encoder: Encoder, format: Format) -> Self {
        GradedTensor {
            encoder,
            format,
            ..self
        }
    }
}

pub(crate) fn real_cutoff<E: Scalar>(cutoff: f64) -> E::Real {
    <E::Real as NumCast>::from(cutoff).unwrap_or_else(num_traits::Zero::zero)
}
