//! Storage of graded tensors.
//!
//! Sign bookkeeping only ever needs two capabilities of the data: visit or rescale an entry by
//! its coordinates, and move entries along a coordinate involution. [`GradedRepr`]
//! captures exactly that, so the encoder and format switches work unchanged on dense and sparse
//! storage. Heavy operations (contraction, grouping, decompositions) densify first.

use alloc::{collections::BTreeMap, vec::Vec};

use ndarray::{ArrayD, Dimension, IxDyn};
use ndarray_linalg::Scalar;
use num_traits::{Float, Zero};

use grassory_core::error::ValidationError;

/// Coordinate-level access shared by every storage variant.
pub trait GradedRepr<E> {
    /// Dimension per axis.
    fn shape(&self) -> &[usize];

    /// Entry at `coords`, `None` out of range.
    fn get(&self, coords: &[usize]) -> Option<E>;

    /// Calls `f` with the coordinates and value of every stored entry.
    fn for_each_indexed<F: FnMut(&[usize], &E)>(&self, f: F);

    /// Calls `f` with the coordinates and a mutable reference of every stored entry.
    fn map_indexed<F: FnMut(&[usize], &mut E)>(&mut self, f: F);

    /// Moves every entry along `involution`, which must map valid coordinates to valid
    /// coordinates and be its own inverse.
    fn reindexed<F: Fn(&[usize]) -> Vec<usize>>(&self, involution: F) -> Self;

    /// Dense copy.
    fn to_dense(&self) -> ArrayD<E>;
}

/// Dense storage backed by an `ndarray` array.
#[derive(Debug, Clone, PartialEq)]
pub struct NdDenseRepr<E> {
    data: ArrayD<E>,
}

impl<E> NdDenseRepr<E> {
    pub fn new(data: ArrayD<E>) -> Self {
        NdDenseRepr { data }
    }
    pub fn data(&self) -> &ArrayD<E> {
        &self.data
    }
    pub fn into_data(self) -> ArrayD<E> {
        self.data
    }
}

impl<E: Scalar> GradedRepr<E> for NdDenseRepr<E> {
    fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    fn get(&self, coords: &[usize]) -> Option<E> {
        self.data.get(IxDyn(coords)).copied()
    }

    fn for_each_indexed<F: FnMut(&[usize], &E)>(&self, mut f: F) {
        for (ix, v) in self.data.indexed_iter() {
            f(ix.slice(), v);
        }
    }

    fn map_indexed<F: FnMut(&[usize], &mut E)>(&mut self, mut f: F) {
        for (ix, v) in self.data.indexed_iter_mut() {
            f(ix.slice(), v);
        }
    }

    fn reindexed<F: Fn(&[usize]) -> Vec<usize>>(&self, involution: F) -> Self {
        let data = ArrayD::from_shape_fn(self.data.raw_dim(), |ix| {
            self.data[IxDyn(&involution(ix.slice()))]
        });
        NdDenseRepr { data }
    }

    fn to_dense(&self) -> ArrayD<E> {
        self.data.clone()
    }
}

/// Sparse storage keyed by index tuples. Absent entries are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NdSparseRepr<E> {
    shape: Vec<usize>,
    entries: BTreeMap<Vec<usize>, E>,
}

impl<E: Scalar> NdSparseRepr<E> {
    /// Builds sparse storage, rejecting out-of-range and repeated coordinates.
    pub fn new(
        shape: Vec<usize>,
        entries: impl IntoIterator<Item = (Vec<usize>, E)>,
    ) -> Result<Self, ValidationError> {
        let mut map = BTreeMap::new();
        for (coords, v) in entries {
            if coords.len() != shape.len() || coords.iter().zip(&shape).any(|(c, d)| c >= d) {
                return Err(ValidationError::InvalidEntry {
                    reason: "lies outside the shape",
                });
            }
            if map.insert(coords, v).is_some() {
                return Err(ValidationError::InvalidEntry {
                    reason: "is given twice",
                });
            }
        }
        Ok(NdSparseRepr {
            shape,
            entries: map,
        })
    }

    /// Sparse copy of a dense array, keeping entries whose magnitude exceeds `cutoff`.
    pub fn from_dense(data: &ArrayD<E>, cutoff: E::Real) -> Self {
        let entries = data
            .indexed_iter()
            .filter(|(_, v)| v.abs() > cutoff)
            .map(|(ix, v)| (ix.slice().to_vec(), *v))
            .collect();
        NdSparseRepr {
            shape: data.shape().to_vec(),
            entries,
        }
    }

    pub fn entries(&self) -> &BTreeMap<Vec<usize>, E> {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut BTreeMap<Vec<usize>, E> {
        &mut self.entries
    }

    /// Drops stored entries whose magnitude is at most `cutoff`.
    pub fn remove_zeros(&mut self, cutoff: E::Real) {
        self.entries.retain(|_, v| v.abs() > cutoff);
    }
}

impl<E: Scalar> GradedRepr<E> for NdSparseRepr<E> {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn get(&self, coords: &[usize]) -> Option<E> {
        if coords.len() != self.shape.len() || coords.iter().zip(&self.shape).any(|(c, d)| c >= d)
        {
            return None;
        }
        Some(self.entries.get(coords).copied().unwrap_or_else(E::zero))
    }

    fn for_each_indexed<F: FnMut(&[usize], &E)>(&self, mut f: F) {
        for (coords, v) in &self.entries {
            f(coords, v);
        }
    }

    fn map_indexed<F: FnMut(&[usize], &mut E)>(&mut self, mut f: F) {
        for (coords, v) in self.entries.iter_mut() {
            f(coords, v);
        }
    }

    fn reindexed<F: Fn(&[usize]) -> Vec<usize>>(&self, involution: F) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(coords, v)| (involution(coords), *v))
            .collect();
        NdSparseRepr {
            shape: self.shape.clone(),
            entries,
        }
    }

    fn to_dense(&self) -> ArrayD<E> {
        let mut data = ArrayD::zeros(IxDyn(&self.shape));
        for (coords, v) in &self.entries {
            data[IxDyn(coords)] = *v;
        }
        data
    }
}

/// Either storage variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage<E> {
    Dense(NdDenseRepr<E>),
    Sparse(NdSparseRepr<E>),
}

impl<E: Scalar> Storage<E> {
    pub fn is_sparse(&self) -> bool {
        matches!(self, Storage::Sparse(_))
    }

    /// Dense variant of the same data.
    pub fn densified(&self) -> Self {
        match self {
            Storage::Dense(_) => self.clone(),
            Storage::Sparse(s) => Storage::Dense(NdDenseRepr::new(s.to_dense())),
        }
    }

    /// Sparse variant of the same data, dropping entries at most `cutoff` in magnitude.
    pub fn sparsified(&self, cutoff: E::Real) -> Self {
        match self {
            Storage::Dense(d) => Storage::Sparse(NdSparseRepr::from_dense(d.data(), cutoff)),
            Storage::Sparse(_) => self.clone(),
        }
    }

    /// Number of entries with magnitude above `cutoff`.
    pub fn nnz(&self, cutoff: E::Real) -> usize {
        match self {
            Storage::Dense(d) => d.data().iter().filter(|v| v.abs() > cutoff).count(),
            Storage::Sparse(s) => s.entries().values().filter(|v| v.abs() > cutoff).count(),
        }
    }

    /// Frobenius norm.
    pub fn norm(&self) -> E::Real {
        let sq: E::Real = match self {
            Storage::Dense(d) => d.data().iter().map(|v| v.square()).fold(Zero::zero(), |a, b| a + b),
            Storage::Sparse(s) => s
                .entries()
                .values()
                .map(|v| v.square())
                .fold(Zero::zero(), |a, b| a + b),
        };
        Float::sqrt(sq)
    }

    /// Applies `f` to every stored value.
    pub fn mapv<F: Fn(E) -> E>(&self, f: F) -> Self {
        match self {
            Storage::Dense(d) => Storage::Dense(NdDenseRepr::new(d.data().mapv(f))),
            Storage::Sparse(s) => {
                let mut s = s.clone();
                for v in s.entries_mut().values_mut() {
                    *v = f(*v);
                }
                Storage::Sparse(s)
            }
        }
    }
}

impl<E: Scalar> GradedRepr<E> for Storage<E> {
    fn shape(&self) -> &[usize] {
        match self {
            Storage::Dense(d) => d.shape(),
            Storage::Sparse(s) => s.shape(),
        }
    }

    fn get(&self, coords: &[usize]) -> Option<E> {
        match self {
            Storage::Dense(d) => d.get(coords),
            Storage::Sparse(s) => s.get(coords),
        }
    }

    fn for_each_indexed<F: FnMut(&[usize], &E)>(&self, f: F) {
        match self {
            Storage::Dense(d) => d.for_each_indexed(f),
            Storage::Sparse(s) => s.for_each_indexed(f),
        }
    }

    fn map_indexed<F: FnMut(&[usize], &mut E)>(&mut self, f: F) {
        match self {
            Storage::Dense(d) => d.map_indexed(f),
            Storage::Sparse(s) => s.map_indexed(f),
        }
    }

    fn reindexed<F: Fn(&[usize]) -> Vec<usize>>(&self, involution: F) -> Self {
        match self {
            Storage::Dense(d) => Storage::Dense(d.reindexed(involution)),
            Storage::Sparse(s) => Storage::Sparse(s.reindexed(involution)),
        }
    }

    fn to_dense(&self) -> ArrayD<E> {
        match self {
            Storage::Dense(d) => d.to_dense(),
            Storage::Sparse(s) => s.to_dense(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use ndarray::array;

    #[test]
    fn sparse_and_dense_agree() -> anyhow::Result<()> {
        let dense = array![[1.0, 0.0], [0.0, -2.0]].into_dyn();
        let sparse = NdSparseRepr::from_dense(&dense, 0.0);
        assert_eq!(sparse.entries().len(), 2);
        assert_eq!(sparse.to_dense(), dense);
        assert_eq!(sparse.get(&[1, 1]), Some(-2.0));
        assert_eq!(sparse.get(&[0, 1]), Some(0.0));
        assert_eq!(sparse.get(&[2, 0]), None);

        let swap = |c: &[usize]| vec![c[1], c[0]];
        let d = NdDenseRepr::new(array![[1.0, 2.0], [3.0, 4.0]].into_dyn());
        let s = NdSparseRepr::from_dense(d.data(), 0.0);
        assert_eq!(d.reindexed(swap).to_dense(), s.reindexed(swap).to_dense());
        Ok(())
    }

    #[test]
    fn visits_stored_entries_in_place() -> anyhow::Result<()> {
        let data = array![[1.0, 0.0], [0.0, -2.0]].into_dyn();
        let dense = Storage::Dense(NdDenseRepr::new(data.clone()));
        let sparse = dense.sparsified(0.0);

        let mut seen = Vec::new();
        dense.for_each_indexed(|c, v| seen.push((c.to_vec(), *v)));
        assert_eq!(seen.len(), 4);
        assert!(seen.contains(&(vec![1, 1], -2.0)));

        let mut total = 0.0;
        let mut visited = 0;
        sparse.for_each_indexed(|_, v| {
            total += v;
            visited += 1;
        });
        assert_eq!(visited, 2);
        assert_eq!(total, -1.0);

        let Storage::Dense(d) = dense else {
            anyhow::bail!("expected dense storage");
        };
        assert_eq!(d.into_data(), data);
        Ok(())
    }

    #[test]
    fn rejects_bad_entries() {
        assert!(NdSparseRepr::new(vec![2, 2], [(vec![2, 0], 1.0)]).is_err());
        assert!(NdSparseRepr::new(vec![2, 2], [(vec![0, 0], 1.0), (vec![0, 0], 2.0)]).is_err());
        assert!(NdSparseRepr::new(vec![2], [(vec![0, 0], 1.0)]).is_err());
    }

    #[test]
    fn remove_zeros_and_norm() {
        let mut s = NdSparseRepr::<f64>::new(vec![3], [(vec![0], 3.0), (vec![1], 1e-20), (vec![2], 4.0)])
            .unwrap_or_else(|e| panic!("{e}"));
        s.remove_zeros(1e-14);
        assert_eq!(s.entries().len(), 2);
        let st = Storage::Sparse(s);
        assert!((st.norm() - 5.0).abs() < 1e-12);
        assert_eq!(st.nnz(0.0), 2);
    }
}
