use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};
use core::ops::{Add, Mul, Neg, Sub};

use grassory_core::error::ValidationError;
use ndarray::Zip;
use ndarray_linalg::Scalar;

use crate::{
    GradedTensor,
    repr::{GradedRepr, NdDenseRepr, Storage},
};

fn check_compatible<E: Scalar>(
    lhs: &GradedTensor<E>,
    rhs: &GradedTensor<E>,
) -> Result<(), ValidationError> {
    let what = if lhs.shape() != rhs.shape() {
        "shape"
    } else if lhs.statistic() != rhs.statistic() {
        "statistic"
    } else if lhs.encoder() != rhs.encoder() {
        "encoder"
    } else if lhs.format() != rhs.format() {
        "format"
    } else {
        return Ok(());
    };
    Err(ValidationError::Mismatch { what })
}

fn combine<E: Scalar, F: Fn(E, E) -> E>(lhs: &Storage<E>, rhs: &Storage<E>, f: F) -> Storage<E> {
    match (lhs, rhs) {
        (Storage::Sparse(l), Storage::Sparse(r)) => {
            let keys: BTreeSet<&Vec<usize>> = l.entries().keys().chain(r.entries().keys()).collect();
            let entries: BTreeMap<Vec<usize>, E> = keys
                .into_iter()
                .map(|k| {
                    let lv = l.entries().get(k).copied().unwrap_or_else(E::zero);
                    let rv = r.entries().get(k).copied().unwrap_or_else(E::zero);
                    (k.clone(), f(lv, rv))
                })
                .collect();
            let mut s = l.clone();
            *s.entries_mut() = entries;
            Storage::Sparse(s)
        }
        _ => {
            let (l, r) = (lhs.to_dense(), rhs.to_dense());
            let data = Zip::from(&l).and(&r).map_collect(|a, b| f(*a, *b));
            Storage::Dense(NdDenseRepr::new(data))
        }
    }
}

impl<E: Scalar> Add for &GradedTensor<E> {
    type Output = Result<GradedTensor<E>, ValidationError>;

    fn add(self, rhs: Self) -> Self::Output {
        check_compatible(self, rhs)?;
        Ok(GradedTensor::from_parts(
            combine(self.storage(), rhs.storage(), |a, b| a + b),
            self.statistic().to_vec(),
            self.encoder(),
            self.format(),
        ))
    }
}

impl<E: Scalar> Sub for &GradedTensor<E> {
    type Output = Result<GradedTensor<E>, ValidationError>;

    fn sub(self, rhs: Self) -> Self::Output {
        check_compatible(self, rhs)?;
        Ok(GradedTensor::from_parts(
            combine(self.storage(), rhs.storage(), |a, b| a - b),
            self.statistic().to_vec(),
            self.encoder(),
            self.format(),
        ))
    }
}

impl<E: Scalar> Neg for &GradedTensor<E> {
    type Output = GradedTensor<E>;

    fn neg(self) -> Self::Output {
        GradedTensor::from_parts(
            self.storage().mapv(|v| -v),
            self.statistic().to_vec(),
            self.encoder(),
            self.format(),
        )
    }
}

impl<E: Scalar> Mul<E> for &GradedTensor<E> {
    type Output = GradedTensor<E>;

    fn mul(self, scalar: E) -> Self::Output {
        GradedTensor::from_parts(
            self.storage().mapv(|v| v * scalar),
            self.statistic().to_vec(),
            self.encoder(),
            self.format(),
        )
    }
}

impl<E: Scalar> Mul<E> for GradedTensor<E> {
    type Output = GradedTensor<E>;

    fn mul(self, scalar: E) -> Self::Output {
        &self * scalar
    }
}
