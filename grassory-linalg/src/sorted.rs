use alloc::vec::Vec;
use core::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, s};
use ndarray_linalg::{Eig, Lapack, SVD, Scalar};

use crate::{cut_filter::CutFilter, error::BlockError};

type Result<T> = core::result::Result<T, BlockError>;

/// Thin SVD with singular values in descending order, truncated by `filter`.
///
/// A zero matrix yields rank 0 instead of an error; callers decide whether that is degenerate.
pub fn sorted_svd<S, E>(
    m: &ArrayBase<S, Ix2>,
    filter: CutFilter<E::Real>,
) -> Result<(Array2<E>, Array1<E::Real>, Array2<E>)>
where
    S: Data<Elem = E>,
    E: Scalar + Lapack,
{
    let (rows, cols) = m.dim();
    if rows == 0 || cols == 0 {
        return Ok((
            Array2::zeros((rows, 0)),
            Array1::zeros(0),
            Array2::zeros((0, cols)),
        ));
    }

    let (Some(u), sing, Some(vt)) = m.svd(true, true)? else {
        return Err(BlockError::InvalidResult);
    };
    let k = filter.rank(&sing)?;

    let u = u.slice(s![.., ..k]).to_owned();
    let sing = sing.slice(s![..k]).to_owned();
    let vt = vt.slice(s![..k, ..]).to_owned();
    Ok((u, sing, vt))
}

/// Eigendecomposition with eigenvalues in descending order of magnitude, truncated by `filter`.
///
/// Columns of the returned matrix are the eigenvectors.
pub fn sorted_eig<S, E>(
    m: &ArrayBase<S, Ix2>,
    filter: CutFilter<E::Real>,
) -> Result<(Array1<E::Complex>, Array2<E::Complex>)>
where
    S: Data<Elem = E>,
    E: Scalar + Lapack,
{
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(BlockError::InvalidInput);
    }
    if rows == 0 {
        return Ok((Array1::zeros(0), Array2::zeros((0, 0))));
    }

    let (vals, vecs) = m.eig()?;

    let mut order: Vec<usize> = (0..vals.len()).collect();
    order.sort_by(|&a, &b| {
        vals[b]
            .abs()
            .partial_cmp(&vals[a].abs())
            .unwrap_or(Ordering::Equal)
    });
    let magnitudes: Array1<E::Real> = order.iter().map(|&i| vals[i].abs()).collect();
    let k = filter.rank(&magnitudes)?;
    let order = &order[..k];

    let vals: Array1<E::Complex> = order.iter().map(|&i| vals[i]).collect();
    let vecs = vecs.select(Axis(1), order);
    Ok((vals, vecs))
}
