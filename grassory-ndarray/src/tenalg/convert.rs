use ndarray::{ArrayBase, ArrayD, CowArray, Data, Dimension, Ix2, IxDyn, Order, ShapeArg};

use super::error::TenalgError;

type Result<T> = core::result::Result<T, TenalgError>;

pub fn ten_to_mat<ST: Data, DT: Dimension, Sh>(
    ten: &ArrayBase<ST, DT>,
    shape: Sh,
) -> Result<CowArray<'_, ST::Elem, Ix2>>
where
    (Sh, Order): ShapeArg<Dim = Ix2>,
    ST::Elem: Clone,
{
    let mat: CowArray<ST::Elem, Ix2> = ten.to_shape((shape, Order::ColumnMajor))?;
    Ok(mat)
}

pub fn mat_to_ten<ST: Data, Sh>(
    mat: &ArrayBase<ST, Ix2>,
    shape: Sh,
) -> Result<CowArray<'_, ST::Elem, <(Sh, Order) as ShapeArg>::Dim>>
where
    (Sh, Order): ShapeArg,
    ST::Elem: Clone,
{
    let ten = mat.to_shape((shape, Order::ColumnMajor))?;
    Ok(ten)
}

/// Row-major reshape: the leading axis varies slowest, so a merged index is `i * d1 + j`.
///
/// Leg grouping relies on this order to put the bosonic part of a group in front of the
/// fermionic part.
pub fn reshape_row_major<ST: Data, DT: Dimension>(
    ten: &ArrayBase<ST, DT>,
    shape: &[usize],
) -> Result<ArrayD<ST::Elem>>
where
    ST::Elem: Clone,
{
    let out = ten.to_shape((IxDyn(shape), Order::RowMajor))?;
    Ok(out.into_owned())
}
