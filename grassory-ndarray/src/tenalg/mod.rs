//! Plain (ungraded) tensor algebra over `ArrayD`.
//!
//! Everything here is sign-blind: the graded layer reduces a contraction to a network of ordinary
//! factors, sign tensors included, and hands it to [`contract_network`].

pub(crate) mod convert;
pub mod error;

use alloc::{collections::BTreeMap, vec, vec::Vec};

use convert::{mat_to_ten, ten_to_mat};
use error::TenalgError;
use grassory_core::expr::{Label, LabelSupply};
use ndarray::{
    ArrayBase, ArrayD, Axis, Data, Dimension, ErrorKind::IncompatibleShape, Ix, IxDyn,
    LinalgScalar, ShapeError,
};

type Result<T> = core::result::Result<T, TenalgError>;

/// Contracts the last `concat_dim` axes of `x` with the first `concat_dim` axes of `y`.
pub fn mul<S1, D1, S2, D2, E>(
    x: &ArrayBase<S1, D1>,
    y: &ArrayBase<S2, D2>,
    concat_dim: usize,
) -> Result<ArrayD<E>>
where
    S1: Data<Elem = E>,
    S2: Data<Elem = E>,
    D1: Dimension,
    D2: Dimension,
    E: LinalgScalar,
{
    let x_ixs = x.shape();
    let y_ixs = y.shape();
    let x_dim = x_ixs.len();
    let y_dim = y_ixs.len();

    if x_dim < concat_dim || y_dim < concat_dim {
        return Err(ShapeError::from_kind(IncompatibleShape).into());
    }
    let (x_remain_ixs, x_concat_ixs) = x_ixs.split_at(x_dim - concat_dim);
    let (y_concat_ixs, y_remain_ixs) = y_ixs.split_at(concat_dim);

    if x_concat_ixs != y_concat_ixs {
        return Err(ShapeError::from_kind(IncompatibleShape).into());
    }
    let z_ixs = [x_remain_ixs, y_remain_ixs].concat();

    let x_remain_full_ix: Ix = x_remain_ixs.iter().product();
    let y_remain_full_ix: Ix = y_remain_ixs.iter().product();
    let concat_full_ix: Ix = x_concat_ixs.iter().product();

    let x_mat = ten_to_mat(x, [x_remain_full_ix, concat_full_ix])?;
    let y_mat = ten_to_mat(y, [concat_full_ix, y_remain_full_ix])?;

    let z_mat = x_mat.dot(&y_mat);
    let z = mat_to_ten(&z_mat, IxDyn(&z_ixs))?.into_owned();
    Ok(z)
}

/// One factor of a contraction network: an array and one label per axis.
#[derive(Debug, Clone)]
pub struct Factor<E> {
    pub data: ArrayD<E>,
    pub labels: Vec<Label>,
}

impl<E> Factor<E> {
    pub fn new(data: ArrayD<E>, labels: Vec<Label>) -> Result<Self> {
        if data.ndim() != labels.len() {
            return Err(TenalgError::InvalidInput);
        }
        Ok(Factor { data, labels })
    }

    fn dim_of(&self, label: Label) -> Option<usize> {
        self.labels
            .iter()
            .position(|&l| l == label)
            .map(|p| self.data.shape()[p])
    }
}

/// Dense Kronecker delta of the given order.
fn delta<E: LinalgScalar>(dim: usize, order: usize) -> ArrayD<E> {
    let mut d = ArrayD::zeros(IxDyn(&vec![dim; order]));
    for i in 0..dim {
        d[IxDyn(&vec![i; order])] = E::one();
    }
    d
}

/// Replaces every label met more than twice by fresh labels joined through a delta factor.
///
/// Afterwards each label occurs at most twice over factors and output together.
fn lower_hyperedges<E: LinalgScalar>(
    factors: &mut Vec<Factor<E>>,
    output: &mut [Label],
    supply: &mut LabelSupply,
) -> Result<()> {
    let mut count: BTreeMap<Label, usize> = BTreeMap::new();
    for l in factors.iter().flat_map(|f| f.labels.iter()).chain(output.iter()) {
        *count.entry(*l).or_default() += 1;
    }

    let mut deltas = Vec::new();
    for (label, n) in count.into_iter().filter(|(_, n)| *n > 2) {
        let dim = factors
            .iter()
            .find_map(|f| f.dim_of(label))
            .ok_or(TenalgError::DanglingOutput)?;
        let mut legs = Vec::with_capacity(n);
        for slot in factors
            .iter_mut()
            .flat_map(|f| f.labels.iter_mut())
            .chain(output.iter_mut())
            .filter(|l| **l == label)
        {
            *slot = supply.fresh();
            legs.push(*slot);
        }
        tracing::trace!(order = n, dim, "lowering hyperedge to delta");
        deltas.push(Factor {
            data: delta(dim, n),
            labels: legs,
        });
    }
    factors.extend(deltas);
    Ok(())
}

/// Sums out labels repeated inside a factor.
fn trace_repeated<E: LinalgScalar>(f: Factor<E>) -> Factor<E> {
    let Factor {
        mut data,
        mut labels,
    } = f;
    while let Some((p, q)) = (0..labels.len()).find_map(|p| {
        labels[p + 1..]
            .iter()
            .position(|&l| l == labels[p])
            .map(|d| (p, p + 1 + d))
    }) {
        let dim = data.shape()[p];
        let mut shape = data.shape().to_vec();
        shape.remove(q);
        shape.remove(p);
        let mut traced = ArrayD::zeros(IxDyn(&shape));
        for i in 0..dim {
            let diag = data.index_axis(Axis(q), i);
            traced = traced + &diag.index_axis(Axis(p), i);
        }
        data = traced;
        labels.remove(q);
        labels.remove(p);
    }
    Factor { data, labels }
}

/// Contracts two factors over all labels they share.
fn contract_pair<E: LinalgScalar>(x: Factor<E>, y: Factor<E>) -> Result<Factor<E>> {
    let shared: Vec<Label> = x
        .labels
        .iter()
        .copied()
        .filter(|l| y.labels.contains(l))
        .collect();
    let x_free: Vec<usize> = (0..x.labels.len())
        .filter(|&p| !shared.contains(&x.labels[p]))
        .collect();
    let y_free: Vec<usize> = (0..y.labels.len())
        .filter(|&p| !shared.contains(&y.labels[p]))
        .collect();

    let position = |labels: &[Label], l: Label| labels.iter().position(|&m| m == l);
    let x_perm: Vec<usize> = x_free
        .iter()
        .copied()
        .chain(shared.iter().filter_map(|&l| position(&x.labels, l)))
        .collect();
    let y_perm: Vec<usize> = shared
        .iter()
        .filter_map(|&l| position(&y.labels, l))
        .chain(y_free.iter().copied())
        .collect();

    let data = mul(
        &x.data.view().permuted_axes(IxDyn(&x_perm)),
        &y.data.view().permuted_axes(IxDyn(&y_perm)),
        shared.len(),
    )?;
    let labels = x_free
        .iter()
        .map(|&p| x.labels[p])
        .chain(y_free.iter().map(|&p| y.labels[p]))
        .collect();
    Ok(Factor { data, labels })
}

fn joined_size<E>(x: &Factor<E>, y: &Factor<E>) -> usize {
    let x_part: usize = x
        .labels
        .iter()
        .zip(x.data.shape())
        .filter(|(l, _)| !y.labels.contains(l))
        .map(|(_, d)| *d)
        .product();
    let y_part: usize = y
        .labels
        .iter()
        .zip(y.data.shape())
        .filter(|(l, _)| !x.labels.contains(l))
        .map(|(_, d)| *d)
        .product();
    x_part * y_part
}

/// Evaluates a labelled tensor network, returning the array with axes in `output` order.
///
/// A label may occur any number of times; labels absent from `output` are summed. Pairs are
/// contracted greedily, always choosing the pair with the smallest intermediate.
pub fn contract_network<E: LinalgScalar>(
    factors: Vec<Factor<E>>,
    output: &[Label],
    supply: &mut LabelSupply,
) -> Result<ArrayD<E>> {
    let mut factors = factors;
    let mut output = output.to_vec();
    lower_hyperedges(&mut factors, &mut output, supply)?;

    let mut factors: Vec<Factor<E>> = factors.into_iter().map(trace_repeated).collect();

    // labels seen once and not requested are plain sums
    for i in 0..factors.len() {
        while let Some(p) = (0..factors[i].labels.len()).find(|&p| {
            let l = factors[i].labels[p];
            !output.contains(&l)
                && factors
                    .iter()
                    .enumerate()
                    .all(|(j, g)| j == i || !g.labels.contains(&l))
        }) {
            let f = &mut factors[i];
            f.data = f.data.sum_axis(Axis(p));
            f.labels.remove(p);
        }
    }

    while factors.len() > 1 {
        let mut best = (0, 1, usize::MAX);
        for i in 0..factors.len() {
            for j in i + 1..factors.len() {
                let size = joined_size(&factors[i], &factors[j]);
                if size < best.2 {
                    best = (i, j, size);
                }
            }
        }
        let (i, j, _) = best;
        let y = factors.remove(j);
        let x = factors.remove(i);
        factors.push(contract_pair(x, y)?);
    }

    let Some(last) = factors.pop() else {
        return Err(TenalgError::InvalidInput);
    };
    if last.labels.len() != output.len() {
        return Err(TenalgError::DanglingOutput);
    }
    let perm = output
        .iter()
        .map(|l| last.labels.iter().position(|m| m == l))
        .collect::<Option<Vec<usize>>>()
        .ok_or(TenalgError::DanglingOutput)?;
    Ok(last
        .data
        .permuted_axes(IxDyn(&perm))
        .as_standard_layout()
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use grassory_core::expr::LabelTable;
    use ndarray::{Array, Array2, Ix3, array};
    use ndarray_linalg::random_using;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn mul_test() -> anyhow::Result<()> {
        let mut x = ArrayD::<f64>::zeros(IxDyn(&[2, 3, 4]));
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    x[[i, j, k]] = (4 * i + 2 * j + k) as f64;
                }
            }
        }
        let mut y = ArrayD::<f64>::zeros(IxDyn(&[6, 5, 4]));
        for i in 0..6 {
            for j in 0..5 {
                for k in 0..4 {
                    y[[i, j, k]] = (4 * i + 2 * j + k) as f64;
                }
            }
        }
        let x_orig = x.clone();
        let y_orig = y.clone();

        y.swap_axes(0, 2);
        y.swap_axes(1, 2);
        x.swap_axes(0, 1);

        let z = mul(&x, &y, 1)?;

        for i in 0..2 {
            for j in 0..3 {
                for ii in 0..6 {
                    for jj in 0..5 {
                        let mut z_expect: f64 = 0.;
                        for k in 0..4 {
                            z_expect += x_orig[[i, j, k]] * y_orig[[ii, jj, k]];
                        }
                        assert_eq!(z[[j, i, ii, jj]], z_expect);
                    }
                }
            }
        }
        Ok(())
    }

    fn labels(table: &mut LabelTable, s: &str) -> Vec<Label> {
        s.chars().map(|c| table.intern(&c.to_string())).collect()
    }

    #[test]
    fn network_matches_matrix_chain() -> anyhow::Result<()> {
        let mut rng = SmallRng::seed_from_u64(1);
        let a: Array2<f64> = random_using([3, 4], &mut rng);
        let b: Array2<f64> = random_using([4, 5], &mut rng);
        let c: Array2<f64> = random_using([5, 2], &mut rng);
        let mut t = LabelTable::default();
        let fs = vec![
            Factor::new(a.clone().into_dyn(), labels(&mut t, "ij"))?,
            Factor::new(b.clone().into_dyn(), labels(&mut t, "jk"))?,
            Factor::new(c.clone().into_dyn(), labels(&mut t, "kl"))?,
        ];
        let out = labels(&mut t, "li");
        let mut supply = LabelSupply::after(&t);
        let z = contract_network(fs, &out, &mut supply)?;
        let expect = a.dot(&b).dot(&c).reversed_axes();
        assert!((&z - &expect.into_dyn()).iter().all(|d| d.abs() < 1e-12));
        Ok(())
    }

    #[test]
    fn traces_hyperedges_and_sums() -> anyhow::Result<()> {
        let mut rng = SmallRng::seed_from_u64(2);
        let x: Array<f64, Ix3> = random_using([3, 3, 2], &mut rng);
        let y: Array2<f64> = random_using([3, 2], &mut rng);
        let mut t = LabelTable::default();

        // trace of the first two axes
        let fs = vec![Factor::new(x.clone().into_dyn(), labels(&mut t, "iij"))?];
        let j = labels(&mut t, "j");
        let z = contract_network(fs, &j, &mut LabelSupply::after(&t))?;
        for jj in 0..2 {
            let expect: f64 = (0..3).map(|i| x[[i, i, jj]]).sum();
            assert!((z[[jj]] - expect).abs() < 1e-12);
        }

        // elementwise product kept on the output
        let fs = vec![
            Factor::new(y.clone().into_dyn(), labels(&mut t, "ij"))?,
            Factor::new(y.clone().into_dyn(), labels(&mut t, "ij"))?,
        ];
        let out = labels(&mut t, "ij");
        let z = contract_network(fs, &out, &mut LabelSupply::after(&t))?;
        assert!((&z - &(&y * &y).into_dyn()).iter().all(|d| d.abs() < 1e-12));

        // full sum to a scalar
        let v = array![1.0, 2.0, 3.0].into_dyn();
        let fs = vec![Factor::new(v, labels(&mut t, "i"))?];
        let z = contract_network(fs, &[], &mut LabelSupply::after(&t))?;
        assert_eq!(z.ndim(), 0);
        assert_eq!(z[IxDyn(&[])], 6.0);
        Ok(())
    }
}
