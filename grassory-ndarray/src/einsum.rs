//! Graded contraction.
//!
//! The operands are brought to the canonical encoding and standard format, and the fermionic
//! sign of the contraction is expressed as up to three ordinary sign tensors:
//!
//! - `S1` moves the conjugate occurrence of every contracted pair right behind its partner,
//! - `S2` integrates each pair out, one vector per pair built from the oracle's sign values,
//! - `S3` reorders the surviving fermionic axes into the requested output order.
//!
//! `S1` and `S3` depend only on the grading parity of their coordinates and are memoized by
//! parity pattern. Everything is then handed to the sign-blind network contraction.

use alloc::{collections::BTreeMap, vec::Vec};

use grassory_core::{
    error::{ExprError, ParityError, ValidationError},
    expr::{EinsumExpr, Label, LabelSupply},
    oracle::ParityOracle,
    parity::{Sign, relative_parity},
    statistic::{Encoder, Format, Statistic},
};
use ndarray::{ArrayD, Dimension, IxDyn};
use ndarray_linalg::Scalar;

use crate::{
    GradedTensor,
    error::GradedError,
    runtime::GradedRuntime,
    tenalg::{Factor, contract_network},
};

type Result<T> = core::result::Result<T, GradedError>;

struct LabelInfo {
    dim: usize,
    stats: Vec<Statistic>,
}

/// Drops the common prefix and suffix of two orderings of the same labels.
fn trimmed<'a>(a: &'a [Label], b: &'a [Label]) -> (&'a [Label], &'a [Label]) {
    let pre = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suf = a[pre..]
        .iter()
        .rev()
        .zip(b[pre..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    (&a[pre..a.len() - suf], &b[pre..b.len() - suf])
}

/// Builds a sign tensor whose value depends only on the grading parity of each coordinate.
fn memoized_sign_tensor<E, O, F>(dims: &[usize], oracle: &O, mut sign_of: F) -> Result<ArrayD<E>>
where
    E: Scalar,
    O: ParityOracle,
    F: FnMut(&[bool]) -> core::result::Result<Sign, ParityError>,
{
    let mut memo: BTreeMap<Vec<bool>, Sign> = BTreeMap::new();
    let mut values = Vec::with_capacity(dims.iter().product());
    for ix in ndarray::indices(IxDyn(dims)) {
        let pattern: Vec<bool> = ix
            .slice()
            .iter()
            .map(|&i| oracle.grading_parity(i))
            .collect();
        let sign = match memo.get(&pattern) {
            Some(s) => *s,
            None => {
                let s = sign_of(&pattern)?;
                memo.insert(pattern, s);
                s
            }
        };
        values.push(sign.apply(E::one()));
    }
    tracing::debug!(patterns = memo.len(), entries = values.len(), "sign tensor");
    Ok(ArrayD::from_shape_vec(IxDyn(dims), values)?)
}

fn collect_labels<E: Scalar>(
    expr: &EinsumExpr,
    operands: &[&GradedTensor<E>],
) -> Result<BTreeMap<Label, LabelInfo>> {
    let table = expr.table();
    let mut info: BTreeMap<Label, LabelInfo> = BTreeMap::new();
    for (labels, t) in expr.inputs().iter().zip(operands) {
        for (axis, &l) in labels.iter().enumerate() {
            let (dim, stat) = (t.shape()[axis], t.statistic()[axis]);
            let entry = info.entry(l).or_insert(LabelInfo {
                dim,
                stats: Vec::new(),
            });
            if entry.dim != dim {
                return Err(ValidationError::DimensionMismatch {
                    label: table.display(l),
                }
                .into());
            }
            if let Some(&first) = entry.stats.first() {
                if first.is_fermionic() != stat.is_fermionic() {
                    return Err(ValidationError::InconsistentPair {
                        label: table.display(l),
                        left: first,
                        right: stat,
                    }
                    .into());
                }
            }
            entry.stats.push(stat);
        }
    }
    Ok(info)
}

fn check_output(expr: &EinsumExpr, info: &BTreeMap<Label, LabelInfo>) -> Result<()> {
    let table = expr.table();
    let output = expr.output().unwrap_or(&[]);
    for (k, l) in output.iter().enumerate() {
        if output[..k].contains(l) {
            return Err(ValidationError::from(ExprError::DuplicateLabel(table.display(*l))).into());
        }
        if !info.contains_key(l) {
            return Err(ValidationError::UnknownOutputLabel {
                label: table.display(*l),
            }
            .into());
        }
    }
    for (l, li) in info {
        if !li.stats[0].is_fermionic() {
            continue;
        }
        let in_output = output.contains(l) as usize;
        let n = li.stats.len();
        if n > 2 || (n + in_output) % 2 == 1 {
            return Err(ValidationError::UnmatchedFermion {
                label: table.display(*l),
            }
            .into());
        }
        if n == 2 && !li.stats[0].pairs_with(li.stats[1]) {
            return Err(ValidationError::InconsistentPair {
                label: table.display(*l),
                left: li.stats[0],
                right: li.stats[1],
            }
            .into());
        }
    }
    Ok(())
}

impl<O: ParityOracle> GradedRuntime<O> {
    /// Graded contraction of `operands` along `expr`.
    ///
    /// ```text
    /// "ijab,abkl->ijkl"   pairwise contraction over a and b
    /// "i1 i2 k1, k1 i3"   digit-suffixed labels, no output: contracted to a scalar
    /// ```
    ///
    /// The result takes the encoder and format of the first operand, and its storage variant.
    #[tracing::instrument(skip_all, fields(expr = expr))]
    pub fn einsum<E: Scalar>(
        &self,
        expr: &str,
        operands: &[&GradedTensor<E>],
    ) -> Result<GradedTensor<E>> {
        let parsed = self.einsum_expr(expr)?;
        self.einsum_parsed(&parsed, operands)
    }

    /// [`GradedRuntime::einsum`] over an already parsed expression.
    pub fn einsum_parsed<E: Scalar>(
        &self,
        expr: &EinsumExpr,
        operands: &[&GradedTensor<E>],
    ) -> Result<GradedTensor<E>> {
        let oracle = self.oracle();
        if operands.len() != expr.inputs().len() {
            return Err(ValidationError::OperandCount {
                expected: expr.inputs().len(),
                found: operands.len(),
            }
            .into());
        }
        let Some(first) = operands.first() else {
            return Err(ValidationError::OperandCount {
                expected: 1,
                found: 0,
            }
            .into());
        };
        for (labels, t) in expr.inputs().iter().zip(operands) {
            if labels.len() != t.ndim() {
                return Err(ValidationError::AxisCount {
                    labels: labels.len(),
                    axes: t.ndim(),
                }
                .into());
            }
            if t.statistic().contains(&Statistic::Hybrid) {
                return Err(ValidationError::HybridAxis {
                    operation: "contraction",
                }
                .into());
            }
        }

        let info = collect_labels(expr, operands)?;
        check_output(expr, &info)?;

        let mut supply = LabelSupply::after(expr.table());
        let mut factors = Vec::with_capacity(operands.len() + 3);
        for (labels, t) in expr.inputs().iter().zip(operands) {
            let data = t.normalized(oracle)?.data();
            factors.push(Factor::new(data, labels.clone())?);
        }
        let signs = self.sign_factors::<E>(expr, &info, &mut supply)?;
        tracing::debug!(operands = operands.len(), signs = signs.len(), "contracting");
        factors.extend(signs);

        let output: Vec<Label> = expr.output().map(<[Label]>::to_vec).unwrap_or_default();
        let data = contract_network(factors, &output, &mut supply)?;
        let statistic = output.iter().map(|l| info[l].stats[0]).collect();

        let result = GradedTensor::dense(
            data,
            statistic,
            Encoder::Canonical,
            Format::Standard,
        );
        Ok(result
            .restored(first.encoder(), first.format(), oracle)?
            .with_storage_of(first, self.config()))
    }

    fn sign_factors<E: Scalar>(
        &self,
        expr: &EinsumExpr,
        info: &BTreeMap<Label, LabelInfo>,
        supply: &mut LabelSupply,
    ) -> Result<Vec<Factor<E>>> {
        let oracle = self.oracle();
        let dim_of = |l: &Label| info[l].dim;

        // fermionic axes of all operands, in operand order
        let mut used: BTreeMap<Label, usize> = BTreeMap::new();
        let mut summand: Vec<(Label, Statistic)> = Vec::new();
        for &l in expr.inputs().iter().flatten() {
            let k = used.entry(l).or_default();
            let stat = info[&l].stats[*k];
            *k += 1;
            if stat.is_fermionic() {
                summand.push((l, stat));
            }
        }

        // conjugate occurrence of every contracted pair gets a fresh label
        let mut pairs: Vec<(Label, Label)> = Vec::new();
        let mut unique: Vec<Label> = Vec::with_capacity(summand.len());
        for &(l, stat) in &summand {
            if info[&l].stats.len() == 2 && stat == Statistic::ConjFermi {
                let c2 = supply.fresh();
                pairs.push((l, c2));
                unique.push(c2);
            } else {
                unique.push(l);
            }
        }
        let base = |l: Label| {
            pairs
                .iter()
                .find(|&&(_, c2)| c2 == l)
                .map_or(l, |&(c1, _)| c1)
        };

        let mut ur = unique.clone();
        for &(c1, c2) in &pairs {
            let p2 = ur.iter().position(|&l| l == c2).ok_or(ParityError::UnknownLabel)?;
            ur.remove(p2);
            let p1 = ur.iter().position(|&l| l == c1).ok_or(ParityError::UnknownLabel)?;
            ur.insert(p1 + 1, c2);
        }

        let mut factors = Vec::new();

        let (ut, urt) = trimmed(&unique, &ur);
        if ut.is_empty() {
            tracing::debug!("S1 skipped, pairs already adjacent");
        } else {
            let mut axes: Vec<Label> = Vec::new();
            for &l in urt {
                if !axes.contains(&base(l)) {
                    axes.push(base(l));
                }
            }
            let slot: Vec<usize> = ut
                .iter()
                .map(|&l| axes.iter().position(|&a| a == base(l)))
                .collect::<Option<_>>()
                .ok_or(ParityError::UnknownLabel)?;
            let dims: Vec<usize> = axes.iter().map(dim_of).collect();
            let data = memoized_sign_tensor(&dims, oracle, |pattern| {
                let odd: Vec<bool> = slot.iter().map(|&s| pattern[s]).collect();
                relative_parity(ut, urt, &odd)
            })?;
            factors.push(Factor::new(data, axes)?);
        }

        for &(c1, _) in &pairs {
            let data = ArrayD::from_shape_fn(IxDyn(&[dim_of(&c1)]), |ix| {
                oracle.sign_value(ix[0]).apply(E::one())
            });
            factors.push(Factor::new(data, alloc::vec![c1])?);
        }

        if let Some(output) = expr.output() {
            let natural: Vec<Label> = ur
                .iter()
                .copied()
                .filter(|&l| !pairs.iter().any(|&(c1, c2)| l == c1 || l == c2))
                .collect();
            let target: Vec<Label> = output
                .iter()
                .copied()
                .filter(|l| info[l].stats[0].is_fermionic())
                .collect();
            let (nt, tt) = trimmed(&natural, &target);
            if nt.is_empty() {
                tracing::debug!("S3 skipped, output already in natural order");
            } else {
                let dims: Vec<usize> = nt.iter().map(dim_of).collect();
                let data = memoized_sign_tensor(&dims, oracle, |pattern| {
                    relative_parity(nt, tt, pattern)
                })?;
                factors.push(Factor::new(data, nt.to_vec())?);
            }
        }
        Ok(factors)
    }
}
