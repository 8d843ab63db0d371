//! Leg grouping.
//!
//! Joining a group first moves its bosonic-like axes in front of its fermionic axes and merges
//! each kind separately. The merged fermionic axis gets the group's intermediate statistic; a
//! `Fermi` axis merged into a `ConjFermi` group picks up `(-1)^p` with `p` the grading parity of
//! its index. The merged axes are then brought to the parity-preserving encoding and fused into
//! one axis per group, so that the grading parity of a joined index is its lowest bit.

use alloc::{string::String, vec::Vec};

use grassory_core::{
    error::ValidationError,
    oracle::ParityOracle,
    statistic::{Encoder, Format, Statistic},
};
use ndarray::{ArrayD, Dimension, IxDyn};
use ndarray_linalg::Scalar;

use crate::{
    GradedTensor, error::GradedError, runtime::GradedRuntime, tenalg::convert::reshape_row_major,
};

type Result<T> = core::result::Result<T, GradedError>;

/// One group of a grouping expression, resolved against the axes it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// label names in expression order
    pub labels: Vec<String>,
    pub statistic: Vec<Statistic>,
    pub shape: Vec<usize>,
    /// positions inside the group, bosonic-like axes first, order otherwise kept
    pub sorted: Vec<usize>,
}

/// Axis bookkeeping of one group.
#[derive(Debug, Clone)]
struct Group {
    /// axes in bosonic-first order, as positions in the ungrouped tensor
    sorted_axes: Vec<usize>,
    bose_dim: Option<usize>,
    fermi_dim: Option<usize>,
    intermediate: Statistic,
}

impl Group {
    /// Statistic of the fully joined axis.
    fn joined_stat(&self) -> Statistic {
        match (self.bose_dim, self.fermi_dim) {
            (Some(_), Some(_)) => Statistic::Hybrid,
            (Some(_), None) => Statistic::Bose,
            _ => self.intermediate,
        }
    }

    fn joined_dim(&self) -> usize {
        self.bose_dim.unwrap_or(1) * self.fermi_dim.unwrap_or(1)
    }
}

/// Grouping of the axes of an ungrouped tensor, derived the same way for join and split.
#[derive(Debug, Clone)]
struct GroupLayout {
    groups: Vec<Group>,
    statistic: Vec<Statistic>,
    shape: Vec<usize>,
}

impl GroupLayout {
    fn new(
        sizes: &[usize],
        statistic: &[Statistic],
        shape: &[usize],
        intermediate: &[Statistic],
    ) -> Result<Self> {
        if shape.len() != statistic.len() {
            return Err(ValidationError::RankMismatch {
                shape: shape.len(),
                statistic: statistic.len(),
            }
            .into());
        }
        let axes: usize = sizes.iter().sum();
        if axes != statistic.len() {
            return Err(ValidationError::AxisCount {
                labels: axes,
                axes: statistic.len(),
            }
            .into());
        }
        if intermediate.len() != sizes.len() {
            return Err(ValidationError::Mismatch {
                what: "intermediate statistic count",
            }
            .into());
        }

        let mut groups = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for (&size, &inter) in sizes.iter().zip(intermediate) {
            let members = start..start + size;
            start += size;
            let (mut bose, fermi): (Vec<usize>, Vec<usize>) =
                members.partition(|&a| statistic[a].is_bose_like());
            let dim = |axes: &[usize]| -> Option<usize> {
                (!axes.is_empty()).then(|| axes.iter().map(|&a| shape[a]).product())
            };
            let (bose_dim, fermi_dim) = (dim(&bose), dim(&fermi));
            if fermi_dim.is_some() && !inter.is_fermionic() {
                return Err(ValidationError::Mismatch {
                    what: "intermediate statistic of a fermionic group",
                }
                .into());
            }
            bose.extend(fermi);
            groups.push(Group {
                sorted_axes: bose,
                bose_dim,
                fermi_dim,
                intermediate: inter,
            });
        }
        Ok(GroupLayout {
            groups,
            statistic: statistic.to_vec(),
            shape: shape.to_vec(),
        })
    }

    fn permutation(&self) -> Vec<usize> {
        self.groups
            .iter()
            .flat_map(|g| g.sorted_axes.iter().copied())
            .collect()
    }

    fn sorted_shape(&self) -> Vec<usize> {
        self.permutation().iter().map(|&a| self.shape[a]).collect()
    }

    /// Positions, in sorted order, of `Fermi` axes merged into a `ConjFermi` group.
    fn signed_positions(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut pos = 0;
        for g in &self.groups {
            for &a in &g.sorted_axes {
                if self.statistic[a] == Statistic::Fermi && g.intermediate == Statistic::ConjFermi
                {
                    out.push(pos);
                }
                pos += 1;
            }
        }
        out
    }

    /// Shape and statistic with bosonic and fermionic parts merged separately.
    fn intermediate(&self) -> (Vec<usize>, Vec<Statistic>) {
        let mut shape = Vec::new();
        let mut stats = Vec::new();
        for g in &self.groups {
            if let Some(d) = g.bose_dim {
                shape.push(d);
                stats.push(Statistic::Bose);
            }
            if let Some(d) = g.fermi_dim {
                shape.push(d);
                stats.push(g.intermediate);
            }
        }
        (shape, stats)
    }

    fn joined(&self) -> (Vec<usize>, Vec<Statistic>) {
        self.groups
            .iter()
            .map(|g| (g.joined_dim(), g.joined_stat()))
            .unzip()
    }
}

/// Multiplies every entry by `(-1)^p`, `p` the summed grading parity at `positions`.
fn apply_merge_signs<E: Scalar, O: ParityOracle>(
    data: &mut ArrayD<E>,
    positions: &[usize],
    oracle: &O,
) {
    if positions.is_empty() {
        return;
    }
    for (ix, v) in data.indexed_iter_mut() {
        let ix = ix.slice();
        let odd = positions
            .iter()
            .fold(false, |acc, &p| acc ^ oracle.grading_parity(ix[p]));
        if odd {
            *v = -*v;
        }
    }
}

fn inverse(perm: &[usize]) -> Vec<usize> {
    let mut inv = alloc::vec![0; perm.len()];
    for (k, &a) in perm.iter().enumerate() {
        inv[a] = k;
    }
    inv
}

impl<O: ParityOracle> GradedRuntime<O> {
    /// Resolves `grouping` against axes with the given statistic and shape.
    pub fn group_info(
        &self,
        grouping: &str,
        statistic: &[Statistic],
        shape: &[usize],
    ) -> Result<Vec<GroupInfo>> {
        if shape.len() != statistic.len() {
            return Err(ValidationError::RankMismatch {
                shape: shape.len(),
                statistic: statistic.len(),
            }
            .into());
        }
        let expr = self.grouping_expr(grouping)?;
        let axes = expr.axis_count();
        if axes != statistic.len() {
            return Err(ValidationError::AxisCount {
                labels: axes,
                axes: statistic.len(),
            }
            .into());
        }
        let mut start = 0;
        let mut out = Vec::with_capacity(expr.groups().len());
        for group in expr.groups() {
            let range = start..start + group.len();
            start += group.len();
            let statistic = statistic[range.clone()].to_vec();
            let (mut sorted, fermi): (Vec<usize>, Vec<usize>) =
                (0..group.len()).partition(|&k| statistic[k].is_bose_like());
            sorted.extend(fermi);
            out.push(GroupInfo {
                labels: group.iter().map(|&l| expr.table().display(l)).collect(),
                statistic,
                shape: shape[range].to_vec(),
                sorted,
            });
        }
        Ok(out)
    }

    /// Merges the axes of `t` group by group.
    ///
    /// `grouping` assigns consecutive axes to groups, `"(ij)(kl)"` or `"ij|kl"`. The result is in
    /// the parity-preserving encoding and in `format`; its axis per group is `Hybrid` if the group
    /// mixes kinds, `Bose` if it is purely bosonic, and the group's entry of `intermediate`
    /// otherwise.
    #[tracing::instrument(skip_all, fields(grouping = grouping))]
    pub fn join_legs<E: Scalar>(
        &self,
        t: &GradedTensor<E>,
        grouping: &str,
        format: Format,
        intermediate: &[Statistic],
    ) -> Result<GradedTensor<E>> {
        let sizes = self.grouping_expr(grouping)?.sizes();
        self.join_legs_sized(t, &sizes, format, intermediate)
    }

    pub(crate) fn join_legs_sized<E: Scalar>(
        &self,
        t: &GradedTensor<E>,
        sizes: &[usize],
        format: Format,
        intermediate: &[Statistic],
    ) -> Result<GradedTensor<E>> {
        let oracle = self.oracle();
        let layout = GroupLayout::new(sizes, t.statistic(), t.shape(), intermediate)?;
        let perm = layout.permutation();

        let data = t.normalized(oracle)?.data();
        let mut data = data
            .permuted_axes(IxDyn(&perm))
            .as_standard_layout()
            .into_owned();
        apply_merge_signs(&mut data, &layout.signed_positions(), oracle);

        let (mid_shape, mid_stats) = layout.intermediate();
        let merged = GradedTensor::dense(
            reshape_row_major(&data, &mid_shape)?,
            mid_stats,
            Encoder::Canonical,
            Format::Standard,
        );
        let merged = merged
            .force_format(format, oracle)?
            .switch_encoder(oracle);

        let (shape, stats) = layout.joined();
        let joined = GradedTensor::dense(
            reshape_row_major(&merged.data(), &shape)?,
            stats,
            Encoder::ParityPreserving,
            format,
        );
        tracing::debug!(shape = ?joined.shape(), statistic = ?joined.statistic(), "joined");
        Ok(joined.with_storage_of(t, self.config()))
    }

    /// Inverse of [`GradedRuntime::join_legs`].
    ///
    /// `statistic` and `shape` describe the ungrouped tensor; `grouping` and `intermediate` must be
    /// the ones the tensor was joined with. The result is in the canonical encoding and in the
    /// format of `t`.
    #[tracing::instrument(skip_all, fields(grouping = grouping))]
    pub fn split_legs<E: Scalar>(
        &self,
        t: &GradedTensor<E>,
        grouping: &str,
        statistic: &[Statistic],
        shape: &[usize],
        intermediate: &[Statistic],
    ) -> Result<GradedTensor<E>> {
        let sizes = self.grouping_expr(grouping)?.sizes();
        self.split_legs_sized(t, &sizes, statistic, shape, intermediate)
    }

    pub(crate) fn split_legs_sized<E: Scalar>(
        &self,
        t: &GradedTensor<E>,
        sizes: &[usize],
        statistic: &[Statistic],
        shape: &[usize],
        intermediate: &[Statistic],
    ) -> Result<GradedTensor<E>> {
        let oracle = self.oracle();
        let layout = GroupLayout::new(sizes, statistic, shape, intermediate)?;
        let (joined_shape, joined_stats) = layout.joined();
        if t.shape() != joined_shape.as_slice() {
            return Err(ValidationError::Mismatch {
                what: "joined shape",
            }
            .into());
        }
        if t.statistic() != joined_stats.as_slice() {
            return Err(ValidationError::Mismatch {
                what: "joined statistic",
            }
            .into());
        }

        let format = t.format();
        let t = t.force_encoder(Encoder::ParityPreserving, oracle);

        let (mid_shape, mid_stats) = layout.intermediate();
        let merged = GradedTensor::dense(
            reshape_row_major(&t.data(), &mid_shape)?,
            mid_stats,
            Encoder::ParityPreserving,
            format,
        );
        let merged = merged
            .switch_encoder(oracle)
            .force_format(Format::Standard, oracle)?;

        let mut data = reshape_row_major(&merged.data(), &layout.sorted_shape())?;
        apply_merge_signs(&mut data, &layout.signed_positions(), oracle);
        let data = data
            .permuted_axes(IxDyn(&inverse(&layout.permutation())))
            .as_standard_layout()
            .into_owned();

        let split = GradedTensor::dense(
            data,
            statistic.to_vec(),
            Encoder::Canonical,
            Format::Standard,
        )
        .force_format(format, oracle)?;
        Ok(split.with_storage_of(&t, self.config()))
    }
}
