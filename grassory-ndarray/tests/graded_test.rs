use grassory_core::prelude::*;
use grassory_core::statistic::Statistic::{Bose, ConjFermi, Fermi, Hybrid};
use grassory_ndarray::{GradedError, GradedRuntime, GradedTensor};
use ndarray::{Array2, Ix2, IxDyn};
use ndarray_linalg::{Scalar, c64, random_using};
use num_traits::ToPrimitive;
use rand::{SeedableRng, rngs::SmallRng};

fn even<E: Scalar>(
    rt: &GradedRuntime,
    shape: &[usize],
    stats: Vec<Statistic>,
    seed: u64,
) -> anyhow::Result<GradedTensor<E>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    Ok(GradedTensor::random(
        shape,
        stats,
        &mut rng,
        rt.oracle(),
        rt.config(),
    )?)
}

fn max_diff<E: Scalar>(a: &GradedTensor<E>, b: &GradedTensor<E>) -> f64 {
    assert_eq!(a.shape(), b.shape());
    (&a.data() - &b.data())
        .iter()
        .map(|d| d.abs().to_f64().unwrap_or(f64::INFINITY))
        .fold(0.0, f64::max)
}

fn assert_identity<E: Scalar>(rt: &GradedRuntime, t: &GradedTensor<E>) -> anyhow::Result<()> {
    let m = t
        .force_format(Format::Matrix, rt.oracle())?
        .data()
        .into_dimensionality::<Ix2>()?;
    let eye = Array2::<E>::eye(m.nrows());
    let err = (&m - &eye)
        .iter()
        .map(|d| d.abs().to_f64().unwrap_or(f64::INFINITY))
        .fold(0.0, f64::max);
    assert!(err < 1e-10, "deviation from identity {err}");
    Ok(())
}

#[test]
fn join_split_round_trip() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<f64> = even(&rt, &[2, 3, 4, 2], vec![Fermi, Bose, ConjFermi, Fermi], 1)?;
    let cases: [(&str, [Statistic; 2]); 3] = [
        ("(ijk)(l)", [ConjFermi, Fermi]),
        ("ij|kl", [Fermi, ConjFermi]),
        ("i,jkl", [ConjFermi, ConjFermi]),
    ];
    for format in [Format::Standard, Format::Matrix] {
        let tf = t.force_format(format, rt.oracle())?;
        for (grouping, inter) in cases {
            let joined = rt.join_legs(&tf, grouping, format, &inter)?;
            assert_eq!(joined.ndim(), 2);
            assert_eq!(joined.encoder(), Encoder::ParityPreserving);
            assert_eq!(joined.format(), format);
            let back = rt.split_legs(&joined, grouping, tf.statistic(), tf.shape(), &inter)?;
            assert_eq!(back.statistic(), tf.statistic());
            assert_eq!(back.encoder(), Encoder::Canonical);
            assert_eq!(back.format(), format);
            assert!(max_diff(&back, &tf) < 1e-12, "{grouping} in {format}");
        }
    }
    Ok(())
}

#[test]
fn joined_axes_are_labelled_by_group_content() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<f64> = even(&rt, &[2, 3, 4, 5], vec![Fermi, Bose, ConjFermi, Bose], 2)?;
    let joined = rt.join_legs(&t, "(ij)(k)(l)", Format::Standard, &[Fermi, ConjFermi, Fermi])?;
    assert_eq!(joined.statistic(), &[Hybrid, ConjFermi, Bose]);
    assert_eq!(joined.shape(), &[6, 4, 5]);
    // hybrid axes cannot be contracted or format-switched
    assert!(matches!(
        joined.switch_format(rt.oracle()),
        Err(ValidationError::HybridAxis { .. })
    ));
    assert!(matches!(
        rt.einsum("abc,abc", &[&joined, &joined]),
        Err(GradedError::Validation(ValidationError::HybridAxis { .. }))
    ));
    Ok(())
}

#[test]
fn double_switches_are_identity() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let o = rt.oracle();
    let t: GradedTensor<c64> = even(&rt, &[4, 2, 8], vec![ConjFermi, Bose, Fermi], 3)?;
    assert_eq!(t.switch_format(o)?.switch_format(o)?, t);
    assert_eq!(t.switch_encoder(o).switch_encoder(o), t);
    let sparse = t.to_sparse(rt.config());
    assert_eq!(sparse.switch_format(o)?.switch_format(o)?, sparse);
    assert_eq!(sparse.switch_encoder(o).switch_encoder(o), sparse);
    assert_eq!(sparse.switch_format(o)?.to_dense(), t.switch_format(o)?);
    Ok(())
}

#[test]
fn bosonic_contraction_is_ordinary() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let mut rng = SmallRng::seed_from_u64(4);
    let a: Array2<f64> = random_using((3, 4), &mut rng);
    let b: Array2<f64> = random_using((4, 5), &mut rng);
    let ga = GradedTensor::new(a.clone().into_dyn(), vec![Bose, Bose], rt.config())?;
    let gb = GradedTensor::new(b.clone().into_dyn(), vec![Bose, Bose], rt.config())?;

    let c = rt.einsum("ij,jk->ik", &[&ga, &gb])?;
    let expect = a.dot(&b);
    assert!((&c.data() - &expect.clone().into_dyn()).iter().all(|d| d.abs() < 1e-12));

    let ct = rt.einsum("ij,jk->ki", &[&ga, &gb])?;
    let expect_t = expect.t().to_owned().into_dyn();
    assert!((&ct.data() - &expect_t).iter().all(|d| d.abs() < 1e-12));

    let s = rt.einsum("ij,jk", &[&ga, &gb])?;
    assert_eq!(s.ndim(), 0);
    assert!((s.data()[IxDyn(&[])] - expect.sum()).abs() < 1e-10);
    Ok(())
}

#[test]
fn contraction_is_associative() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t1: GradedTensor<f64> = even(&rt, &[2, 4, 2], vec![Fermi, ConjFermi, ConjFermi], 5)?;
    let t2: GradedTensor<f64> = even(&rt, &[4, 2, 4], vec![Fermi, Fermi, ConjFermi], 6)?;
    let t3: GradedTensor<f64> = even(&rt, &[4, 2], vec![Fermi, ConjFermi], 7)?;

    let all = rt.einsum("iab,abj,jk->ik", &[&t1, &t2, &t3])?;
    let t12 = rt.einsum("iab,abj->ij", &[&t1, &t2])?;
    let left = rt.einsum("ij,jk->ik", &[&t12, &t3])?;
    let t23 = rt.einsum("abj,jk->abk", &[&t2, &t3])?;
    let right = rt.einsum("iab,abk->ik", &[&t1, &t23])?;

    assert_eq!(all.statistic(), &[Fermi, ConjFermi]);
    assert!(max_diff(&all, &left) < 1e-10);
    assert!(max_diff(&all, &right) < 1e-10);
    Ok(())
}

#[test]
fn digit_suffixed_labels_rename_consistently() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let a: GradedTensor<f64> = even(&rt, &[2, 2, 4, 2], vec![Fermi, Fermi, ConjFermi, ConjFermi], 8)?;
    let b: GradedTensor<f64> = even(&rt, &[4, 2, 2, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 9)?;
    let long = rt.einsum("i1 i2 k1 k2, k1 k2 i3 i4 -> i1 i2 i3 i4", &[&a, &b])?;
    let short = rt.einsum("ijab,abkl->ijkl", &[&a, &b])?;
    assert_eq!(long.statistic(), short.statistic());
    assert!(max_diff(&long, &short) < 1e-12);
    Ok(())
}

#[test]
fn output_reordering_matches_permuted_contraction() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let a: GradedTensor<f64> = even(&rt, &[2, 4, 2], vec![Fermi, Fermi, ConjFermi], 10)?;
    let b: GradedTensor<f64> = even(&rt, &[2, 4], vec![Fermi, ConjFermi], 11)?;
    let ab = rt.einsum("ijk,kl->ijl", &[&a, &b])?;
    let ba = rt.einsum("ijk,kl->lji", &[&a, &b])?;
    let back = rt.einsum("lji->ijl", &[&ba])?;
    assert!(max_diff(&ab, &back) < 1e-12);
    Ok(())
}

#[test]
fn svd_reconstructs_and_is_isometric() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<c64> = even(&rt, &[4, 4, 4, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 12)?;
    let (u, s, v) = rt.svd(&t, "ij,kl", None)?;
    assert_eq!(u.statistic(), &[Fermi, Fermi, Fermi]);
    assert_eq!(s.statistic(), &[ConjFermi, Fermi]);
    assert_eq!(v.statistic(), &[ConjFermi, ConjFermi, ConjFermi]);
    assert_eq!(s.shape(), &[16, 16]);

    let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    assert!((&back - &t)?.norm() < 1e-10);

    let ud = rt.hconjugate(&u, "ij,a")?;
    assert_eq!(ud.statistic(), &[ConjFermi, ConjFermi, ConjFermi]);
    assert_identity(&rt, &rt.einsum("aij,ijb->ab", &[&ud, &u])?)?;

    let vd = rt.hconjugate(&v, "a,kl")?;
    assert_eq!(vd.statistic(), &[Fermi, Fermi, Fermi]);
    assert_identity(&rt, &rt.einsum("akl,klb->ab", &[&v, &vd])?)?;
    Ok(())
}

#[test]
fn svd_respects_rank_cutoff() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<f64> = even(&rt, &[4, 4, 4, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 13)?;
    let (u, s, v) = rt.svd(&t, "(ij)(kl)", Some(4))?;
    assert_eq!(s.shape(), &[4, 4]);
    assert_eq!(u.shape(), &[4, 4, 4]);
    assert_eq!(v.shape(), &[4, 4, 4]);
    let approx = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    let err = (&approx - &t)?.norm();
    assert!(err > 1e-8 && err < t.norm());
    Ok(())
}

#[test]
fn svd_with_bosonic_and_hybrid_groups() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();

    let b: GradedTensor<f64> = even(&rt, &[3, 4, 2, 5], vec![Bose; 4], 14)?;
    let (u, s, v) = rt.svd(&b, "ij,kl", None)?;
    assert_eq!(s.statistic(), &[Bose, Bose]);
    assert_eq!(s.shape()[0], 10);
    let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    assert!(max_diff(&back, &b) < 1e-10);

    let h: GradedTensor<f64> = even(&rt, &[3, 4, 4, 2], vec![Bose, Fermi, ConjFermi, Fermi], 15)?;
    let (u, s, v) = rt.svd(&h, "ij,kl", None)?;
    assert_eq!(u.statistic(), &[Bose, Fermi, Fermi]);
    assert_eq!(s.statistic(), &[ConjFermi, Fermi]);
    let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    assert!(max_diff(&back, &h) < 1e-10);
    Ok(())
}

#[test]
fn svd_restores_caller_layout() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let o = rt.oracle();
    let t: GradedTensor<f64> = even(&rt, &[4, 4, 4, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 16)?;
    let tm = t
        .force_format(Format::Matrix, o)?
        .force_encoder(Encoder::ParityPreserving, o);
    let (u, s, v) = rt.svd(&tm, "ij,kl", None)?;
    for x in [&u, &s, &v] {
        assert_eq!(x.format(), Format::Matrix);
        assert_eq!(x.encoder(), Encoder::ParityPreserving);
    }
    let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    assert_eq!(back.format(), Format::Matrix);
    assert!(max_diff(&back, &tm) < 1e-10);
    Ok(())
}

#[test]
fn svd_with_vanishing_odd_block() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let o = rt.oracle();
    let base: GradedTensor<f64> = even(&rt, &[4, 4, 4, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 27)?;
    // keep only the rows of even joined parity
    let mut data = base.data();
    for (ix, v) in data.indexed_iter_mut() {
        if (ix[0].count_ones() + ix[1].count_ones()) % 2 == 1 {
            *v = 0.0;
        }
    }
    let t = GradedTensor::new(data, base.statistic().to_vec(), rt.config())?;
    assert!(t.is_grassmann_even(o, rt.config()));

    let (u, s, v) = rt.svd(&t, "ij,kl", None)?;
    // full even block of rank 8 sets the shared dimension
    assert_eq!(s.shape(), &[16, 16]);
    assert_eq!(u.shape(), &[4, 4, 16]);
    assert_eq!(v.shape(), &[16, 4, 4]);
    let sm = s
        .force_format(Format::Matrix, o)?
        .force_encoder(Encoder::ParityPreserving, o)
        .data();
    for k in 0..8 {
        assert!(sm[IxDyn(&[2 * k, 2 * k])] > 0.0);
        assert_eq!(sm[IxDyn(&[2 * k + 1, 2 * k + 1])], 0.0);
    }
    let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    assert!(max_diff(&back, &t) < 1e-10);
    Ok(())
}

#[test]
fn eig_diagonalizes() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<c64> = even(&rt, &[8, 8], vec![Fermi, ConjFermi], 17)?;
    let (lambda, u) = rt.eig(&t, "i,j", None)?;
    assert_eq!(lambda.statistic(), &[ConjFermi, Fermi]);
    assert_eq!(u.statistic(), &[Fermi, Fermi]);
    let tu = rt.einsum("ij,ja->ia", &[&t, &u])?;
    let ul = rt.einsum("ib,ba->ia", &[&u, &lambda])?;
    assert!(max_diff(&tu, &ul) < 1e-8);
    Ok(())
}

#[test]
fn eig_respects_rank_cutoff() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<c64> = even(&rt, &[8, 8], vec![Fermi, ConjFermi], 28)?;
    let (lambda, u) = rt.eig(&t, "i,j", Some(4))?;
    // two per block
    assert_eq!(lambda.shape(), &[4, 4]);
    assert_eq!(u.shape(), &[8, 4]);
    let tu = rt.einsum("ij,ja->ia", &[&t, &u])?;
    let ul = rt.einsum("ib,ba->ia", &[&u, &lambda])?;
    assert!(max_diff(&tu, &ul) < 1e-8);
    Ok(())
}

#[test]
fn eig_of_bosonic_matrix() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<f64> = even(&rt, &[5, 5], vec![Bose; 2], 29)?;
    let (lambda, u) = rt.eig(&t, "i,j", None)?;
    assert_eq!(lambda.statistic(), &[Bose, Bose]);
    assert_eq!(u.statistic(), &[Bose, Bose]);
    assert_eq!(lambda.shape(), &[5, 5]);

    let tc = GradedTensor::new(t.data().mapv(|x| c64::new(x, 0.0)), vec![Bose; 2], rt.config())?;
    let tu = rt.einsum("ij,ja->ia", &[&tc, &u])?;
    let ul = rt.einsum("ib,ba->ia", &[&u, &lambda])?;
    assert!(max_diff(&tu, &ul) < 1e-8);
    Ok(())
}

#[test]
fn decompositions_keep_sparse_storage() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();

    let t: GradedTensor<f64> = even(&rt, &[4, 4, 4, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 30)?;
    let (u, s, v) = rt.svd(&t.to_sparse(rt.config()), "ij,kl", None)?;
    assert!(u.is_sparse() && s.is_sparse() && v.is_sparse());
    let back = rt.einsum("ija,ab,bkl->ijkl", &[&u, &s, &v])?;
    assert!(back.is_sparse());
    assert!(max_diff(&back.to_dense(), &t) < 1e-10);

    let m: GradedTensor<c64> = even(&rt, &[8, 8], vec![Fermi, ConjFermi], 31)?;
    let (lambda, w) = rt.eig(&m.to_sparse(rt.config()), "i,j", None)?;
    assert!(lambda.is_sparse() && w.is_sparse());
    let mw = rt.einsum("ij,ja->ia", &[&m, &w])?;
    let wl = rt.einsum("ib,ba->ia", &[&w, &lambda])?;
    assert!(max_diff(&mw, &wl.to_dense()) < 1e-8);
    Ok(())
}

#[test]
fn hconjugate_is_an_involution() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<c64> = even(&rt, &[2, 4, 3, 2], vec![Fermi, ConjFermi, Bose, ConjFermi], 18)?;
    let h = rt.hconjugate(&t, "ij,kl")?;
    assert_eq!(h.shape(), &[3, 2, 2, 4]);
    assert_eq!(h.statistic(), &[Bose, Fermi, ConjFermi, Fermi]);
    let hh = rt.hconjugate(&h, "kl,ij")?;
    assert_eq!(hh.statistic(), t.statistic());
    assert!(max_diff(&hh, &t) < 1e-12);
    Ok(())
}

#[test]
fn grading_violation_is_rejected_unless_disabled() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let mut rng = SmallRng::seed_from_u64(19);
    let raw: ndarray::ArrayD<f64> = random_using(IxDyn(&[4, 4]), &mut rng);
    let t = GradedTensor::new(raw, vec![ConjFermi, Fermi], rt.config())?;
    assert!(!t.is_grassmann_even(rt.oracle(), rt.config()));
    assert!(matches!(
        rt.svd(&t, "i,j", None),
        Err(GradedError::GradingViolation { .. })
    ));

    let lenient = GradedRuntime::with_config(GradedConfig::default().skip_grading_check(true));
    assert!(lenient.svd(&t, "i,j", None).is_ok());
    Ok(())
}

#[test]
fn zero_tensor_is_degenerate() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let z = GradedTensor::new(
        ndarray::ArrayD::<f64>::zeros(IxDyn(&[2, 2, 2, 2])),
        vec![Fermi, Fermi, ConjFermi, ConjFermi],
        rt.config(),
    )?;
    assert!(matches!(
        rt.svd(&z, "ij,kl", None),
        Err(GradedError::NumericDegeneracy)
    ));
    Ok(())
}

#[test]
fn malformed_contractions_fail() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let a: GradedTensor<f64> = even(&rt, &[2, 2], vec![Fermi, ConjFermi], 20)?;
    let b: GradedTensor<f64> = even(&rt, &[2, 2], vec![Fermi, ConjFermi], 21)?;

    // the ConjFermi axis of b is left dangling
    assert!(matches!(
        rt.einsum("ij,jk->i", &[&a, &b]),
        Err(GradedError::Validation(ValidationError::UnmatchedFermion { .. }))
    ));
    // two Fermi axes cannot be contracted
    assert!(matches!(
        rt.einsum("ij,ik->jk", &[&a, &b]),
        Err(GradedError::Validation(ValidationError::InconsistentPair { .. }))
    ));
    // a fermionic label on three axes
    assert!(matches!(
        rt.einsum("ij,jj->i", &[&a, &b]),
        Err(GradedError::Validation(ValidationError::UnmatchedFermion { .. }))
    ));
    assert!(matches!(
        rt.einsum("ij,jk->ik->i", &[&a, &b]),
        Err(GradedError::Validation(ValidationError::Expression(
            ExprError::MultipleArrows(2)
        )))
    ));
    assert!(matches!(
        rt.einsum("ij->ij", &[&a, &b]),
        Err(GradedError::Validation(ValidationError::OperandCount { .. }))
    ));
    assert!(matches!(
        rt.einsum("ijk,jk->i", &[&a, &b]),
        Err(GradedError::Validation(ValidationError::AxisCount { .. }))
    ));
    assert!(matches!(
        rt.svd(&a, "ij", None),
        Err(GradedError::Validation(ValidationError::Expression(
            ExprError::PartitionCount(1)
        )))
    ));
    Ok(())
}

#[test]
fn sparse_operands_give_sparse_results() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let a: GradedTensor<f64> = even(&rt, &[2, 4], vec![Fermi, ConjFermi], 22)?;
    let b: GradedTensor<f64> = even(&rt, &[4, 2], vec![Fermi, ConjFermi], 23)?;
    let dense = rt.einsum("ij,jk->ik", &[&a, &b])?;
    let sparse = rt.einsum("ij,jk->ik", &[&a.to_sparse(rt.config()), &b])?;
    assert!(sparse.is_sparse());
    assert!(max_diff(&sparse.to_dense(), &dense) < 1e-12);
    Ok(())
}

#[test]
fn sqrt_splits_singular_values() -> anyhow::Result<()> {
    let rt = GradedRuntime::new();
    let t: GradedTensor<f64> = even(&rt, &[4, 4, 4, 4], vec![Fermi, Fermi, ConjFermi, ConjFermi], 24)?;
    let (u, s, v) = rt.svd(&t, "ij,kl", None)?;
    let r = s.sqrt(rt.oracle())?;
    let us = rt.einsum("ija,ab->ijb", &[&u, &r])?;
    let sv = rt.einsum("ab,bkl->akl", &[&r, &v])?;
    let back = rt.einsum("ija,akl->ijkl", &[&us, &sv])?;
    assert!(max_diff(&back, &t) < 1e-10);
    Ok(())
}
