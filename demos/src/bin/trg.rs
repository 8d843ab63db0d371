use grassory_core::statistic::Statistic::{ConjFermi, Fermi};
use grassory_ndarray::{GradedRuntime, GradedTensor};
use ndarray_linalg::{Scalar, c64};
use rand::{SeedableRng, rngs::SmallRng};

type Tensor = GradedTensor<c64>;

/// One coarse-graining step of a `(m, n, m, n)` tensor with statistic `(+1, +1, -1, -1)`.
///
/// Returns the new tensor, normalized, and the norm it was divided by.
fn trg_step(rt: &GradedRuntime, t: &Tensor, dcut: usize) -> anyhow::Result<(Tensor, f64)> {
    // legs i (east), j (north), k (west), l (south)
    let t1 = rt.einsum("ijkl->jkli", &[t])?;
    let t2 = rt.einsum("ijkl->klij", &[t])?;

    let (u1, s1, v1) = rt.svd(&t1, "ab cd", Some(dcut))?;
    let (u2, s2, v2) = rt.svd(&t2, "ab cd", Some(dcut))?;

    let r1 = s1.sqrt(rt.oracle())?;
    let u1 = rt.einsum("abx,xc->abc", &[&u1, &r1])?;
    let v1 = rt.einsum("ax,xbc->abc", &[&r1, &v1])?;
    let r2 = s2.sqrt(rt.oracle())?;
    let u2 = rt.einsum("abx,xc->abc", &[&u2, &r2])?;
    let v2 = rt.einsum("ax,xbc->abc", &[&r2, &v2])?;

    let vv = rt.einsum("kwz,lxw->lxzk", &[&v1, &v2])?;
    let uu = rt.einsum("yxi,zyj->jzxi", &[&u1, &u2])?;
    let coarse = rt.einsum("lxzk,jzxi->ijkl", &[&vv, &uu])?;

    let before = scalar(&rt.einsum("ijkl,klij", &[t, t])?)?;
    let after = scalar(&rt.einsum("ijij", &[&coarse])?)?;
    tracing::info!(
        shape = ?coarse.shape(),
        trace_error = (before - after).abs(),
        "coarse-grained"
    );

    let norm = coarse.norm();
    Ok((&coarse * c64::from_real(1.0 / norm), norm))
}

fn scalar(t: &Tensor) -> anyhow::Result<c64> {
    t.get(&[])
        .ok_or_else(|| anyhow::anyhow!("expected a scalar, got shape {:?}", t.shape()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let steps: usize = 6;
    let n: usize = 4;
    let dcut: usize = 16;

    let rt = GradedRuntime::new();
    let mut rng = SmallRng::seed_from_u64(0);
    let mut t = Tensor::random(
        &[n, n, n, n],
        vec![Fermi, Fermi, ConjFermi, ConjFermi],
        &mut rng,
        rt.oracle(),
        rt.config(),
    )?;

    let norm = t.norm();
    t = &t * c64::from_real(1.0 / norm);
    let mut coeff_log = norm.ln();

    for step in 0..steps {
        let (next, norm) = trg_step(&rt, &t, dcut)?;
        t = next;
        coeff_log *= 2.0;
        coeff_log += norm.ln();
        println!("step {step}: renormed norm {norm}");
    }

    let z = scalar(&rt.einsum("ijij", &[&t])?)?;
    coeff_log += z.abs().ln();

    println!("Final trace: {z}");
    println!(
        "Log partition function per site: {}",
        coeff_log / 2.0f64.powi((steps + 1) as i32)
    );
    println!("cached expressions: {}", rt.cached_expressions());

    Ok(())
}
