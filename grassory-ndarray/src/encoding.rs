//! Encoder and format switches.
//!
//! A format switch multiplies every entry by the product of `sign_value` over its `ConjFermi`
//! coordinates; applied twice it is the identity. An encoder switch moves entries along the
//! oracle's reencoding of every fermionic coordinate; it is an involution as well.

use alloc::vec::Vec;

use grassory_core::{
    error::ValidationError,
    oracle::ParityOracle,
    parity::Sign,
    statistic::{Encoder, Format, Statistic},
};
use ndarray_linalg::Scalar;

use crate::{GradedTensor, repr::GradedRepr};

impl<E: Scalar> GradedTensor<E> {
    /// Absorbs or releases the `ConjFermi` sign factors, toggling the format.
    ///
    /// In the parity-preserving encoding the switch happens in canonical coordinates, so the
    /// encoder is switched away and back around it.
    pub fn switch_format<O: ParityOracle>(&self, oracle: &O) -> Result<Self, ValidationError> {
        if self.statistic().contains(&Statistic::Hybrid) {
            return Err(ValidationError::HybridAxis {
                operation: "format switch",
            });
        }
        if self.encoder() == Encoder::ParityPreserving {
            let canonical = self.switch_encoder(oracle);
            return Ok(canonical.switch_format(oracle)?.switch_encoder(oracle));
        }

        let conj_axes: Vec<usize> = self
            .statistic()
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Statistic::ConjFermi)
            .map(|(a, _)| a)
            .collect();

        let mut out = self.clone();
        if !conj_axes.is_empty() {
            out.storage_mut().map_indexed(|coords, v| {
                let sign: Sign = conj_axes.iter().map(|&a| oracle.sign_value(coords[a])).product();
                *v = sign.apply(*v);
            });
        }
        let format = self.format().toggled();
        Ok(out.with_tags(self.encoder(), format))
    }

    /// Reorders the fermionic axes into the other encoding, toggling the encoder.
    ///
    /// Bosonic and hybrid axes are left alone.
    pub fn switch_encoder<O: ParityOracle>(&self, oracle: &O) -> Self {
        let fermionic: Vec<bool> = self.statistic().iter().map(|s| s.is_fermionic()).collect();
        let storage = if fermionic.iter().any(|&f| f) {
            self.storage().reindexed(|coords| {
                coords
                    .iter()
                    .zip(&fermionic)
                    .map(|(&c, &f)| if f { oracle.reencode_index(c) } else { c })
                    .collect()
            })
        } else {
            self.storage().clone()
        };
        GradedTensor::from_parts(
            storage,
            self.statistic().to_vec(),
            self.encoder().toggled(),
            self.format(),
        )
    }

    /// Returns the tensor in `format`, switching only if it differs.
    pub fn force_format<O: ParityOracle>(
        &self,
        format: Format,
        oracle: &O,
    ) -> Result<Self, ValidationError> {
        if self.format() == format {
            Ok(self.clone())
        } else {
            self.switch_format(oracle)
        }
    }

    /// Returns the tensor in `encoder`, switching only if it differs.
    pub fn force_encoder<O: ParityOracle>(&self, encoder: Encoder, oracle: &O) -> Self {
        if self.encoder() == encoder {
            self.clone()
        } else {
            self.switch_encoder(oracle)
        }
    }

    /// Canonical encoding and standard format, the layout every contraction works in.
    pub(crate) fn normalized<O: ParityOracle>(&self, oracle: &O) -> Result<Self, ValidationError> {
        self.force_encoder(Encoder::Canonical, oracle)
            .force_format(Format::Standard, oracle)
    }

    /// Moves a normalized tensor back to the given layout.
    pub(crate) fn restored<O: ParityOracle>(
        &self,
        encoder: Encoder,
        format: Format,
        oracle: &O,
    ) -> Result<Self, ValidationError> {
        Ok(self
            .force_format(format, oracle)?
            .force_encoder(encoder, oracle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use grassory_core::{
        config::GradedConfig,
        oracle::BinaryOracle,
        statistic::Statistic::{Bose, ConjFermi, Fermi, Hybrid},
    };
    use ndarray::{ArrayD, IxDyn};
    use ndarray_linalg::random_using;
    use rand::{SeedableRng, rngs::SmallRng};

    fn sample(stats: Vec<Statistic>, shape: &[usize]) -> anyhow::Result<GradedTensor<f64>> {
        let mut rng = SmallRng::seed_from_u64(5);
        let data: ArrayD<f64> = random_using(IxDyn(shape), &mut rng);
        Ok(GradedTensor::new(data, stats, &GradedConfig::default())?)
    }

    #[test]
    fn switches_are_involutions() -> anyhow::Result<()> {
        let o = BinaryOracle;
        let t = sample(vec![Fermi, ConjFermi, Bose], &[4, 8, 3])?;
        let back = t.switch_format(&o)?.switch_format(&o)?;
        assert_eq!(back, t);
        let back = t.switch_encoder(&o).switch_encoder(&o);
        assert_eq!(back, t);
        let mixed = t.switch_encoder(&o).switch_format(&o)?;
        assert_eq!(mixed.encoder(), Encoder::ParityPreserving);
        assert_eq!(mixed.format(), Format::Matrix);
        assert_eq!(mixed.switch_format(&o)?.switch_encoder(&o), t);
        Ok(())
    }

    #[test]
    fn format_switch_signs_conjugate_axes() -> anyhow::Result<()> {
        let o = BinaryOracle;
        let t = sample(vec![ConjFermi, Fermi], &[4, 4])?;
        let m = t.switch_format(&o)?;
        for i in 0..4 {
            for j in 0..4 {
                // only index 3 has two generators
                let expect = if i == 3 { -t.data()[[i, j]] } else { t.data()[[i, j]] };
                assert_eq!(m.data()[[i, j]], expect);
            }
        }
        Ok(())
    }

    #[test]
    fn encoder_switch_moves_odd_basis_states() -> anyhow::Result<()> {
        let o = BinaryOracle;
        let t = sample(vec![Fermi, Bose], &[4, 2])?;
        let p = t.switch_encoder(&o);
        // canonical 0,1,2,3 sit at 0,1,3,2
        for (i, j) in [(0, 0), (1, 1), (2, 3), (3, 2)] {
            assert_eq!(p.data()[[j, 1]], t.data()[[i, 1]]);
        }
        Ok(())
    }

    #[test]
    fn hybrid_axes_refuse_format_switch() -> anyhow::Result<()> {
        let o = BinaryOracle;
        let t = sample(vec![Hybrid, Fermi], &[6, 2])?;
        assert_eq!(
            t.switch_format(&o),
            Err(ValidationError::HybridAxis {
                operation: "format switch"
            })
        );
        assert_eq!(t.switch_encoder(&o).switch_encoder(&o), t);
        Ok(())
    }
}
