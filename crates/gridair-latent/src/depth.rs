//! Depth latent `z`: orders overlapping objects.

use crate::noise::std_nonlinearity;
use crate::wheels::TrainingWheels;
use crate::{sample_normal, FieldMap};
use gridair_core::{sigmoid, LatentField, RandomSource, ShapeError, Tensor};

/// Samples a scalar depth logit and squashes it to `(0, 1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepthBuilder;

/// Depth sample and its distribution, each `[..leading, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthLatent {
    /// Logit mean (after the training-wheels blend).
    pub z_logit_mean: Tensor,
    /// Logit std (after the training-wheels blend).
    pub z_logit_std: Tensor,
    /// Sampled logit.
    pub z_logit: Tensor,
    /// `sigmoid(clip(z_logit))`.
    pub z: Tensor,
}

impl DepthBuilder {
    /// Network outputs consumed: mean then std logit.
    pub const PARAMS: usize = 2;

    /// Sample from `params` of shape `[..leading, 2]`.
    pub fn build(
        &self,
        params: &Tensor,
        noise: f32,
        wheels: TrainingWheels,
        rng: &mut dyn RandomSource,
    ) -> Result<DepthLatent, ShapeError> {
        let parts = params.split_last(&[1, 1])?;
        let std = parts[1].map(|x| std_nonlinearity(x, noise));
        let z_logit_mean = wheels.blend(&parts[0]);
        let z_logit_std = wheels.blend(&std);
        let z_logit = sample_normal(&z_logit_mean, &z_logit_std, rng)?;
        let z = z_logit.map(sigmoid);
        Ok(DepthLatent {
            z_logit_mean,
            z_logit_std,
            z_logit,
            z,
        })
    }
}

impl DepthLatent {
    /// Export into `out` under the latent field names.
    pub fn into_fields(self, out: &mut FieldMap) {
        out.insert(LatentField::ZLogitMean, self.z_logit_mean);
        out.insert(LatentField::ZLogitStd, self.z_logit_std);
        out.insert(LatentField::ZLogit, self.z_logit);
        out.insert(LatentField::Z, self.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridair_test_utils::FixedRandom;

    #[test]
    fn zero_params_without_noise_give_half() {
        let mut rng = FixedRandom::new(0.5, 2.0);
        let d = DepthBuilder
            .build(&Tensor::zeros(&[4, 2]), 0.0, TrainingWheels::OFF, &mut rng)
            .unwrap();
        assert!(d.z.data().iter().all(|z| (*z - 0.5).abs() < 1e-7));
        assert_eq!(d.z.shape(), &[4, 1]);
    }

    #[test]
    fn huge_logits_stay_inside_unit_interval() {
        let params = Tensor::from_vec(&[2, 2], vec![1e30, 0.0, -1e30, 0.0]).unwrap();
        let mut rng = FixedRandom::centred();
        let d = DepthBuilder
            .build(&params, 1.0, TrainingWheels::new(0.5).unwrap(), &mut rng)
            .unwrap();
        for z in d.z.data() {
            assert!(*z > 0.0 && *z < 1.0);
        }
    }
}
