//! Attribute latent: the appearance embedding of an object.

use crate::noise::std_nonlinearity;
use crate::{sample_normal, FieldMap};
use gridair_core::{ConfigError, LatentField, RandomSource, ShapeError, Tensor};

/// Samples an `A`-wide attribute vector from `A` (mean, std-logit) pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrBuilder {
    width: usize,
}

/// Attribute sample and its distribution, each `[..leading, A]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrLatent {
    /// Mean.
    pub attr_mean: Tensor,
    /// Standard deviation in `[0, 2]`.
    pub attr_std: Tensor,
    /// Sample.
    pub attr: Tensor,
}

impl AttrBuilder {
    /// Builder for an `A = width` embedding.
    pub fn new(width: usize) -> Result<Self, ConfigError> {
        if width == 0 {
            return Err(ConfigError::ZeroSize { name: "A" });
        }
        Ok(Self { width })
    }

    /// Embedding width `A`.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Network outputs consumed: `2 * A`.
    pub fn params(&self) -> usize {
        2 * self.width
    }

    /// Sample from `params` of shape `[..leading, 2A]`.
    pub fn build(
        &self,
        params: &Tensor,
        noise: f32,
        rng: &mut dyn RandomSource,
    ) -> Result<AttrLatent, ShapeError> {
        let parts = params.split_last(&[self.width, self.width])?;
        let attr_std = parts[1].map(|x| std_nonlinearity(x, noise));
        let attr = sample_normal(&parts[0], &attr_std, rng)?;
        let attr_mean = parts.into_iter().next().ok_or(ShapeError::Empty { op: "build_attr" })?;
        Ok(AttrLatent {
            attr_mean,
            attr_std,
            attr,
        })
    }
}

impl AttrLatent {
    /// Export into `out` under the latent field names.
    pub fn into_fields(self, out: &mut FieldMap) {
        out.insert(LatentField::AttrMean, self.attr_mean);
        out.insert(LatentField::AttrStd, self.attr_std);
        out.insert(LatentField::Attr, self.attr);
    }
}
