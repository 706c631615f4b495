//! Priors over latent distributions and the Normal KL terms against them.
//!
//! A [`Prior`] maps `*_mean` / `*_std` latent fields to either a scalar
//! (broadcast to every element) or a tensor matching the posterior's
//! shape. The independent prior uses scalars; a temporal module can
//! supply per-object tensors instead. Priors are only used for KL, never
//! while sampling.

use crate::FieldMap;
use gridair_core::{LatentField, LayerError, ShapeError, Tensor};
use indexmap::IndexMap;

/// One prior parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum PriorParam {
    /// Broadcast to every element.
    Scalar(f32),
    /// Elementwise; must match the posterior shape.
    Tensor(Tensor),
}

impl PriorParam {
    fn resolve(&self, like: &Tensor) -> Result<Tensor, ShapeError> {
        match self {
            Self::Scalar(v) => Ok(Tensor::full(like.shape(), *v)),
            Self::Tensor(t) if t.shape() == like.shape() => Ok(t.clone()),
            Self::Tensor(t) => Err(ShapeError::Mismatch {
                op: "prior",
                expected: like.shape().to_vec(),
                actual: t.shape().to_vec(),
            }),
        }
    }
}

impl From<f32> for PriorParam {
    fn from(v: f32) -> Self {
        Self::Scalar(v)
    }
}

impl From<Tensor> for PriorParam {
    fn from(t: Tensor) -> Self {
        Self::Tensor(t)
    }
}

/// (mean, std) parameters keyed by latent field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prior {
    params: IndexMap<LatentField, PriorParam>,
}

impl Prior {
    /// An empty prior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one parameter, replacing any previous value.
    pub fn insert(&mut self, field: LatentField, param: impl Into<PriorParam>) {
        self.params.insert(field, param.into());
    }

    /// Look up one parameter.
    pub fn get(&self, field: LatentField) -> Option<&PriorParam> {
        self.params.get(&field)
    }

    /// Number of parameters set.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// The factorized prior used when no external prior is supplied.
///
/// Each argument is a `(mean, std)` pair for the logits of the box
/// centre, box size, depth, and attribute embedding.
pub fn independent_prior(yx: (f32, f32), hw: (f32, f32), z: (f32, f32), attr: (f32, f32)) -> Prior {
    use LatentField::*;
    let mut prior = Prior::new();
    prior.insert(CellYLogitMean, yx.0);
    prior.insert(CellXLogitMean, yx.0);
    prior.insert(HeightLogitMean, hw.0);
    prior.insert(WidthLogitMean, hw.0);
    prior.insert(AttrMean, attr.0);
    prior.insert(ZLogitMean, z.0);

    prior.insert(CellYLogitStd, yx.1);
    prior.insert(CellXLogitStd, yx.1);
    prior.insert(HeightLogitStd, hw.1);
    prior.insert(WidthLogitStd, hw.1);
    prior.insert(AttrStd, attr.1);
    prior.insert(ZLogitStd, z.1);
    prior
}

/// `KL(N(m1, s1) || N(m2, s2))`.
///
/// A zero posterior std (noise disabled) yields `+inf`.
#[inline]
pub fn normal_kl(m1: f32, s1: f32, m2: f32, s2: f32) -> f32 {
    let diff = m1 - m2;
    (s2 / s1).ln() + (s1 * s1 + diff * diff) / (2.0 * s2 * s2) - 0.5
}

/// KL terms that [`compute_kl`] produces, with the latent they cover.
const KL_TERMS: [(&str, LatentField, LatentField); 6] = [
    ("cell_y_kl", LatentField::CellYLogitMean, LatentField::CellYLogitStd),
    ("cell_x_kl", LatentField::CellXLogitMean, LatentField::CellXLogitStd),
    ("height_kl", LatentField::HeightLogitMean, LatentField::HeightLogitStd),
    ("width_kl", LatentField::WidthLogitMean, LatentField::WidthLogitStd),
    ("z_kl", LatentField::ZLogitMean, LatentField::ZLogitStd),
    ("attr_kl", LatentField::AttrMean, LatentField::AttrStd),
];

/// Elementwise Normal KL of every posterior latent except presence.
///
/// Returns tensors shaped like the posterior parameters, keyed
/// `cell_y_kl`, `cell_x_kl`, `height_kl`, `width_kl`, `z_kl`, `attr_kl`.
pub fn compute_kl(
    posterior: &FieldMap,
    prior: &Prior,
) -> Result<IndexMap<&'static str, Tensor>, LayerError> {
    let lookup = |field: LatentField| {
        posterior.get(&field).ok_or_else(|| LayerError::MissingField {
            name: field.name().to_string(),
        })
    };
    let param = |field: LatentField| {
        prior.get(field).ok_or_else(|| LayerError::MissingField {
            name: format!("prior.{}", field.name()),
        })
    };

    let mut out = IndexMap::with_capacity(KL_TERMS.len());
    for (name, mean_field, std_field) in KL_TERMS {
        let mean = lookup(mean_field)?;
        let std = lookup(std_field)?;
        let prior_mean = param(mean_field)?.resolve(mean)?;
        let prior_std = param(std_field)?.resolve(std)?;
        let data = mean
            .data()
            .iter()
            .zip(std.data())
            .zip(prior_mean.data().iter().zip(prior_std.data()))
            .map(|((&m1, &s1), (&m2, &s2))| normal_kl(m1, s1, m2, s2))
            .collect();
        out.insert(name, Tensor::from_vec(mean.shape(), data)?);
    }
    Ok(out)
}
