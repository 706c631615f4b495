//! Stochastic latent builders for grid object layers.
//!
//! Each builder takes the raw output of a lateral network, splits it
//! into distributional parameters, applies a bounded nonlinearity, draws
//! one sample from an injected [`RandomSource`], and returns the sample
//! together with its parameters:
//!
//! - [`BoxBuilder`]: cell-local box, anchor-normalized box, logit
//!   means/stds.
//! - [`AttrBuilder`]: attribute embedding.
//! - [`DepthBuilder`]: depth logit and `z` in `(0, 1)`.
//! - [`PresenceBuilder`]: presence log-odds, probability, relaxed
//!   Bernoulli pre-sigmoid and final presence score.
//!
//! Supporting pieces: scheduled scalars ([`Schedule`]), the train/eval
//! noise switch ([`NoiseSwitch`]), the training-wheels blend
//! ([`TrainingWheels`]), the Concrete relaxation, a seeded
//! [`SeededRandom`], and the independent prior with Normal KL terms
//! ([`prior`]).
//!
//! [`RandomSource`]: gridair_core::RandomSource

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attr;
pub mod boxes;
pub mod concrete;
pub mod depth;
pub mod noise;
pub mod presence;
pub mod prior;
pub mod random;
pub mod schedule;
pub mod wheels;

use gridair_core::{LatentField, Tensor};
use indexmap::IndexMap;

/// Named latent tensors in insertion order.
pub type FieldMap = IndexMap<LatentField, Tensor>;

pub use attr::{AttrBuilder, AttrLatent};
pub use boxes::{BoxBuilder, BoxLatent};
pub use concrete::concrete_binary_pre_sigmoid_sample;
pub use depth::{DepthBuilder, DepthLatent};
pub use noise::{std_nonlinearity, NoiseSwitch};
pub use presence::{PresenceBuilder, PresenceLatent};
pub use prior::{compute_kl, independent_prior, normal_kl, Prior, PriorParam};
pub use random::SeededRandom;
pub use schedule::Schedule;
pub use wheels::TrainingWheels;

/// Draw `mean + std * N(0, 1)` elementwise.
pub(crate) fn sample_normal(
    mean: &Tensor,
    std: &Tensor,
    rng: &mut dyn gridair_core::RandomSource,
) -> Result<Tensor, gridair_core::ShapeError> {
    mean.zip_map(std, |m, s| m + s * rng.standard_normal())
}
