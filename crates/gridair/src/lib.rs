//! gridair: grid-structured object discovery for object-centric generative models.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! gridair sub-crates. For most users, adding `gridair` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use gridair::prelude::*;
//!
//! let config = LayerConfig {
//!     object_shape: (4, 4),
//!     attr_width: 4,
//!     n_passthrough_features: 6,
//!     ..Default::default()
//! };
//! let mut layer = GridObjectLayer::new(config, StandardFactory::new(&[16], 3)).unwrap();
//!
//! // A 2x2 grid of backbone features over a 24x24 RGB image.
//! let image = Tensor::full(&[1, 24, 24, 3], 0.5);
//! let features = Tensor::zeros(&[1, 2, 2, 5]);
//! let mut rng = SeededRandom::new(11);
//!
//! let bundle = layer
//!     .forward(&image, &features, &ForwardContext::default(), None, &mut rng)
//!     .unwrap();
//! assert_eq!(bundle.require(LatentField::Obj).unwrap().shape(), &[1, 4, 1]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `gridair-core` | Tensors, latent field names, errors, network traits |
//! | [`space`] | `gridair-space` | Cell-slot grid, coordinate transforms, context plans |
//! | [`arena`] | `gridair-arena` | Program storage for the sequential layer |
//! | [`glimpse`] | `gridair-glimpse` | Warp grids, bilinear sampling, glimpse extraction |
//! | [`nn`] | `gridair-nn` | Reference dense and 3x3 networks with a seeded factory |
//! | [`latent`] | `gridair-latent` | Latent builders, schedules, priors and KL |
//! | [`layer`] | `gridair-layer` | Sequential and convolutional grid object layers |
//! | [`render`] | `gridair-render` | Object decoders and the sprite compositor |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`gridair-core`).
///
/// Contains [`types::Tensor`], the [`types::LatentField`] names, the error
/// enums, and the [`types::Network`] / [`types::NetworkFactory`] seams.
pub use gridair_core as types;

/// Grid geometry (`gridair-space`).
///
/// [`space::GridShape`] and its canonical ordering, the box conventions,
/// and the causal [`space::ContextPlan`].
pub use gridair_space as space;

/// Program arena (`gridair-arena`).
pub use gridair_arena as arena;

/// Glimpse extraction (`gridair-glimpse`).
///
/// [`glimpse::GlimpseExtractor`] crops fixed-size patches through
/// [`glimpse::warp_grid`] and [`glimpse::bilinear_sample`].
pub use gridair_glimpse as glimpse;

/// Reference networks (`gridair-nn`).
pub use gridair_nn as nn;

/// Latent builders and priors (`gridair-latent`).
///
/// The box, attribute, depth and presence builders, the
/// [`latent::Schedule`] type, and [`latent::compute_kl`].
pub use gridair_latent as latent;

/// Grid object layers (`gridair-layer`).
///
/// [`layer::GridObjectLayer`] for the autoregressive variant and
/// [`layer::ConvGridObjectLayer`] for the fully parallel one.
pub use gridair_layer as layer;

/// Object rendering (`gridair-render`).
pub use gridair_render as render;

/// Common imports for typical gridair usage.
///
/// ```rust
/// use gridair::prelude::*;
/// ```
///
/// This imports the layers and their configuration, the tensor and field
/// types, the network seams with the reference factory, and the renderer.
pub mod prelude {
    // Core types and traits
    pub use gridair_core::{
        LatentField, Network, NetworkFactory, NetworkRole, NetworkSpec, RandomSource, Tensor,
    };

    // Errors
    pub use gridair_core::{ArenaError, ConfigError, LayerError, ShapeError};

    // Layers
    pub use gridair_layer::{
        ConvGridObjectLayer, ForwardContext, GridObjectLayer, LatentBundle, LayerConfig,
    };

    // Latents
    pub use gridair_latent::{Prior, Schedule, SeededRandom};

    // Networks
    pub use gridair_nn::StandardFactory;

    // Rendering
    pub use gridair_render::{Flight, FlightObjects, ObjectRenderer, RenderConfig, RenderMode};
}
