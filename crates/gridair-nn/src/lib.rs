//! Concrete forward-only sub-networks for gridair layers.
//!
//! Layers request networks through [`NetworkFactory`]; this crate
//! supplies [`StandardFactory`], which builds:
//!
//! - [`Mlp`] for [`NetworkKind::Dense`] specs: trailing dims are flattened,
//!   passed through ReLU hidden layers, and reshaped to the output shape.
//! - [`ConvLateral`] for [`NetworkKind::SpatialConv`] specs: a stack of
//!   size-preserving 3x3 convolutions over `[H, W, C]`.
//!
//! Parameters are Glorot-uniform initialized from a seeded `ChaCha8Rng`,
//! with a distinct stream per [`NetworkRole`], so two factories with the
//! same seed build identical networks.
//!
//! [`NetworkFactory`]: gridair_core::NetworkFactory
//! [`NetworkKind::Dense`]: gridair_core::NetworkKind::Dense
//! [`NetworkKind::SpatialConv`]: gridair_core::NetworkKind::SpatialConv
//! [`NetworkRole`]: gridair_core::NetworkRole

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod conv;
pub mod dense;
pub mod factory;
pub mod mlp;

pub use conv::{Conv3x3, ConvLateral};
pub use dense::Dense;
pub use factory::StandardFactory;
pub use mlp::Mlp;
