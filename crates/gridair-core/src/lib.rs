//! Core types and traits for the gridair object layer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the gridair workspace:
//! the dense [`Tensor`], latent field names, error types, and the
//! [`Network`] / [`RandomSource`] seams through which sub-networks and
//! sampling noise are injected.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod ops;
pub mod tensor;
pub mod traits;

pub use error::{ArenaError, ConfigError, LayerError, ShapeError};
pub use field::LatentField;
pub use ops::{clip_logit, sigmoid, LOGIT_CLIP};
pub use tensor::{Shape, Tensor};
pub use traits::{Network, NetworkFactory, NetworkKind, NetworkRole, NetworkSpec, RandomSource};
