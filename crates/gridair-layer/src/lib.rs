//! Grid object layers for gridair.
//!
//! Two layers turn a `[batch, H, W, C]` feature map and the
//! `[batch, Hi, Wi, D]` image it was computed from into a
//! [`LatentBundle`] describing one candidate object per cell-slot:
//!
//! - [`GridObjectLayer`] visits cell-slots one at a time in canonical
//!   order, conditioning each on the program entries its causal
//!   neighbours already wrote (or the learned [`EdgeElement`]).
//! - [`ConvGridObjectLayer`] builds every cell at once with
//!   size-preserving convolutional networks and supports one slot per
//!   cell.
//!
//! Both are configured by a validated [`LayerConfig`], receive their
//! networks from a [`NetworkFactory`](gridair_core::NetworkFactory) on
//! the first forward pass, and take per-call switches through a
//! [`ForwardContext`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bundle;
pub mod config;
pub mod conv;
pub mod edge;
pub mod sequential;
mod state;

pub use bundle::LatentBundle;
pub use config::{ForwardContext, LayerConfig};
pub use conv::{flatten, ConvGridObjectLayer};
pub use edge::EdgeElement;
pub use sequential::GridObjectLayer;
pub use state::Geometry;
