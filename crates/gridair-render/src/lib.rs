//! Object rendering for gridair.
//!
//! [`ObjectRenderer`] turns per-object attribute vectors into small
//! color-plus-alpha sprites with one decoder per [`Flight`], weights
//! them by presence and depth, places them with the top-left image-space
//! conversion of the anchor-normalized boxes, and hands everything to
//! the [`compositor`].
//!
//! Two debug modes are available through [`RenderMode`]: decoded
//! appearances only, and an occupancy mask (white sprites over black).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod compositor;
pub mod config;
pub mod renderer;

pub use compositor::{composite, SpriteLayer};
pub use config::{Flight, RenderConfig, RenderMode};
pub use renderer::{FlightObjects, ObjectRenderer, RenderOutput};
