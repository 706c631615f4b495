//! Grid geometry for gridair layers.
//!
//! This crate defines the cell-slot lattice the object layers iterate
//! over, the pure coordinate transforms between cell-local boxes and
//! anchor-normalized, image-space and warp coordinates, and the causal
//! [`ContextPlan`] that fixes which earlier cell-slots an autoregressive
//! layer may condition on.
//!
//! # Ordering
//!
//! Cell-slots are visited row-major, then column, then slot. The
//! [`GridShape::canonical_ordering`] sequence is the single total order
//! both the program arena and the context plan assume.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod coords;
pub mod grid;

pub use context::{ContextPlan, ContextSource};
pub use coords::{
    coords_to_image_space, CellGeometry, ImageBox, LocalBox, NormalizedBox, WarpBox,
};
pub use grid::{CellSlot, GridShape};
