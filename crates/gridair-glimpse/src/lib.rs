//! Differentiable-style glimpse extraction.
//!
//! A glimpse is a fixed-size rectified crop of the source image taken at
//! a predicted box. Extraction is two steps:
//!
//! 1. [`warp`]: an affine, no-shear grid warper turns each [`WarpBox`]
//!    into a grid of source sampling coordinates.
//! 2. [`resample`]: a bilinear resampler reads the source at those
//!    coordinates, either zero-padded outside the image or clamped to
//!    the nearest edge pixel.
//!
//! [`GlimpseExtractor`] bundles both for batched `[B, H, W, D]` images.
//!
//! [`WarpBox`]: gridair_space::WarpBox

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod extractor;
pub mod resample;
pub mod warp;

pub use extractor::GlimpseExtractor;
pub use resample::{bilinear_sample, Resampler};
pub use warp::{warp_grid, SamplePoint};
