//! Benchmark profiles and utilities for gridair.
//!
//! Provides pre-built layer configurations and deterministic inputs so
//! the criterion benches measure the same workloads run to run.

#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use gridair_core::Tensor;
use gridair_latent::SeededRandom;
use gridair_layer::{ConvGridObjectLayer, GridObjectLayer, LayerConfig};
use gridair_nn::StandardFactory;

/// Hidden widths for every network the bench layers build.
pub const BENCH_HIDDEN: &[usize] = &[32];

/// A small layer: 4x4 object crops, 8 attributes, lookback 1.
///
/// Mirrors the scale of a single-flight CLEVR-style detector without
/// the training schedules.
pub fn small_layer_config() -> LayerConfig {
    LayerConfig {
        object_shape: (4, 4),
        attr_width: 8,
        anchor_box: (16.0, 16.0),
        pixels_per_cell: (8.0, 8.0),
        n_passthrough_features: 4,
        n_lookback: 1,
        ..Default::default()
    }
}

/// Same as [`small_layer_config`] but with `slots` objects per cell.
pub fn multi_slot_config(slots: usize) -> LayerConfig {
    LayerConfig {
        n_objects_per_cell: slots,
        ..small_layer_config()
    }
}

/// Deterministic `(image, features)` pair for a `rows x cols` grid.
///
/// The image is `[batch, 8 * rows, 8 * cols, 3]` to match
/// [`small_layer_config`]'s pixels-per-cell, and the features are
/// `[batch, rows, cols, channels]`.
pub fn bench_inputs(batch: usize, rows: usize, cols: usize, channels: usize) -> (Tensor, Tensor) {
    let image = Tensor::from_fn(&[batch, 8 * rows, 8 * cols, 3], |i| {
        ((i * 31) % 101) as f32 / 100.0
    });
    let features = Tensor::from_fn(&[batch, rows, cols, channels], |i| {
        ((i as f32) * 0.37).sin()
    });
    (image, features)
}

/// Sequential layer over [`StandardFactory`] with fixed seed.
pub fn sequential_layer(config: LayerConfig, seed: u64) -> GridObjectLayer {
    match GridObjectLayer::new(config, StandardFactory::new(BENCH_HIDDEN, seed)) {
        Ok(layer) => layer,
        Err(e) => panic!("bench profile rejected: {e}"),
    }
}

/// Convolutional layer over [`StandardFactory`] with fixed seed.
pub fn conv_layer(config: LayerConfig, seed: u64, flatten: bool) -> ConvGridObjectLayer {
    match ConvGridObjectLayer::new(config, StandardFactory::new(BENCH_HIDDEN, seed), flatten) {
        Ok(layer) => layer,
        Err(e) => panic!("bench profile rejected: {e}"),
    }
}

/// Sampling source for a bench run.
pub fn bench_rng(seed: u64) -> SeededRandom {
    SeededRandom::new(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_profile_validates() {
        small_layer_config().validate().unwrap();
        multi_slot_config(3).validate().unwrap();
    }

    #[test]
    fn bench_inputs_match_pixels_per_cell() {
        let (image, features) = bench_inputs(2, 3, 4, 5);
        assert_eq!(image.shape(), &[2, 24, 32, 3]);
        assert_eq!(features.shape(), &[2, 3, 4, 5]);
        assert!(image.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn bench_inputs_are_deterministic() {
        assert_eq!(bench_inputs(1, 2, 2, 3), bench_inputs(1, 2, 2, 3));
    }
}
