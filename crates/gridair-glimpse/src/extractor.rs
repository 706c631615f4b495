//! Batched glimpse extraction.

use crate::resample::{bilinear_sample, Resampler};
use crate::warp::warp_grid;
use gridair_core::{ConfigError, ShapeError, Tensor};
use gridair_space::WarpBox;

/// Extracts fixed-size glimpses from `[B, H, W, D]` images.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlimpseExtractor {
    object_shape: (usize, usize),
    resampler: Resampler,
}

impl GlimpseExtractor {
    /// Create an extractor producing `object_shape = (rows, cols)` glimpses.
    pub fn new(object_shape: (usize, usize), resampler: Resampler) -> Result<Self, ConfigError> {
        if object_shape.0 == 0 || object_shape.1 == 0 {
            return Err(ConfigError::ZeroSize {
                name: "object_shape",
            });
        }
        Ok(Self {
            object_shape,
            resampler,
        })
    }

    /// Glimpse spatial shape.
    pub fn object_shape(&self) -> (usize, usize) {
        self.object_shape
    }

    /// Resampler variant in use.
    pub fn resampler(&self) -> Resampler {
        self.resampler
    }

    /// Extract `warps.len() / B` glimpses per image.
    ///
    /// `warps` is batch-major: entries `[b * n, (b + 1) * n)` are read from
    /// image `b`. Returns `[B, n, rows, cols, D]`.
    pub fn extract(&self, image: &Tensor, warps: &[WarpBox]) -> Result<Tensor, ShapeError> {
        if image.rank() != 4 {
            return Err(ShapeError::Rank {
                op: "extract_glimpses",
                expected: 4,
                actual: image.rank(),
            });
        }
        let (batch, rows, cols, depth) = (image.dim(0)?, image.dim(1)?, image.dim(2)?, image.dim(3)?);
        if batch == 0 || warps.len() % batch != 0 {
            return Err(ShapeError::Mismatch {
                op: "extract_glimpses",
                expected: vec![batch],
                actual: vec![warps.len()],
            });
        }
        let n = warps.len() / batch;
        let (oh, ow) = self.object_shape;
        let per_image = rows * cols * depth;
        let per_glimpse = oh * ow * depth;

        let mut data = vec![0.0f32; warps.len() * per_glimpse];
        for (g, warp) in warps.iter().enumerate() {
            let b = g / n;
            let src = &image.data()[b * per_image..(b + 1) * per_image];
            let dst = &mut data[g * per_glimpse..(g + 1) * per_glimpse];
            for (p, point) in warp_grid(*warp, (rows, cols), self.object_shape)
                .into_iter()
                .enumerate()
            {
                bilinear_sample(
                    src,
                    (rows, cols, depth),
                    point,
                    self.resampler,
                    &mut dst[p * depth..(p + 1) * depth],
                );
            }
        }
        Tensor::from_vec(&[batch, n, oh, ow, depth], data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridair_space::ImageBox;
    use proptest::prelude::*;

    fn ramp(rows: usize, cols: usize) -> Tensor {
        Tensor::from_fn(&[1, rows, cols, 1], |i| i as f32)
    }

    #[test]
    fn rejects_zero_object_shape() {
        assert!(matches!(
            GlimpseExtractor::new((0, 4), Resampler::ZeroPadded),
            Err(ConfigError::ZeroSize { name: "object_shape" })
        ));
    }

    #[test]
    fn whole_image_box_reproduces_image() {
        let image = ramp(4, 4);
        let ex = GlimpseExtractor::new((4, 4), Resampler::ZeroPadded).unwrap();
        let full = ImageBox {
            y: 0.5,
            x: 0.5,
            h: 1.0,
            w: 1.0,
        };
        let g = ex.extract(&image, &[full.to_warp()]).unwrap();
        assert_eq!(g.shape(), &[1, 1, 4, 4, 1]);
        for (a, b) in g.data().iter().zip(image.data()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn batch_major_warps_read_their_own_image() {
        let image = Tensor::from_vec(&[2, 1, 1, 1], vec![3.0, 7.0]).unwrap();
        let ex = GlimpseExtractor::new((1, 1), Resampler::Edge).unwrap();
        let centre = ImageBox {
            y: 0.5,
            x: 0.5,
            h: 1.0,
            w: 1.0,
        }
        .to_warp();
        let g = ex.extract(&image, &[centre, centre, centre, centre]).unwrap();
        assert_eq!(g.shape(), &[2, 2, 1, 1, 1]);
        assert_eq!(g.data(), &[3.0, 3.0, 7.0, 7.0]);
    }

    #[test]
    fn uneven_warp_count_is_rejected() {
        let image = Tensor::zeros(&[2, 3, 3, 1]);
        let ex = GlimpseExtractor::new((2, 2), Resampler::ZeroPadded).unwrap();
        let w = WarpBox {
            scale_x: 1.0,
            offset_x: 0.0,
            scale_y: 1.0,
            offset_y: 0.0,
        };
        assert!(matches!(
            ex.extract(&image, &[w, w, w]),
            Err(ShapeError::Mismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn edge_glimpse_stays_within_image_range(
            y in -1.0f32..2.0,
            x in -1.0f32..2.0,
            h in 0.01f32..3.0,
            w in 0.01f32..3.0,
        ) {
            let image = ramp(5, 6);
            let ex = GlimpseExtractor::new((3, 3), Resampler::Edge).unwrap();
            let g = ex.extract(&image, &[ImageBox { y, x, h, w }.to_warp()]).unwrap();
            for v in g.data() {
                prop_assert!(*v >= -1e-4 && *v <= 29.0 + 1e-4);
            }
        }
    }
}
