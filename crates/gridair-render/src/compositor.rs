//! Sprite compositing.
//!
//! Each object is a small `[rows, cols, D + 2]` map (colors, alpha,
//! importance) placed at a top-left image-fraction box. An output pixel
//! is covered by every sprite whose box contains the pixel centre; the
//! sprite is read there by edge-clamped bilinear sampling. With
//! `T = prod(1 - alpha_i)` over the covering sprites,
//!
//! ```text
//! out = T * background + (1 - T) * sum(importance_i * color_i) / sum(importance_i)
//! ```
//!
//! Uncovered pixels, and pixels whose covering sprites all have alpha 0,
//! keep the background value exactly.

use gridair_core::{ShapeError, Tensor};
use gridair_glimpse::{bilinear_sample, Resampler, SamplePoint};
use gridair_space::ImageBox;

/// The sprites of one flight, ready for compositing.
#[derive(Clone, Debug, PartialEq)]
pub struct SpriteLayer {
    maps: Tensor,
    boxes: Vec<ImageBox>,
}

impl SpriteLayer {
    /// Wrap `[B, n, rows, cols, D + 2]` maps with `B * n` batch-major
    /// top-left boxes.
    pub fn new(maps: Tensor, boxes: Vec<ImageBox>) -> Result<Self, ShapeError> {
        if maps.rank() != 5 {
            return Err(ShapeError::Rank {
                op: "sprite maps",
                expected: 5,
                actual: maps.rank(),
            });
        }
        if maps.last_dim() < 2 {
            return Err(ShapeError::Mismatch {
                op: "sprite channels",
                expected: vec![2],
                actual: vec![maps.last_dim()],
            });
        }
        let objects = maps.shape()[0] * maps.shape()[1];
        if boxes.len() != objects {
            return Err(ShapeError::Mismatch {
                op: "sprite boxes",
                expected: vec![objects],
                actual: vec![boxes.len()],
            });
        }
        Ok(Self { maps, boxes })
    }

    /// Batch size.
    pub fn batch(&self) -> usize {
        self.maps.shape()[0]
    }

    /// Objects per batch row.
    pub fn objects(&self) -> usize {
        self.maps.shape()[1]
    }

    /// Color channels `D`.
    pub fn depth(&self) -> usize {
        self.maps.last_dim() - 2
    }

    /// Sprite maps.
    pub fn maps(&self) -> &Tensor {
        &self.maps
    }

    /// Placement boxes.
    pub fn boxes(&self) -> &[ImageBox] {
        &self.boxes
    }

    fn sprite_shape(&self) -> (usize, usize, usize) {
        let s = self.maps.shape();
        (s[2], s[3], s[4])
    }
}

/// Composite every layer over `background` `[B, H, W, D]`.
pub fn composite(layers: &[SpriteLayer], background: &Tensor) -> Result<Tensor, ShapeError> {
    let &[batch, rows, cols, depth] = background.shape() else {
        return Err(ShapeError::Rank {
            op: "composite background",
            expected: 4,
            actual: background.rank(),
        });
    };
    for layer in layers {
        if layer.batch() != batch || layer.depth() != depth {
            return Err(ShapeError::Mismatch {
                op: "composite sprites",
                expected: vec![batch, depth + 2],
                actual: vec![layer.batch(), layer.maps.last_dim()],
            });
        }
    }

    let mut out = background.clone();
    let mut tap = vec![0.0f32; depth + 2];
    let mut color = vec![0.0f32; depth];
    for b in 0..batch {
        for py in 0..rows {
            let v = (py as f32 + 0.5) / rows as f32;
            for px in 0..cols {
                let u = (px as f32 + 0.5) / cols as f32;
                let mut transmit = 1.0f32;
                let mut weight = 0.0f32;
                color.fill(0.0);

                for layer in layers {
                    let (sh, sw, channels) = layer.sprite_shape();
                    let per_sprite = sh * sw * channels;
                    let n = layer.objects();
                    for i in 0..n {
                        let g = b * n + i;
                        let bx = layer.boxes[g];
                        if !(bx.h > 0.0 && bx.w > 0.0) {
                            continue;
                        }
                        let sy = (v - bx.y) / bx.h;
                        let sx = (u - bx.x) / bx.w;
                        if !(0.0..1.0).contains(&sy) || !(0.0..1.0).contains(&sx) {
                            continue;
                        }
                        let sprite = &layer.maps.data()[g * per_sprite..(g + 1) * per_sprite];
                        let point = SamplePoint {
                            y: sy * sh as f32 - 0.5,
                            x: sx * sw as f32 - 0.5,
                        };
                        bilinear_sample(sprite, (sh, sw, channels), point, Resampler::Edge, &mut tap);
                        let alpha = tap[depth];
                        let importance = tap[depth + 1];
                        transmit *= 1.0 - alpha;
                        weight += importance;
                        for (c, &t) in color.iter_mut().zip(&tap[..depth]) {
                            *c += importance * t;
                        }
                    }
                }

                if weight > 0.0 {
                    let base = ((b * rows + py) * cols + px) * depth;
                    let coverage = 1.0 - transmit;
                    for (d, px_val) in out.data_mut()[base..base + depth].iter_mut().enumerate() {
                        *px_val = *px_val * transmit + coverage * color[d] / weight;
                    }
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sprite(batch: usize, depth: usize, color: f32, alpha: f32) -> Tensor {
        Tensor::from_fn(&[batch, 1, 2, 2, depth + 2], |i| match i % (depth + 2) {
            c if c < depth => color,
            c if c == depth => alpha,
            _ => 1.0,
        })
    }

    fn whole_image() -> ImageBox {
        ImageBox {
            y: 0.0,
            x: 0.0,
            h: 1.0,
            w: 1.0,
        }
    }

    #[test]
    fn opaque_sprite_replaces_background() {
        let bg = Tensor::full(&[1, 3, 3, 2], 0.25);
        let layer = SpriteLayer::new(sprite(1, 2, 0.75, 1.0), vec![whole_image()]).unwrap();
        let out = composite(&[layer], &bg).unwrap();
        assert!(out.data().iter().all(|&v| (v - 0.75).abs() < 1e-6));
    }

    #[test]
    fn transparent_sprite_keeps_background_exactly() {
        let bg = Tensor::from_fn(&[1, 4, 4, 3], |i| i as f32 * 0.01);
        let layer = SpriteLayer::new(sprite(1, 3, 0.9, 0.0), vec![whole_image()]).unwrap();
        assert_eq!(composite(&[layer], &bg).unwrap(), bg);
    }

    #[test]
    fn sprite_outside_its_box_leaves_pixels_alone() {
        let bg = Tensor::zeros(&[1, 4, 4, 1]);
        let quarter = ImageBox {
            y: 0.0,
            x: 0.0,
            h: 0.5,
            w: 0.5,
        };
        let layer = SpriteLayer::new(sprite(1, 1, 1.0, 1.0), vec![quarter]).unwrap();
        let out = composite(&[layer], &bg).unwrap();
        for py in 0..4 {
            for px in 0..4 {
                let v = out.get(&[0, py, px, 0]).unwrap();
                let covered = py < 2 && px < 2;
                let expected = if covered { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-5, "pixel ({py}, {px}) = {v}");
            }
        }
    }

    #[test]
    fn equal_importance_averages_colors() {
        let bg = Tensor::zeros(&[1, 2, 2, 1]);
        let a = SpriteLayer::new(sprite(1, 1, 0.2, 1.0), vec![whole_image()]).unwrap();
        let b = SpriteLayer::new(sprite(1, 1, 0.6, 1.0), vec![whole_image()]).unwrap();
        let out = composite(&[a, b], &bg).unwrap();
        assert!(out.data().iter().all(|&v| (v - 0.4).abs() < 1e-6));
    }

    #[test]
    fn rejects_depth_mismatch() {
        let bg = Tensor::zeros(&[1, 2, 2, 3]);
        let layer = SpriteLayer::new(sprite(1, 1, 0.0, 0.0), vec![whole_image()]).unwrap();
        assert!(composite(&[layer], &bg).is_err());
        assert!(SpriteLayer::new(sprite(1, 1, 0.0, 0.0), vec![]).is_err());
    }

    proptest! {
        #[test]
        fn output_stays_between_background_and_colors(
            bg in 0.0f32..1.0,
            color in 0.0f32..1.0,
            alpha in 0.0f32..1.0,
            y in -0.5f32..1.0,
            x in -0.5f32..1.0,
            size in 0.05f32..1.5,
        ) {
            let background = Tensor::full(&[1, 5, 5, 2], bg);
            let placed = ImageBox { y, x, h: size, w: size };
            let layer = SpriteLayer::new(sprite(1, 2, color, alpha), vec![placed]).unwrap();
            let out = composite(&[layer], &background).unwrap();
            let (lo, hi) = (bg.min(color) - 1e-5, bg.max(color) + 1e-5);
            for &v in out.data() {
                prop_assert!(v >= lo && v <= hi, "{} outside [{}, {}]", v, lo, hi);
            }
        }
    }
}
