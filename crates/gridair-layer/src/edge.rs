//! The learned edge element.

use gridair_core::{sigmoid, Tensor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Placeholder program entry for missing or out-of-bounds neighbours.
///
/// Raw weights have width `4 + A + 1 + 1` (box, attributes, depth,
/// presence). The exposed element squashes the box and presence parts
/// through a sigmoid so it lives in the same range as real entries.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeElement {
    weights: Vec<f32>,
    attr_width: usize,
    fixed: bool,
}

impl EdgeElement {
    /// Glorot-uniform initialization from `seed`.
    pub fn init(attr_width: usize, fixed: bool, seed: u64) -> Self {
        let width = 4 + attr_width + 2;
        let limit = (3.0 / width as f32).sqrt();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let weights = (0..width)
            .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * limit)
            .collect();
        Self {
            weights,
            attr_width,
            fixed,
        }
    }

    /// Raw weights.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Whether the weights are excluded from gradient updates.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Entry width.
    pub fn width(&self) -> usize {
        self.weights.len()
    }

    /// The element as seen by context assembly.
    pub fn element(&self) -> Vec<f32> {
        let a = self.attr_width;
        self.weights
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let squashed = i < 4 || i == 4 + a + 1;
                if squashed {
                    sigmoid(w)
                } else {
                    w
                }
            })
            .collect()
    }

    /// The element repeated for every batch row: `[batch, width]`.
    pub fn tiled(&self, batch: usize) -> Tensor {
        let element = Tensor::from_fn(&[self.width()], {
            let e = self.element();
            move |i| e[i]
        });
        element.tile_leading(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_and_presence_parts_are_squashed() {
        let mut edge = EdgeElement::init(2, false, 0);
        edge.weights = vec![0.0, 0.0, 0.0, 0.0, -3.0, 3.0, -3.0, 0.0];
        let e = edge.element();
        assert_eq!(&e[..4], &[0.5; 4]);
        assert_eq!(&e[4..7], &[-3.0, 3.0, -3.0]);
        assert_eq!(e[7], 0.5);
    }

    #[test]
    fn init_is_seeded() {
        assert_eq!(EdgeElement::init(5, false, 3), EdgeElement::init(5, false, 3));
        assert_ne!(EdgeElement::init(5, false, 3), EdgeElement::init(5, false, 4));
        assert_eq!(EdgeElement::init(5, true, 0).width(), 11);
    }

    #[test]
    fn tiled_repeats_rows() {
        let edge = EdgeElement::init(1, true, 1);
        let t = edge.tiled(3);
        assert_eq!(t.shape(), &[3, 7]);
        assert_eq!(&t.data()[..7], &t.data()[14..]);
    }
}
