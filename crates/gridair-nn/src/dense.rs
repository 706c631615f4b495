//! Fully connected layer.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Glorot-uniform limit for a `fan_in x fan_out` weight.
pub(crate) fn glorot_limit(fan_in: usize, fan_out: usize) -> f32 {
    (6.0 / (fan_in + fan_out).max(1) as f32).sqrt()
}

pub(crate) fn glorot_fill(rng: &mut ChaCha8Rng, len: usize, limit: f32) -> Vec<f32> {
    (0..len)
        .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * limit)
        .collect()
}

/// `y = x W + b` over rows of width `inputs`.
#[derive(Clone, Debug, PartialEq)]
pub struct Dense {
    inputs: usize,
    outputs: usize,
    /// `[inputs, outputs]`, row-major.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl Dense {
    /// Glorot-uniform weights, zero bias.
    pub fn new(inputs: usize, outputs: usize, rng: &mut ChaCha8Rng) -> Self {
        let limit = glorot_limit(inputs, outputs);
        Self {
            inputs,
            outputs,
            weights: glorot_fill(rng, inputs * outputs, limit),
            bias: vec![0.0; outputs],
        }
    }

    /// Construct from explicit parameters. Returns `None` if the lengths
    /// do not match `inputs x outputs`.
    pub fn from_parts(
        inputs: usize,
        outputs: usize,
        weights: Vec<f32>,
        bias: Vec<f32>,
    ) -> Option<Self> {
        if weights.len() != inputs * outputs || bias.len() != outputs {
            return None;
        }
        Some(Self {
            inputs,
            outputs,
            weights,
            bias,
        })
    }

    /// Input width.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Output width.
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Apply to `rows` consecutive rows of `input`.
    ///
    /// `input` must hold at least `rows * inputs` values.
    pub fn forward_rows(&self, input: &[f32], rows: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(rows * self.outputs);
        for r in 0..rows {
            let x = &input[r * self.inputs..(r + 1) * self.inputs];
            out.extend_from_slice(&self.bias);
            let y = &mut out[r * self.outputs..];
            for (i, &xi) in x.iter().enumerate() {
                if xi == 0.0 {
                    continue;
                }
                let w = &self.weights[i * self.outputs..(i + 1) * self.outputs];
                for (yo, &wo) in y.iter_mut().zip(w) {
                    *yo += xi * wo;
                }
            }
        }
        out
    }
}
