//! Size-preserving convolutional lateral networks.

use crate::dense::{glorot_fill, glorot_limit};
use crate::mlp::leading_dims;
use gridair_core::{ConfigError, LayerError, Network, NetworkSpec, Tensor};
use rand_chacha::ChaCha8Rng;

/// 3x3 convolution with zero padding and unit stride.
#[derive(Clone, Debug, PartialEq)]
pub struct Conv3x3 {
    inputs: usize,
    outputs: usize,
    /// `[3, 3, inputs, outputs]`, row-major.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl Conv3x3 {
    /// Glorot-uniform kernel, zero bias.
    pub fn new(inputs: usize, outputs: usize, rng: &mut ChaCha8Rng) -> Self {
        let limit = glorot_limit(9 * inputs, 9 * outputs);
        Self {
            inputs,
            outputs,
            weights: glorot_fill(rng, 9 * inputs * outputs, limit),
            bias: vec![0.0; outputs],
        }
    }

    /// Input channels.
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    /// Output channels.
    pub fn outputs(&self) -> usize {
        self.outputs
    }

    /// Convolve `n` images of `[rows, cols, inputs]` stored contiguously.
    pub fn forward_images(&self, input: &[f32], n: usize, rows: usize, cols: usize) -> Vec<f32> {
        let (ci, co) = (self.inputs, self.outputs);
        let mut out = vec![0.0f32; n * rows * cols * co];
        for img in 0..n {
            let src = &input[img * rows * cols * ci..(img + 1) * rows * cols * ci];
            let dst = &mut out[img * rows * cols * co..(img + 1) * rows * cols * co];
            for r in 0..rows {
                for c in 0..cols {
                    let y = &mut dst[(r * cols + c) * co..(r * cols + c + 1) * co];
                    y.copy_from_slice(&self.bias);
                    for kr in 0..3 {
                        let sr = r as isize + kr as isize - 1;
                        if sr < 0 || sr >= rows as isize {
                            continue;
                        }
                        for kc in 0..3 {
                            let sc = c as isize + kc as isize - 1;
                            if sc < 0 || sc >= cols as isize {
                                continue;
                            }
                            let x = &src[(sr as usize * cols + sc as usize) * ci..][..ci];
                            let k = &self.weights[(kr * 3 + kc) * ci * co..][..ci * co];
                            for (i, &xi) in x.iter().enumerate() {
                                for (yo, &w) in y.iter_mut().zip(&k[i * co..(i + 1) * co]) {
                                    *yo += xi * w;
                                }
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// Stack of [`Conv3x3`] layers with ReLU between them.
///
/// The [`NetworkSpec`] trailing shapes are `[H, W, C_in]` and `[H, W, C_out]`;
/// every leading index is an independent image.
#[derive(Clone, Debug)]
pub struct ConvLateral {
    name: String,
    spec: NetworkSpec,
    rows: usize,
    cols: usize,
    layers: Vec<Conv3x3>,
}

impl ConvLateral {
    /// Build a lateral network with the given hidden channel counts.
    pub fn new(spec: NetworkSpec, hidden: &[usize], rng: &mut ChaCha8Rng) -> Result<Self, ConfigError> {
        let (input, output) = (&spec.input_shape, &spec.output_shape);
        if input.len() != 3 || output.len() != 3 || input[..2] != output[..2] {
            return Err(ConfigError::InvalidValue {
                name: "conv network shape",
                reason: format!("expected [H, W, C] -> [H, W, C'], got {input:?} -> {output:?}"),
            });
        }
        let (rows, cols) = (input[0], input[1]);
        let mut channels = Vec::with_capacity(hidden.len() + 2);
        channels.push(input[2]);
        channels.extend_from_slice(hidden);
        channels.push(output[2]);
        let layers = channels
            .windows(2)
            .map(|c| Conv3x3::new(c[0], c[1], rng))
            .collect();
        Ok(Self {
            name: spec.role.to_string(),
            spec,
            rows,
            cols,
            layers,
        })
    }
}

impl Network for ConvLateral {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let mut shape = leading_dims(&self.name, input, &self.spec.input_shape)?;
        let n: usize = shape.iter().product();
        let last = self.layers.len().saturating_sub(1);
        let mut x = input.data().to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward_images(&x, n, self.rows, self.cols);
            if i < last {
                x.iter_mut().for_each(|v| *v = v.max(0.0));
            }
        }
        shape.extend_from_slice(&self.spec.output_shape);
        Ok(Tensor::from_vec(&shape, x)?)
    }
}
