//! Multi-layer perceptron applied object-wise.

use crate::dense::Dense;
use gridair_core::{ConfigError, LayerError, Network, NetworkSpec, Tensor};
use rand_chacha::ChaCha8Rng;

/// Check that `input` ends in `trailing` and return its leading dims.
pub(crate) fn leading_dims(
    name: &str,
    input: &Tensor,
    trailing: &[usize],
) -> Result<Vec<usize>, LayerError> {
    let shape = input.shape();
    if shape.len() < trailing.len() || &shape[shape.len() - trailing.len()..] != trailing {
        return Err(LayerError::Network {
            name: name.to_string(),
            reason: format!("expected input ending in {trailing:?}, got {shape:?}"),
        });
    }
    Ok(shape[..shape.len() - trailing.len()].to_vec())
}

/// Dense layers with ReLU between them.
///
/// Trailing input dims are flattened to `spec.input_size()` and the
/// result is reshaped to `spec.output_shape`; leading dims pass through.
#[derive(Clone, Debug)]
pub struct Mlp {
    name: String,
    spec: NetworkSpec,
    layers: Vec<Dense>,
}

impl Mlp {
    /// Glorot-initialized MLP with the given hidden widths.
    pub fn new(spec: NetworkSpec, hidden: &[usize], rng: &mut ChaCha8Rng) -> Self {
        let mut widths = Vec::with_capacity(hidden.len() + 2);
        widths.push(spec.input_size());
        widths.extend_from_slice(hidden);
        widths.push(spec.output_size());
        let layers = widths
            .windows(2)
            .map(|w| Dense::new(w[0], w[1], rng))
            .collect();
        Self {
            name: spec.role.to_string(),
            spec,
            layers,
        }
    }

    /// Assemble from explicit layers, checking that widths chain.
    pub fn from_layers(spec: NetworkSpec, layers: Vec<Dense>) -> Result<Self, ConfigError> {
        let mut width = spec.input_size();
        for layer in &layers {
            if layer.inputs() != width {
                return Err(ConfigError::InvalidValue {
                    name: "mlp layers",
                    reason: format!("layer expects {} inputs, previous width is {width}", layer.inputs()),
                });
            }
            width = layer.outputs();
        }
        if width != spec.output_size() || layers.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "mlp layers",
                reason: format!("final width {width} does not match output size {}", spec.output_size()),
            });
        }
        Ok(Self {
            name: spec.role.to_string(),
            spec,
            layers,
        })
    }

    /// Number of dense layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }
}

impl Network for Mlp {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let mut shape = leading_dims(&self.name, input, &self.spec.input_shape)?;
        let rows: usize = shape.iter().product();
        let last = self.layers.len().saturating_sub(1);
        let mut x = input.data().to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward_rows(&x, rows);
            if i < last {
                x.iter_mut().for_each(|v| *v = v.max(0.0));
            }
        }
        shape.extend_from_slice(&self.spec.output_shape);
        Ok(Tensor::from_vec(&shape, x)?)
    }
}
