//! Injection seams: sub-networks and sampling noise.
//!
//! The grid layers and renderer never construct networks themselves.
//! They describe what they need with a [`NetworkSpec`] and ask a
//! [`NetworkFactory`] for it on first use. Stochastic sampling draws
//! from a caller-supplied [`RandomSource`], so tests can substitute a
//! fixed stream.

use crate::error::{ConfigError, LayerError};
use crate::tensor::Tensor;
use std::fmt;

/// The job a sub-network performs inside a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkRole {
    /// Box parameter lateral network.
    Box,
    /// Attribute lateral network.
    Attr,
    /// Depth lateral network.
    Z,
    /// Presence lateral network.
    Obj,
    /// Glimpse encoder.
    ObjectEncoder,
    /// Appearance decoder for one renderer flight.
    ObjectDecoder {
        /// Flight index.
        flight: usize,
    },
}

impl fmt::Display for NetworkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Box => f.write_str("box_network"),
            Self::Attr => f.write_str("attr_network"),
            Self::Z => f.write_str("z_network"),
            Self::Obj => f.write_str("obj_network"),
            Self::ObjectEncoder => f.write_str("object_encoder"),
            Self::ObjectDecoder { flight } => write!(f, "object_decoder_for_flight_{flight}"),
        }
    }
}

/// How a network treats the trailing dimensions of its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkKind {
    /// Trailing input dims are flattened and mapped to the trailing
    /// output dims independently for every leading index.
    Dense,
    /// Trailing input dims are `[H, W, C]`; output is `[H, W, C']`
    /// with the spatial extent preserved.
    SpatialConv,
}

/// Description of a network a layer needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkSpec {
    /// What the network is for.
    pub role: NetworkRole,
    /// How trailing dimensions are interpreted.
    pub kind: NetworkKind,
    /// Trailing input shape consumed per leading index.
    pub input_shape: Vec<usize>,
    /// Trailing output shape produced per leading index.
    pub output_shape: Vec<usize>,
}

impl NetworkSpec {
    /// A dense spec mapping `[in]` to `[out]`.
    pub fn dense(role: NetworkRole, input: usize, output: usize) -> Self {
        Self {
            role,
            kind: NetworkKind::Dense,
            input_shape: vec![input],
            output_shape: vec![output],
        }
    }

    /// Flat size of the trailing input.
    pub fn input_size(&self) -> usize {
        self.input_shape.iter().product()
    }

    /// Flat size of the trailing output.
    pub fn output_size(&self) -> usize {
        self.output_shape.iter().product()
    }
}

/// A forward-only sub-network.
///
/// Maps a tensor of shape `[..leading, ..input_shape]` to
/// `[..leading, ..output_shape]`, applying identical parameters to every
/// leading index ("object-wise" application).
pub trait Network: Send + 'static {
    /// Human-readable name for error reporting.
    fn name(&self) -> &str;

    /// The spec this network was built for.
    fn spec(&self) -> &NetworkSpec;

    /// Run the network.
    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError>;
}

/// Builds networks on demand.
pub trait NetworkFactory: Send + 'static {
    /// Construct a network matching `spec`.
    fn build(&self, spec: &NetworkSpec) -> Result<Box<dyn Network>, ConfigError>;
}

/// Source of sampling noise.
pub trait RandomSource {
    /// Uniform sample in the open interval `(0, 1)`.
    fn uniform(&mut self) -> f32;

    /// Standard normal sample.
    ///
    /// Default implementation uses the Box-Muller transform over two
    /// [`uniform`](Self::uniform) draws.
    fn standard_normal(&mut self) -> f32 {
        let u1 = self.uniform().max(f32::MIN_POSITIVE);
        let u2 = self.uniform();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self) -> f32 {
        (**self).uniform()
    }

    fn standard_normal(&mut self) -> f32 {
        (**self).standard_normal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Half;

    impl RandomSource for Half {
        fn uniform(&mut self) -> f32 {
            0.5
        }
    }

    #[test]
    fn role_names_match_scopes() {
        assert_eq!(NetworkRole::Box.to_string(), "box_network");
        assert_eq!(
            NetworkRole::ObjectDecoder { flight: 2 }.to_string(),
            "object_decoder_for_flight_2"
        );
    }

    #[test]
    fn default_normal_uses_box_muller() {
        let mut r = Half;
        let n = r.standard_normal();
        let expected = (-2.0f32 * 0.5f32.ln()).sqrt() * (std::f32::consts::PI).cos();
        assert!((n - expected).abs() < 1e-6);
    }

    #[test]
    fn spec_sizes_flatten() {
        let spec = NetworkSpec {
            role: NetworkRole::ObjectEncoder,
            kind: NetworkKind::Dense,
            input_shape: vec![4, 4, 3],
            output_shape: vec![8],
        };
        assert_eq!(spec.input_size(), 48);
        assert_eq!(spec.output_size(), 8);
    }
}
