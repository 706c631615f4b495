//! Test utilities and mock types for gridair development.
//!
//! Provides constant-output [`Network`]s, factories that build them (and
//! record what they were asked for), and fixed [`RandomSource`]s so that
//! layer and renderer tests are fully deterministic.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::{Arc, Mutex};

use gridair_core::{
    ConfigError, LayerError, Network, NetworkFactory, NetworkRole, NetworkSpec, RandomSource, Tensor,
};

/// A network whose every output element equals a fixed value.
///
/// Input trailing dims are checked against the spec so shape bugs in the
/// caller still surface.
pub struct ConstNetwork {
    name: String,
    spec: NetworkSpec,
    value: f32,
}

impl ConstNetwork {
    pub fn new(spec: NetworkSpec, value: f32) -> Self {
        Self {
            name: spec.role.to_string(),
            spec,
            value,
        }
    }
}

impl Network for ConstNetwork {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> &NetworkSpec {
        &self.spec
    }

    fn forward(&self, input: &Tensor) -> Result<Tensor, LayerError> {
        let shape = input.shape();
        let trailing = &self.spec.input_shape;
        if shape.len() < trailing.len() || &shape[shape.len() - trailing.len()..] != trailing.as_slice() {
            return Err(LayerError::Network {
                name: self.name.clone(),
                reason: format!("expected input ending in {trailing:?}, got {shape:?}"),
            });
        }
        let mut out = shape[..shape.len() - trailing.len()].to_vec();
        out.extend_from_slice(&self.spec.output_shape);
        Ok(Tensor::full(&out, self.value))
    }
}

/// Builds [`ConstNetwork`]s, with optional per-role output values.
#[derive(Clone, Debug, Default)]
pub struct ConstFactory {
    default: f32,
    overrides: Vec<(NetworkRole, f32)>,
}

impl ConstFactory {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    /// Every network outputs zeros.
    pub fn zeros() -> Self {
        Self::new(0.0)
    }

    /// Networks for `role` output `value` instead of the default.
    pub fn with_role(mut self, role: NetworkRole, value: f32) -> Self {
        self.overrides.retain(|(r, _)| *r != role);
        self.overrides.push((role, value));
        self
    }

    fn value_for(&self, role: NetworkRole) -> f32 {
        self.overrides
            .iter()
            .find(|(r, _)| *r == role)
            .map_or(self.default, |(_, v)| *v)
    }
}

impl NetworkFactory for ConstFactory {
    fn build(&self, spec: &NetworkSpec) -> Result<Box<dyn Network>, ConfigError> {
        Ok(Box::new(ConstNetwork::new(spec.clone(), self.value_for(spec.role))))
    }
}

/// Wraps another factory and records every spec it is asked to build.
pub struct RecordingFactory<F> {
    inner: F,
    built: Arc<Mutex<Vec<NetworkSpec>>>,
}

impl<F: NetworkFactory> RecordingFactory<F> {
    /// Returns the factory and a handle to the shared build log.
    pub fn new(inner: F) -> (Self, Arc<Mutex<Vec<NetworkSpec>>>) {
        let built = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner,
                built: Arc::clone(&built),
            },
            built,
        )
    }
}

impl<F: NetworkFactory> NetworkFactory for RecordingFactory<F> {
    fn build(&self, spec: &NetworkSpec) -> Result<Box<dyn Network>, ConfigError> {
        self.built.lock().unwrap().push(spec.clone());
        self.inner.build(spec)
    }
}

/// A random source returning the same uniform and normal draw forever.
///
/// Counts draws so tests can assert on sampling activity.
#[derive(Clone, Debug)]
pub struct FixedRandom {
    uniform: f32,
    normal: f32,
    draws: usize,
}

impl FixedRandom {
    pub fn new(uniform: f32, normal: f32) -> Self {
        Self {
            uniform,
            normal,
            draws: 0,
        }
    }

    /// Uniform 0.5 and normal 0.0: every stochastic step returns its
    /// distribution's centre.
    pub fn centred() -> Self {
        Self::new(0.5, 0.0)
    }

    /// Number of draws made so far.
    pub fn draws(&self) -> usize {
        self.draws
    }
}

impl RandomSource for FixedRandom {
    fn uniform(&mut self) -> f32 {
        self.draws += 1;
        self.uniform
    }

    fn standard_normal(&mut self) -> f32 {
        self.draws += 1;
        self.normal
    }
}
