//! Seeded network factory.

use crate::conv::ConvLateral;
use crate::mlp::Mlp;
use gridair_core::{ConfigError, Network, NetworkFactory, NetworkKind, NetworkRole, NetworkSpec};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

/// Builds [`Mlp`]s and [`ConvLateral`]s with shared hidden widths.
///
/// Each role draws its parameters from its own ChaCha stream of the
/// factory seed, so building order does not affect the result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardFactory {
    hidden: SmallVec<[usize; 4]>,
    seed: u64,
}

impl StandardFactory {
    /// Factory with the given hidden widths and seed.
    pub fn new(hidden: &[usize], seed: u64) -> Self {
        Self {
            hidden: SmallVec::from_slice(hidden),
            seed,
        }
    }

    /// Hidden widths (or channel counts for convolutional networks).
    pub fn hidden(&self) -> &[usize] {
        &self.hidden
    }

    fn stream(role: NetworkRole) -> u64 {
        match role {
            NetworkRole::Box => 1,
            NetworkRole::Attr => 2,
            NetworkRole::Z => 3,
            NetworkRole::Obj => 4,
            NetworkRole::ObjectEncoder => 5,
            NetworkRole::ObjectDecoder { flight } => 16 + flight as u64,
        }
    }

    fn rng_for(&self, spec: &NetworkSpec) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(Self::stream(spec.role));
        rng
    }
}

impl Default for StandardFactory {
    fn default() -> Self {
        Self::new(&[100, 100], 0)
    }
}

impl NetworkFactory for StandardFactory {
    fn build(&self, spec: &NetworkSpec) -> Result<Box<dyn Network>, ConfigError> {
        let mut rng = self.rng_for(spec);
        match spec.kind {
            NetworkKind::Dense => Ok(Box::new(Mlp::new(spec.clone(), &self.hidden, &mut rng))),
            NetworkKind::SpatialConv => Ok(Box::new(ConvLateral::new(
                spec.clone(),
                &self.hidden,
                &mut rng,
            )?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridair_core::Tensor;

    #[test]
    fn same_seed_builds_identical_networks() {
        let spec = NetworkSpec::dense(NetworkRole::Attr, 5, 4);
        let a = StandardFactory::new(&[8], 42).build(&spec).unwrap();
        let b = StandardFactory::new(&[8], 42).build(&spec).unwrap();
        let x = Tensor::from_fn(&[3, 5], |i| i as f32 * 0.1);
        assert_eq!(a.forward(&x).unwrap(), b.forward(&x).unwrap());
    }

    #[test]
    fn roles_use_distinct_streams() {
        let f = StandardFactory::new(&[8], 42);
        let a = f.build(&NetworkSpec::dense(NetworkRole::Box, 5, 4)).unwrap();
        let b = f.build(&NetworkSpec::dense(NetworkRole::Obj, 5, 4)).unwrap();
        let x = Tensor::ones(&[1, 5]);
        assert_ne!(a.forward(&x).unwrap(), b.forward(&x).unwrap());
    }

    #[test]
    fn builds_conv_for_spatial_specs() {
        let spec = NetworkSpec {
            role: NetworkRole::Z,
            kind: NetworkKind::SpatialConv,
            input_shape: vec![2, 2, 3],
            output_shape: vec![2, 2, 2],
        };
        let net = StandardFactory::default().build(&spec).unwrap();
        assert_eq!(net.name(), "z_network");
        assert_eq!(net.forward(&Tensor::ones(&[1, 2, 2, 3])).unwrap().shape(), &[1, 2, 2, 2]);
    }
}
