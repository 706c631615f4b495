//! Training-wheels interpolation between a constant and a live value.

use gridair_core::{ConfigError, Tensor};

/// Blend weight `tw` in `[0, 1]`.
///
/// `blend(x) = tw * detach(x) + (1 - tw) * x`. The forward value is `x`;
/// only the `(1 - tw)` share, [`live_fraction`](Self::live_fraction),
/// carries gradient for a trainer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingWheels(f32);

impl TrainingWheels {
    /// Fully live: no stop-gradient share.
    pub const OFF: Self = Self(0.0);

    /// Construct, rejecting values outside `[0, 1]`.
    pub fn new(value: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::InvalidValue {
                name: "training_wheels",
                reason: format!("must be in [0, 1], got {value}"),
            });
        }
        Ok(Self(value))
    }

    /// The blend weight.
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Share of the blend that is not gradient-stopped.
    pub fn live_fraction(&self) -> f32 {
        1.0 - self.0
    }

    /// Apply the blend elementwise.
    pub fn blend(&self, x: &Tensor) -> Tensor {
        let constant = x.detach();
        let tw = self.0;
        let mut out = constant;
        for (o, &live) in out.data_mut().iter_mut().zip(x.data()) {
            *o = tw * *o + (1.0 - tw) * live;
        }
        out
    }
}

impl Default for TrainingWheels {
    fn default() -> Self {
        Self::OFF
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(TrainingWheels::new(-0.1).is_err());
        assert!(TrainingWheels::new(1.1).is_err());
        assert!(TrainingWheels::new(f32::NAN).is_err());
    }

    #[test]
    fn blend_preserves_forward_value() {
        let x = Tensor::from_vec(&[3], vec![-2.0, 0.5, 4.0]).unwrap();
        for tw in [0.0, 0.25, 1.0] {
            let y = TrainingWheels::new(tw).unwrap().blend(&x);
            for (a, b) in y.data().iter().zip(x.data()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn live_fraction_complements_weight() {
        assert_eq!(TrainingWheels::new(0.25).unwrap().live_fraction(), 0.75);
        assert_eq!(TrainingWheels::OFF.live_fraction(), 1.0);
    }
}
