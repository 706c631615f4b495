//! Scalars that change with the global training step.

use gridair_core::ConfigError;

/// A scalar evaluated at a global step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Schedule {
    /// The same value at every step.
    Constant(f32),
    /// Linear interpolation from `start` to `end` over `steps`, then `end`.
    Linear {
        /// Value at step 0.
        start: f32,
        /// Value from `steps` onward.
        end: f32,
        /// Length of the ramp. Zero jumps straight to `end`.
        steps: u64,
    },
    /// `end + (start - end) * decay_rate^(step / decay_steps)`.
    Exponential {
        /// Value at step 0.
        start: f32,
        /// Asymptote.
        end: f32,
        /// Decay factor per `decay_steps`, in `(0, 1]`.
        decay_rate: f32,
        /// Steps per application of `decay_rate`.
        decay_steps: u64,
    },
}

impl Schedule {
    /// Value at `step`.
    pub fn value_at(&self, step: u64) -> f32 {
        match *self {
            Self::Constant(v) => v,
            Self::Linear { start, end, steps } => {
                if step >= steps {
                    end
                } else {
                    let t = step as f32 / steps as f32;
                    start + (end - start) * t
                }
            }
            Self::Exponential {
                start,
                end,
                decay_rate,
                decay_steps,
            } => {
                let t = step as f32 / decay_steps.max(1) as f32;
                end + (start - end) * decay_rate.powf(t)
            }
        }
    }

    /// Smallest and largest value the schedule can take.
    pub fn bounds(&self) -> (f32, f32) {
        match *self {
            Self::Constant(v) => (v, v),
            Self::Linear { start, end, .. } | Self::Exponential { start, end, .. } => {
                (start.min(end), start.max(end))
            }
        }
    }

    /// Reject non-finite parameters and degenerate decay settings.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let (start, end) = match *self {
            Self::Constant(v) => (v, v),
            Self::Linear { start, end, .. } | Self::Exponential { start, end, .. } => (start, end),
        };
        if !start.is_finite() || !end.is_finite() {
            return Err(ConfigError::InvalidValue {
                name,
                reason: format!("schedule values must be finite, got {self:?}"),
            });
        }
        if let Self::Exponential {
            decay_rate,
            decay_steps,
            ..
        } = *self
        {
            if !(decay_rate > 0.0 && decay_rate <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("decay_rate must be in (0, 1], got {decay_rate}"),
                });
            }
            if decay_steps == 0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: "decay_steps must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate, then require every value to lie in `[lo, hi]`.
    pub fn validate_within(&self, name: &'static str, lo: f32, hi: f32) -> Result<(), ConfigError> {
        self.validate(name)?;
        let (min, max) = self.bounds();
        if min < lo || max > hi {
            return Err(ConfigError::InvalidValue {
                name,
                reason: format!("values must lie in [{lo}, {hi}], schedule spans [{min}, {max}]"),
            });
        }
        Ok(())
    }

    /// Validate, then require every value to be strictly positive.
    pub fn validate_positive(&self, name: &'static str) -> Result<(), ConfigError> {
        self.validate(name)?;
        let (min, _) = self.bounds();
        if min <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name,
                reason: format!("must be > 0, schedule reaches {min}"),
            });
        }
        Ok(())
    }
}

impl From<f32> for Schedule {
    fn from(v: f32) -> Self {
        Self::Constant(v)
    }
}
