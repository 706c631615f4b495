//! Train/eval noise switch and the bounded std nonlinearity.

use gridair_core::sigmoid;

/// Whether sampling is stochastic, separately for training and
/// evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoiseSwitch {
    /// Stochastic sampling while training.
    pub noisy: bool,
    /// Stochastic sampling while evaluating.
    pub eval_noisy: bool,
}

impl Default for NoiseSwitch {
    fn default() -> Self {
        Self {
            noisy: true,
            eval_noisy: true,
        }
    }
}

impl NoiseSwitch {
    /// Noise level in `{0, 1}`: the `is_training`-weighted blend of the
    /// two flags.
    pub fn level(&self, is_training: bool) -> f32 {
        let t = if is_training { 1.0 } else { 0.0 };
        let noisy = f32::from(u8::from(self.noisy));
        let eval_noisy = f32::from(u8::from(self.eval_noisy));
        t * noisy + (1.0 - t) * eval_noisy
    }
}

/// Map a std logit to a standard deviation in `[0, 2]`.
///
/// `noise * 2 * sigmoid(clip(x))`: with `noise == 0` the std is exactly
/// zero and sampling returns the mean.
#[inline]
pub fn std_nonlinearity(std_logit: f32, noise: f32) -> f32 {
    noise * 2.0 * sigmoid(std_logit)
}
