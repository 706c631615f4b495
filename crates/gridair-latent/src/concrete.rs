//! Concrete (Gumbel-sigmoid) relaxation of a Bernoulli.

use gridair_core::RandomSource;

/// Pre-sigmoid sample of a binary Concrete distribution.
///
/// `(log_odds + ln u - ln(1 - u)) / temperature` with `u ~ U(0, 1)`.
/// `sigmoid` of the result is a relaxed Bernoulli sample; lower
/// temperatures push it towards `{0, 1}`.
pub fn concrete_binary_pre_sigmoid_sample(
    log_odds: f32,
    temperature: f32,
    rng: &mut dyn RandomSource,
) -> f32 {
    let u = rng.uniform().clamp(f32::EPSILON, 1.0 - f32::EPSILON);
    let logistic = u.ln() - (1.0 - u).ln();
    (log_odds + logistic) / temperature
}
