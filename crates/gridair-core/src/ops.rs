//! Numerically guarded scalar nonlinearities.
//!
//! Every logit that reaches an exponential is first clipped to
//! `[-LOGIT_CLIP, LOGIT_CLIP]`.

/// Magnitude bound applied to logits before any exponential.
pub const LOGIT_CLIP: f32 = 10.0;

/// Clip a logit to `[-LOGIT_CLIP, LOGIT_CLIP]`.
///
/// NaN passes through unchanged.
#[inline]
pub fn clip_logit(x: f32) -> f32 {
    x.clamp(-LOGIT_CLIP, LOGIT_CLIP)
}

/// Logistic sigmoid of a clipped logit.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-clip_logit(x)).exp())
}
