//! Presence latent: whether a cell-slot holds an object.

use crate::concrete::concrete_binary_pre_sigmoid_sample;
use crate::wheels::TrainingWheels;
use crate::FieldMap;
use gridair_core::{sigmoid, ConfigError, LatentField, RandomSource, ShapeError, Tensor, LOGIT_CLIP};

/// Presence builder with temperatures evaluated for the current step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresenceBuilder {
    temperature: f32,
    concrete_temperature: f32,
}

/// Presence outputs, each `[..leading, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PresenceLatent {
    /// `clip(blend(logit) / obj_temp, -10, 10)`.
    pub obj_log_odds: Tensor,
    /// `sigmoid(obj_log_odds)`.
    pub obj_prob: Tensor,
    /// Relaxed sample (noisy) or the log-odds themselves (not noisy).
    pub obj_pre_sigmoid: Tensor,
    /// `sigmoid(obj_pre_sigmoid)`, in `[0, 1]`.
    pub obj: Tensor,
}

impl PresenceBuilder {
    /// Network outputs consumed: one logit.
    pub const PARAMS: usize = 1;

    /// Both temperatures must be finite and strictly positive.
    pub fn new(temperature: f32, concrete_temperature: f32) -> Result<Self, ConfigError> {
        for (name, t) in [("obj_temp", temperature), ("obj_concrete_temp", concrete_temperature)] {
            if !t.is_finite() || t <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("temperature must be finite and > 0, got {t}"),
                });
            }
        }
        Ok(Self {
            temperature,
            concrete_temperature,
        })
    }

    /// Build presence from raw logits of shape `[..leading, 1]`.
    pub fn build(
        &self,
        logit: &Tensor,
        noise: f32,
        wheels: TrainingWheels,
        rng: &mut dyn RandomSource,
    ) -> Result<PresenceLatent, ShapeError> {
        if logit.rank() == 0 || logit.last_dim() != Self::PARAMS {
            return Err(ShapeError::InvalidSplit {
                sizes: vec![Self::PARAMS],
                axis_len: logit.last_dim(),
            });
        }
        let temp = self.temperature;
        let obj_log_odds = wheels
            .blend(logit)
            .map(|x| (x / temp).clamp(-LOGIT_CLIP, LOGIT_CLIP));
        let concrete_temp = self.concrete_temperature;
        let obj_pre_sigmoid = obj_log_odds.map(|odds| {
            let relaxed = concrete_binary_pre_sigmoid_sample(odds, concrete_temp, rng);
            noise * relaxed + (1.0 - noise) * odds
        });
        Ok(PresenceLatent {
            obj_prob: obj_log_odds.map(sigmoid),
            obj: obj_pre_sigmoid.map(sigmoid),
            obj_log_odds,
            obj_pre_sigmoid,
        })
    }
}

impl PresenceLatent {
    /// Export into `out` under the latent field names.
    pub fn into_fields(self, out: &mut FieldMap) {
        out.insert(LatentField::ObjLogOdds, self.obj_log_odds);
        out.insert(LatentField::ObjProb, self.obj_prob);
        out.insert(LatentField::ObjPreSigmoid, self.obj_pre_sigmoid);
        out.insert(LatentField::Obj, self.obj);
    }
}
