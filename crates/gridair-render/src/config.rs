//! Renderer configuration.

use gridair_core::ConfigError;

// ── RenderConfig ───────────────────────────────────────────────────

/// Appearance logit rescaling and importance temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderConfig {
    /// Multiplier on color logits. Default: 1.
    pub color_logit_scale: f32,
    /// Multiplier on the alpha logit. Default: 1.
    pub alpha_logit_scale: f32,
    /// Added to the alpha logit after scaling. Default: 1.
    pub alpha_logit_bias: f32,
    /// Divides `alpha * z` to give compositing importance. Default: 1.
    pub importance_temp: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color_logit_scale: 1.0,
            alpha_logit_scale: 1.0,
            alpha_logit_bias: 1.0,
            importance_temp: 1.0,
        }
    }
}

impl RenderConfig {
    /// Check that every value is finite and `importance_temp > 0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [
            ("color_logit_scale", self.color_logit_scale),
            ("alpha_logit_scale", self.alpha_logit_scale),
            ("alpha_logit_bias", self.alpha_logit_bias),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("must be finite, got {v}"),
                });
            }
        }
        if !self.importance_temp.is_finite() || self.importance_temp <= 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "importance_temp",
                reason: format!("must be finite and > 0, got {}", self.importance_temp),
            });
        }
        Ok(())
    }
}

// ── Flight ─────────────────────────────────────────────────────────

/// A group of objects sharing one decoder, anchor box and sprite size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flight {
    /// Anchor box `(height, width)` in pixels.
    pub anchor_box: (f32, f32),
    /// Decoded sprite size `(rows, cols)`.
    pub object_shape: (usize, usize),
}

impl Flight {
    /// Check the anchor box is positive and the sprite non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (h, w) = self.anchor_box;
        if !(h.is_finite() && w.is_finite() && h > 0.0 && w > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "anchor_box",
                reason: format!("must be finite and > 0, got ({h}, {w})"),
            });
        }
        if self.object_shape.0 == 0 || self.object_shape.1 == 0 {
            return Err(ConfigError::ZeroSize {
                name: "object_shape",
            });
        }
        Ok(())
    }
}

// ── RenderMode ─────────────────────────────────────────────────────

/// What a render call produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Decode and composite over the background.
    #[default]
    Full,
    /// Decode only; no compositing.
    AppearanceOnly,
    /// Composite white sprites over a black background, showing only
    /// occupancy.
    MaskOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RenderConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_importance_temp() {
        for t in [0.0, -1.0, f32::NAN] {
            let cfg = RenderConfig {
                importance_temp: t,
                ..Default::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidValue { name: "importance_temp", .. })
            ));
        }
    }

    #[test]
    fn flight_rejects_empty_sprite() {
        let f = Flight {
            anchor_box: (48.0, 48.0),
            object_shape: (0, 4),
        };
        assert!(matches!(f.validate(), Err(ConfigError::ZeroSize { .. })));
    }
}
