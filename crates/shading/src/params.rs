use serde::{Deserialize, Serialize};

use crate::noise::NoiseType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("alpha_min ({min}) must not exceed alpha_max ({max})")]
    AlphaBounds { min: f64, max: f64 },
    #[error("fbm_octaves must be at least 1")]
    NoOctaves,
    #[error("{name} must be a finite number greater than zero (got {value})")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must be a finite, non-negative number (got {value})")]
    Negative { name: &'static str, value: f64 },
    #[error("hue_range bounds must be finite (got {min}..{max})")]
    HueRange { min: f64, max: f64 },
}

/// Span of the normalised hue circle the hue-sweep shader paints into.
///
/// When `min > max` the range wraps through the top of the circle, so
/// `300° .. 60°` covers magenta, red, orange and yellow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueRange {
    pub min: f64,
    pub max: f64,
}

impl HueRange {
    /// Palette the sculpture ships with: 169° wrapping round to 69°.
    pub const SIGNATURE: HueRange = HueRange {
        min: 169.0 / 360.0,
        max: 69.0 / 360.0,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn wraps(&self) -> bool {
        self.min > self.max
    }
}

impl Default for HueRange {
    fn default() -> Self {
        Self::SIGNATURE
    }
}

/// Immutable snapshot of everything the shaders read on a tick.
///
/// Snapshots are replaced wholesale between ticks; nothing mutates one in
/// place once the pipeline has it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderParameters {
    pub seed: i32,
    pub spatial_scale: f64,
    pub time_scale: f64,
    pub noise_type: NoiseType,
    pub alpha_power: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub fbm_octaves: u32,
    pub fbm_lacunarity: f64,
    pub fbm_gain: f64,
    pub hue_range: HueRange,
}

impl Default for ShaderParameters {
    fn default() -> Self {
        Self {
            seed: 618,
            spatial_scale: 0.05,
            time_scale: 0.124,
            noise_type: NoiseType::Perlin,
            alpha_power: 4.0,
            alpha_min: 0.0,
            alpha_max: 1.0,
            fbm_octaves: 8,
            fbm_lacunarity: 1.415,
            fbm_gain: 0.593,
            hue_range: HueRange::SIGNATURE,
        }
    }
}

impl ShaderParameters {
    /// Rejects snapshots the shaders would render degenerately.
    ///
    /// Zero spatial or time scales are accepted; they collapse the field to a
    /// constant along that axis but are otherwise harmless.
    pub fn validate(&self) -> Result<(), ParameterError> {
        non_negative("spatial_scale", self.spatial_scale)?;
        non_negative("time_scale", self.time_scale)?;
        positive("alpha_power", self.alpha_power)?;
        non_negative("alpha_min", self.alpha_min)?;
        non_negative("alpha_max", self.alpha_max)?;

        if self.alpha_min > self.alpha_max {
            return Err(ParameterError::AlphaBounds {
                min: self.alpha_min,
                max: self.alpha_max,
            });
        }

        if self.fbm_octaves == 0 {
            return Err(ParameterError::NoOctaves);
        }
        positive("fbm_lacunarity", self.fbm_lacunarity)?;
        positive("fbm_gain", self.fbm_gain)?;

        if !self.hue_range.min.is_finite() || !self.hue_range.max.is_finite() {
            return Err(ParameterError::HueRange {
                min: self.hue_range.min,
                max: self.hue_range.max,
            });
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::NotPositive { name, value })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::Negative { name, value })
    }
}
