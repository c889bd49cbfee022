//! Pixel shading policies.
//!
//! Both shaders are pure: the same pixel, time and parameter snapshot always
//! produce the same colour. They never fail; out-of-range intermediate values
//! are clamped rather than reported.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{Color, Hsv};
use crate::noise::{NoiseBasis, NoiseField, NoiseType};
use crate::params::{HueRange, ShaderParameters};

/// Anything that turns a pixel position and a time into a colour.
pub trait PixelShader: Send + Sync {
    fn shade(&self, x: i32, y: i32, t: f64, params: &ShaderParameters) -> Color;
}

/// Samples the field selected by `params.noise_type` at an already scaled position.
pub fn sample_field(
    noise: &NoiseField,
    params: &ShaderParameters,
    x: f64,
    y: f64,
    z: f64,
) -> f64 {
    match params.noise_type {
        NoiseType::Perlin => noise.sample3d(params.seed, x, y, z),
        NoiseType::FbmPerlin => noise.fractal_sum(
            params.seed,
            x,
            y,
            z,
            params.fbm_octaves,
            params.fbm_lacunarity,
            params.fbm_gain,
            NoiseBasis::Smooth,
        ),
        NoiseType::FbmPerlinLinear => noise.fractal_sum(
            params.seed,
            x,
            y,
            z,
            params.fbm_octaves,
            params.fbm_lacunarity,
            params.fbm_gain,
            NoiseBasis::Linear,
        ),
    }
}

/// Response curve shared by alpha and value: `((n + 1) / 2) ^ power`, clamped
/// to `[alpha_min, alpha_max]`.
///
/// The clamp is written as `max` then `min` so inverted bounds degrade to
/// `alpha_max` instead of panicking.
pub fn shape_alpha(noise: f64, params: &ShaderParameters) -> f64 {
    ((noise + 1.0) / 2.0)
        .powf(params.alpha_power)
        .max(params.alpha_min)
        .min(params.alpha_max)
}

/// Maps normalised hue noise in `[0, 1]` into `range`.
///
/// A wrapping range is split at `0.5`: the lower half sweeps `min -> 1.0`, the
/// upper half sweeps `0.0 -> max`. The two halves have different slopes
/// whenever `1 - min != max`. A lower-half result that rounds up to `1.0`
/// lands on `0.0`, the same point on the hue circle.
pub fn map_hue(norm: f64, range: HueRange) -> f64 {
    if range.wraps() {
        if norm < 0.5 {
            let hue = range.min + norm * 2.0 * (1.0 - range.min);
            if hue < 1.0 {
                hue
            } else {
                0.0
            }
        } else {
            (norm - 0.5) * 2.0 * range.max
        }
    } else {
        range.min + norm * (range.max - range.min)
    }
}

/// Solid red whose alpha follows the noise field.
#[derive(Debug, Clone, Default)]
pub struct IntensityShader {
    noise: NoiseField,
}

impl IntensityShader {
    pub fn new(noise: NoiseField) -> Self {
        Self { noise }
    }
}

impl PixelShader for IntensityShader {
    fn shade(&self, x: i32, y: i32, t: f64, params: &ShaderParameters) -> Color {
        let noise = sample_field(
            &self.noise,
            params,
            f64::from(x) * params.spatial_scale,
            f64::from(y) * params.spatial_scale,
            t * params.time_scale,
        );
        Color::RED.with_alpha(shape_alpha(noise, params))
    }
}

/// Fully saturated colour whose hue and brightness both follow the field.
///
/// Value noise is read from the same lattice as hue noise, shifted by
/// `value_offset` on every axis before scaling. With the default offset of
/// zero the two are identical, so brighter pixels always sit at the same end
/// of the hue range.
#[derive(Debug, Clone, Default)]
pub struct HueSweepShader {
    noise: NoiseField,
    value_offset: f64,
}

impl HueSweepShader {
    pub fn new(noise: NoiseField) -> Self {
        Self {
            noise,
            value_offset: 0.0,
        }
    }

    pub fn with_value_offset(mut self, offset: f64) -> Self {
        self.value_offset = offset;
        self
    }

    pub fn value_offset(&self) -> f64 {
        self.value_offset
    }
}

impl PixelShader for HueSweepShader {
    fn shade(&self, x: i32, y: i32, t: f64, params: &ShaderParameters) -> Color {
        let x = f64::from(x);
        let y = f64::from(y);
        let scale = params.spatial_scale;

        let hue_noise = sample_field(
            &self.noise,
            params,
            x * scale,
            y * scale,
            t * params.time_scale,
        );
        let offset = self.value_offset;
        let value_noise = if offset == 0.0 {
            hue_noise
        } else {
            sample_field(
                &self.noise,
                params,
                (x + offset) * scale,
                (y + offset) * scale,
                (t + offset) * params.time_scale,
            )
        };

        let hue = map_hue((hue_noise + 1.0) / 2.0, params.hue_range);
        let value = shape_alpha(value_noise, params);
        Hsv::new(hue, 1.0, value).to_rgba()
    }
}

/// Name-level choice of shading policy, fixed for the lifetime of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderKind {
    /// [`IntensityShader`].
    Red,
    /// [`HueSweepShader`].
    #[default]
    Warm,
}

impl ShaderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderKind::Red => "red",
            ShaderKind::Warm => "warm",
        }
    }

    /// Builds the policy. `value_offset` only affects the warm shader.
    pub fn build(self, noise: NoiseField, value_offset: f64) -> ShaderAlgorithm {
        match self {
            ShaderKind::Red => ShaderAlgorithm::Intensity(IntensityShader::new(noise)),
            ShaderKind::Warm => ShaderAlgorithm::HueSweep(
                HueSweepShader::new(noise).with_value_offset(value_offset),
            ),
        }
    }
}

impl fmt::Display for ShaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShaderKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("shader name must not be empty".to_string());
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "red" | "intensity" => Ok(ShaderKind::Red),
            "warm" | "hue" | "hue-sweep" => Ok(ShaderKind::Warm),
            other => Err(format!("unknown shader '{other}'; expected red or warm")),
        }
    }
}

/// The two shading policies behind one type.
#[derive(Debug, Clone)]
pub enum ShaderAlgorithm {
    Intensity(IntensityShader),
    HueSweep(HueSweepShader),
}

impl ShaderAlgorithm {
    pub fn kind(&self) -> ShaderKind {
        match self {
            ShaderAlgorithm::Intensity(_) => ShaderKind::Red,
            ShaderAlgorithm::HueSweep(_) => ShaderKind::Warm,
        }
    }
}

impl PixelShader for ShaderAlgorithm {
    fn shade(&self, x: i32, y: i32, t: f64, params: &ShaderParameters) -> Color {
        match self {
            ShaderAlgorithm::Intensity(shader) => shader.shade(x, y, t, params),
            ShaderAlgorithm::HueSweep(shader) => shader.shade(x, y, t, params),
        }
    }
}
