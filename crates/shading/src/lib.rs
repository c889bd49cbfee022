//! Noise-driven shading for the digital sun sculpture.
//!
//! Everything here is pure and allocation-light so the pipeline can call it
//! for every pixel on every tick:
//!
//! ```text
//!   Topology::build() ──▶ Pixel { x, y }
//!                               │
//!   ShaderParameters ──▶ PixelShader::shade(x, y, t) ──▶ Color
//!                               │
//!                          NoiseField (gradient noise / fractal sums)
//! ```

pub mod color;
pub mod noise;
pub mod params;
pub mod shader;
pub mod topology;

pub use color::{hue, Color, Hsv};
pub use noise::{NoiseBasis, NoiseField, NoiseType};
pub use params::{HueRange, ParameterError, ShaderParameters};
pub use shader::{
    map_hue, sample_field, shape_alpha, HueSweepShader, IntensityShader, PixelShader,
    ShaderAlgorithm, ShaderKind,
};
pub use topology::{Pixel, RowSpan, Topology, SUN_PIXEL_COUNT, SUN_ROWS};
