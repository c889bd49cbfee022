//! Lattice gradient noise and fractal sums built on top of it.
//!
//! The lattice is Ken Perlin's improved noise: a fixed 256-entry permutation
//! duplicated to 512 entries so corner hashing never needs to wrap. Seeds do
//! not reshuffle the table; they shift the sampling position by a large
//! per-axis offset, so every seed reads a different region of one shared
//! field.

use serde::{Deserialize, Serialize};

const PERMUTATION: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

/// Per-axis distance the sampling position moves for each unit of seed.
const SEED_OFFSET: [f64; 3] = [123.456, 234.567, 345.678];

/// Noise flavour selected by [`crate::ShaderParameters::noise_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseType {
    /// A single octave of smooth gradient noise.
    #[default]
    Perlin,
    /// Fractal sum of smooth gradient noise.
    FbmPerlin,
    /// Fractal sum of linearly interpolated gradient noise.
    FbmPerlinLinear,
}

impl NoiseType {
    pub fn as_str(self) -> &'static str {
        match self {
            NoiseType::Perlin => "perlin",
            NoiseType::FbmPerlin => "fbm-perlin",
            NoiseType::FbmPerlinLinear => "fbm-perlin-linear",
        }
    }
}

impl std::fmt::Display for NoiseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpolation used between lattice corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseBasis {
    /// Quintic fade `6t^5 - 15t^4 + 10t^3`.
    Smooth,
    /// Raw fractional offset, which leaves visible creases along cell faces.
    Linear,
}

/// Deterministic 3-D gradient noise sampler.
#[derive(Clone)]
pub struct NoiseField {
    perm: [u8; 512],
}

impl NoiseField {
    pub fn new() -> Self {
        let mut perm = [0u8; 512];
        for (index, slot) in perm.iter_mut().enumerate() {
            *slot = PERMUTATION[index & 255];
        }
        Self { perm }
    }

    /// Smooth gradient noise in `[-1, 1]`.
    pub fn sample3d(&self, seed: i32, x: f64, y: f64, z: f64) -> f64 {
        self.lattice(NoiseBasis::Smooth, seed, x, y, z)
    }

    /// Same lattice as [`Self::sample3d`] with linear corner weights.
    pub fn sample_linear3d(&self, seed: i32, x: f64, y: f64, z: f64) -> f64 {
        self.lattice(NoiseBasis::Linear, seed, x, y, z)
    }

    /// Fractal sum normalised by the total amplitude actually accumulated.
    ///
    /// Amplitude and frequency both start at one; each octave multiplies the
    /// amplitude by `gain` and the frequency by `lacunarity`. Dividing by the
    /// amplitude sum keeps the result in `[-1, 1]` for any octave count, and a
    /// single octave reproduces the base sample exactly. Zero octaves are
    /// treated as one; a non-positive amplitude sum (only reachable with a
    /// negative gain) yields `0.0`.
    #[allow(clippy::too_many_arguments)]
    pub fn fractal_sum(
        &self,
        seed: i32,
        x: f64,
        y: f64,
        z: f64,
        octaves: u32,
        lacunarity: f64,
        gain: f64,
        basis: NoiseBasis,
    ) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;
        let mut amplitude_sum = 0.0;

        for _ in 0..octaves.max(1) {
            let sample =
                self.lattice(basis, seed, x * frequency, y * frequency, z * frequency);
            total += sample * amplitude;
            amplitude_sum += amplitude;
            amplitude *= gain;
            frequency *= lacunarity;
        }

        if amplitude_sum <= 0.0 || amplitude_sum.is_nan() {
            return 0.0;
        }
        (total / amplitude_sum).clamp(-1.0, 1.0)
    }

    fn lattice(&self, basis: NoiseBasis, seed: i32, x: f64, y: f64, z: f64) -> f64 {
        let seed = f64::from(seed);
        let (xi, xf) = split_cell(x + seed * SEED_OFFSET[0]);
        let (yi, yf) = split_cell(y + seed * SEED_OFFSET[1]);
        let (zi, zf) = split_cell(z + seed * SEED_OFFSET[2]);

        let (u, v, w) = match basis {
            NoiseBasis::Smooth => (fade(xf), fade(yf), fade(zf)),
            NoiseBasis::Linear => (xf, yf, zf),
        };

        let p = &self.perm;
        let a = p[xi] as usize + yi;
        let aa = p[a] as usize + zi;
        let ab = p[a + 1] as usize + zi;
        let b = p[xi + 1] as usize + yi;
        let ba = p[b] as usize + zi;
        let bb = p[b + 1] as usize + zi;

        let x1 = lerp(grad(p[aa], xf, yf, zf), grad(p[ba], xf - 1.0, yf, zf), u);
        let x2 = lerp(
            grad(p[ab], xf, yf - 1.0, zf),
            grad(p[bb], xf - 1.0, yf - 1.0, zf),
            u,
        );
        let y1 = lerp(x1, x2, v);

        let x1 = lerp(
            grad(p[aa + 1], xf, yf, zf - 1.0),
            grad(p[ba + 1], xf - 1.0, yf, zf - 1.0),
            u,
        );
        let x2 = lerp(
            grad(p[ab + 1], xf, yf - 1.0, zf - 1.0),
            grad(p[bb + 1], xf - 1.0, yf - 1.0, zf - 1.0),
            u,
        );
        let y2 = lerp(x1, x2, v);

        lerp(y1, y2, w).clamp(-1.0, 1.0)
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField").finish_non_exhaustive()
    }
}

/// Splits a coordinate into its wrapped lattice cell and the offset inside it.
fn split_cell(value: f64) -> (usize, f64) {
    let floor = value.floor();
    ((floor as i64 & 255) as usize, value - floor)
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Dot product with one of 12 edge directions picked by the low four hash bits.
fn grad(hash: u8, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn random_point(rng: &mut StdRng) -> (i32, f64, f64, f64) {
        (
            rng.gen_range(-10_000..10_000),
            rng.gen_range(-500.0..500.0),
            rng.gen_range(-500.0..500.0),
            rng.gen_range(-500.0..500.0),
        )
    }

    #[test]
    fn samples_stay_within_unit_interval() {
        let field = NoiseField::new();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20_000 {
            let (seed, x, y, z) = random_point(&mut rng);
            let smooth = field.sample3d(seed, x, y, z);
            let linear = field.sample_linear3d(seed, x, y, z);
            assert!((-1.0..=1.0).contains(&smooth), "smooth {smooth} out of range");
            assert!((-1.0..=1.0).contains(&linear), "linear {linear} out of range");
        }
    }

    #[test]
    fn identical_arguments_give_identical_bits() {
        let first = NoiseField::new();
        let second = NoiseField::new();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..1_000 {
            let (seed, x, y, z) = random_point(&mut rng);
            assert_eq!(
                first.sample3d(seed, x, y, z).to_bits(),
                second.sample3d(seed, x, y, z).to_bits()
            );
            assert_eq!(
                first.sample_linear3d(seed, x, y, z).to_bits(),
                second.sample_linear3d(seed, x, y, z).to_bits()
            );
        }
    }

    #[test]
    fn lattice_points_are_zero() {
        let field = NoiseField::new();
        assert_eq!(field.sample3d(0, 3.0, 5.0, 7.0), 0.0);
        assert_eq!(field.sample_linear3d(0, -2.0, 9.0, 0.0), 0.0);
    }

    #[test]
    fn seeds_shift_the_sampling_window() {
        let field = NoiseField::new();
        let shifted = field.sample3d(
            0,
            0.3 + SEED_OFFSET[0],
            0.6 + SEED_OFFSET[1],
            0.9 + SEED_OFFSET[2],
        );
        assert_eq!(field.sample3d(1, 0.3, 0.6, 0.9), shifted);
    }

    #[test]
    fn single_octave_reduces_to_base_sample() {
        let field = NoiseField::new();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..1_000 {
            let (seed, x, y, z) = random_point(&mut rng);
            let lacunarity = rng.gen_range(0.5..4.0);
            let gain = rng.gen_range(0.1..1.0);
            assert_eq!(
                field.fractal_sum(seed, x, y, z, 1, lacunarity, gain, NoiseBasis::Smooth),
                field.sample3d(seed, x, y, z)
            );
            assert_eq!(
                field.fractal_sum(seed, x, y, z, 1, lacunarity, gain, NoiseBasis::Linear),
                field.sample_linear3d(seed, x, y, z)
            );
        }
    }

    #[test]
    fn fractal_sum_is_bounded_for_any_octave_count() {
        let field = NoiseField::new();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..2_000 {
            let (seed, x, y, z) = random_point(&mut rng);
            let octaves = rng.gen_range(1..12);
            let gain = rng.gen_range(0.05..2.0);
            let value = field.fractal_sum(seed, x, y, z, octaves, 1.415, gain, NoiseBasis::Smooth);
            assert!((-1.0..=1.0).contains(&value), "fbm {value} out of range");
        }
    }

    #[test]
    fn zero_octaves_behave_like_one() {
        let field = NoiseField::new();
        assert_eq!(
            field.fractal_sum(618, 1.3, 2.7, 0.4, 0, 2.0, 0.5, NoiseBasis::Smooth),
            field.sample3d(618, 1.3, 2.7, 0.4)
        );
    }

    #[test]
    fn cancelling_amplitudes_yield_zero() {
        let field = NoiseField::new();
        let value = field.fractal_sum(618, 1.3, 2.7, 0.4, 2, 2.0, -1.0, NoiseBasis::Smooth);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn gradient_table_matches_edge_directions() {
        assert_eq!(grad(0, 1.0, 2.0, 3.0), 3.0);
        assert_eq!(grad(3, 1.0, 2.0, 3.0), -3.0);
        assert_eq!(grad(4, 1.0, 2.0, 3.0), 4.0);
        assert_eq!(grad(12, 1.0, 2.0, 3.0), 3.0);
        assert_eq!(grad(13, 1.0, 2.0, 3.0), 1.0);
        assert_eq!(grad(14, 1.0, 2.0, 3.0), 1.0);
        // only the low nibble matters
        assert_eq!(grad(0xF4, 1.0, 2.0, 3.0), grad(4, 1.0, 2.0, 3.0));
    }

    #[test]
    fn fade_hits_endpoints_and_midpoint() {
        assert_eq!(fade(0.0), 0.0);
        assert_eq!(fade(1.0), 1.0);
        assert!((fade(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn non_finite_input_does_not_panic() {
        let field = NoiseField::new();
        let _ = field.sample3d(0, f64::NAN, 0.0, 0.0);
        let _ = field.sample_linear3d(0, f64::INFINITY, 0.0, f64::NEG_INFINITY);
    }
}
