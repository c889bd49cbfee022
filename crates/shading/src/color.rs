/// RGBA colour with floating point channels in `[0, 1]`.
///
/// Alpha is treated as intensity: the luminance a transport should emit is
/// `channel * alpha`, see [`Color::to_rgb8`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub const fn with_alpha(self, a: f64) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Folds alpha into the channels and quantises to 8 bits.
    ///
    /// Values are truncated, not rounded, and saturate at both ends.
    pub fn to_rgb8(self) -> [u8; 3] {
        [
            quantise(self.r, self.a),
            quantise(self.g, self.a),
            quantise(self.b, self.a),
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

fn quantise(channel: f64, alpha: f64) -> u8 {
    ((channel * alpha * 255.0) as i64).clamp(0, 255) as u8
}

/// Hue constants on the normalised `[0, 1)` hue circle.
pub mod hue {
    pub const RED: f64 = 0.0;
    pub const YELLOW: f64 = 60.0 / 360.0;
    pub const GREEN: f64 = 120.0 / 360.0;
    pub const CYAN: f64 = 180.0 / 360.0;
    pub const BLUE: f64 = 240.0 / 360.0;
    pub const MAGENTA: f64 = 300.0 / 360.0;
}

/// HSV triple used while building colours; hue wraps around `1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Hsv {
    pub const fn new(h: f64, s: f64, v: f64) -> Self {
        Self { h, s, v }
    }

    /// Six-sector conversion to an opaque [`Color`].
    pub fn to_rgba(self) -> Color {
        let h = ((self.h % 1.0) + 1.0) % 1.0;
        let c = self.v * self.s;
        let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
        let m = self.v - c;

        // Sector 6 only shows up when wrapping a tiny negative hue rounds to 1.0.
        let (r, g, b) = match (h * 6.0).floor() as i32 {
            0 | 6 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            5 => (c, 0.0, x),
            _ => (0.0, 0.0, 0.0),
        };

        Color::rgb(r + m, g + m, b + m)
    }
}
