//! Lock-free frame storage shared by the shading and dispatch loops.
//!
//! Each pixel is one `AtomicU64` holding the colour as four 16-bit unorm
//! channels. A single cell is always read whole, but nothing ties cells
//! together: the dispatch loop may see a frame where some pixels come from
//! the current shading tick and the rest from the previous one.

use std::sync::atomic::{AtomicU64, Ordering};

use shading::Color;

const CHANNEL_MAX: f64 = u16::MAX as f64;

pub struct FrameBuffer {
    cells: Box<[AtomicU64]>,
}

impl FrameBuffer {
    /// Creates a buffer of `len` black pixels.
    pub fn new(len: usize) -> Self {
        let blank = pack(Color::BLACK);
        let cells = (0..len).map(|_| AtomicU64::new(blank)).collect();
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Publishes one pixel. Indices past the end are ignored.
    pub fn store(&self, index: usize, color: Color) {
        if let Some(cell) = self.cells.get(index) {
            cell.store(pack(color), Ordering::Relaxed);
        }
    }

    pub fn load(&self, index: usize) -> Option<Color> {
        self.cells
            .get(index)
            .map(|cell| unpack(cell.load(Ordering::Relaxed)))
    }

    /// Current colours in index order.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.cells
            .iter()
            .map(|cell| unpack(cell.load(Ordering::Relaxed)))
    }

    pub fn snapshot(&self) -> Vec<Color> {
        self.colors().collect()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.cells.len())
            .finish()
    }
}

fn pack(color: Color) -> u64 {
    (u64::from(to_unorm(color.r)) << 48)
        | (u64::from(to_unorm(color.g)) << 32)
        | (u64::from(to_unorm(color.b)) << 16)
        | u64::from(to_unorm(color.a))
}

fn unpack(bits: u64) -> Color {
    Color::new(
        from_unorm((bits >> 48) as u16),
        from_unorm((bits >> 32) as u16),
        from_unorm((bits >> 16) as u16),
        from_unorm(bits as u16),
    )
}

fn to_unorm(channel: f64) -> u16 {
    if channel.is_nan() {
        return 0;
    }
    (channel.clamp(0.0, 1.0) * CHANNEL_MAX).round() as u16
}

fn from_unorm(value: u16) -> f64 {
    f64::from(value) / CHANNEL_MAX
}
