//! Physical layout of the sculpture.
//!
//! The sun is a stack of horizontal rows, narrow at the top and bottom and
//! widest through the middle. Pixels are listed row by row, left to right,
//! which is also the order the strip is wired in: index `i` in a
//! [`Topology`] is always wire position `i`.

/// One addressable light on the physical grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A row of the sculpture covering `from_x..to_x` at height `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub y: i32,
    pub from_x: i32,
    pub to_x: i32,
}

impl RowSpan {
    pub const fn new(y: i32, from_x: i32, to_x: i32) -> Self {
        Self { y, from_x, to_x }
    }

    pub fn len(&self) -> usize {
        (self.to_x - self.from_x).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

const ROW_PITCH: i32 = 8;
const ROW_OFFSET: i32 = 6;
const INSET: i32 = 5;
const LEFT: i32 = 32;
const RIGHT: i32 = 80;

const fn sun_row(row: i32, inset_steps: i32) -> RowSpan {
    RowSpan::new(
        row * ROW_PITCH + ROW_OFFSET,
        LEFT + INSET * inset_steps,
        RIGHT - INSET * inset_steps,
    )
}

/// Row geometry of the sculpture, top to bottom.
pub const SUN_ROWS: [RowSpan; 6] = [
    sun_row(0, 3),
    sun_row(1, 1),
    sun_row(2, 0),
    sun_row(3, 0),
    sun_row(4, 1),
    sun_row(5, 3),
];

/// Number of lights described by [`SUN_ROWS`].
pub const SUN_PIXEL_COUNT: usize = 208;

/// Ordered pixel list; its length is the hardware pixel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    rows: Vec<RowSpan>,
    pixels: Vec<Pixel>,
}

impl Topology {
    /// Layout of the sun sculpture.
    pub fn build() -> Self {
        Self::from_rows(&SUN_ROWS)
    }

    pub fn from_rows(rows: &[RowSpan]) -> Self {
        let pixels = rows
            .iter()
            .flat_map(|row| (row.from_x..row.to_x).map(move |x| Pixel::new(x, row.y)))
            .collect();
        Self {
            rows: rows.to_vec(),
            pixels,
        }
    }

    /// A single row of `count` pixels, handy for small test rigs.
    pub fn strip(count: usize) -> Self {
        let width = i32::try_from(count).unwrap_or(i32::MAX);
        Self::from_rows(&[RowSpan::new(0, 0, width)])
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn rows(&self) -> &[RowSpan] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<Pixel> {
        self.pixels.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sun_has_documented_pixel_count() {
        let topology = Topology::build();
        assert_eq!(topology.len(), SUN_PIXEL_COUNT);
        let from_rows: usize = SUN_ROWS.iter().map(RowSpan::len).sum();
        assert_eq!(from_rows, SUN_PIXEL_COUNT);
    }

    #[test]
    fn row_widths_form_a_lens() {
        let widths: Vec<usize> = SUN_ROWS.iter().map(RowSpan::len).collect();
        assert_eq!(widths, vec![18, 38, 48, 48, 38, 18]);
        let ys: Vec<i32> = SUN_ROWS.iter().map(|row| row.y).collect();
        assert_eq!(ys, vec![6, 14, 22, 30, 38, 46]);
    }

    #[test]
    fn rows_mirror_around_a_shared_centre() {
        let topology = Topology::build();
        let mut start = 0;
        for row in topology.rows() {
            let end = start + row.len();
            let pixels = &topology.pixels()[start..end];
            for (offset, pixel) in pixels.iter().enumerate() {
                let mirror = pixels[pixels.len() - 1 - offset];
                assert_eq!(pixel.y, row.y);
                assert_eq!(pixel.x - row.from_x, (row.to_x - 1) - mirror.x);
            }
            assert_eq!(row.from_x + row.to_x, LEFT + RIGHT);
            start = end;
        }
    }

    #[test]
    fn rows_mirror_top_to_bottom() {
        for (top, bottom) in SUN_ROWS.iter().zip(SUN_ROWS.iter().rev()) {
            assert_eq!((top.from_x, top.to_x), (bottom.from_x, bottom.to_x));
        }
    }

    #[test]
    fn index_order_follows_wiring() {
        let topology = Topology::build();
        assert_eq!(topology.get(0), Some(Pixel::new(47, 6)));
        assert_eq!(topology.get(17), Some(Pixel::new(64, 6)));
        assert_eq!(topology.get(18), Some(Pixel::new(37, 14)));
        assert_eq!(topology.get(SUN_PIXEL_COUNT - 1), Some(Pixel::new(64, 46)));
        assert_eq!(topology.get(SUN_PIXEL_COUNT), None);
    }

    #[test]
    fn custom_geometry_tables_are_honoured() {
        let rows = [RowSpan::new(0, 0, 3), RowSpan::new(1, 1, 2), RowSpan::new(2, 5, 5)];
        let topology = Topology::from_rows(&rows);
        assert_eq!(topology.len(), 4);
        assert_eq!(topology.pixels()[3], Pixel::new(1, 1));
        assert!(rows[2].is_empty());
        assert_eq!(Topology::strip(10).len(), 10);
    }
}
