//! Stand-in sinks for running without sculpture hardware.

use std::io::{self, Write};

use pipeline::{check_index, PixelSink, SinkError};
use serde::Serialize;
use shading::Color;
use tracing::{debug, info};

/// Accepts and drops every frame.
#[derive(Debug)]
pub struct NullSink {
    pixels: usize,
    commits: u64,
}

impl NullSink {
    pub fn new(pixels: usize) -> Self {
        Self { pixels, commits: 0 }
    }
}

impl PixelSink for NullSink {
    fn pixel_count(&self) -> usize {
        self.pixels
    }

    fn set_pixel(&mut self, index: usize, _color: Color) -> Result<(), SinkError> {
        check_index(index, self.pixels)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        self.commits += 1;
        Ok(())
    }

    fn blank_all(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn release(&mut self) -> Result<(), SinkError> {
        info!(frames = self.commits, "null sink released");
        Ok(())
    }
}

#[derive(Serialize)]
struct FrameLine<'a> {
    frame: u64,
    pixels: &'a [[u8; 3]],
}

/// Writes each committed frame as one JSON line of 8-bit RGB triples.
///
/// With a frame limit, commits past the limit are accepted but not written,
/// so scripted runs see exactly that many shaded lines. A commit that follows
/// [`blank_all`](PixelSink::blank_all) is always written.
pub struct JsonSink<W> {
    out: W,
    staged: Vec<[u8; 3]>,
    limit: Option<u64>,
    written: u64,
    blanked: bool,
}

impl<W: Write + Send> JsonSink<W> {
    pub fn new(out: W, pixels: usize, limit: Option<u64>) -> Self {
        Self {
            out,
            staged: vec![[0; 3]; pixels],
            limit,
            written: 0,
            blanked: false,
        }
    }
}

impl<W: Write + Send> PixelSink for JsonSink<W> {
    fn pixel_count(&self) -> usize {
        self.staged.len()
    }

    fn set_pixel(&mut self, index: usize, color: Color) -> Result<(), SinkError> {
        check_index(index, self.staged.len())?;
        self.staged[index] = color.to_rgb8();
        self.blanked = false;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        let at_limit = self.limit.is_some_and(|limit| self.written >= limit);
        if at_limit && !self.blanked {
            return Ok(());
        }

        let line = FrameLine {
            frame: self.written,
            pixels: &self.staged,
        };
        serde_json::to_writer(&mut self.out, &line)
            .map_err(|err| SinkError::transport(format!("failed to encode frame: {err}")))?;
        self.out
            .write_all(b"\n")
            .and_then(|()| self.out.flush())
            .map_err(io_error)?;
        self.written += 1;
        self.blanked = false;
        Ok(())
    }

    fn blank_all(&mut self) -> Result<(), SinkError> {
        self.staged.fill([0; 3]);
        self.blanked = true;
        Ok(())
    }

    fn release(&mut self) -> Result<(), SinkError> {
        debug!(frames = self.written, "json sink released");
        self.out.flush().map_err(io_error)
    }
}

fn io_error(err: io::Error) -> SinkError {
    SinkError::transport(format!("failed to write frame: {err}"))
}
