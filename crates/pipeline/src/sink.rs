use std::sync::{Mutex, PoisonError};

use shading::Color;

use crate::error::LifecycleError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("pixel index {index} is out of range for a sink of {count} pixels")]
    OutOfRange { index: usize, count: usize },
    #[error("sink transport failed: {0}")]
    Transport(String),
}

impl SinkError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Output device that accepts one colour per pixel index.
///
/// Writes are staged by [`set_pixel`](PixelSink::set_pixel) and become visible
/// on [`commit`](PixelSink::commit). The pipeline is the only writer and calls
/// [`release`](PixelSink::release) exactly once, after which it never touches
/// the sink again.
pub trait PixelSink: Send {
    fn pixel_count(&self) -> usize;
    fn set_pixel(&mut self, index: usize, color: Color) -> Result<(), SinkError>;
    fn commit(&mut self) -> Result<(), SinkError>;
    /// Stages black on every pixel. Takes effect on the next commit.
    fn blank_all(&mut self) -> Result<(), SinkError>;
    fn release(&mut self) -> Result<(), SinkError>;
}

impl<S: PixelSink + ?Sized> PixelSink for Box<S> {
    fn pixel_count(&self) -> usize {
        (**self).pixel_count()
    }

    fn set_pixel(&mut self, index: usize, color: Color) -> Result<(), SinkError> {
        (**self).set_pixel(index, color)
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        (**self).commit()
    }

    fn blank_all(&mut self) -> Result<(), SinkError> {
        (**self).blank_all()
    }

    fn release(&mut self) -> Result<(), SinkError> {
        (**self).release()
    }
}

/// Bounds check shared by sink implementations.
pub fn check_index(index: usize, count: usize) -> Result<(), SinkError> {
    if index < count {
        Ok(())
    } else {
        Err(SinkError::OutOfRange { index, count })
    }
}

/// Owner of the acquired sink.
///
/// The dispatch loop borrows the sink through [`SinkSlot::with`]; shutdown
/// removes it with [`SinkSlot::retire`] under the same lock, so once retired
/// no further call can reach the device.
pub(crate) struct SinkSlot<S> {
    sink: Mutex<Option<S>>,
}

impl<S> SinkSlot<S> {
    pub(crate) fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
        }
    }

    /// Runs `f` against the sink while it is still held. Returns `None` once
    /// the sink has been retired.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut guard = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_mut().map(f)
    }

    pub(crate) fn retire(&self) -> Result<S, LifecycleError> {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(LifecycleError::AlreadyReleased)
    }

    #[cfg(test)]
    pub(crate) fn is_held(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingSink {
        pixels: Vec<Color>,
        commits: usize,
    }

    impl PixelSink for CountingSink {
        fn pixel_count(&self) -> usize {
            self.pixels.len()
        }

        fn set_pixel(&mut self, index: usize, color: Color) -> Result<(), SinkError> {
            check_index(index, self.pixels.len())?;
            self.pixels[index] = color;
            Ok(())
        }

        fn commit(&mut self) -> Result<(), SinkError> {
            self.commits += 1;
            Ok(())
        }

        fn blank_all(&mut self) -> Result<(), SinkError> {
            self.pixels.fill(Color::BLACK);
            Ok(())
        }

        fn release(&mut self) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn out_of_range_writes_are_rejected() {
        let mut sink = CountingSink {
            pixels: vec![Color::BLACK; 2],
            commits: 0,
        };
        assert!(sink.set_pixel(1, Color::RED).is_ok());
        assert_eq!(
            sink.set_pixel(2, Color::RED),
            Err(SinkError::OutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn boxed_sinks_forward_every_call() {
        let mut sink: Box<dyn PixelSink> = Box::new(CountingSink {
            pixels: vec![Color::BLACK; 3],
            commits: 0,
        });
        assert_eq!(sink.pixel_count(), 3);
        sink.set_pixel(0, Color::GREEN).unwrap();
        sink.blank_all().unwrap();
        sink.commit().unwrap();
        sink.release().unwrap();
    }

    #[test]
    fn retired_slot_refuses_access() {
        let slot = SinkSlot::new(CountingSink {
            pixels: vec![Color::BLACK; 1],
            commits: 0,
        });
        assert_eq!(slot.with(|sink| sink.commit()), Some(Ok(())));
        assert!(slot.is_held());

        let sink = slot.retire().unwrap();
        assert_eq!(sink.commits, 1);
        assert!(!slot.is_held());
        assert!(slot.with(|sink| sink.commit()).is_none());
        assert!(matches!(slot.retire(), Err(LifecycleError::AlreadyReleased)));
    }

    #[test]
    fn transport_errors_render_their_cause() {
        let err = SinkError::transport("spi bus timeout");
        assert_eq!(err.to_string(), "sink transport failed: spi bus timeout");
    }
}
