//! Concurrent shading and dispatch for the digital sun.
//!
//! Two threads share a lock-free [`FrameBuffer`]:
//!
//! ```text
//!   digisun-shade     every shade_interval:    shade all pixels ─▶ FrameBuffer
//!   digisun-dispatch  every dispatch_interval: FrameBuffer ─▶ PixelSink::commit
//! ```
//!
//! Both loops watch one [`CancelToken`]. Cancelling it, or a transport error in
//! the dispatch loop, drains the [`Pipeline`]; shutdown then blanks the sink
//! and releases it exactly once.

pub mod cancel;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod meter;
pub mod params;
pub mod runtime;
pub mod sink;

pub use cancel::CancelToken;
pub use error::{LifecycleError, PipelineError};
pub use frame::FrameBuffer;
pub use lifecycle::{Pipeline, PipelineState, PipelineStats};
pub use meter::TickMeter;
pub use params::ParameterHandle;
pub use runtime::{
    time_source_for, BoxedTimeSource, FixedTimeSource, PipelineConfig, SystemTimeSource,
    TimeSample, TimeSource,
};
pub use sink::{check_index, PixelSink, SinkError};
