use std::time::{Duration, Instant};

/// Cadence and shutdown timings for the two pipeline loops.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Pause between shading ticks.
    pub shade_interval: Duration,
    /// Pause between dispatch ticks. Zero means dispatch as fast as the sink
    /// accepts frames.
    pub dispatch_interval: Duration,
    /// How long shutdown waits for in-flight ticks before blanking the sink.
    pub shutdown_grace: Duration,
    /// Log loop throughput every this many ticks; zero disables reporting.
    pub report_every: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            shade_interval: Duration::from_millis(2),
            dispatch_interval: Duration::from_millis(10),
            shutdown_grace: Duration::from_millis(150),
            report_every: 1000,
        }
    }
}

/// Snapshot of the clock handed to one shading tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f64,
}

impl TimeSample {
    pub fn new(seconds: f64) -> Self {
        Self { seconds }
    }
}

/// Abstraction over where shading time comes from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces the time for the next shading tick.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Creates a system time source that starts counting now.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
    }

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.origin.elapsed().as_secs_f64())
    }
}

/// Time source that always reports the same timestamp, freezing the frame.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f64,
}

impl FixedTimeSource {
    pub fn new(time: f64) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time)
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Picks the clock for a run: frozen at `still` seconds, or wall-clock time.
pub fn time_source_for(still: Option<f64>) -> BoxedTimeSource {
    match still {
        Some(time) => Box::new(FixedTimeSource::new(time)),
        None => Box::new(SystemTimeSource::new()),
    }
}
