use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use shading::{Color, PixelShader, Topology};
use tracing::{debug, error, info, trace, warn};

use crate::cancel::CancelToken;
use crate::error::PipelineError;
use crate::frame::FrameBuffer;
use crate::meter::TickMeter;
use crate::params::ParameterHandle;
use crate::runtime::{BoxedTimeSource, PipelineConfig};
use crate::sink::{PixelSink, SinkError, SinkSlot};

const SHADE_THREAD: &str = "digisun-shade";
const DISPATCH_THREAD: &str = "digisun-dispatch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Starting = 0,
    Running = 1,
    Draining = 2,
    Closed = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Closed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tick counters for both loops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub shade_ticks: u64,
    pub dispatch_ticks: u64,
}

struct Shared<S> {
    state: AtomicU8,
    token: CancelToken,
    frame: FrameBuffer,
    sink: SinkSlot<S>,
    failure: Mutex<Option<SinkError>>,
    shade_ticks: AtomicU64,
    dispatch_ticks: AtomicU64,
}

impl<S> Shared<S> {
    fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn advance(&self, from: PipelineState, to: PipelineState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn begin_draining(&self) -> bool {
        self.advance(PipelineState::Running, PipelineState::Draining)
            || self.advance(PipelineState::Starting, PipelineState::Draining)
    }

    fn fail(&self, err: SinkError) {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(err);
        if self.begin_draining() {
            info!(state = %PipelineState::Draining, "pipeline state changed");
        }
        self.token.cancel();
    }

    fn stats(&self) -> PipelineStats {
        PipelineStats {
            shade_ticks: self.shade_ticks.load(Ordering::Acquire),
            dispatch_ticks: self.dispatch_ticks.load(Ordering::Acquire),
        }
    }
}

/// Reports a loop's exit to shutdown, including exits by panic.
struct ExitNotice {
    stage: &'static str,
    tx: Sender<&'static str>,
}

impl Drop for ExitNotice {
    fn drop(&mut self) {
        let _ = self.tx.send(self.stage);
    }
}

/// Running shading and dispatch loops around one acquired sink.
///
/// ```text
///   time source ─▶ shade loop ─▶ FrameBuffer ─▶ dispatch loop ─▶ PixelSink
///                      ▲                              │
///               ParameterHandle              CancelToken ◀─ shutdown / failure
/// ```
///
/// The sink is released exactly once, by [`Pipeline::shutdown`], after it
/// has been blanked. Dropping the pipeline shuts it down.
pub struct Pipeline<S: PixelSink + 'static> {
    shared: Arc<Shared<S>>,
    params: ParameterHandle,
    config: PipelineConfig,
    exits: Receiver<&'static str>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: Mutex<bool>,
}

impl<S: PixelSink + 'static> Pipeline<S> {
    /// Acquires the sink and launches both loops.
    ///
    /// A failed acquisition surfaces as [`PipelineError::Transport`] before
    /// any thread exists. A sink whose pixel count differs from the topology
    /// is released again and reported as [`PipelineError::SizeMismatch`].
    pub fn start<Sh, F>(
        config: PipelineConfig,
        topology: Topology,
        shader: Sh,
        params: ParameterHandle,
        time: BoxedTimeSource,
        acquire: F,
    ) -> Result<Self, PipelineError>
    where
        Sh: PixelShader + 'static,
        F: FnOnce() -> Result<S, SinkError>,
    {
        let mut sink = acquire()?;
        let pixels = topology.len();
        if sink.pixel_count() != pixels {
            let mismatch = PipelineError::SizeMismatch {
                topology: pixels,
                sink: sink.pixel_count(),
            };
            if let Err(err) = sink.release() {
                warn!(%err, "failed to release mismatched sink");
            }
            return Err(mismatch);
        }

        let shared = Arc::new(Shared {
            state: AtomicU8::new(PipelineState::Starting as u8),
            token: CancelToken::new(),
            frame: FrameBuffer::new(pixels),
            sink: SinkSlot::new(sink),
            failure: Mutex::new(None),
            shade_ticks: AtomicU64::new(0),
            dispatch_ticks: AtomicU64::new(0),
        });
        info!(pixels, state = %PipelineState::Starting, "pipeline state changed");

        let (exit_tx, exits) = unbounded();
        let pipeline = Self {
            shared: Arc::clone(&shared),
            params: params.clone(),
            config: config.clone(),
            exits,
            workers: Mutex::new(Vec::with_capacity(2)),
            closed: Mutex::new(false),
        };

        let shade_notice = ExitNotice {
            stage: "shade",
            tx: exit_tx.clone(),
        };
        let dispatch_notice = ExitNotice {
            stage: "dispatch",
            tx: exit_tx,
        };

        let spawned = {
            let shared = Arc::clone(&shared);
            let interval = config.shade_interval;
            let report_every = config.report_every;
            pipeline.spawn_worker(SHADE_THREAD, move || {
                let _notice = shade_notice;
                shade_loop(
                    &shared,
                    &topology,
                    &shader,
                    &params,
                    time,
                    interval,
                    report_every,
                );
            })
        }
        .and_then(|()| {
            let shared = Arc::clone(&shared);
            let interval = config.dispatch_interval;
            let report_every = config.report_every;
            pipeline.spawn_worker(DISPATCH_THREAD, move || {
                let _notice = dispatch_notice;
                dispatch_loop(&shared, interval, report_every);
            })
        });

        if let Err(err) = spawned {
            pipeline.shutdown();
            return Err(err);
        }

        if shared.advance(PipelineState::Starting, PipelineState::Running) {
            info!(state = %PipelineState::Running, "pipeline state changed");
        }
        Ok(pipeline)
    }

    fn spawn_worker<F>(&self, name: &str, body: F) -> Result<(), PipelineError>
    where
        F: FnOnce() + Send + 'static,
    {
        // A closure that fails to spawn is dropped, which sends its exit notice.
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(body)
            .map_err(|err| {
                error!(thread = name, %err, "failed to spawn pipeline thread");
                PipelineError::Spawn(format!("{name} thread: {err}"))
            })?;
        self.workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(())
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    pub fn stats(&self) -> PipelineStats {
        self.shared.stats()
    }

    /// Token the loops observe. Cancelling it makes [`Pipeline::wait`] return.
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.token.clone()
    }

    pub fn params(&self) -> &ParameterHandle {
        &self.params
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pixel_count(&self) -> usize {
        self.shared.frame.len()
    }

    /// Most recently shaded colours, possibly from two adjacent ticks.
    pub fn frame_snapshot(&self) -> Vec<Color> {
        self.shared.frame.snapshot()
    }

    /// The dispatch failure that drained the pipeline, if any.
    pub fn failure(&self) -> Option<SinkError> {
        self.shared
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until the token is cancelled, then shuts down.
    pub fn wait(&self) -> Result<(), PipelineError> {
        self.shared.token.wait();
        self.shutdown();
        match self.failure() {
            Some(err) => Err(PipelineError::Transport(err)),
            None => Ok(()),
        }
    }

    /// Stops both loops, blanks the sink and releases it.
    ///
    /// Safe to call any number of times from any thread; only the first call
    /// does the work and later calls return once it has finished.
    pub fn shutdown(&self) {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            trace!("pipeline already closed");
            return;
        }

        if self.shared.begin_draining() {
            info!(state = %PipelineState::Draining, "pipeline state changed");
        }
        self.shared.token.cancel();

        let exited = self.await_exits();
        let workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if exited {
            for worker in workers {
                if worker.join().is_err() {
                    warn!("pipeline loop panicked");
                }
            }
        } else {
            warn!(
                grace = ?self.config.shutdown_grace,
                "pipeline loops still busy after grace period; detaching"
            );
        }

        match self.shared.sink.retire() {
            Ok(mut sink) => blank_and_release(&mut sink),
            Err(err) => trace!(%err, "skipping sink release"),
        }

        self.shared
            .state
            .store(PipelineState::Closed as u8, Ordering::SeqCst);
        *closed = true;
        let stats = self.shared.stats();
        info!(
            state = %PipelineState::Closed,
            shade_ticks = stats.shade_ticks,
            dispatch_ticks = stats.dispatch_ticks,
            "pipeline state changed"
        );
    }

    /// Waits up to the grace period for every loop to report its exit.
    fn await_exits(&self) -> bool {
        let deadline = Instant::now() + self.config.shutdown_grace;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.exits.recv_timeout(remaining) {
                Ok(stage) => debug!(stage, "pipeline loop exited"),
                Err(RecvTimeoutError::Disconnected) => return true,
                Err(RecvTimeoutError::Timeout) => return false,
            }
        }
    }
}

impl<S: PixelSink + 'static> Drop for Pipeline<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<S: PixelSink + 'static> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .field("pixels", &self.pixel_count())
            .finish()
    }
}

fn blank_and_release<S: PixelSink>(sink: &mut S) {
    debug!("blanking sink");
    if let Err(err) = sink.blank_all().and_then(|()| sink.commit()) {
        warn!(%err, "failed to blank sink during shutdown");
    }
    debug!("releasing sink");
    if let Err(err) = sink.release() {
        warn!(%err, "failed to release sink");
    }
}

fn shade_loop<S, Sh: PixelShader>(
    shared: &Shared<S>,
    topology: &Topology,
    shader: &Sh,
    params: &ParameterHandle,
    mut time: BoxedTimeSource,
    interval: Duration,
    report_every: u64,
) {
    let mut meter = TickMeter::new("shade", report_every, Instant::now());
    time.reset();
    debug!("shade loop started");
    while !shared.token.is_cancelled() {
        let sample = time.sample();
        let snapshot = params.snapshot();
        for (index, pixel) in topology.pixels().iter().enumerate() {
            let color = shader.shade(pixel.x, pixel.y, sample.seconds, &snapshot);
            shared.frame.store(index, color);
        }
        shared.shade_ticks.fetch_add(1, Ordering::Release);
        meter.tick(Instant::now());

        if shared.token.wait_timeout(interval) {
            break;
        }
    }
    debug!(ticks = meter.ticks(), "shade loop finished");
}

fn dispatch_loop<S: PixelSink>(shared: &Shared<S>, interval: Duration, report_every: u64) {
    let mut meter = TickMeter::new("dispatch", report_every, Instant::now());
    debug!("dispatch loop started");
    while !shared.token.is_cancelled() {
        let outcome = shared.sink.with(|sink| -> Result<bool, SinkError> {
            // Shutdown may have cancelled while this loop queued on the lock.
            if shared.token.is_cancelled() {
                return Ok(false);
            }
            for (index, color) in shared.frame.colors().enumerate() {
                sink.set_pixel(index, color)?;
            }
            sink.commit().map(|()| true)
        });

        match outcome {
            Some(Ok(true)) => {
                shared.dispatch_ticks.fetch_add(1, Ordering::Release);
                meter.tick(Instant::now());
            }
            Some(Ok(false)) | None => break,
            Some(Err(err)) => {
                error!(%err, "sink dispatch failed; draining pipeline");
                shared.fail(err);
                break;
            }
        }

        if shared.token.wait_timeout(interval) {
            break;
        }
    }
    debug!(ticks = meter.ticks(), "dispatch loop finished");
}
