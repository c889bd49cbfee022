use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pipeline::{
    check_index, FixedTimeSource, ParameterHandle, Pipeline, PipelineConfig, PipelineError,
    PipelineState, PixelSink, SinkError, SystemTimeSource,
};
use shading::{Color, NoiseField, PixelShader, ShaderKind, ShaderParameters, Topology};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Set(usize),
    Commit,
    Blank,
    Release,
}

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|seen| *seen == call).count()
    }

    fn commits(&self) -> usize {
        self.count(&Call::Commit)
    }
}

struct RecordingSink {
    pixels: usize,
    journal: Journal,
    fail_commit_after: Option<usize>,
    commits: usize,
}

impl RecordingSink {
    fn new(pixels: usize, journal: Journal) -> Self {
        Self {
            pixels,
            journal,
            fail_commit_after: None,
            commits: 0,
        }
    }

    fn failing_after(mut self, commits: usize) -> Self {
        self.fail_commit_after = Some(commits);
        self
    }

    fn record(&self, call: Call) {
        self.journal.0.lock().unwrap().push(call);
    }
}

impl PixelSink for RecordingSink {
    fn pixel_count(&self) -> usize {
        self.pixels
    }

    fn set_pixel(&mut self, index: usize, _color: Color) -> Result<(), SinkError> {
        check_index(index, self.pixels)?;
        self.record(Call::Set(index));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        if self.fail_commit_after == Some(self.commits) {
            return Err(SinkError::transport("bus unplugged"));
        }
        self.commits += 1;
        self.record(Call::Commit);
        Ok(())
    }

    fn blank_all(&mut self) -> Result<(), SinkError> {
        self.record(Call::Blank);
        Ok(())
    }

    fn release(&mut self) -> Result<(), SinkError> {
        self.record(Call::Release);
        Ok(())
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        shade_interval: Duration::from_millis(1),
        dispatch_interval: Duration::from_millis(1),
        shutdown_grace: Duration::from_secs(2),
        report_every: 0,
    }
}

fn start_recording(
    pixels: usize,
    sink: RecordingSink,
) -> Result<Pipeline<RecordingSink>, PipelineError> {
    Pipeline::start(
        fast_config(),
        Topology::strip(pixels),
        ShaderKind::Warm.build(NoiseField::new(), 0.0),
        ParameterHandle::default(),
        Box::new(SystemTimeSource::new()),
        move || Ok(sink),
    )
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

/// Checks that nothing reaches the sink after release, and that the last
/// frame-carrying calls are the shutdown blank and its commit.
fn assert_clean_teardown(calls: &[Call]) {
    let release = calls
        .iter()
        .position(|call| *call == Call::Release)
        .expect("sink was never released");
    assert_eq!(release, calls.len() - 1, "calls after release: {calls:?}");
    assert_eq!(calls[release - 1], Call::Commit);
    assert_eq!(calls[release - 2], Call::Blank);
}

#[test]
fn cancel_blanks_and_releases_exactly_once() {
    let journal = Journal::default();
    let pipeline = start_recording(10, RecordingSink::new(10, journal.clone())).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Running);

    wait_until(|| pipeline.stats().shade_ticks >= 5 && journal.commits() >= 3);
    pipeline.cancel_token().cancel();
    pipeline.wait().unwrap();

    assert_eq!(pipeline.state(), PipelineState::Closed);
    let calls = journal.calls();
    assert_eq!(journal.count(&Call::Blank), 1);
    assert_eq!(journal.count(&Call::Release), 1);
    assert_clean_teardown(&calls);

    // Every dispatch tick writes the whole frame in index order.
    let first_commit = calls.iter().position(|call| *call == Call::Commit).unwrap();
    let expected: Vec<Call> = (0..10).map(Call::Set).collect();
    assert_eq!(&calls[..first_commit], expected.as_slice());
}

#[test]
fn repeated_shutdown_is_a_no_op() {
    let journal = Journal::default();
    let pipeline = start_recording(10, RecordingSink::new(10, journal.clone())).unwrap();
    wait_until(|| journal.commits() >= 1);

    pipeline.shutdown();
    pipeline.shutdown();
    drop(pipeline);

    assert_eq!(journal.count(&Call::Release), 1);
    assert_eq!(journal.count(&Call::Blank), 1);
    assert_clean_teardown(&journal.calls());
}

#[test]
fn concurrent_shutdown_releases_once() {
    let journal = Journal::default();
    let pipeline =
        Arc::new(start_recording(10, RecordingSink::new(10, journal.clone())).unwrap());
    wait_until(|| journal.commits() >= 1);

    let callers: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            thread::spawn(move || {
                pipeline.shutdown();
                pipeline.state()
            })
        })
        .collect();

    for caller in callers {
        assert_eq!(caller.join().unwrap(), PipelineState::Closed);
    }
    assert_eq!(journal.count(&Call::Release), 1);
    assert_clean_teardown(&journal.calls());
}

#[test]
fn dispatch_failure_drains_and_reports_transport_error() {
    let journal = Journal::default();
    let sink = RecordingSink::new(10, journal.clone()).failing_after(3);
    let pipeline = start_recording(10, sink).unwrap();

    let err = pipeline.wait().unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Transport(SinkError::Transport(ref message)) if message == "bus unplugged"
    ));
    assert_eq!(pipeline.state(), PipelineState::Closed);
    assert_eq!(pipeline.stats().dispatch_ticks, 3);
    assert_eq!(journal.count(&Call::Release), 1);

    // The failing commit is never retried: only the shutdown blank reaches
    // the sink afterwards, and its commit fails the same way.
    let calls = journal.calls();
    assert_eq!(calls.last(), Some(&Call::Release));
    assert_eq!(calls[calls.len() - 2], Call::Blank);
    assert_eq!(journal.commits(), 3);
}

#[test]
fn failed_acquisition_starts_nothing() {
    let result: Result<Pipeline<RecordingSink>, _> = Pipeline::start(
        fast_config(),
        Topology::build(),
        ShaderKind::Red.build(NoiseField::new(), 0.0),
        ParameterHandle::default(),
        Box::new(SystemTimeSource::new()),
        || Err(SinkError::transport("no device")),
    );
    assert!(matches!(
        result,
        Err(PipelineError::Transport(SinkError::Transport(_)))
    ));
}

#[test]
fn mismatched_sink_is_released_and_rejected() {
    let journal = Journal::default();
    let err = start_recording(10, RecordingSink::new(12, journal.clone())).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SizeMismatch {
            topology: 10,
            sink: 12
        }
    ));
    assert_eq!(journal.calls(), vec![Call::Release]);
}

struct SeedEcho;

impl PixelShader for SeedEcho {
    fn shade(&self, _x: i32, _y: i32, _t: f64, params: &ShaderParameters) -> Color {
        Color::new(f64::from(params.seed) / 100.0, 0.0, 0.0, 1.0)
    }
}

#[test]
fn parameter_replacement_reaches_the_frame() {
    let journal = Journal::default();
    let sink = RecordingSink::new(4, journal.clone());
    let params = ParameterHandle::new(ShaderParameters {
        seed: 25,
        ..ShaderParameters::default()
    })
    .unwrap();
    let pipeline = Pipeline::start(
        fast_config(),
        Topology::strip(4),
        SeedEcho,
        params,
        Box::new(FixedTimeSource::new(0.0)),
        move || Ok(sink),
    )
    .unwrap();

    wait_until(|| pipeline.stats().shade_ticks >= 1);
    assert!(pipeline
        .frame_snapshot()
        .iter()
        .all(|color| (color.r - 0.25).abs() < 1e-4));

    pipeline
        .params()
        .replace(ShaderParameters {
            seed: 75,
            ..ShaderParameters::default()
        })
        .unwrap();
    let seen = pipeline.stats().shade_ticks;
    wait_until(|| pipeline.stats().shade_ticks >= seen + 2);
    assert!(pipeline
        .frame_snapshot()
        .iter()
        .all(|color| (color.r - 0.75).abs() < 1e-4));

    pipeline.shutdown();
    assert_eq!(journal.count(&Call::Release), 1);
}

#[test]
fn sun_topology_drives_a_full_sized_sink() {
    let journal = Journal::default();
    let sink = RecordingSink::new(shading::SUN_PIXEL_COUNT, journal.clone());
    let pipeline = Pipeline::start(
        fast_config(),
        Topology::build(),
        ShaderKind::Red.build(NoiseField::new(), 0.0),
        ParameterHandle::default(),
        Box::new(FixedTimeSource::new(1.5)),
        move || Ok(sink),
    )
    .unwrap();

    wait_until(|| journal.commits() >= 2);
    assert_eq!(pipeline.pixel_count(), 208);
    assert!(pipeline
        .frame_snapshot()
        .iter()
        .all(|color| color.r == 1.0 && color.g == 0.0 && color.b == 0.0));
    drop(pipeline);

    assert_eq!(journal.count(&Call::Release), 1);
    assert_clean_teardown(&journal.calls());
}
