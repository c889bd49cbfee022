use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use pipeline::{
    time_source_for, CancelToken, ParameterHandle, Pipeline, PipelineError, PixelSink, SinkError,
};
use shading::{NoiseField, ShaderKind, Topology};
use sunconfig::{AcquireSection, SunConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{RunArgs, SinkKind};
use crate::paths::AppPaths;
use crate::settings::{load_config, resolve_shader, Overrides};
use crate::signals::{Reloader, SignalWatch};
use crate::sinks::{JsonSink, NullSink};

type DynSink = Box<dyn PixelSink>;

/// How often the controlling thread checks the frame limit.
const SUPERVISE_POLL: Duration = Duration::from_millis(20);

pub fn run(args: RunArgs) -> Result<()> {
    // Mask termination signals before any other thread exists.
    let signals = SignalWatch::block()?;

    let paths = AppPaths::discover()?;
    let config_path = args.config.clone().unwrap_or_else(|| paths.config_file());
    let overrides = Overrides { seed: args.seed };
    let required = args.config.is_some();
    let mut config = load_config(&config_path, required)?;
    overrides.apply(&mut config);

    let kind = resolve_shader(args.shader.as_deref(), config.shader.algorithm);
    let topology = match args.pixels {
        Some(count) => Topology::strip(count),
        None => Topology::build(),
    };
    let params =
        ParameterHandle::new(config.parameters.clone()).context("invalid shader parameters")?;
    tracing::debug!(
        config = %config_path.display(),
        shader = %kind,
        sink = %args.sink,
        pixels = topology.len(),
        "resolved digisun settings"
    );

    let stop = CancelToken::new();
    signals.spawn(
        stop.clone(),
        Reloader {
            path: config_path,
            required,
            params: params.clone(),
            overrides,
        },
    )?;

    let Some(pipeline) = start_pipeline(&args, &config, kind, &topology, &params, &stop)? else {
        tracing::info!("shutdown requested before the sink was acquired");
        return Ok(());
    };
    tracing::info!(shader = %kind, sink = %args.sink, "digisun running");

    supervise(&pipeline, &stop, args.frames);
    pipeline
        .wait()
        .context("pipeline stopped after a sink failure")?;
    Ok(())
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn open_sink(kind: SinkKind, pixels: usize, frames: Option<u64>) -> Result<DynSink, SinkError> {
    let sink: DynSink = match kind {
        SinkKind::Null => Box::new(NullSink::new(pixels)),
        SinkKind::Json => Box::new(JsonSink::new(io::stdout(), pixels, frames)),
    };
    Ok(sink)
}

/// Starts the pipeline, retrying sink acquisition as configured.
///
/// Returns `None` when a shutdown signal lands during a backoff.
fn start_pipeline(
    args: &RunArgs,
    config: &SunConfig,
    kind: ShaderKind,
    topology: &Topology,
    params: &ParameterHandle,
    stop: &CancelToken,
) -> Result<Option<Pipeline<DynSink>>> {
    let AcquireSection { retries, backoff } = config.acquire.clone();
    let mut attempt = 0;
    loop {
        attempt += 1;
        let started = Pipeline::start(
            config.pipeline_config(),
            topology.clone(),
            kind.build(NoiseField::new(), config.shader.value_offset),
            params.clone(),
            time_source_for(args.still),
            || open_sink(args.sink, topology.len(), args.frames),
        );

        match started {
            Ok(pipeline) => return Ok(Some(pipeline)),
            Err(PipelineError::Transport(err)) if attempt <= retries => {
                tracing::warn!(
                    attempt,
                    retries,
                    backoff = ?backoff,
                    %err,
                    "sink acquisition failed; retrying"
                );
                if stop.wait_timeout(backoff) {
                    return Ok(None);
                }
            }
            Err(err) => return Err(err).context("failed to start the pipeline"),
        }
    }
}

/// Forwards signal-driven stops to the pipeline and enforces `--frames`.
fn supervise(pipeline: &Pipeline<DynSink>, stop: &CancelToken, frames: Option<u64>) {
    let token = pipeline.cancel_token();
    loop {
        if stop.wait_timeout(SUPERVISE_POLL) {
            token.cancel();
            return;
        }
        if token.is_cancelled() {
            return;
        }
        if let Some(limit) = frames {
            let committed = pipeline.stats().dispatch_ticks;
            if committed >= limit {
                tracing::info!(frames = committed, "frame limit reached");
                token.cancel();
                return;
            }
        }
    }
}
