use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use nix::sys::signal::{SigSet, Signal};
use pipeline::{CancelToken, ParameterHandle};
use tracing::{debug, info, warn};

use crate::settings::{load_config, Overrides};

/// Re-reads the config file on SIGHUP and swaps in its parameters.
///
/// `required` carries the startup rule: an explicitly named file that has
/// since disappeared fails the reload instead of resetting to defaults.
#[derive(Debug, Clone)]
pub struct Reloader {
    pub path: PathBuf,
    pub required: bool,
    pub params: ParameterHandle,
    pub overrides: Overrides,
}

impl Reloader {
    pub fn reload(&self) {
        let mut config = match load_config(&self.path, self.required) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %self.path.display(), "config reload failed: {err:#}");
                return;
            }
        };
        self.overrides.apply(&mut config);

        match self.params.replace(config.parameters) {
            Ok(()) => info!(path = %self.path.display(), "shader parameters reloaded"),
            Err(err) => warn!(%err, "reloaded parameters rejected; keeping current set"),
        }
    }
}

/// Termination and reload signals, blocked for every thread of the process.
pub struct SignalWatch {
    set: SigSet,
}

impl SignalWatch {
    /// Blocks SIGINT, SIGTERM and SIGHUP on the calling thread. Threads
    /// spawned afterwards inherit the mask, so only the watcher thread ever
    /// receives them.
    pub fn block() -> Result<Self> {
        let mut set = SigSet::empty();
        set.add(Signal::SIGINT);
        set.add(Signal::SIGTERM);
        set.add(Signal::SIGHUP);
        set.thread_block()
            .context("failed to block termination signals")?;
        Ok(Self { set })
    }

    /// Cancels `stop` on SIGINT or SIGTERM and reloads parameters on SIGHUP.
    pub fn spawn(self, stop: CancelToken, reloader: Reloader) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("digisun-signals".into())
            .spawn(move || loop {
                match self.set.wait() {
                    Ok(Signal::SIGHUP) => reloader.reload(),
                    Ok(signal) => {
                        if stop.cancel() {
                            info!(signal = signal.as_str(), "shutdown requested");
                        } else {
                            debug!(signal = signal.as_str(), "shutdown already in progress");
                        }
                    }
                    Err(err) => {
                        warn!(%err, "waiting for signals failed");
                        return;
                    }
                }
            })
            .context("failed to spawn signal thread")
    }
}
