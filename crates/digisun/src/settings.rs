use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{bail, Context, Result};
use shading::ShaderKind;
use sunconfig::SunConfig;
use tracing::{debug, warn};

/// Reads and validates the config file.
///
/// A missing file yields the defaults unless the caller named the path
/// explicitly.
pub fn load_config(path: &Path, required: bool) -> Result<SunConfig> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound && !required => {
            debug!(path = %path.display(), "no config file; using defaults");
            return Ok(SunConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
    };

    SunConfig::from_toml_str(&raw).with_context(|| format!("failed to load {}", path.display()))
}

/// Command-line values that win over the config file, on startup and reload.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub seed: Option<i32>,
}

impl Overrides {
    pub fn apply(&self, config: &mut SunConfig) {
        if let Some(seed) = self.seed {
            config.parameters.seed = seed;
        }
    }
}

/// Picks the shading policy. An unrecognised name falls back to the warm
/// shader instead of refusing to light the sculpture.
pub fn resolve_shader(requested: Option<&str>, configured: ShaderKind) -> ShaderKind {
    let Some(name) = requested else {
        return configured;
    };

    match name.parse::<ShaderKind>() {
        Ok(kind) => kind,
        Err(err) => {
            warn!(requested = name, "{err}; falling back to warm");
            ShaderKind::Warm
        }
    }
}

pub fn write_sample(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, sunconfig::SAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))
}
