use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "digisun",
    author,
    version,
    about = "Digital sun LED sculpture driver",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file; defaults to `config.toml` in the config directory.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Shading policy: `red` (intensity) or `warm` (hue sweep).
    #[arg(long, env = "SHADER", value_name = "NAME")]
    pub shader: Option<String>,

    /// Noise seed, overriding `parameters.seed`.
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i32>,

    /// Output sink: `null` discards frames, `json` prints one line per frame.
    #[arg(long, value_name = "KIND", value_parser = parse_sink_kind, default_value = "null")]
    pub sink: SinkKind,

    /// Drive a straight strip of this many pixels instead of the sun layout.
    #[arg(long, value_name = "COUNT", value_parser = parse_pixel_count)]
    pub pixels: Option<usize>,

    /// Stop after this many committed frames.
    #[arg(long, value_name = "COUNT")]
    pub frames: Option<u64>,

    /// Freeze shading time at this many seconds.
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub still: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Null,
    Json,
}

impl SinkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SinkKind::Null => "null",
            SinkKind::Json => "json",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or create the configuration file.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration directory and file.
    Where,
    /// Write a commented sample configuration.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_sink_kind(value: &str) -> Result<SinkKind, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("sink must not be empty".to_string());
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "null" | "none" => Ok(SinkKind::Null),
        "json" | "stdout" => Ok(SinkKind::Json),
        other => Err(format!("unknown sink '{other}'; expected null or json")),
    }
}

pub fn parse_pixel_count(value: &str) -> Result<usize, String> {
    let count: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid pixel count '{value}'"))?;
    if count == 0 {
        return Err("pixel count must be greater than zero".into());
    }
    Ok(count)
}
