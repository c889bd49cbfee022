use std::fmt;
use std::time::Duration;

use pipeline::PipelineConfig;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use shading::{ShaderKind, ShaderParameters};

/// Longest shutdown grace a config may ask for.
pub const MAX_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Commented starting point written by `digisun config init`.
pub const SAMPLE_CONFIG: &str = r#"# digisun configuration
version = 1

[shader]
# "red" paints intensity only; "warm" sweeps hue and value.
algorithm = "warm"
# Shift of the warm shader's value sample on x, y and t; 0 reuses the hue sample.
value_offset = 0.0

[parameters]
seed = 618
spatial_scale = 0.05
time_scale = 0.124
noise_type = "perlin"      # perlin | fbm-perlin | fbm-perlin-linear
alpha_power = 4.0
alpha_min = 0.0
alpha_max = 1.0
fbm_octaves = 8
fbm_lacunarity = 1.415
fbm_gain = 0.593
hue_range = { min = 0.469444, max = 0.191667 }

[pipeline]
shade_interval = "2ms"
dispatch_interval = "10ms"
shutdown_grace = "150ms"
report_every = 1000

[acquire]
retries = 0
backoff = "1s"
"#;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SunConfig {
    pub version: u32,
    #[serde(default)]
    pub shader: ShaderSection,
    #[serde(default)]
    pub parameters: ShaderParameters,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub acquire: AcquireSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShaderSection {
    #[serde(default, deserialize_with = "deserialize_shader_kind")]
    pub algorithm: ShaderKind,
    /// Shift applied to x, y and t when the warm shader samples its value
    /// field. Zero reuses the hue sample.
    #[serde(default)]
    pub value_offset: f64,
}

impl Default for ShaderSection {
    fn default() -> Self {
        Self {
            algorithm: ShaderKind::default(),
            value_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineSection {
    #[serde(
        default = "default_shade_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub shade_interval: Duration,
    #[serde(
        default = "default_dispatch_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub dispatch_interval: Duration,
    #[serde(
        default = "default_shutdown_grace",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_grace: Duration,
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            shade_interval: default_shade_interval(),
            dispatch_interval: default_dispatch_interval(),
            shutdown_grace: default_shutdown_grace(),
            report_every: default_report_every(),
        }
    }
}

impl PipelineSection {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            shade_interval: self.shade_interval,
            dispatch_interval: self.dispatch_interval,
            shutdown_grace: self.shutdown_grace,
            report_every: self.report_every,
        }
    }
}

/// How the binary retries opening the sink before giving up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AcquireSection {
    /// Extra attempts after the first failure.
    #[serde(default)]
    pub retries: u32,
    #[serde(default = "default_backoff", deserialize_with = "deserialize_duration")]
    pub backoff: Duration,
}

impl Default for AcquireSection {
    fn default() -> Self {
        Self {
            retries: 0,
            backoff: default_backoff(),
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            version: 1,
            shader: ShaderSection::default(),
            parameters: ShaderParameters::default(),
            pipeline: PipelineSection::default(),
            acquire: AcquireSection::default(),
        }
    }
}

fn default_shade_interval() -> Duration {
    PipelineConfig::default().shade_interval
}

fn default_dispatch_interval() -> Duration {
    PipelineConfig::default().dispatch_interval
}

fn default_shutdown_grace() -> Duration {
    PipelineConfig::default().shutdown_grace
}

fn default_report_every() -> u64 {
    PipelineConfig::default().report_every
}

fn default_backoff() -> Duration {
    Duration::from_secs(1)
}

fn deserialize_shader_kind<'de, D>(deserializer: D) -> Result<ShaderKind, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v.trim())
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs(v as u64))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a finite, non-negative number"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl SunConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: SunConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        self.pipeline.to_pipeline_config()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        self.parameters
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("parameters: {err}")))?;

        if !self.shader.value_offset.is_finite() {
            return Err(ConfigError::Invalid(
                "shader.value_offset must be a finite number".into(),
            ));
        }

        if self.pipeline.report_every == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.report_every must be greater than zero".into(),
            ));
        }

        if self.pipeline.shutdown_grace > MAX_SHUTDOWN_GRACE {
            return Err(ConfigError::Invalid(format!(
                "pipeline.shutdown_grace must not exceed {}",
                humantime::format_duration(MAX_SHUTDOWN_GRACE)
            )));
        }

        Ok(())
    }
}
