//! Service configuration from environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8000` |
//! | `ARTIFACT_DIR` | `/tmp/gerber_images` |
//! | `ARTIFACT_RETENTION_SECS` | `3600` |
//! | `SWEEP_INTERVAL_SECS` | `300` |
//! | `RENDER_TIMEOUT_SECS` | `120` |
//! | `MAX_UPLOAD_BYTES` | `52428800` |
//! | `MAX_INFLATED_BYTES` | `268435456` |
//! | `RENDER_ENGINE` | `command` (`command` or `fixed`) |
//! | `RENDER_COMMAND` | `gerbv` |
//!
//! Unparseable values fall back to the default with a warning.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::archive::MAX_TOTAL_INFLATED_BYTES;
use crate::converter::{ConversionSettings, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_RENDER_TIMEOUT};
use crate::render::command::DEFAULT_RENDER_COMMAND;
use crate::store::RetentionPolicy;

/// Default artifact directory.
pub const DEFAULT_ARTIFACT_DIR: &str = "/tmp/gerber_images";

/// Which render engine the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// External gerbv-compatible rasterizer.
    #[default]
    Command,
    /// Blank raster of fixed size; no rasterizer needed.
    Fixed,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "command" => Ok(Self::Command),
            "fixed" => Ok(Self::Fixed),
            other => Err(format!("unknown render engine: {other}")),
        }
    }
}

/// Runtime configuration for the render service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory holding rendered artifacts.
    pub artifact_dir: PathBuf,
    /// Age after which artifacts are swept.
    pub retention: Duration,
    /// Period between sweeps.
    pub sweep_interval: Duration,
    /// Time budget per render job.
    pub render_timeout: Duration,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// Budget for all layer text inflated from one upload.
    pub max_inflated_bytes: u64,
    /// Render engine selection.
    pub engine: EngineKind,
    /// Rasterizer program for [`EngineKind::Command`].
    pub render_command: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let retention = RetentionPolicy::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            artifact_dir: PathBuf::from(DEFAULT_ARTIFACT_DIR),
            retention: retention.max_age,
            sweep_interval: retention.sweep_interval,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_inflated_bytes: MAX_TOTAL_INFLATED_BYTES,
            engine: EngineKind::default(),
            render_command: DEFAULT_RENDER_COMMAND.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let secs = |key: &str, default: Duration| {
            Duration::from_secs(parse_or(&lookup, key, default.as_secs()))
        };

        Self {
            host: lookup("HOST")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            artifact_dir: lookup("ARTIFACT_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            retention: secs("ARTIFACT_RETENTION_SECS", defaults.retention),
            sweep_interval: secs("SWEEP_INTERVAL_SECS", defaults.sweep_interval),
            render_timeout: secs("RENDER_TIMEOUT_SECS", defaults.render_timeout),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            max_inflated_bytes: parse_or(
                &lookup,
                "MAX_INFLATED_BYTES",
                defaults.max_inflated_bytes,
            ),
            engine: parse_or(&lookup, "RENDER_ENGINE", defaults.engine),
            render_command: lookup("RENDER_COMMAND")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.render_command),
        }
    }

    /// Retention policy for the sweeper.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age: self.retention,
            sweep_interval: self.sweep_interval,
        }
    }

    /// Limits for the converter.
    pub fn conversion_settings(&self) -> ConversionSettings {
        ConversionSettings {
            render_timeout: self.render_timeout,
            max_upload_bytes: self.max_upload_bytes,
            max_inflated_bytes: self.max_inflated_bytes,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %raw, default = ?default, "invalid value, using default");
            default
        }),
    }
}
