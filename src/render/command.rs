//! Render engine backed by an external rasterizer process.
//!
//! Layers are staged into a per-call temporary directory and handed to a
//! gerbv-compatible command line:
//!
//! ```text
//! gerbv --export=png --dpi=<dpi> --border=0 --output=<out.png> <layer>...
//! ```
//!
//! The staging directory is removed when the call finishes, and the child is
//! killed if the call is dropped (timeout or sibling failure).

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{EngineError, RenderEngine};
use crate::types::LayerFile;

/// Millimeters per inch, for converting dpmm to the rasterizer's dpi.
const MM_PER_INCH: f64 = 25.4;

/// Longest stderr excerpt carried into an error message.
const MAX_STDERR_CHARS: usize = 2048;

/// Default rasterizer program.
pub const DEFAULT_RENDER_COMMAND: &str = "gerbv";

/// Engine that shells out to a gerbv-compatible rasterizer.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    extra_args: Vec<String>,
}

impl CommandEngine {
    /// Create an engine running `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    /// Engine running `gerbv` from `PATH`.
    pub fn gerbv() -> Self {
        Self::new(DEFAULT_RENDER_COMMAND)
    }

    /// Extra arguments placed before the export flags.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program this engine runs.
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

/// Resolution in dots per inch for a dots-per-millimeter value.
pub fn dots_per_inch(dpmm: u32) -> u32 {
    (f64::from(dpmm) * MM_PER_INCH).round() as u32
}

// Staged file name: index keeps archive order and avoids collisions between
// same-named layers from different directories.
fn staged_name(index: usize, layer: &LayerFile) -> String {
    let base: String = layer
        .file_name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{index:03}_{base}")
}

fn excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.chars().count() > MAX_STDERR_CHARS {
        let cut: String = text.chars().take(MAX_STDERR_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[async_trait]
impl RenderEngine for CommandEngine {
    fn name(&self) -> &str {
        "command"
    }

    async fn render(&self, layers: &[LayerFile], dpmm: u32) -> Result<Vec<u8>, EngineError> {
        if layers.is_empty() {
            return Err(EngineError::Rasterize("nothing to rasterize".to_string()));
        }

        let staging = tempfile::Builder::new()
            .prefix("gerber-render-")
            .tempdir()?;

        let mut inputs = Vec::with_capacity(layers.len());
        for (index, layer) in layers.iter().enumerate() {
            let path = staging.path().join(staged_name(index, layer));
            tokio::fs::write(&path, layer.content.as_bytes()).await?;
            inputs.push(path);
        }
        let output = staging.path().join("render.png");

        debug!(
            program = %self.program.display(),
            layer_count = layers.len(),
            dpi = dots_per_inch(dpmm),
            "invoking rasterizer"
        );

        let result = Command::new(&self.program)
            .args(&self.extra_args)
            .arg("--export=png")
            .arg(format!("--dpi={}", dots_per_inch(dpmm)))
            .arg("--border=0")
            .arg(format!("--output={}", output.display()))
            .args(&inputs)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                EngineError::Rasterize(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !result.status.success() {
            let stderr = excerpt(&result.stderr);
            return Err(EngineError::Rasterize(if stderr.is_empty() {
                format!("{} exited with {}", self.program.display(), result.status)
            } else {
                stderr
            }));
        }

        let png = match tokio::fs::read(&output).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            _ => {
                return Err(EngineError::Rasterize(format!(
                    "{} produced no image",
                    self.program.display()
                )))
            }
        };

        Ok(png)
    }
}
