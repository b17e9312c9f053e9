//! Render-only config variant.
//!
//! Opens an existing project, locates one composition, configures its
//! output and renders. No reconciliation happens.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::output::OutputSpec;
use crate::paths::normalize_path;

/// A render-only job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    /// Project to open.
    #[serde(default)]
    pub project_path: String,

    /// Composition to render.
    #[serde(default = "default_comp_name")]
    pub comp_name: String,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,

    #[serde(default = "default_first")]
    pub global_first: i64,

    #[serde(default = "default_first")]
    pub global_last: i64,

    /// Destination path; frame tokens are converted before use.
    #[serde(default)]
    pub output_path: String,

    #[serde(default)]
    pub output_settings: OutputSpec,
}

fn default_comp_name() -> String {
    crate::desired::DEFAULT_COMP_NAME.to_string()
}

fn default_frame_rate() -> f64 {
    crate::desired::DEFAULT_FRAME_RATE
}

fn default_first() -> i64 {
    1
}

impl RenderJob {
    /// Load and validate a render-only config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut job: RenderJob =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
                path: PathBuf::from(origin),
                source: e,
            })?;
        job.project_path = normalize_path(job.project_path.trim());
        job.output_path = normalize_path(job.output_path.trim());
        job.validate()?;
        Ok(job)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_path.is_empty() {
            return Err(ConfigError::validation("missing required field 'project_path'"));
        }
        if self.output_path.is_empty() {
            return Err(ConfigError::validation("missing required field 'output_path'"));
        }
        if self.comp_name.trim().is_empty() {
            return Err(ConfigError::validation("comp_name is empty"));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(ConfigError::validation(format!(
                "frame_rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if self.global_last < self.global_first {
            return Err(ConfigError::validation(format!(
                "global_last ({}) is before global_first ({})",
                self.global_last, self.global_first
            )));
        }
        Ok(())
    }
}
