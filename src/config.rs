// In: src/config.rs

//! The single source of truth for pipeline construction settings.
//!
//! `PipelineConfig` is created once at the application boundary (in code, or
//! from a JSON file) and handed to `PipelineBuilder`. Everything in it is
//! optional; the defaults give an anonymous pipeline with unnamed stages and
//! the platform's default thread stack size.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Smallest worker stack we accept; below this even logging can overflow.
pub const MIN_WORKER_STACK_SIZE: usize = 16 * 1024;

//==================================================================================
// I. Sub-sections
//==================================================================================

/// Settings for the library's own logger (see `observability::init_from_config`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitoringConfig {
    /// A `log` level name such as `"info"` or `"trace"`. Defaults to `info`.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Append log records to this file instead of stderr.
    #[serde(default)]
    pub log_file: Option<String>,
}

//==================================================================================
// II. The Unified PipelineConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Prefix for worker thread names and log records.
    #[serde(default = "default_name")]
    pub name: String,

    /// Positional names for stages that were added without one.
    /// Missing entries fall back to `stage-<index>`.
    #[serde(default)]
    pub stage_names: Vec<String>,

    /// Stack size for every worker thread, in bytes.
    #[serde(default)]
    pub worker_stack_size: Option<usize>,

    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            stage_names: Vec::new(),
            worker_stack_size: None,
            monitoring: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "pipeline name must not be empty".to_string(),
            ));
        }
        if let Some(size) = self.worker_stack_size {
            if size < MIN_WORKER_STACK_SIZE {
                return Err(PipelineError::InvalidConfig(format!(
                    "worker_stack_size {} is below the minimum of {} bytes",
                    size, MIN_WORKER_STACK_SIZE
                )));
            }
        }
        Ok(())
    }

    /// Name for the stage at `index` when the caller supplied none.
    pub(crate) fn stage_name(&self, index: usize) -> String {
        self.stage_names
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("stage-{}", index))
    }
}

/// Helper for `serde` to provide a default for `name`.
fn default_name() -> String {
    "stagepipe".to_string()
}
