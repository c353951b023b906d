// src/config.rs
//
// Editor configuration. Every field has a default, so an empty TOML file
// (or none at all) gives the stock behavior.

use crate::engine::PngSettings;
use crate::error::{ResizerError, Result};
use crate::history::HistoryConfig;
use crate::ops::ResampleFilter;
use crate::validation::InputLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default quiet period between the last dimension edit and the render.
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 300;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub limits: InputLimits,
    pub history: HistoryConfig,
    pub png: PngSettings,
    pub filter: ResampleFilter,
    pub resize_debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            limits: InputLimits::default(),
            history: HistoryConfig::default(),
            png: PngSettings::default(),
            filter: ResampleFilter::default(),
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
        }
    }
}

impl EditorConfig {
    /// Fast PNG output and no debouncing. Meant for batch use where nobody
    /// is typing.
    pub fn headless() -> Self {
        Self {
            png: PngSettings::fast(),
            resize_debounce_ms: 0,
            history: HistoryConfig {
                debounce_ms: 0,
                ..HistoryConfig::default()
            },
            ..Self::default()
        }
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        self.history.validate()?;
        if self.png.level > crate::engine::MAX_OPTIMIZE_LEVEL {
            return Err(ResizerError::invalid_config(format!(
                "png.level must be at most {}",
                crate::engine::MAX_OPTIMIZE_LEVEL
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ResizerError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResizerError::file_not_found(path.display().to_string())
            } else {
                ResizerError::file_read_failed(path.display().to_string(), e)
            }
        })?;
        let config = Self::from_toml(&text)?;
        debug!(target: "image_resizer::config", path = %path.display(), ?config, "loaded");
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ResizerError::invalid_config(e.to_string()))
    }
}
