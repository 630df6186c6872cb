//! # Toolkit Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! file (or no file) yields a working setup.
//!
//! ```toml
//! [window]
//! title = "demo"
//! fps = 30
//!
//! [bus]
//! cleanup_threshold = 500
//! pump_interval = 0.1
//!
//! [tree]
//! max_depth = 64
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{UiError, UiResult};

/// Root window settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Window title, also the root node's name.
    pub title: String,
    /// Root width in pixels.
    pub width: i32,
    /// Root height in pixels.
    pub height: i32,
    /// Target frames per second.
    pub fps: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "root".to_owned(),
            width: 800,
            height: 600,
            fps: 60,
        }
    }
}

/// Address bus settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// Deliveries between two cleanup passes.
    pub cleanup_threshold: usize,
    /// Seconds between scheduled pumps.
    pub pump_interval: f64,
}

impl BusConfig {
    /// Scheduled pump interval as a duration.
    ///
    /// Values a [`Duration`] cannot hold saturate to [`Duration::MAX`], which
    /// turns scheduled pumps off.
    #[must_use]
    pub fn pump_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.pump_interval.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            cleanup_threshold: switchboard_bus::DEFAULT_CLEANUP_THRESHOLD,
            pump_interval: 0.3,
        }
    }
}

/// Element tree settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    /// Deepest allowed nesting (root is depth 0).
    pub max_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self { max_depth: 255 }
    }
}

/// Complete toolkit configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolkitConfig {
    /// Root window.
    pub window: WindowConfig,
    /// Address bus.
    pub bus: BusConfig,
    /// Element tree.
    pub tree: TreeConfig,
}

impl ToolkitConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the document does not parse or fails validation.
    pub fn from_toml_str(source: &str) -> UiResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| UiError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `InvalidConfig` otherwise.
    pub fn load(path: impl AsRef<Path>) -> UiResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> UiResult<()> {
        if self.window.fps == 0 {
            return Err(UiError::InvalidConfig("window.fps must be positive".into()));
        }
        if Duration::try_from_secs_f64(self.bus.pump_interval).is_err() {
            return Err(UiError::InvalidConfig(
                "bus.pump_interval must be a non-negative number of seconds that fits a duration"
                    .into(),
            ));
        }
        if self.bus.cleanup_threshold == 0 {
            return Err(UiError::InvalidConfig(
                "bus.cleanup_threshold must be positive".into(),
            ));
        }
        if self.tree.max_depth == 0 {
            return Err(UiError::InvalidConfig("tree.max_depth must be positive".into()));
        }
        Ok(())
    }
}
