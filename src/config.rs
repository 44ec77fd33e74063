// src/config.rs

//! Configuration for the window system shim and its demo binary.
//!
//! The settings are plain serde structs with defaults for every field, so a
//! JSON file only needs to name what it overrides. The file is located through
//! the `SWIM_CONFIG` environment variable; when it is unset, unreadable or
//! malformed, the defaults are used.

use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::types::Size;

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "SWIM_CONFIG";

/// Process-wide configuration, loaded on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Initial window settings.
    pub window: WindowConfig,
    /// OpenGL (GLX) settings.
    pub gl: GlConfig,
    /// Polling loop settings.
    pub event_loop: EventLoopConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f64,
    pub height: f64,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 640.0,
            height: 480.0,
            title: "swim".to_string(),
        }
    }
}

impl WindowConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlConfig {
    /// Create a GLX-backed window instead of a plain one (X11 only).
    pub enabled: bool,
    /// RGBA colour used by `GlWindow::draw`.
    pub clear_color: [f32; 4],
    /// Request a double-buffered framebuffer configuration.
    pub double_buffered: bool,
}

impl Default for GlConfig {
    fn default() -> Self {
        GlConfig {
            enabled: false,
            clear_color: [1.0, 0.0, 0.0, 1.0],
            double_buffered: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Sleep between polls when no event is pending.
    pub poll_interval_ms: u64,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        EventLoopConfig {
            poll_interval_ms: 16,
        }
    }
}

impl EventLoopConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Loads the file named by `SWIM_CONFIG`, falling back to defaults.
    pub fn load_or_default() -> Self {
        match std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{:#}. Using default configuration.", e);
                    Config::default()
                }
            },
            None => Config::default(),
        }
    }
}
