// src/config.rs

//! Defines the configuration structures for the pixelflut client.
//!
//! Settings are deserialized from a JSON file. Every struct carries
//! `#[serde(default)]`, so a file only needs the fields it wants to change.
//! The file is looked up at the path in `PIXELFLUT_CONFIG`, then at
//! `pixelflut.json` in the working directory; without either, the defaults
//! below are used. The defaults match the public TU Berlin canvas.

use anyhow::{Context, Result};
use log::*;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "PIXELFLUT_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pixelflut.json";

/// Process-wide configuration, loaded on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Where the canvas server lives.
    pub server: ServerConfig,
    /// Size of the remote canvas.
    pub canvas: CanvasConfig,
    /// Scrolling line animation.
    pub scroll: ScrollConfig,
    /// Rectangle, gradient and jumping-rectangle settings.
    pub shapes: ShapesConfig,
}

impl Config {
    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse configuration JSON")
    }

    /// Loads the configured file, falling back to defaults when there is none
    /// or it cannot be read.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::locate() else {
            info!("Config: No configuration file found, using defaults.");
            return Config::default();
        };
        match Self::load(&path) {
            Ok(config) => {
                info!("Config: Loaded {}", path.display());
                config
            }
            Err(e) => {
                warn!("Config: {:#}. Using defaults.", e);
                Config::default()
            }
        }
    }

    fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.is_file().then_some(local)
    }
}

// --- Server Configuration ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout_ms: u64,
    /// How long a pixel get may wait for its answer. 0 waits forever.
    pub read_timeout_ms: u64,
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    /// `None` disables the timeout; the socket API rejects a zero duration.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "pixelflut.3s.tu-berlin.de".to_string(),
            port: 60042,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
        }
    }
}

// --- Canvas Configuration ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            width: 1920,
            height: 1080,
        }
    }
}

// --- Scroll Configuration ---

/// Timing and size of the scrolling line and its restore workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Number of contiguous columns overwritten per frame.
    pub band_width: u32,
    /// Restore workers per frame. Each one restores the whole band.
    pub worker_count: usize,
    /// Delay before the first worker of a wave restores.
    pub restore_base_delay_ms: u64,
    /// Extra delay added per worker index.
    pub restore_worker_skew_ms: u64,
    /// Pause between frames.
    pub frame_interval_ms: u64,
    /// Stop after this many frames. `None` runs until cancelled.
    pub max_frames: Option<u64>,
    /// Fixed draw color. `None` picks a random one per run.
    pub draw_color: Option<crate::color::Rgb>,
}

impl ScrollConfig {
    pub fn restore_base_delay(&self) -> Duration {
        Duration::from_millis(self.restore_base_delay_ms)
    }

    pub fn restore_worker_skew(&self) -> Duration {
        Duration::from_millis(self.restore_worker_skew_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        ScrollConfig {
            band_width: 100,
            worker_count: 10,
            restore_base_delay_ms: 500,
            restore_worker_skew_ms: 50,
            frame_interval_ms: 100,
            max_frames: None,
            draw_color: None,
        }
    }
}

// --- Shapes Configuration ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapesConfig {
    /// Rectangle used by the solid and gradient fills.
    pub rect: RectConfig,
    pub jump: JumpConfig,
}

impl Default for ShapesConfig {
    fn default() -> Self {
        ShapesConfig {
            rect: RectConfig {
                x: 200,
                y: 200,
                width: 300,
                height: 300,
            },
            jump: JumpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RectConfig {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The jumping rectangle redraws itself at a random position every
/// `interval_ms` until `duration_ms` has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    pub width: u32,
    pub height: u32,
    pub interval_ms: u64,
    pub duration_ms: u64,
}

impl JumpConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

impl Default for JumpConfig {
    fn default() -> Self {
        JumpConfig {
            width: 300,
            height: 300,
            interval_ms: 1_000,
            duration_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use test_log::test;

    #[test]
    fn it_should_default_to_the_public_canvas_settings() {
        let config = Config::default();
        assert_eq!(config.server.port, 60042);
        assert_eq!(config.canvas.width, 1920);
        assert_eq!(config.canvas.height, 1080);
        assert_eq!(config.scroll.band_width, 100);
        assert_eq!(config.scroll.worker_count, 10);
        assert_eq!(config.scroll.restore_base_delay(), Duration::from_millis(500));
        assert_eq!(config.scroll.restore_worker_skew(), Duration::from_millis(50));
        assert_eq!(config.scroll.frame_interval(), Duration::from_millis(100));
    }

    #[test]
    fn it_should_fill_missing_fields_from_defaults() -> Result<()> {
        let config = Config::from_json(
            r#"{ "server": { "host": "localhost" }, "scroll": { "worker_count": 2, "draw_color": "ff00ff" } }"#,
        )?;
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 60042);
        assert_eq!(config.scroll.worker_count, 2);
        assert_eq!(config.scroll.band_width, 100);
        assert_eq!(config.scroll.draw_color, Some(Rgb::from_u32(0xFF00FF)));
        assert_eq!(config.shapes.rect.width, 300);
        Ok(())
    }

    #[test]
    fn it_should_reject_invalid_json() {
        assert!(Config::from_json("{ \"scroll\": { \"band_width\": \"wide\" } }").is_err());
        assert!(Config::from_json("{ \"scroll\": { \"draw_color\": \"red\" } }").is_err());
    }

    #[test]
    fn it_should_treat_a_zero_read_timeout_as_none() {
        let mut server = ServerConfig::default();
        assert_eq!(server.read_timeout(), Some(Duration::from_secs(10)));
        server.read_timeout_ms = 0;
        assert_eq!(server.read_timeout(), None);
    }
}
