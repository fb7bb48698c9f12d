//! Controller configuration, persisted as JSON in the user's home
//! directory. Scene names are owned by the UI layer; the core reads the
//! file for `preferred_port` (and an optional preferred player) and writes
//! it back verbatim otherwise.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::protocol::DEFAULT_PORT;

/// Name of the config file under the home directory.
pub const CONFIG_FILE_NAME: &str = ".jamdeck_config.json";

/// The scene that always exists and maps to the bare overlay URL.
pub const DEFAULT_SCENE: &str = "default";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Ordered scene names. "default" is forced to the front on load.
    #[serde(default = "default_scenes")]
    pub scenes: Vec<String>,
    /// Port the worker should try to bind first.
    #[serde(default = "default_port")]
    pub preferred_port: u16,
    /// Optional app-id prefix that wins candidate ordering in the media
    /// session provider (e.g. "Spotify").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_app: Option<String>,
}

fn default_scenes() -> Vec<String> {
    vec![DEFAULT_SCENE.to_string()]
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scenes: default_scenes(),
            preferred_port: DEFAULT_PORT,
            preferred_app: None,
        }
    }
}

impl OverlayConfig {
    /// Standard config file location.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("failed to resolve home directory")?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// Load from the standard location, falling back to defaults when the
    /// file is missing or unreadable. A corrupt config must never prevent
    /// startup.
    pub fn load() -> Self {
        match Self::default_path() {
            Ok(path) => Self::load_from(&path),
            Err(e) => {
                warn!("config path unavailable, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load from an explicit path with the same fallback behavior.
    pub fn load_from(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(_) => return Self::default(),
        };
        let mut config: OverlayConfig = match serde_json::from_str(&data) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring corrupt config at {}: {}", path.display(), e);
                return Self::default();
            }
        };
        config.normalize();
        config
    }

    /// Persist to an explicit path as pretty-printed JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))
    }

    /// Persist to the standard location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Keep the invariant that "default" exists and leads the scene list.
    fn normalize(&mut self) {
        if self.scenes.is_empty() {
            self.scenes = default_scenes();
        } else if !self.scenes.iter().any(|s| s == DEFAULT_SCENE) {
            self.scenes.insert(0, DEFAULT_SCENE.to_string());
        }
    }
}
