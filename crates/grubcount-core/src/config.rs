//! Persistent user settings
//!
//! Stored as JSON under the platform config directory. A missing or broken
//! file is never fatal; callers fall back to [`Config::default`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::memory::layout::{process, timing};
use crate::stream::COUNT_PLACEHOLDER;

const CONFIG_DIR: &str = "grubcount";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub process_name: String,
    pub output_file: PathBuf,
    pub write_enabled: bool,
    pub template: String,
    pub poll_interval_ms: u64,
    /// Last known count, shown before the game is attached
    pub last_count: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: process::PROCESS_NAME.to_string(),
            output_file: PathBuf::from("grub_count.txt"),
            write_enabled: true,
            template: COUNT_PLACEHOLDER.to_string(),
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            last_count: None,
        }
    }
}

impl Config {
    /// `<config_dir>/grubcount/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load from `path`, or defaults when the file is absent or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("Failed to load config {}: {}. Using defaults", path.display(), e);
            Self::default()
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Poll period, at least 1 ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
