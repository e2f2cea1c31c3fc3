//! Watcher configuration management

use crate::usb::FilterSet;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Log levels accepted in the config file
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default)]
    pub watcher: WatcherSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherSettings {
    #[serde(default = "WatcherSettings::default_log_level")]
    pub log_level: String,
    /// Run headless instead of showing the terminal UI
    #[serde(default)]
    pub service_mode: bool,
    /// UI redraw tick in milliseconds
    #[serde(default = "WatcherSettings::default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    /// Log file used while the terminal UI is active
    /// If None, uses the default data dir path: ~/.local/share/usb-watcher/usb-watcher.log
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            service_mode: false,
            tick_rate_ms: Self::default_tick_rate_ms(),
            log_file: None,
        }
    }
}

impl WatcherSettings {
    const MIN_TICK_RATE_MS: u64 = 50;
    const MAX_TICK_RATE_MS: u64 = 5000;

    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_tick_rate_ms() -> u64 {
        250
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms)
    }

    /// Resolved log file path for TUI mode
    pub fn log_file_path(&self) -> PathBuf {
        match &self.log_file {
            Some(path) => expand_path(path),
            None => match dirs::data_local_dir() {
                Some(data_dir) => data_dir.join("usb-watcher").join("usb-watcher.log"),
                None => PathBuf::from("usb-watcher.log"),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbSettings {
    /// VID:PID filters, e.g. "0x046d:*". Empty means every device.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Hide Linux Foundation root hubs
    #[serde(default)]
    pub skip_root_hubs: bool,
}

impl WatcherConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            expand_path(&p)
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-watcher/watcher.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: WatcherConfig =
            toml::from_str(content).context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-watcher").join("watcher.toml")
        } else {
            PathBuf::from(".config/usb-watcher/watcher.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.watcher.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.watcher.log_level,
                VALID_LOG_LEVELS.join(", ")
            ));
        }

        let tick = self.watcher.tick_rate_ms;
        if !(WatcherSettings::MIN_TICK_RATE_MS..=WatcherSettings::MAX_TICK_RATE_MS).contains(&tick)
        {
            return Err(anyhow!(
                "Invalid tick_rate_ms {}, must be between {} and {}",
                tick,
                WatcherSettings::MIN_TICK_RATE_MS,
                WatcherSettings::MAX_TICK_RATE_MS
            ));
        }

        FilterSet::parse(&self.usb.filters)?;

        Ok(())
    }
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}
