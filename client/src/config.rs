use crate::coalescer::CoalescerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "tapgame.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    #[serde(default)]
    pub save: SaveConfig,
}

/// Save timing, all in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SaveConfig {
    pub debounce_ms: u64,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub force_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            save: SaveConfig::default(),
        }
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            interval_ms: 3000,
            timeout_ms: 5000,
            force_timeout_ms: 2000,
        }
    }
}

impl SaveConfig {
    pub fn coalescer(&self) -> CoalescerConfig {
        CoalescerConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            interval: Duration::from_millis(self.interval_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn force_timeout(&self) -> Duration {
        Duration::from_millis(self.force_timeout_ms)
    }
}

impl Config {
    /// Loads `tapgame.toml` from the working directory, or the defaults if there is none.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }
}
