//! Server configuration.
//!
//! Controls the tick driver, where farms are stored and which simulation
//! config to load. Loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use fasal_gameplay::SimConfig;

/// Configuration file name.
const CONFIG_FILE: &str = "fasal.toml";

/// Server configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    // === Tick Settings ===
    /// Real milliseconds between ticks
    pub tick_interval_ms: u64,
    /// Simulated seconds per real second
    pub time_scale: f64,
    /// Simulated minutes between farm ticks
    pub tick_minutes: u32,

    // === Storage ===
    /// Directory holding one JSON snapshot per farm
    pub save_dir: PathBuf,
    /// Simulation config file (None = built-in defaults)
    pub sim_config: Option<PathBuf>,

    // === Economy ===
    /// Overrides the simulation config's starting coins
    pub starting_coins: Option<u64>,

    // === Diagnostics ===
    /// Undrained events kept on the bus
    pub event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            time_scale: 60.0,
            tick_minutes: 1,
            save_dir: PathBuf::from("farms"),
            sim_config: None,
            starting_coins: None,
            event_capacity: 1024,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the default file location.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let mut config: Self = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        };
        config.validate();
        config
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Builds the simulation config this server runs with.
    pub fn sim_config(&self) -> SimConfig {
        let mut sim = match &self.sim_config {
            Some(path) => SimConfig::load_or_default(path),
            None => SimConfig::default(),
        };
        if let Some(coins) = self.starting_coins {
            sim.ledger.starting_coins = coins;
        }
        sim
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("fasal").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_interval_ms = self.tick_interval_ms.clamp(10, 3_600_000);
        if !self.time_scale.is_finite() {
            self.time_scale = 60.0;
        }
        self.time_scale = self.time_scale.clamp(0.0, 86_400.0);
        self.tick_minutes = self.tick_minutes.clamp(1, 24 * 60);
        self.event_capacity = self.event_capacity.clamp(16, 1 << 20);
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.tick_interval_ms, 1000);
        assert_eq!(config.save_dir, PathBuf::from("farms"));
        assert!(config.sim_config.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ServerConfig::default();
        config.tick_interval_ms = 0;
        config.time_scale = f64::NAN;
        config.event_capacity = 1;

        config.validate();

        assert_eq!(config.tick_interval_ms, 10);
        assert_eq!(config.time_scale, 60.0);
        assert_eq!(config.event_capacity, 16);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("fasal.toml");

        let mut config = ServerConfig::default();
        config.tick_interval_ms = 250;
        config.starting_coins = Some(500);
        config.save_to(&config_path).expect("Failed to save config");

        let loaded = ServerConfig::load_from(&config_path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.sim_config().ledger.starting_coins, 500);
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = ServerConfig::load_from("/nonexistent/path/fasal.toml");
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_sim_config_path_is_followed() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let sim_path = temp_dir.path().join("sim.toml");
        fs::write(&sim_path, "[ledger]\nxp_per_level = 300\n").expect("write");

        let config = ServerConfig {
            sim_config: Some(sim_path),
            ..ServerConfig::default()
        };
        assert_eq!(config.sim_config().ledger.xp_per_level, 300);
    }
}
