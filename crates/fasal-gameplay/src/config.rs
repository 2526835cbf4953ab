//! Simulation configuration.
//!
//! Every rate, threshold, tier table and reward magnitude lives here. The
//! config is plain TOML; missing keys fall back to defaults.

use std::fs;
use std::io;
use std::path::Path;

use fasal_common::SchemaVersion;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::achievements::{default_achievements, AchievementDefinition};
use crate::challenges::{default_challenges, ChallengeDefinition};
use crate::climate::ClimateConfig;
use crate::crops::{CareConfig, CropCatalog, HarvestConfig};
use crate::growth::GrowthRates;
use crate::progression::LedgerConfig;
use crate::scenario::ScenarioConfig;

/// Errors loading or saving a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// TOML parse error
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// TOML serialization error
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Written by an incompatible version
    #[error("Unsupported config version {actual} (expected {expected})")]
    UnsupportedVersion {
        /// Version this build reads
        expected: SchemaVersion,
        /// Version found in the file
        actual: SchemaVersion,
    },
}

/// Farm grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rows
    pub rows: u16,
    /// Columns
    pub cols: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { rows: 6, cols: 6 }
    }
}

/// Complete simulation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Config file format version
    pub version: SchemaVersion,
    /// Farm grid
    pub grid: GridConfig,
    /// Resource model rates
    pub growth: GrowthRates,
    /// Planting costs
    pub crops: CropCatalog,
    /// Care tiers and saturation policy
    pub care: CareConfig,
    /// Harvest rewards
    pub harvest: HarvestConfig,
    /// Climate bands
    pub climate: ClimateConfig,
    /// Scenario rules and action tables
    pub scenarios: ScenarioConfig,
    /// Ledger settings
    pub ledger: LedgerConfig,
    /// Challenge catalogue
    pub challenges: Vec<ChallengeDefinition>,
    /// Achievement catalogue
    pub achievements: Vec<AchievementDefinition>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            version: SchemaVersion::SIM_CONFIG,
            grid: GridConfig::default(),
            growth: GrowthRates::default(),
            crops: CropCatalog::default(),
            care: CareConfig::default(),
            harvest: HarvestConfig::default(),
            climate: ClimateConfig::default(),
            scenarios: ScenarioConfig::default(),
            ledger: LedgerConfig::default(),
            challenges: default_challenges(),
            achievements: default_achievements(),
        }
    }
}

impl SimConfig {
    /// Parses and validates a config from a TOML string.
    ///
    /// A file without a version is read as the current version.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents)?;
        if !SchemaVersion::SIM_CONFIG.can_read(&config.version) {
            return Err(ConfigError::UnsupportedVersion {
                expected: SchemaVersion::SIM_CONFIG,
                actual: config.version,
            });
        }
        config.version = SchemaVersion::SIM_CONFIG;
        config.validate();
        Ok(config)
    }

    /// Loads and validates a config file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded simulation config from {}", path.display());
        Ok(config)
    }

    /// Loads a config file, falling back to defaults if it is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Simulation config not found at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load simulation config: {e}");
                Self::default()
            },
        }
    }

    /// Writes the config as pretty TOML.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        info!("Saved simulation config to {}", path.display());
        Ok(())
    }

    /// Clamps values into their valid ranges.
    pub fn validate(&mut self) {
        self.grid.rows = self.grid.rows.clamp(1, 64);
        self.grid.cols = self.grid.cols.clamp(1, 64);
        self.growth.validate();
        self.care.validate();
        self.climate.validate();
        self.scenarios.validate();
        self.ledger.validate();
        for challenge in &mut self.challenges {
            challenge.target = challenge.target.max(1);
        }
    }

    /// Looks up a challenge definition.
    #[must_use]
    pub fn challenge(&self, id: fasal_common::ChallengeId) -> Option<&ChallengeDefinition> {
        self.challenges.iter().find(|c| c.id == id)
    }

    /// Looks up an achievement definition.
    #[must_use]
    pub fn achievement(&self, id: fasal_common::AchievementId) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|a| a.id == id)
    }
}
