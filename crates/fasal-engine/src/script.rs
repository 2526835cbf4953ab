//! JSON command scripts.
//!
//! A script is one JSON command per line. Blank lines and lines starting with
//! `#` are skipped. Each command produces one JSON line on the output:
//! `{"ok": ...}` on success or `{"error": {"kind": ..., "message": ...}}`.
//! A failing command does not stop the script.

use std::io::{BufRead, Write};
use std::sync::Arc;

use chrono::Duration;
use fasal_common::{
    AchievementId, ChallengeId, CropId, ErrorKind, GridPosition, Location, OwnerId, ScenarioId,
};
use fasal_gameplay::{
    ActionKind, CropType, Credit, FarmEngine, FarmError, FarmStore, FertilizerTier, ManualClock,
    WaterTier,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that stop a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Reading the script or writing results failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A result could not be encoded
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One scripted command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Open a new farm
    OpenFarm {
        /// Player
        owner: OwnerId,
    },
    /// Plant a crop
    Plant {
        /// Player
        owner: OwnerId,
        /// Grid row
        row: u16,
        /// Grid column
        col: u16,
        /// Crop type
        crop_type: CropType,
        /// Optional latitude for climate lookups
        #[serde(default)]
        latitude: Option<f64>,
        /// Optional longitude for climate lookups
        #[serde(default)]
        longitude: Option<f64>,
    },
    /// Water a crop
    Water {
        /// Player
        owner: OwnerId,
        /// Crop
        crop: CropId,
        /// Tier
        tier: WaterTier,
    },
    /// Fertilize a crop
    Fertilize {
        /// Player
        owner: OwnerId,
        /// Crop
        crop: CropId,
        /// Tier
        tier: FertilizerTier,
    },
    /// Harvest a ready crop
    Harvest {
        /// Player
        owner: OwnerId,
        /// Crop
        crop: CropId,
    },
    /// Raise scenarios for a crop
    GenerateScenarios {
        /// Player
        owner: OwnerId,
        /// Crop
        crop: CropId,
    },
    /// List active scenarios
    ActiveScenarios {
        /// Player
        owner: OwnerId,
        /// Optional crop filter
        #[serde(default)]
        crop: Option<CropId>,
    },
    /// Resolve a scenario
    CompleteScenario {
        /// Player
        owner: OwnerId,
        /// Scenario
        scenario: ScenarioId,
        /// Action taken
        action: ActionKind,
    },
    /// Check the climate bonus at a location
    CheckClimate {
        /// Player
        owner: OwnerId,
        /// Latitude
        latitude: f64,
        /// Longitude
        longitude: f64,
    },
    /// Direct credit or charge
    Credit {
        /// Player
        owner: OwnerId,
        /// XP
        #[serde(default)]
        xp: u64,
        /// Coin delta
        #[serde(default)]
        coins: i64,
    },
    /// Advance a challenge
    AdvanceChallenge {
        /// Player
        owner: OwnerId,
        /// Challenge
        challenge: ChallengeId,
        /// Amount
        amount: u32,
    },
    /// Unlock an achievement
    UnlockAchievement {
        /// Player
        owner: OwnerId,
        /// Achievement
        achievement: AchievementId,
    },
    /// List crops
    Crops {
        /// Player
        owner: OwnerId,
    },
    /// Show XP, level and coins
    Progress {
        /// Player
        owner: OwnerId,
    },
    /// List challenges
    Challenges {
        /// Player
        owner: OwnerId,
    },
    /// List achievements
    Achievements {
        /// Player
        owner: OwnerId,
    },
    /// Show the ledger journal
    Journal {
        /// Player
        owner: OwnerId,
    },
    /// Show the leaderboard
    Leaderboard {
        /// Rows
        #[serde(default = "default_limit")]
        limit: usize,
    },
    /// Move the simulated clock forward
    AdvanceClock {
        /// Simulated minutes
        minutes: i64,
    },
    /// Tick every farm at the current simulated time
    Tick,
    /// Drain published events
    Events,
}

fn default_limit() -> usize {
    10
}

/// Executes commands against an engine on a manual clock.
pub struct ScriptRunner<S: FarmStore> {
    engine: FarmEngine<S>,
    clock: Arc<ManualClock>,
}

impl<S: FarmStore> ScriptRunner<S> {
    /// Creates a runner. The engine should already use `clock`.
    #[must_use]
    pub fn new(engine: FarmEngine<S>, clock: Arc<ManualClock>) -> Self {
        Self { engine, clock }
    }

    /// The engine commands run against.
    #[must_use]
    pub fn engine(&self) -> &FarmEngine<S> {
        &self.engine
    }

    /// Runs every command in `input`, writing one result line per command.
    /// Returns the number of commands that failed.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<usize, ScriptError> {
        let mut failures = 0;
        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let result = match serde_json::from_str::<Command>(trimmed) {
                Ok(command) => {
                    debug!("Line {}: {:?}", index + 1, command);
                    self.execute(command)
                },
                Err(e) => Err(Failure::parse(&e)),
            };
            let line = match result {
                Ok(value) => json!({ "ok": value }),
                Err(failure) => {
                    failures += 1;
                    json!({ "error": failure })
                },
            };
            serde_json::to_writer(&mut output, &line)?;
            writeln!(output)?;
        }
        output.flush()?;
        info!("Script finished with {failures} failed command(s)");
        Ok(failures)
    }

    /// Executes one command.
    pub fn execute(&self, command: Command) -> Result<Value, Failure> {
        let engine = &self.engine;
        let value = match command {
            Command::OpenFarm { owner } => to_value(engine.open_farm(owner)?)?,
            Command::Plant {
                owner,
                row,
                col,
                crop_type,
                latitude,
                longitude,
            } => {
                let location = match (latitude, longitude) {
                    (Some(lat), Some(lon)) => Some(Location::new(lat, lon)),
                    (None, None) => None,
                    _ => {
                        return Err(Failure::from(FarmError::InvalidInput(
                            "latitude and longitude must be given together".into(),
                        )))
                    },
                };
                to_value(engine.plant(owner, GridPosition::new(row, col), crop_type, location)?)?
            },
            Command::Water { owner, crop, tier } => to_value(engine.water(owner, crop, tier)?)?,
            Command::Fertilize { owner, crop, tier } => {
                to_value(engine.fertilize(owner, crop, tier)?)?
            },
            Command::Harvest { owner, crop } => to_value(engine.harvest(owner, crop)?)?,
            Command::GenerateScenarios { owner, crop } => {
                to_value(engine.generate_scenarios(owner, crop)?)?
            },
            Command::ActiveScenarios { owner, crop } => {
                to_value(engine.active_scenarios(owner, crop)?)?
            },
            Command::CompleteScenario {
                owner,
                scenario,
                action,
            } => to_value(engine.complete_scenario(owner, scenario, action)?)?,
            Command::CheckClimate {
                owner,
                latitude,
                longitude,
            } => to_value(engine.check_climate(owner, Location::new(latitude, longitude))?)?,
            Command::Credit { owner, xp, coins } => {
                to_value(engine.credit(owner, Credit::new(xp, coins))?)?
            },
            Command::AdvanceChallenge {
                owner,
                challenge,
                amount,
            } => to_value(engine.advance_challenge(owner, challenge, amount)?)?,
            Command::UnlockAchievement { owner, achievement } => {
                to_value(engine.unlock_achievement(owner, achievement)?)?
            },
            Command::Crops { owner } => to_value(engine.crops(owner)?)?,
            Command::Progress { owner } => to_value(engine.progress(owner)?)?,
            Command::Challenges { owner } => to_value(engine.challenges(owner)?)?,
            Command::Achievements { owner } => to_value(engine.achievements(owner)?)?,
            Command::Journal { owner } => to_value(engine.journal(owner)?)?,
            Command::Leaderboard { limit } => to_value(engine.leaderboard(limit)?)?,
            Command::AdvanceClock { minutes } => {
                if minutes < 0 {
                    return Err(Failure::from(FarmError::InvalidInput(
                        "the clock only moves forward".into(),
                    )));
                }
                let now = Duration::try_minutes(minutes)
                    .and_then(|by| self.clock.try_advance(by))
                    .ok_or_else(|| {
                        FarmError::InvalidInput(format!(
                            "cannot advance the clock by {minutes} minutes"
                        ))
                    })?;
                to_value(now)?
            },
            Command::Tick => to_value(engine.tick())?,
            Command::Events => to_value(engine.events().drain())?,
        };
        Ok(value)
    }
}

/// A failed command as reported on the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Error class
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl Failure {
    fn parse(error: &serde_json::Error) -> Self {
        Self {
            kind: format!("{:?}", ErrorKind::InvalidInput),
            message: format!("unrecognised command: {error}"),
        }
    }
}

impl From<FarmError> for Failure {
    fn from(error: FarmError) -> Self {
        Self {
            kind: format!("{:?}", error.kind()),
            message: error.to_string(),
        }
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, Failure> {
    serde_json::to_value(value).map_err(|e| Failure {
        kind: format!("{:?}", ErrorKind::Storage),
        message: format!("failed to encode result: {e}"),
    })
}
