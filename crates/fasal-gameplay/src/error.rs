//! Farm command errors.

use fasal_common::{
    AchievementId, ChallengeId, CropId, ErrorKind, GridPosition, OwnerId, ScenarioId, StoreError,
};
use thiserror::Error;

use crate::scenario::ActionKind;

/// Error types for farm operations.
#[derive(Debug, Error)]
pub enum FarmError {
    /// No farm exists for the owner
    #[error("Farm not found for {0}")]
    FarmNotFound(OwnerId),
    /// Crop missing from the active set
    #[error("Crop not found: {0}")]
    CropNotFound(CropId),
    /// Scenario missing
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(ScenarioId),
    /// Action not offered by the scenario
    #[error("Action {action:?} is not available for {scenario}")]
    ActionNotFound {
        /// Scenario the action was requested on
        scenario: ScenarioId,
        /// Requested action
        action: ActionKind,
    },
    /// Challenge missing
    #[error("Challenge not found: {0:?}")]
    ChallengeNotFound(ChallengeId),
    /// Achievement missing
    #[error("Achievement not found: {0:?}")]
    AchievementNotFound(AchievementId),

    /// Plot already holds an active crop
    #[error("Slot {0} is already occupied")]
    SlotOccupied(GridPosition),
    /// Harvest attempted before the crop is fully grown
    #[error("{crop} is not ready for harvest (growth {growth:.1}%)")]
    NotReady {
        /// Crop that was not ready
        crop: CropId,
        /// Current growth stage
        growth: f32,
    },
    /// Scenario was already resolved, expired, or dismissed
    #[error("Scenario already resolved: {0}")]
    ScenarioAlreadyResolved(ScenarioId),
    /// Watering or fertilizing blocked by the saturation policy
    #[error("{crop} is already saturated ({level:.1}%)")]
    AlreadySaturated {
        /// Crop that is saturated
        crop: CropId,
        /// Current resource level
        level: f32,
    },
    /// Farm already exists for the owner
    #[error("Farm already exists for {0}")]
    FarmExists(OwnerId),

    /// Coin charge exceeds the balance
    #[error("Insufficient funds: need {needed}, have {have}")]
    InsufficientFunds {
        /// Amount needed
        needed: u64,
        /// Amount available
        have: u64,
    },

    /// Position outside the farm grid
    #[error("Position {position} is outside the {rows}x{cols} farm grid")]
    PositionOutOfRange {
        /// Requested position
        position: GridPosition,
        /// Grid rows
        rows: u16,
        /// Grid columns
        cols: u16,
    },
    /// Malformed input (unknown tier, crop type, bad location)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A committed mutation could not be persisted
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl FarmError {
    /// Classifies the error into the shared taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FarmNotFound(_)
            | Self::CropNotFound(_)
            | Self::ScenarioNotFound(_)
            | Self::ActionNotFound { .. }
            | Self::ChallengeNotFound(_)
            | Self::AchievementNotFound(_) => ErrorKind::NotFound,
            Self::SlotOccupied(_)
            | Self::NotReady { .. }
            | Self::ScenarioAlreadyResolved(_)
            | Self::AlreadySaturated { .. }
            | Self::FarmExists(_) => ErrorKind::InvalidState,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::PositionOutOfRange { .. } | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for farm operations.
pub type FarmResult<T> = Result<T, FarmError>;
