//! # Fasal Gameplay
//!
//! Farming simulation and progression for Fasal.
//!
//! This crate provides the whole simulation core:
//! - Crops with a time-driven resource and health model
//! - Climate bonuses from environmental samples
//! - Scenario events raised against crops and resolved by the player
//! - XP, coins and levels with a journaled ledger
//! - Challenges, achievements and activity statistics
//! - The per-owner farm aggregate, its store and the engine facade
//! - Event bus for the UI collaborator

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod achievements;
pub mod activity;
pub mod challenges;
pub mod climate;
pub mod clock;
pub mod config;
pub mod crops;
pub mod engine;
pub mod environment;
pub mod error;
pub mod events;
pub mod farm;
pub mod growth;
pub mod progression;
pub mod scenario;
pub mod store;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::achievements::*;
    pub use crate::activity::*;
    pub use crate::challenges::*;
    pub use crate::climate::*;
    pub use crate::clock::*;
    pub use crate::config::*;
    pub use crate::crops::*;
    pub use crate::engine::*;
    pub use crate::environment::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::farm::*;
    pub use crate::growth::*;
    pub use crate::progression::*;
    pub use crate::scenario::*;
    pub use crate::store::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use fasal_common::{GridPosition, OwnerId};

    #[test]
    fn test_engine_round_trip() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).single().expect("valid date");
        let clock = Arc::new(ManualClock::new(start));
        let engine = FarmEngine::new(SimConfig::default(), MemoryStore::new())
            .with_clock(clock.clone());
        let owner = OwnerId::new(1);
        engine.open_farm(owner).expect("open");

        let crop = engine
            .plant(owner, GridPosition::new(2, 3), CropType::Tomato, None)
            .expect("plant");
        clock.advance_minutes(300);
        engine.tick();
        let result = engine.harvest(owner, crop.id).expect("harvest");
        assert_eq!(result.xp, 100);
        assert_eq!(result.coins, 200);
        assert!(engine.crops(owner).expect("crops").is_empty());
    }

    #[test]
    fn test_errors_map_to_kinds() {
        use fasal_common::ErrorKind;

        let (engine, owner) = (
            FarmEngine::new(SimConfig::default(), MemoryStore::new()),
            OwnerId::new(4),
        );
        engine.open_farm(owner).expect("open");
        let err = engine
            .plant(owner, GridPosition::new(40, 0), CropType::Wheat, None)
            .expect_err("out of range");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.kind().is_recoverable());
    }
}
