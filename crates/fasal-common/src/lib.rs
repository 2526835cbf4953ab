//! # Fasal Common
//!
//! Common types, utilities, and shared abstractions for the Fasal farming
//! engine.
//!
//! This crate provides foundational types used across all Fasal subsystems:
//! - Grid positions and geographic locations
//! - ID types (OwnerId, CropId, ScenarioId, etc.)
//! - Version information for persisted snapshots
//! - The shared error taxonomy
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
