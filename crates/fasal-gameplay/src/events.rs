//! Farm event bus.
//!
//! Committed commands and ticks publish [`FarmEvent`]s here for the UI
//! collaborator to drain. Events are published only after the farm has been
//! saved, so a consumer never sees an event for state that was rolled back.

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::warn;

use fasal_common::{AchievementId, ChallengeId, CropId, GridPosition, OwnerId, ScenarioId};

use crate::crops::CropType;
use crate::scenario::{ActionKind, ScenarioKind, Severity};

/// Something that happened on a farm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FarmEvent {
    /// A crop was planted
    CropPlanted {
        /// Farm owner
        owner: OwnerId,
        /// New crop
        crop: CropId,
        /// Kind of crop
        crop_type: CropType,
        /// Plot
        position: GridPosition,
    },
    /// A crop finished growing
    CropReady {
        /// Farm owner
        owner: OwnerId,
        /// Ready crop
        crop: CropId,
    },
    /// A crop was harvested
    CropHarvested {
        /// Farm owner
        owner: OwnerId,
        /// Harvested crop
        crop: CropId,
        /// XP credited
        xp: u64,
        /// Coins credited
        coins: u64,
    },
    /// A scenario was raised
    ScenarioRaised {
        /// Farm owner
        owner: OwnerId,
        /// New scenario
        scenario: ScenarioId,
        /// Affected crop
        crop: CropId,
        /// Kind
        kind: ScenarioKind,
        /// Severity
        severity: Severity,
    },
    /// A scenario was resolved by the player
    ScenarioResolved {
        /// Farm owner
        owner: OwnerId,
        /// Resolved scenario
        scenario: ScenarioId,
        /// Action taken
        action: ActionKind,
    },
    /// A scenario lapsed
    ScenarioExpired {
        /// Farm owner
        owner: OwnerId,
        /// Expired scenario
        scenario: ScenarioId,
    },
    /// A scenario was closed because its crop was harvested
    ScenarioDismissed {
        /// Farm owner
        owner: OwnerId,
        /// Dismissed scenario
        scenario: ScenarioId,
    },
    /// A challenge was completed
    ChallengeCompleted {
        /// Farm owner
        owner: OwnerId,
        /// Completed challenge
        challenge: ChallengeId,
    },
    /// An achievement was unlocked
    AchievementUnlocked {
        /// Farm owner
        owner: OwnerId,
        /// Unlocked achievement
        achievement: AchievementId,
    },
    /// The player reached a new level
    LevelUp {
        /// Farm owner
        owner: OwnerId,
        /// New level
        level: u32,
    },
}

impl FarmEvent {
    /// Owner the event belongs to.
    #[must_use]
    pub const fn owner(&self) -> OwnerId {
        match self {
            Self::CropPlanted { owner, .. }
            | Self::CropReady { owner, .. }
            | Self::CropHarvested { owner, .. }
            | Self::ScenarioRaised { owner, .. }
            | Self::ScenarioResolved { owner, .. }
            | Self::ScenarioExpired { owner, .. }
            | Self::ScenarioDismissed { owner, .. }
            | Self::ChallengeCompleted { owner, .. }
            | Self::AchievementUnlocked { owner, .. }
            | Self::LevelUp { owner, .. } => *owner,
        }
    }
}

/// Bounded multi-producer event queue.
///
/// Publishing never blocks: events arriving while the queue is full are
/// dropped and logged.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<FarmEvent>,
    receiver: Receiver<FarmEvent>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undrained events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes an event. When the bus is full the event is dropped.
    pub fn publish(&self, event: FarmEvent) {
        if self.sender.try_send(event).is_err() {
            warn!("Event bus full ({} pending), dropping event", self.capacity);
        }
    }

    /// Publishes several events in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = FarmEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<FarmEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Receiver handle for a consumer running on another thread.
    #[must_use]
    pub fn receiver(&self) -> Receiver<FarmEvent> {
        self.receiver.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_up(level: u32) -> FarmEvent {
        FarmEvent::LevelUp {
            owner: OwnerId::new(1),
            level,
        }
    }

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new(8);
        bus.publish_all([level_up(2), level_up(3)]);
        assert_eq!(bus.pending_count(), 2);
        assert_eq!(bus.drain(), vec![level_up(2), level_up(3)]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_full_bus_drops() {
        let bus = EventBus::new(1);
        bus.publish(level_up(2));
        bus.publish(level_up(3));
        assert_eq!(bus.drain(), vec![level_up(2)]);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_string(&level_up(4)).expect("serialize");
        assert!(json.contains("\"event\":\"level_up\""));
        assert_eq!(level_up(4).owner(), OwnerId::new(1));
    }
}
