//! Challenges: counted goals keyed to player activity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fasal_common::ChallengeId;
use serde::{Deserialize, Serialize};

use crate::activity::ActivityKind;
use crate::progression::Reward;

/// A challenge in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDefinition {
    /// Challenge ID
    pub id: ChallengeId,
    /// Short title
    pub title: String,
    /// Description
    pub description: String,
    /// Activity that advances it
    pub activity: ActivityKind,
    /// Count needed to complete
    pub target: u32,
    /// Reward on completion
    pub reward: Reward,
}

impl ChallengeDefinition {
    fn new(
        id: u32,
        title: &str,
        description: &str,
        activity: ActivityKind,
        target: u32,
        reward: Reward,
    ) -> Self {
        Self {
            id: ChallengeId::new(id),
            title: title.to_string(),
            description: description.to_string(),
            activity,
            target: target.max(1),
            reward,
        }
    }
}

/// The standard challenge catalogue.
#[must_use]
pub fn default_challenges() -> Vec<ChallengeDefinition> {
    vec![
        ChallengeDefinition::new(
            1,
            "Plant Your Garden",
            "Plant 5 crops",
            ActivityKind::Plant,
            5,
            Reward::new(50, 100),
        ),
        ChallengeDefinition::new(
            2,
            "Water Wise",
            "Water plants 10 times",
            ActivityKind::Water,
            10,
            Reward::new(30, 50),
        ),
        ChallengeDefinition::new(
            3,
            "Harvest Time",
            "Harvest 3 crops",
            ActivityKind::Harvest,
            3,
            Reward::new(100, 200),
        ),
        ChallengeDefinition::new(
            4,
            "Climate Explorer",
            "Check the climate at your farm",
            ActivityKind::ClimateCheck,
            1,
            Reward::new(75, 150),
        ),
        ChallengeDefinition::new(
            5,
            "Crisis Manager",
            "Resolve 3 scenarios",
            ActivityKind::ResolveScenario,
            3,
            Reward::new(120, 100),
        ),
    ]
}

/// A player's progress on one challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    /// Challenge ID
    pub id: ChallengeId,
    /// Progress so far (never above target)
    pub progress: u32,
    /// Count needed
    pub target: u32,
    /// Whether the reward has been credited
    pub completed: bool,
    /// When it completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChallengeProgress {
    /// Fresh progress for a definition.
    #[must_use]
    pub fn new(definition: &ChallengeDefinition) -> Self {
        Self {
            id: definition.id,
            progress: 0,
            target: definition.target.max(1),
            completed: false,
            completed_at: None,
        }
    }

    /// Progress as a percentage.
    #[must_use]
    pub fn percent(&self) -> f32 {
        self.progress as f32 / self.target.max(1) as f32 * 100.0
    }
}

/// Progress on every challenge for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBoard {
    progress: BTreeMap<ChallengeId, ChallengeProgress>,
}

impl ChallengeBoard {
    /// Progress for a challenge, if it has been started.
    #[must_use]
    pub fn get(&self, id: ChallengeId) -> Option<&ChallengeProgress> {
        self.progress.get(&id)
    }

    /// Progress for every challenge in the catalogue, started or not.
    #[must_use]
    pub fn view(&self, catalogue: &[ChallengeDefinition]) -> Vec<ChallengeProgress> {
        catalogue
            .iter()
            .map(|d| {
                self.progress
                    .get(&d.id)
                    .copied()
                    .unwrap_or_else(|| ChallengeProgress::new(d))
            })
            .collect()
    }

    /// Advances a challenge by `amount`, clamped to its target.
    ///
    /// Returns the reward the first time the target is reached and `None`
    /// otherwise. Completed challenges are left untouched.
    pub fn advance(
        &mut self,
        definition: &ChallengeDefinition,
        amount: u32,
        now: DateTime<Utc>,
    ) -> Option<Reward> {
        let entry = self
            .progress
            .entry(definition.id)
            .or_insert_with(|| ChallengeProgress::new(definition));
        if entry.completed {
            return None;
        }
        entry.progress = entry.progress.saturating_add(amount).min(entry.target);
        if entry.progress < entry.target {
            return None;
        }
        entry.completed = true;
        entry.completed_at = Some(now);
        Some(definition.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).single().expect("valid date")
    }

    fn plant_five() -> ChallengeDefinition {
        default_challenges().remove(0)
    }

    #[test]
    fn test_crossing_target_credits_once() {
        let def = plant_five();
        let mut board = ChallengeBoard::default();
        assert_eq!(board.advance(&def, 4, now()), None);
        assert_eq!(board.advance(&def, 2, now()), Some(Reward::new(50, 100)));
        let progress = board.get(def.id).expect("progress");
        assert_eq!(progress.progress, 5);
        assert!(progress.completed);
        assert_eq!(board.advance(&def, 2, now()), None);
        assert_eq!(board.get(def.id).expect("progress").progress, 5);
    }

    #[test]
    fn test_zero_amount_is_noop() {
        let def = plant_five();
        let mut board = ChallengeBoard::default();
        board.advance(&def, 3, now());
        assert_eq!(board.advance(&def, 0, now()), None);
        assert_eq!(board.get(def.id).expect("progress").progress, 3);
    }

    #[test]
    fn test_view_includes_unstarted() {
        let catalogue = default_challenges();
        let board = ChallengeBoard::default();
        let view = board.view(&catalogue);
        assert_eq!(view.len(), catalogue.len());
        assert!(view.iter().all(|p| p.progress == 0 && !p.completed));
    }
}
