//! Achievements: one-time unlocks with a reward.
//!
//! Unlocking is monotonic. Once stamped, `unlocked_at` never changes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fasal_common::AchievementId;
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityKind, ActivityStats};
use crate::crops::FertilizerTier;
use crate::progression::Reward;

/// Condition that unlocks an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnlockCondition {
    /// Perform an activity a number of times
    ActionCount {
        /// Activity counted
        action: ActivityKind,
        /// Times needed
        count: u32,
    },
    /// Use a fertilizer tier a number of times
    FertilizerTier {
        /// Tier counted
        tier: FertilizerTier,
        /// Times needed
        count: u32,
    },
    /// Use premium or expert care a number of times
    PremiumUsage {
        /// Times needed
        count: u32,
    },
    /// Be active on consecutive days
    Streak {
        /// Days needed
        days: u32,
    },
    /// Earn coins over the farm's lifetime
    TotalCoins {
        /// Coins needed
        amount: u64,
    },
    /// Earn XP
    TotalXp {
        /// XP needed
        amount: u64,
    },
    /// Reach a level
    Level {
        /// Level needed
        level: u32,
    },
}

/// Player figures the conditions are checked against.
#[derive(Debug, Clone, Copy)]
pub struct AchievementContext<'a> {
    /// Activity counters
    pub activity: &'a ActivityStats,
    /// Current XP
    pub xp: u64,
    /// Current level
    pub level: u32,
    /// Coins earned over the farm's lifetime
    pub coins_earned: u64,
}

impl UnlockCondition {
    /// Current and required amounts.
    #[must_use]
    pub fn measure(&self, ctx: &AchievementContext<'_>) -> (u64, u64) {
        match *self {
            Self::ActionCount { action, count } => {
                (u64::from(ctx.activity.count(action)), u64::from(count))
            },
            Self::FertilizerTier { tier, count } => (
                u64::from(ctx.activity.fertilizer_tier_count(tier)),
                u64::from(count),
            ),
            Self::PremiumUsage { count } => {
                (u64::from(ctx.activity.premium_care()), u64::from(count))
            },
            Self::Streak { days } => (
                u64::from(ctx.activity.longest_streak()),
                u64::from(days),
            ),
            Self::TotalCoins { amount } => (ctx.coins_earned, amount),
            Self::TotalXp { amount } => (ctx.xp, amount),
            Self::Level { level } => (u64::from(ctx.level), u64::from(level)),
        }
    }

    /// Whether the condition holds.
    #[must_use]
    pub fn is_met(&self, ctx: &AchievementContext<'_>) -> bool {
        let (current, required) = self.measure(ctx);
        current >= required
    }
}

/// An achievement in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    /// Achievement ID
    pub id: AchievementId,
    /// Stable string key
    pub key: String,
    /// Title
    pub title: String,
    /// Description
    pub description: String,
    /// Unlock condition
    pub condition: UnlockCondition,
    /// One-time reward
    pub reward: Reward,
}

impl AchievementDefinition {
    fn new(
        id: u32,
        key: &str,
        title: &str,
        description: &str,
        condition: UnlockCondition,
        reward: Reward,
    ) -> Self {
        Self {
            id: AchievementId::new(id),
            key: key.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            condition,
            reward,
        }
    }
}

/// The standard achievement catalogue.
#[must_use]
pub fn default_achievements() -> Vec<AchievementDefinition> {
    use ActivityKind as A;
    use UnlockCondition as C;

    vec![
        AchievementDefinition::new(
            1,
            "first_plant",
            "Green Thumb",
            "Plant your first crop",
            C::ActionCount {
                action: A::Plant,
                count: 1,
            },
            Reward::new(50, 25),
        ),
        AchievementDefinition::new(
            2,
            "first_water",
            "Hydration Hero",
            "Water a plant for the first time",
            C::ActionCount {
                action: A::Water,
                count: 1,
            },
            Reward::new(25, 10),
        ),
        AchievementDefinition::new(
            3,
            "first_fertilize",
            "Nutrition Expert",
            "Fertilize a plant for the first time",
            C::ActionCount {
                action: A::Fertilize,
                count: 1,
            },
            Reward::new(35, 15),
        ),
        AchievementDefinition::new(
            4,
            "first_harvest",
            "Harvest Master",
            "Complete your first harvest",
            C::ActionCount {
                action: A::Harvest,
                count: 1,
            },
            Reward::new(100, 50),
        ),
        AchievementDefinition::new(
            5,
            "plant_collector",
            "Plant Collector",
            "Plant 10 crops",
            C::ActionCount {
                action: A::Plant,
                count: 10,
            },
            Reward::new(200, 100),
        ),
        AchievementDefinition::new(
            6,
            "water_master",
            "Water Master",
            "Water plants 50 times",
            C::ActionCount {
                action: A::Water,
                count: 50,
            },
            Reward::new(300, 150),
        ),
        AchievementDefinition::new(
            7,
            "fertilizer_expert",
            "Fertilizer Expert",
            "Use fertilizer 25 times",
            C::ActionCount {
                action: A::Fertilize,
                count: 25,
            },
            Reward::new(250, 125),
        ),
        AchievementDefinition::new(
            8,
            "harvest_champion",
            "Harvest Champion",
            "Complete 20 harvests",
            C::ActionCount {
                action: A::Harvest,
                count: 20,
            },
            Reward::new(500, 250),
        ),
        AchievementDefinition::new(
            9,
            "crisis_solver",
            "Crisis Solver",
            "Resolve 5 scenarios",
            C::ActionCount {
                action: A::ResolveScenario,
                count: 5,
            },
            Reward::new(150, 75),
        ),
        AchievementDefinition::new(
            10,
            "daily_farmer",
            "Daily Farmer",
            "Farm for 7 consecutive days",
            C::Streak { days: 7 },
            Reward::new(300, 150),
        ),
        AchievementDefinition::new(
            11,
            "dedicated_grower",
            "Dedicated Grower",
            "Farm for 30 consecutive days",
            C::Streak { days: 30 },
            Reward::new(1000, 500),
        ),
        AchievementDefinition::new(
            12,
            "sustainability_advocate",
            "Sustainability Advocate",
            "Use organic fertilizer 15 times",
            C::FertilizerTier {
                tier: FertilizerTier::Organic,
                count: 15,
            },
            Reward::new(350, 175),
        ),
        AchievementDefinition::new(
            13,
            "premium_grower",
            "Premium Grower",
            "Use premium care products 10 times",
            C::PremiumUsage { count: 10 },
            Reward::new(600, 300),
        ),
        AchievementDefinition::new(
            14,
            "coin_collector",
            "Coin Collector",
            "Earn 1000 coins total",
            C::TotalCoins { amount: 1000 },
            Reward::new(200, 100),
        ),
        AchievementDefinition::new(
            15,
            "experience_master",
            "Experience Master",
            "Earn 2000 XP total",
            C::TotalXp { amount: 2000 },
            Reward::new(300, 150),
        ),
        AchievementDefinition::new(
            16,
            "level_five",
            "Seasoned Farmer",
            "Reach level 5",
            C::Level { level: 5 },
            Reward::new(500, 250),
        ),
        AchievementDefinition::new(
            17,
            "level_ten",
            "Expert Cultivator",
            "Reach level 10",
            C::Level { level: 10 },
            Reward::new(1000, 500),
        ),
    ]
}

/// An achievement as shown to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementView {
    /// Achievement ID
    pub id: AchievementId,
    /// Stable key
    pub key: String,
    /// Title
    pub title: String,
    /// Whether it is unlocked
    pub unlocked: bool,
    /// When it was unlocked
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Progress toward the condition (0-100)
    pub progress_percent: f32,
    /// Reward
    pub reward: Reward,
}

/// Unlock stamps for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementBook {
    unlocked: BTreeMap<AchievementId, DateTime<Utc>>,
}

impl AchievementBook {
    /// Whether an achievement is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.unlocked.contains_key(&id)
    }

    /// When an achievement was unlocked.
    #[must_use]
    pub fn unlocked_at(&self, id: AchievementId) -> Option<DateTime<Utc>> {
        self.unlocked.get(&id).copied()
    }

    /// Stamps an unlock. Returns false if it was already unlocked.
    pub fn unlock(&mut self, id: AchievementId, now: DateTime<Utc>) -> bool {
        if self.is_unlocked(id) {
            return false;
        }
        self.unlocked.insert(id, now);
        true
    }

    /// Number of unlocked achievements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.unlocked.len()
    }

    /// Whether nothing is unlocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unlocked.is_empty()
    }

    /// First locked achievement whose condition holds.
    #[must_use]
    pub fn next_eligible<'c>(
        &self,
        catalogue: &'c [AchievementDefinition],
        ctx: &AchievementContext<'_>,
    ) -> Option<&'c AchievementDefinition> {
        catalogue
            .iter()
            .find(|d| !self.is_unlocked(d.id) && d.condition.is_met(ctx))
    }

    /// Catalogue with unlock state and progress.
    #[must_use]
    pub fn view(
        &self,
        catalogue: &[AchievementDefinition],
        ctx: &AchievementContext<'_>,
    ) -> Vec<AchievementView> {
        catalogue
            .iter()
            .map(|d| {
                let unlocked_at = self.unlocked_at(d.id);
                let (current, required) = d.condition.measure(ctx);
                let progress_percent = if unlocked_at.is_some() || required == 0 {
                    100.0
                } else {
                    (current.min(required) as f64 / required as f64 * 100.0) as f32
                };
                AchievementView {
                    id: d.id,
                    key: d.key.clone(),
                    title: d.title.clone(),
                    unlocked: unlocked_at.is_some(),
                    unlocked_at,
                    progress_percent,
                    reward: d.reward,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).single().expect("valid date")
    }

    fn ctx(activity: &ActivityStats, xp: u64) -> AchievementContext<'_> {
        AchievementContext {
            activity,
            xp,
            level: crate::progression::recompute_level(xp, 100),
            coins_earned: 0,
        }
    }

    #[test]
    fn test_catalogue_ids_are_unique() {
        let catalogue = default_achievements();
        let mut ids: Vec<_> = catalogue.iter().map(|d| d.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), catalogue.len());
        assert_eq!(catalogue[0].key, "first_plant");
        let last = catalogue.last().expect("non-empty");
        assert_eq!(last.id, AchievementId::new(17));
        assert_eq!(last.condition, UnlockCondition::Level { level: 10 });
        assert_eq!(last.reward, Reward::new(1000, 500));
    }

    #[test]
    fn test_unlock_is_monotonic() {
        let mut book = AchievementBook::default();
        let id = AchievementId::new(1);
        assert!(book.unlock(id, now()));
        assert!(!book.unlock(id, now() + chrono::Duration::days(1)));
        assert_eq!(book.unlocked_at(id), Some(now()));
    }

    #[test]
    fn test_next_eligible_follows_activity() {
        let catalogue = default_achievements();
        let mut activity = ActivityStats::default();
        let book = AchievementBook::default();
        assert!(book.next_eligible(&catalogue, &ctx(&activity, 0)).is_none());

        let day = NaiveDate::from_ymd_opt(2025, 3, 3).expect("valid date");
        activity.record(ActivityKind::Plant, day);
        let found = book
            .next_eligible(&catalogue, &ctx(&activity, 0))
            .expect("eligible");
        assert_eq!(found.key, "first_plant");
    }

    #[test]
    fn test_level_condition() {
        let activity = ActivityStats::default();
        let condition = UnlockCondition::Level { level: 5 };
        assert!(!condition.is_met(&ctx(&activity, 399)));
        assert!(condition.is_met(&ctx(&activity, 400)));
    }

    #[test]
    fn test_view_progress() {
        let catalogue = default_achievements();
        let activity = ActivityStats::default();
        let book = AchievementBook::default();
        let view = book.view(&catalogue, &ctx(&activity, 1000));
        let experience = view
            .iter()
            .find(|v| v.key == "experience_master")
            .expect("present");
        assert!((experience.progress_percent - 50.0).abs() < 1e-4);
        assert!(!experience.unlocked);
    }
}
