//! Per-player activity counters and daily streaks.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::crops::{FertilizerTier, WaterTier};

/// Player actions that count toward challenges and achievements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Planted a crop
    Plant,
    /// Watered a crop
    Water,
    /// Fertilized a crop
    Fertilize,
    /// Harvested a crop
    Harvest,
    /// Checked the climate at a location
    ClimateCheck,
    /// Resolved a scenario
    ResolveScenario,
}

/// Lifetime activity for one player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    counts: BTreeMap<ActivityKind, u32>,
    water_tiers: BTreeMap<WaterTier, u32>,
    fertilizer_tiers: BTreeMap<FertilizerTier, u32>,
    premium_care: u32,
    current_streak: u32,
    longest_streak: u32,
    last_active_day: Option<NaiveDate>,
}

impl ActivityStats {
    /// Records one action on `day`.
    pub fn record(&mut self, kind: ActivityKind, day: NaiveDate) {
        *self.counts.entry(kind).or_insert(0) += 1;
        self.touch(day);
    }

    /// Records a watering and its tier.
    pub fn record_water(&mut self, tier: WaterTier, day: NaiveDate) {
        *self.water_tiers.entry(tier).or_insert(0) += 1;
        if matches!(tier, WaterTier::Premium | WaterTier::Expert) {
            self.premium_care += 1;
        }
        self.record(ActivityKind::Water, day);
    }

    /// Records a fertilizing and its tier.
    pub fn record_fertilizer(&mut self, tier: FertilizerTier, day: NaiveDate) {
        *self.fertilizer_tiers.entry(tier).or_insert(0) += 1;
        if tier == FertilizerTier::Premium {
            self.premium_care += 1;
        }
        self.record(ActivityKind::Fertilize, day);
    }

    /// Times an action was taken.
    #[must_use]
    pub fn count(&self, kind: ActivityKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Times a watering tier was used.
    #[must_use]
    pub fn water_tier_count(&self, tier: WaterTier) -> u32 {
        self.water_tiers.get(&tier).copied().unwrap_or(0)
    }

    /// Times a fertilizer tier was used.
    #[must_use]
    pub fn fertilizer_tier_count(&self, tier: FertilizerTier) -> u32 {
        self.fertilizer_tiers.get(&tier).copied().unwrap_or(0)
    }

    /// Premium and expert care actions.
    #[must_use]
    pub const fn premium_care(&self) -> u32 {
        self.premium_care
    }

    /// Consecutive active days ending at the last active day.
    #[must_use]
    pub const fn current_streak(&self) -> u32 {
        self.current_streak
    }

    /// Longest run of consecutive active days.
    #[must_use]
    pub const fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    /// Last day with any activity.
    #[must_use]
    pub const fn last_active_day(&self) -> Option<NaiveDate> {
        self.last_active_day
    }

    fn touch(&mut self, day: NaiveDate) {
        match self.last_active_day {
            Some(last) if day <= last => return,
            Some(last) if last + Duration::days(1) == day => self.current_streak += 1,
            _ => self.current_streak = 1,
        }
        self.last_active_day = Some(day);
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).expect("valid date")
    }

    #[test]
    fn test_counts() {
        let mut stats = ActivityStats::default();
        stats.record(ActivityKind::Plant, day(1));
        stats.record(ActivityKind::Plant, day(1));
        stats.record_water(WaterTier::Expert, day(1));
        stats.record_fertilizer(FertilizerTier::Organic, day(1));
        assert_eq!(stats.count(ActivityKind::Plant), 2);
        assert_eq!(stats.count(ActivityKind::Water), 1);
        assert_eq!(stats.count(ActivityKind::Harvest), 0);
        assert_eq!(stats.premium_care(), 1);
        assert_eq!(stats.fertilizer_tier_count(FertilizerTier::Organic), 1);
    }

    #[test]
    fn test_streaks() {
        let mut stats = ActivityStats::default();
        for d in [1, 2, 2, 3, 5, 6] {
            stats.record(ActivityKind::Water, day(d));
        }
        assert_eq!(stats.current_streak(), 2);
        assert_eq!(stats.longest_streak(), 3);
        assert_eq!(stats.last_active_day(), Some(day(6)));
    }
}
