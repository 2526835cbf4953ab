//! Resource and health model.
//!
//! A pure function from a crop's prior resource state and elapsed minutes to
//! its new state. Health penalties accrue per minute spent below a threshold,
//! which makes the result independent of how the elapsed time is split into
//! ticks.

use serde::{Deserialize, Serialize};

/// Upper bound for every resource level.
pub const MAX_LEVEL: f32 = 100.0;

/// Rates and thresholds driving the resource model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthRates {
    /// Growth stage gained per minute before the climate bonus
    pub growth_per_minute: f32,
    /// Water lost per minute
    pub water_depletion_per_minute: f32,
    /// Fertilizer lost per minute
    pub fertilizer_depletion_per_minute: f32,
    /// Water level below which health decays
    pub low_water_threshold: f32,
    /// Fertilizer level below which health decays
    pub low_fertilizer_threshold: f32,
    /// Health lost per minute while water is low
    pub water_health_penalty_per_minute: f32,
    /// Health lost per minute while fertilizer is low
    pub fertilizer_health_penalty_per_minute: f32,
}

impl Default for GrowthRates {
    fn default() -> Self {
        Self {
            // 25% per hour
            growth_per_minute: 25.0 / 60.0,
            water_depletion_per_minute: 1.0 / 60.0,
            fertilizer_depletion_per_minute: 0.8 / 60.0,
            low_water_threshold: 30.0,
            low_fertilizer_threshold: 20.0,
            water_health_penalty_per_minute: 0.01,
            fertilizer_health_penalty_per_minute: 0.01,
        }
    }
}

impl GrowthRates {
    /// Clamps rates to non-negative values and thresholds into range.
    pub fn validate(&mut self) {
        for rate in [
            &mut self.growth_per_minute,
            &mut self.water_depletion_per_minute,
            &mut self.fertilizer_depletion_per_minute,
            &mut self.water_health_penalty_per_minute,
            &mut self.fertilizer_health_penalty_per_minute,
        ] {
            *rate = sanitize_rate(*rate);
        }
        self.low_water_threshold = clamp_level(self.low_water_threshold);
        self.low_fertilizer_threshold = clamp_level(self.low_fertilizer_threshold);
    }
}

/// The time-varying part of a crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Growth stage (0-100)
    pub growth_stage: f32,
    /// Health (0-100)
    pub health: f32,
    /// Water level (0-100)
    pub water_level: f32,
    /// Fertilizer level (0-100)
    pub fertilizer_level: f32,
}

impl ResourceState {
    /// State of a freshly planted crop.
    #[must_use]
    pub const fn seedling() -> Self {
        Self {
            growth_stage: 0.0,
            health: MAX_LEVEL,
            water_level: MAX_LEVEL,
            fertilizer_level: MAX_LEVEL,
        }
    }

    /// Returns a copy with every level clamped to [0, 100].
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            growth_stage: clamp_level(self.growth_stage),
            health: clamp_level(self.health),
            water_level: clamp_level(self.water_level),
            fertilizer_level: clamp_level(self.fertilizer_level),
        }
    }

    /// Whether the crop has finished growing.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.growth_stage >= MAX_LEVEL
    }
}

impl Default for ResourceState {
    fn default() -> Self {
        Self::seedling()
    }
}

/// Advances a crop's resources by `dt_minutes`.
///
/// Non-finite or negative `dt_minutes` is treated as zero elapsed time and a
/// climate bonus below 1.0 is raised to 1.0.
#[must_use]
pub fn advance(
    prior: ResourceState,
    dt_minutes: f32,
    rates: &GrowthRates,
    climate_bonus: f32,
) -> ResourceState {
    let prior = prior.clamped();
    let dt = if dt_minutes.is_finite() {
        dt_minutes.max(0.0)
    } else {
        0.0
    };
    let bonus = if climate_bonus.is_finite() {
        climate_bonus.max(1.0)
    } else {
        1.0
    };

    let growth_rate = sanitize_rate(rates.growth_per_minute);
    let water_rate = sanitize_rate(rates.water_depletion_per_minute);
    let fertilizer_rate = sanitize_rate(rates.fertilizer_depletion_per_minute);

    let growth_stage = (prior.growth_stage + growth_rate * dt * bonus).min(MAX_LEVEL);
    let water_level = (prior.water_level - water_rate * dt).max(0.0);
    let fertilizer_level = (prior.fertilizer_level - fertilizer_rate * dt).max(0.0);

    let water_deficit = minutes_below(prior.water_level, water_rate, rates.low_water_threshold, dt);
    let fertilizer_deficit = minutes_below(
        prior.fertilizer_level,
        fertilizer_rate,
        rates.low_fertilizer_threshold,
        dt,
    );
    let penalty = sanitize_rate(rates.water_health_penalty_per_minute) * water_deficit
        + sanitize_rate(rates.fertilizer_health_penalty_per_minute) * fertilizer_deficit;

    ResourceState {
        growth_stage,
        health: prior.health - penalty,
        water_level,
        fertilizer_level,
    }
    .clamped()
}

/// Minutes within `dt` that a linearly depleting level spends below `threshold`.
fn minutes_below(level: f32, rate: f32, threshold: f32, dt: f32) -> f32 {
    if level < threshold {
        dt
    } else if rate <= 0.0 {
        0.0
    } else {
        (dt - (level - threshold) / rate).max(0.0)
    }
}

fn clamp_level(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_LEVEL)
    }
}

fn sanitize_rate(rate: f32) -> f32 {
    if rate.is_finite() {
        rate.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit_rates() -> GrowthRates {
        GrowthRates {
            growth_per_minute: 1.0,
            ..GrowthRates::default()
        }
    }

    #[test]
    fn test_hundred_minutes_at_unit_rate_is_ready() {
        let state = advance(ResourceState::seedling(), 100.0, &unit_rates(), 1.0);
        assert!((state.growth_stage - 100.0).abs() < f32::EPSILON);
        assert!(state.is_ready());
    }

    #[test]
    fn test_growth_caps_at_hundred() {
        let state = advance(ResourceState::seedling(), 500.0, &unit_rates(), 2.0);
        assert_eq!(state.growth_stage, 100.0);
    }

    #[test]
    fn test_climate_bonus_scales_growth_only() {
        let plain = advance(ResourceState::seedling(), 10.0, &unit_rates(), 1.0);
        let boosted = advance(ResourceState::seedling(), 10.0, &unit_rates(), 1.5);
        assert!((boosted.growth_stage - 15.0).abs() < 1e-4);
        assert_eq!(plain.water_level, boosted.water_level);
    }

    #[test]
    fn test_bonus_below_one_is_ignored() {
        let state = advance(ResourceState::seedling(), 10.0, &unit_rates(), 0.2);
        assert!((state.growth_stage - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_no_penalty_above_thresholds() {
        let state = advance(ResourceState::seedling(), 60.0, &GrowthRates::default(), 1.0);
        assert_eq!(state.health, 100.0);
        assert!((state.water_level - 99.0).abs() < 1e-4);
    }

    #[test]
    fn test_penalty_only_for_minutes_below_threshold() {
        let rates = GrowthRates {
            water_depletion_per_minute: 1.0,
            fertilizer_depletion_per_minute: 0.0,
            water_health_penalty_per_minute: 0.5,
            ..GrowthRates::default()
        };
        let prior = ResourceState {
            water_level: 40.0,
            ..ResourceState::seedling()
        };
        // 10 minutes to reach 30, then 10 minutes below.
        let state = advance(prior, 20.0, &rates, 1.0);
        assert!((state.water_level - 20.0).abs() < 1e-4);
        assert!((state.health - 95.0).abs() < 1e-4);
    }

    #[test]
    fn test_negative_or_nan_elapsed_is_noop() {
        let prior = ResourceState {
            growth_stage: 42.0,
            ..ResourceState::seedling()
        };
        assert_eq!(advance(prior, -5.0, &unit_rates(), 1.0), prior);
        assert_eq!(advance(prior, f32::NAN, &unit_rates(), 1.0), prior);
    }

    fn arb_state() -> impl Strategy<Value = ResourceState> {
        (-20.0f32..120.0, -20.0f32..120.0, -20.0f32..120.0, -20.0f32..120.0).prop_map(
            |(growth_stage, health, water_level, fertilizer_level)| ResourceState {
                growth_stage,
                health,
                water_level,
                fertilizer_level,
            },
        )
    }

    fn arb_rates() -> impl Strategy<Value = GrowthRates> {
        (0.0f32..2.0, 0.01f32..2.0, 0.01f32..2.0, 0.0f32..0.5, 0.0f32..0.5).prop_map(
            |(growth, water, fertilizer, water_penalty, fertilizer_penalty)| GrowthRates {
                growth_per_minute: growth,
                water_depletion_per_minute: water,
                fertilizer_depletion_per_minute: fertilizer,
                water_health_penalty_per_minute: water_penalty,
                fertilizer_health_penalty_per_minute: fertilizer_penalty,
                ..GrowthRates::default()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_levels_stay_in_range(
            prior in arb_state(),
            rates in arb_rates(),
            dt in -10.0f32..10_000.0,
            bonus in 0.0f32..3.0,
        ) {
            let s = advance(prior, dt, &rates, bonus);
            for level in [s.growth_stage, s.health, s.water_level, s.fertilizer_level] {
                prop_assert!((0.0..=100.0).contains(&level));
            }
        }

        #[test]
        fn prop_catch_up_matches_split_ticks(
            prior in arb_state(),
            rates in arb_rates(),
            dt in 0.0f32..500.0,
            split in 0.0f32..1.0,
            bonus in 1.0f32..2.0,
        ) {
            let first = dt * split;
            let once = advance(prior, dt, &rates, bonus);
            let twice = advance(advance(prior, first, &rates, bonus), dt - first, &rates, bonus);
            prop_assert!((once.growth_stage - twice.growth_stage).abs() < 1e-2);
            prop_assert!((once.health - twice.health).abs() < 1e-2);
            prop_assert!((once.water_level - twice.water_level).abs() < 1e-2);
            prop_assert!((once.fertilizer_level - twice.fertilizer_level).abs() < 1e-2);
        }
    }
}
