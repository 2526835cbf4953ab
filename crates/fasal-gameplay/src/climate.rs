//! Climate modifier calculator.
//!
//! Maps an environmental sample to a growth and yield multiplier. Each band
//! contributes a bonus when the sample falls inside it; there are no
//! penalties, so the multiplier is always at least 1.0.

use serde::{Deserialize, Serialize};

/// Averaged environmental conditions for a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    /// Air temperature at 2 m (°C)
    pub temperature: f32,
    /// Precipitation (mm/day)
    pub precipitation_rate: f32,
    /// All-sky surface shortwave radiation (MJ/m²/day)
    pub solar_radiation: f32,
    /// Relative humidity (%)
    #[serde(default)]
    pub humidity: Option<f32>,
    /// Wind speed at 2 m (m/s)
    #[serde(default)]
    pub wind_speed: Option<f32>,
}

impl EnvironmentSample {
    /// Creates a sample with only the three core readings.
    #[must_use]
    pub const fn new(temperature: f32, precipitation_rate: f32, solar_radiation: f32) -> Self {
        Self {
            temperature,
            precipitation_rate,
            solar_radiation,
            humidity: None,
            wind_speed: None,
        }
    }

    /// Adds a humidity reading.
    #[must_use]
    pub const fn with_humidity(mut self, humidity: f32) -> Self {
        self.humidity = Some(humidity);
        self
    }

    /// Adds a wind speed reading.
    #[must_use]
    pub const fn with_wind_speed(mut self, wind_speed: f32) -> Self {
        self.wind_speed = Some(wind_speed);
        self
    }
}

/// Inclusive ranges with a primary (narrow) and secondary (wide) bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBands {
    /// Lower bound of the primary band
    pub primary_min: f32,
    /// Upper bound of the primary band
    pub primary_max: f32,
    /// Bonus inside the primary band
    pub primary_bonus: f32,
    /// Lower bound of the secondary band
    pub secondary_min: f32,
    /// Upper bound of the secondary band
    pub secondary_max: f32,
    /// Bonus inside the secondary band only
    pub secondary_bonus: f32,
}

impl RangeBands {
    /// Bonus for a value.
    #[must_use]
    pub fn bonus(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return 0.0;
        }
        if (self.primary_min..=self.primary_max).contains(&value) {
            self.primary_bonus.max(0.0)
        } else if (self.secondary_min..=self.secondary_max).contains(&value) {
            self.secondary_bonus.max(0.0)
        } else {
            0.0
        }
    }
}

/// Strict lower thresholds with a primary and secondary bonus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBands {
    /// Value must exceed this for the primary bonus
    pub primary_above: f32,
    /// Primary bonus
    pub primary_bonus: f32,
    /// Value must exceed this for the secondary bonus
    pub secondary_above: f32,
    /// Secondary bonus
    pub secondary_bonus: f32,
}

impl ThresholdBands {
    /// Bonus for a value.
    #[must_use]
    pub fn bonus(&self, value: f32) -> f32 {
        if !value.is_finite() {
            0.0
        } else if value > self.primary_above {
            self.primary_bonus.max(0.0)
        } else if value > self.secondary_above {
            self.secondary_bonus.max(0.0)
        } else {
            0.0
        }
    }
}

/// Climate modifier configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    /// Temperature bands (°C)
    pub temperature: RangeBands,
    /// Precipitation bands (mm/day)
    pub precipitation: RangeBands,
    /// Solar radiation thresholds
    pub solar: ThresholdBands,
    /// Maximum multiplier
    pub cap: f32,
    /// Days of history averaged for the bonus
    pub lookback_days: u32,
    /// Days the data source lags behind today
    pub lag_days: u32,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            temperature: RangeBands {
                primary_min: 20.0,
                primary_max: 30.0,
                primary_bonus: 0.2,
                secondary_min: 15.0,
                secondary_max: 35.0,
                secondary_bonus: 0.1,
            },
            precipitation: RangeBands {
                primary_min: 2.0,
                primary_max: 5.0,
                primary_bonus: 0.15,
                secondary_min: 1.0,
                secondary_max: 7.0,
                secondary_bonus: 0.05,
            },
            solar: ThresholdBands {
                primary_above: 15.0,
                primary_bonus: 0.1,
                secondary_above: 10.0,
                secondary_bonus: 0.05,
            },
            cap: 2.0,
            lookback_days: 7,
            lag_days: 3,
        }
    }
}

impl ClimateConfig {
    /// Keeps the cap at or above 1.0.
    pub fn validate(&mut self) {
        if !self.cap.is_finite() || self.cap < 1.0 {
            self.cap = 1.0;
        }
        self.lookback_days = self.lookback_days.max(1);
    }
}

/// Breakdown of a climate multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateReport {
    /// Bonus from temperature
    pub temperature_bonus: f32,
    /// Bonus from precipitation
    pub precipitation_bonus: f32,
    /// Bonus from solar radiation
    pub solar_bonus: f32,
    /// Final capped multiplier
    pub multiplier: f32,
}

impl ClimateReport {
    /// Report for a missing sample.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            temperature_bonus: 0.0,
            precipitation_bonus: 0.0,
            solar_bonus: 0.0,
            multiplier: 1.0,
        }
    }

    /// Evaluates a sample against the configured bands.
    #[must_use]
    pub fn evaluate(sample: Option<&EnvironmentSample>, config: &ClimateConfig) -> Self {
        let Some(sample) = sample else {
            return Self::neutral();
        };
        let temperature_bonus = config.temperature.bonus(sample.temperature);
        let precipitation_bonus = config.precipitation.bonus(sample.precipitation_rate);
        let solar_bonus = config.solar.bonus(sample.solar_radiation);
        let cap = if config.cap.is_finite() {
            config.cap.max(1.0)
        } else {
            1.0
        };
        let multiplier = (1.0 + temperature_bonus + precipitation_bonus + solar_bonus).min(cap);
        Self {
            temperature_bonus,
            precipitation_bonus,
            solar_bonus,
            multiplier,
        }
    }
}

/// Growth and yield multiplier for an optional sample.
#[must_use]
pub fn climate_multiplier(sample: Option<&EnvironmentSample>, config: &ClimateConfig) -> f32 {
    ClimateReport::evaluate(sample, config).multiplier
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_missing_sample_is_neutral() {
        assert_eq!(climate_multiplier(None, &ClimateConfig::default()), 1.0);
    }

    #[test]
    fn test_ideal_conditions() {
        let sample = EnvironmentSample::new(25.0, 3.0, 18.0);
        let m = climate_multiplier(Some(&sample), &ClimateConfig::default());
        assert!((m - 1.45).abs() < 1e-5);
    }

    #[test]
    fn test_secondary_bands() {
        let sample = EnvironmentSample::new(33.0, 6.5, 12.0);
        let report = ClimateReport::evaluate(Some(&sample), &ClimateConfig::default());
        assert!((report.temperature_bonus - 0.1).abs() < 1e-6);
        assert!((report.precipitation_bonus - 0.05).abs() < 1e-6);
        assert!((report.solar_bonus - 0.05).abs() < 1e-6);
        assert!((report.multiplier - 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_band_edges() {
        let config = ClimateConfig::default();
        assert!((config.temperature.bonus(20.0) - 0.2).abs() < 1e-6);
        assert!((config.temperature.bonus(30.0) - 0.2).abs() < 1e-6);
        // Solar thresholds are strict.
        assert!((config.solar.bonus(15.0) - 0.05).abs() < 1e-6);
        assert_eq!(config.solar.bonus(10.0), 0.0);
    }

    #[test]
    fn test_hostile_conditions_give_no_penalty() {
        let sample = EnvironmentSample::new(45.0, 30.0, 1.0);
        assert_eq!(
            climate_multiplier(Some(&sample), &ClimateConfig::default()),
            1.0
        );
    }

    #[test]
    fn test_cap_applies() {
        let config = ClimateConfig {
            cap: 1.25,
            ..ClimateConfig::default()
        };
        let sample = EnvironmentSample::new(25.0, 3.0, 18.0);
        assert_eq!(climate_multiplier(Some(&sample), &config), 1.25);
    }

    proptest! {
        #[test]
        fn prop_multiplier_within_bounds(t in -60.0f32..60.0, p in 0.0f32..50.0, s in 0.0f32..40.0) {
            let config = ClimateConfig::default();
            let m = climate_multiplier(Some(&EnvironmentSample::new(t, p, s)), &config);
            prop_assert!(m >= 1.0);
            prop_assert!(m <= config.cap);
        }
    }
}
