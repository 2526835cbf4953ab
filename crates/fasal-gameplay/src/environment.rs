//! Environmental data provider.
//!
//! Daily readings keyed by date, parsed from NASA POWER style responses
//! (`parameter -> {YYYYMMDD -> value}`). Averages feed the climate bonus and
//! the most recent readings feed scenario eligibility.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use fasal_common::Location;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::climate::EnvironmentSample;

/// Temperature at 2 m.
pub const PARAM_TEMPERATURE: &str = "T2M";
/// Corrected precipitation.
pub const PARAM_PRECIPITATION: &str = "PRECTOTCORR";
/// All-sky surface shortwave radiation.
pub const PARAM_SOLAR: &str = "ALLSKY_SFC_SW_DWN";
/// Relative humidity at 2 m.
pub const PARAM_HUMIDITY: &str = "RH2M";
/// Wind speed at 2 m.
pub const PARAM_WIND: &str = "WS2M";

/// Values at or below this are missing-data markers.
const FILL_VALUE: f64 = -999.0;

/// Errors raised by environment providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream source could not be reached
    #[error("Environment source unavailable: {0}")]
    Unavailable(String),
    /// The response could not be parsed
    #[error("Malformed environment data: {0}")]
    Malformed(String),
}

/// Inclusive range of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day
    pub start: NaiveDate,
    /// Last day
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, swapping the bounds if they are reversed.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Window of `lookback_days` ending `lag_days` before `today`.
    #[must_use]
    pub fn lookback(today: NaiveDate, lookback_days: u32, lag_days: u32) -> Self {
        let end = today - Duration::days(i64::from(lag_days));
        let start = end - Duration::days(i64::from(lookback_days));
        Self::new(start, end)
    }

    /// Whether `day` lies in the range.
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// One day of readings. Any parameter may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    /// Day of the readings
    pub date: NaiveDate,
    /// Temperature (°C)
    pub temperature: Option<f32>,
    /// Precipitation (mm/day)
    pub precipitation: Option<f32>,
    /// Solar radiation (MJ/m²/day)
    pub solar_radiation: Option<f32>,
    /// Relative humidity (%)
    pub humidity: Option<f32>,
    /// Wind speed (m/s)
    pub wind_speed: Option<f32>,
}

impl DailyReading {
    /// Empty reading for a day.
    #[must_use]
    pub const fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            temperature: None,
            precipitation: None,
            solar_radiation: None,
            humidity: None,
            wind_speed: None,
        }
    }

    fn slot(&mut self, parameter: &str) -> Option<&mut Option<f32>> {
        match parameter {
            PARAM_TEMPERATURE => Some(&mut self.temperature),
            PARAM_PRECIPITATION => Some(&mut self.precipitation),
            PARAM_SOLAR => Some(&mut self.solar_radiation),
            PARAM_HUMIDITY => Some(&mut self.humidity),
            PARAM_WIND => Some(&mut self.wind_speed),
            _ => None,
        }
    }
}

/// Daily readings sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSeries {
    readings: Vec<DailyReading>,
}

impl EnvironmentSeries {
    /// Builds a series from readings in any order. Later duplicates win.
    #[must_use]
    pub fn from_readings(readings: impl IntoIterator<Item = DailyReading>) -> Self {
        let by_day: BTreeMap<NaiveDate, DailyReading> =
            readings.into_iter().map(|r| (r.date, r)).collect();
        Self {
            readings: by_day.into_values().collect(),
        }
    }

    /// Parses a POWER response.
    ///
    /// Accepts either the full document (`properties.parameter`) or the bare
    /// parameter map. Unknown parameters and fill values are skipped.
    pub fn from_power_json(value: &serde_json::Value) -> Result<Self, ProviderError> {
        let parameters = value
            .get("properties")
            .and_then(|p| p.get("parameter"))
            .unwrap_or(value)
            .as_object()
            .ok_or_else(|| ProviderError::Malformed("expected a parameter object".into()))?;

        let mut days: BTreeMap<NaiveDate, DailyReading> = BTreeMap::new();
        for (parameter, series) in parameters {
            let Some(series) = series.as_object() else {
                return Err(ProviderError::Malformed(format!(
                    "parameter {parameter} is not a date map"
                )));
            };
            for (key, raw) in series {
                let date = NaiveDate::parse_from_str(key, "%Y%m%d")
                    .map_err(|e| ProviderError::Malformed(format!("bad date {key}: {e}")))?;
                let Some(value) = raw.as_f64() else {
                    continue;
                };
                if value <= FILL_VALUE || !value.is_finite() {
                    continue;
                }
                let reading = days.entry(date).or_insert_with(|| DailyReading::empty(date));
                if let Some(slot) = reading.slot(parameter) {
                    *slot = Some(value as f32);
                }
            }
        }

        debug!("Parsed {} days of environment readings", days.len());
        Ok(Self {
            readings: days.into_values().collect(),
        })
    }

    /// Parses a POWER response from a JSON string.
    pub fn from_power_str(json: &str) -> Result<Self, ProviderError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        Self::from_power_json(&value)
    }

    /// Readings in date order.
    #[must_use]
    pub fn readings(&self) -> &[DailyReading] {
        &self.readings
    }

    /// Whether the series has no readings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Readings inside a date range.
    #[must_use]
    pub fn within(&self, range: DateRange) -> Self {
        Self {
            readings: self
                .readings
                .iter()
                .filter(|r| range.contains(r.date))
                .copied()
                .collect(),
        }
    }

    /// Per-parameter mean over the days that report it.
    ///
    /// Returns `None` unless temperature, precipitation and solar radiation
    /// all have at least one reading.
    #[must_use]
    pub fn average(&self) -> Option<EnvironmentSample> {
        let mean = |pick: fn(&DailyReading) -> Option<f32>| {
            let values: Vec<f32> = self.readings.iter().filter_map(pick).collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f32>() / values.len() as f32)
            }
        };
        Some(EnvironmentSample {
            temperature: mean(|r| r.temperature)?,
            precipitation_rate: mean(|r| r.precipitation)?,
            solar_radiation: mean(|r| r.solar_radiation)?,
            humidity: mean(|r| r.humidity),
            wind_speed: mean(|r| r.wind_speed),
        })
    }

    /// Most recent reported value of each parameter.
    #[must_use]
    pub fn latest(&self) -> Option<EnvironmentSample> {
        let last =
            |pick: fn(&DailyReading) -> Option<f32>| self.readings.iter().rev().find_map(pick);
        Some(EnvironmentSample {
            temperature: last(|r| r.temperature)?,
            precipitation_rate: last(|r| r.precipitation)?,
            solar_radiation: last(|r| r.solar_radiation)?,
            humidity: last(|r| r.humidity),
            wind_speed: last(|r| r.wind_speed),
        })
    }
}

/// Inbound source of environmental readings.
pub trait EnvironmentProvider: Send + Sync {
    /// Fetches daily readings for a location.
    fn fetch(&self, location: Location, range: DateRange)
        -> Result<EnvironmentSeries, ProviderError>;
}

/// Provider with no data. Every crop gets the neutral climate bonus.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnvironment;

impl EnvironmentProvider for NoEnvironment {
    fn fetch(&self, _: Location, _: DateRange) -> Result<EnvironmentSeries, ProviderError> {
        Ok(EnvironmentSeries::default())
    }
}

/// Serves one fixed series for every location, ignoring the requested range.
///
/// With no series configured every fetch fails, which models an unreachable
/// upstream.
#[derive(Debug, Default)]
pub struct StaticEnvironment {
    series: RwLock<Option<EnvironmentSeries>>,
}

impl StaticEnvironment {
    /// Creates a provider serving `series`.
    #[must_use]
    pub fn new(series: EnvironmentSeries) -> Self {
        Self {
            series: RwLock::new(Some(series)),
        }
    }

    /// Creates a provider whose fetches always fail.
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Replaces the served series.
    pub fn set_series(&self, series: EnvironmentSeries) {
        *self.series.write() = Some(series);
    }

    /// Makes subsequent fetches fail.
    pub fn clear(&self) {
        *self.series.write() = None;
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn fetch(&self, _: Location, _: DateRange) -> Result<EnvironmentSeries, ProviderError> {
        self.series
            .read()
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("no series configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).expect("valid date")
    }

    const POWER: &str = r#"{
        "properties": {
            "parameter": {
                "T2M": {"20250601": 24.0, "20250602": 26.0, "20250603": -999.0},
                "PRECTOTCORR": {"20250601": 3.0, "20250602": 0.5, "20250603": 0.2},
                "ALLSKY_SFC_SW_DWN": {"20250601": 16.0, "20250602": 18.0},
                "RH2M": {"20250603": 85.0},
                "QV2M": {"20250601": 1.0}
            }
        }
    }"#;

    #[test]
    fn test_parse_power_response() {
        let series = EnvironmentSeries::from_power_str(POWER).expect("parse");
        assert_eq!(series.readings().len(), 3);
        assert_eq!(series.readings()[2].temperature, None);
        assert_eq!(series.readings()[2].humidity, Some(85.0));
    }

    #[test]
    fn test_average_and_latest() {
        let series = EnvironmentSeries::from_power_str(POWER).expect("parse");
        let avg = series.average().expect("average");
        assert!((avg.temperature - 25.0).abs() < 1e-5);
        assert!((avg.solar_radiation - 17.0).abs() < 1e-5);

        let latest = series.latest().expect("latest");
        assert!((latest.temperature - 26.0).abs() < 1e-5);
        assert!((latest.precipitation_rate - 0.2).abs() < 1e-5);
        assert_eq!(latest.humidity, Some(85.0));
        assert_eq!(latest.wind_speed, None);
    }

    #[test]
    fn test_bare_parameter_map_is_accepted() {
        let json = serde_json::json!({"T2M": {"20250601": 21.0}});
        let series = EnvironmentSeries::from_power_json(&json).expect("parse");
        assert_eq!(series.readings().len(), 1);
        // Precipitation and solar missing, so no usable sample.
        assert!(series.average().is_none());
    }

    #[test]
    fn test_bad_date_is_malformed() {
        let json = serde_json::json!({"T2M": {"June 1": 21.0}});
        assert!(matches!(
            EnvironmentSeries::from_power_json(&json),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_lookback_window() {
        let range = DateRange::lookback(day(20), 7, 3);
        assert_eq!(range.end, day(17));
        assert_eq!(range.start, day(10));
        assert!(range.contains(day(12)));
        assert!(!range.contains(day(18)));
    }

    #[test]
    fn test_static_provider_failure() {
        let provider = StaticEnvironment::unavailable();
        let range = DateRange::new(day(1), day(2));
        assert!(provider.fetch(Location::new(0.0, 0.0), range).is_err());
        provider.set_series(EnvironmentSeries::default());
        assert!(provider
            .fetch(Location::new(0.0, 0.0), range)
            .expect("fetch")
            .is_empty());
    }
}
