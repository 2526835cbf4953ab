//! Scenario engine.
//!
//! Scenarios are adverse conditions raised against a single crop. Each comes
//! with a menu of actions; resolving one consumes exactly one action. Unresolved
//! scenarios expire after their playbook's lifetime and harvesting a crop
//! dismisses whatever is still open on it.
//!
//! Eligibility is a pure function of crop state and the latest environmental
//! reading, see [`evaluate`].

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use fasal_common::{CropId, ScenarioId};
use serde::{Deserialize, Serialize};

use crate::climate::EnvironmentSample;
use crate::crops::Crop;
use crate::error::{FarmError, FarmResult};
use crate::progression::Reward;

/// Kinds of scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Little rain and low soil water
    Drought,
    /// Heavy rain
    Flood,
    /// Warm humid weather favouring pests
    Pest,
    /// Poor crop health
    Disease,
    /// Depleted fertilizer
    FertilizerShortage,
    /// High winds
    ExtremeWeather,
    /// Excessive heat
    HeatStress,
    /// Excessive cold
    ColdStress,
    /// Insufficient sunlight
    LowLight,
}

impl ScenarioKind {
    /// Every scenario kind, in evaluation order.
    pub const ALL: [Self; 9] = [
        Self::Drought,
        Self::Flood,
        Self::Pest,
        Self::Disease,
        Self::FertilizerShortage,
        Self::ExtremeWeather,
        Self::HeatStress,
        Self::ColdStress,
        Self::LowLight,
    ];
}

/// Severity of a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Slightly past the trigger
    Low,
    /// Well past the trigger
    Medium,
    /// Far past the trigger
    High,
}

impl Severity {
    /// Severity for a relative excess over a trigger threshold.
    #[must_use]
    pub fn from_excess(excess: f32) -> Self {
        if excess < 0.33 {
            Self::Low
        } else if excess < 0.66 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

/// Every action a player can take on a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ActionKind {
    InstallDripIrrigation,
    ApplyMulch,
    DeepWatering,
    ImproveDrainage,
    RaisedBeds,
    FungicideTreatment,
    BeneficialInsects,
    OrganicSpray,
    CompanionPlanting,
    RemoveInfectedLeaves,
    ApplyBiofungicide,
    ApplyCompost,
    SlowReleaseFertilizer,
    Windbreak,
    CropSupport,
    ShadeCloth,
    MistingSystem,
    FrostProtection,
    HeatingSystem,
    LedGrowLights,
    ReflectiveMulch,
}

impl ActionKind {
    /// Human readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::InstallDripIrrigation => "Install Drip Irrigation",
            Self::ApplyMulch => "Apply Organic Mulch",
            Self::DeepWatering => "Deep Watering",
            Self::ImproveDrainage => "Improve Drainage",
            Self::RaisedBeds => "Build Raised Beds",
            Self::FungicideTreatment => "Fungicide Treatment",
            Self::BeneficialInsects => "Release Beneficial Insects",
            Self::OrganicSpray => "Organic Pest Spray",
            Self::CompanionPlanting => "Companion Planting",
            Self::RemoveInfectedLeaves => "Remove Infected Leaves",
            Self::ApplyBiofungicide => "Apply Biofungicide",
            Self::ApplyCompost => "Apply Compost",
            Self::SlowReleaseFertilizer => "Slow-Release Fertilizer",
            Self::Windbreak => "Plant Windbreak",
            Self::CropSupport => "Stake Crop Supports",
            Self::ShadeCloth => "Install Shade Cloth",
            Self::MistingSystem => "Misting System",
            Self::FrostProtection => "Frost Protection Covers",
            Self::HeatingSystem => "Greenhouse Heating",
            Self::LedGrowLights => "LED Grow Lights",
            Self::ReflectiveMulch => "Reflective Mulch",
        }
    }
}

/// An action offered on a raised scenario, already scaled by severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioAction {
    /// Action kind
    pub kind: ActionKind,
    /// Display name
    pub name: String,
    /// Coin cost
    pub cost: u64,
    /// Effectiveness (0-100)
    pub effectiveness: u8,
    /// Reward on completion
    pub reward: Reward,
}

/// Where a scenario is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Open and awaiting an action
    Active,
    /// Resolved by the player
    Resolved {
        /// Action taken
        action: ActionKind,
        /// When
        at: DateTime<Utc>,
    },
    /// Lapsed without an action
    Expired {
        /// When
        at: DateTime<Utc>,
    },
    /// Closed because its crop was harvested
    Dismissed {
        /// When
        at: DateTime<Utc>,
    },
}

/// A scenario raised against a crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    /// Scenario ID
    pub id: ScenarioId,
    /// Affected crop
    pub crop: CropId,
    /// Scenario kind
    pub kind: ScenarioKind,
    /// Severity
    pub severity: Severity,
    /// Lifecycle status
    pub status: ScenarioStatus,
    /// When it was raised
    pub created_at: DateTime<Utc>,
    /// When it lapses if unresolved
    pub expires_at: Option<DateTime<Utc>>,
    /// Offered actions, most effective first
    pub actions: Vec<ScenarioAction>,
}

impl ScenarioEvent {
    /// Whether the scenario is still open.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ScenarioStatus::Active
    }

    /// Whether the scenario has passed its expiry time.
    #[must_use]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }

    /// The most effective action.
    #[must_use]
    pub fn top_action(&self) -> Option<&ScenarioAction> {
        self.actions.first()
    }

    /// Looks up an action that may still be taken at `now`.
    pub fn available_action(
        &self,
        kind: ActionKind,
        now: DateTime<Utc>,
    ) -> FarmResult<&ScenarioAction> {
        if !self.is_active() || self.is_past_expiry(now) {
            return Err(FarmError::ScenarioAlreadyResolved(self.id));
        }
        self.actions
            .iter()
            .find(|a| a.kind == kind)
            .ok_or(FarmError::ActionNotFound {
                scenario: self.id,
                action: kind,
            })
    }
}

/// Result of resolving a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Resolved scenario
    pub scenario: ScenarioId,
    /// Action taken
    pub action: ActionKind,
    /// Coins charged
    pub cost: u64,
    /// Reward credited
    pub rewards: Reward,
    /// Effectiveness of the action (0-100)
    pub effectiveness: u8,
}

/// Unscaled action definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTemplate {
    /// Action kind
    pub kind: ActionKind,
    /// Base coin cost
    pub cost: u64,
    /// Effectiveness (0-100)
    pub effectiveness: u8,
    /// Base reward
    pub reward: Reward,
}

impl ActionTemplate {
    /// Creates a template.
    #[must_use]
    pub const fn new(kind: ActionKind, cost: u64, effectiveness: u8, xp: u64, coins: u64) -> Self {
        Self {
            kind,
            cost,
            effectiveness,
            reward: Reward::new(xp, coins),
        }
    }
}

/// Actions and lifetime for one scenario kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playbook {
    /// Scenario kind
    pub kind: ScenarioKind,
    /// Hours until an unresolved scenario expires; `None` never expires
    pub lifetime_hours: Option<u32>,
    /// Offered actions
    pub actions: Vec<ActionTemplate>,
}

/// Trigger thresholds for every rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioThresholds {
    /// Drought: precipitation below (mm/day)
    pub drought_precipitation: f32,
    /// Drought: water level below
    pub drought_water_level: f32,
    /// Flood: precipitation above (mm/day)
    pub flood_precipitation: f32,
    /// Pest: humidity above (%)
    pub pest_humidity: f32,
    /// Pest: temperature above (°C)
    pub pest_temperature: f32,
    /// Heat stress: temperature above (°C)
    pub heat_temperature: f32,
    /// Cold stress: temperature below (°C)
    pub cold_temperature: f32,
    /// Low light: solar radiation below
    pub low_light_solar: f32,
    /// Extreme weather: wind speed above (m/s)
    pub extreme_wind: f32,
    /// Fertilizer shortage: fertilizer level below
    pub fertilizer_level: f32,
    /// Disease: health below
    pub disease_health: f32,
}

impl Default for ScenarioThresholds {
    fn default() -> Self {
        Self {
            drought_precipitation: 1.0,
            drought_water_level: 30.0,
            flood_precipitation: 15.0,
            pest_humidity: 80.0,
            pest_temperature: 25.0,
            heat_temperature: 40.0,
            cold_temperature: 10.0,
            low_light_solar: 3.0,
            extreme_wind: 15.0,
            fertilizer_level: 20.0,
            disease_health: 40.0,
        }
    }
}

/// Cost and reward multipliers per severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityScaling {
    /// Multiplier for low severity
    pub low: f32,
    /// Multiplier for medium severity
    pub medium: f32,
    /// Multiplier for high severity
    pub high: f32,
}

impl Default for SeverityScaling {
    fn default() -> Self {
        Self {
            low: 0.75,
            medium: 1.0,
            high: 1.5,
        }
    }
}

impl SeverityScaling {
    /// Multiplier for a severity.
    #[must_use]
    pub const fn factor(&self, severity: Severity) -> f32 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }
}

/// Scenario engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Trigger thresholds
    pub thresholds: ScenarioThresholds,
    /// Severity multipliers
    pub severity: SeverityScaling,
    /// Action tables
    pub playbooks: Vec<Playbook>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        use ActionKind as A;
        let playbook = |kind, hours, actions: Vec<ActionTemplate>| Playbook {
            kind,
            lifetime_hours: Some(hours),
            actions,
        };
        Self {
            thresholds: ScenarioThresholds::default(),
            severity: SeverityScaling::default(),
            playbooks: vec![
                playbook(
                    ScenarioKind::Drought,
                    48,
                    vec![
                        ActionTemplate::new(A::InstallDripIrrigation, 200, 90, 100, 50),
                        ActionTemplate::new(A::ApplyMulch, 50, 70, 60, 20),
                        ActionTemplate::new(A::DeepWatering, 80, 60, 40, 10),
                    ],
                ),
                playbook(
                    ScenarioKind::Flood,
                    24,
                    vec![
                        ActionTemplate::new(A::ImproveDrainage, 300, 95, 120, 80),
                        ActionTemplate::new(A::RaisedBeds, 150, 80, 80, 40),
                        ActionTemplate::new(A::FungicideTreatment, 100, 70, 50, 20),
                    ],
                ),
                playbook(
                    ScenarioKind::Pest,
                    36,
                    vec![
                        ActionTemplate::new(A::BeneficialInsects, 180, 85, 90, 60),
                        ActionTemplate::new(A::OrganicSpray, 120, 75, 70, 30),
                        ActionTemplate::new(A::CompanionPlanting, 80, 60, 50, 25),
                    ],
                ),
                playbook(
                    ScenarioKind::Disease,
                    48,
                    vec![
                        ActionTemplate::new(A::ApplyBiofungicide, 140, 85, 80, 40),
                        ActionTemplate::new(A::RemoveInfectedLeaves, 60, 70, 50, 20),
                    ],
                ),
                playbook(
                    ScenarioKind::FertilizerShortage,
                    72,
                    vec![
                        ActionTemplate::new(A::SlowReleaseFertilizer, 90, 85, 70, 30),
                        ActionTemplate::new(A::ApplyCompost, 40, 70, 40, 15),
                    ],
                ),
                playbook(
                    ScenarioKind::ExtremeWeather,
                    6,
                    vec![
                        ActionTemplate::new(A::Windbreak, 180, 85, 80, 40),
                        ActionTemplate::new(A::CropSupport, 60, 70, 40, 15),
                    ],
                ),
                playbook(
                    ScenarioKind::HeatStress,
                    12,
                    vec![
                        ActionTemplate::new(A::ShadeCloth, 120, 80, 70, 35),
                        ActionTemplate::new(A::MistingSystem, 200, 90, 100, 50),
                    ],
                ),
                playbook(
                    ScenarioKind::ColdStress,
                    18,
                    vec![
                        ActionTemplate::new(A::FrostProtection, 100, 85, 60, 30),
                        ActionTemplate::new(A::HeatingSystem, 250, 95, 120, 70),
                    ],
                ),
                playbook(
                    ScenarioKind::LowLight,
                    72,
                    vec![
                        ActionTemplate::new(A::LedGrowLights, 300, 90, 110, 80),
                        ActionTemplate::new(A::ReflectiveMulch, 80, 60, 40, 20),
                    ],
                ),
            ],
        }
    }
}

impl ScenarioConfig {
    /// Playbook for a kind.
    #[must_use]
    pub fn playbook(&self, kind: ScenarioKind) -> Option<&Playbook> {
        self.playbooks.iter().find(|p| p.kind == kind)
    }

    /// Clamps severity multipliers and effectiveness values into range.
    pub fn validate(&mut self) {
        for factor in [
            &mut self.severity.low,
            &mut self.severity.medium,
            &mut self.severity.high,
        ] {
            if !factor.is_finite() || *factor < 0.0 {
                *factor = 1.0;
            }
        }
        for playbook in &mut self.playbooks {
            for action in &mut playbook.actions {
                action.effectiveness = action.effectiveness.min(100);
            }
        }
    }

    /// Builds a scenario for a trigger, or `None` without a playbook.
    #[must_use]
    pub fn instantiate(
        &self,
        id: ScenarioId,
        crop: CropId,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Option<ScenarioEvent> {
        let playbook = self.playbook(trigger.kind)?;
        let severity = Severity::from_excess(trigger.excess);
        let factor = self.severity.factor(severity);

        let mut actions: Vec<ScenarioAction> = playbook
            .actions
            .iter()
            .map(|t| ScenarioAction {
                kind: t.kind,
                name: t.kind.display_name().to_string(),
                cost: Reward::new(0, t.cost).scaled(factor).coins,
                effectiveness: t.effectiveness.min(100),
                reward: t.reward.scaled(factor),
            })
            .collect();
        actions.sort_by(|a, b| b.effectiveness.cmp(&a.effectiveness));

        Some(ScenarioEvent {
            id,
            crop,
            kind: trigger.kind,
            severity,
            status: ScenarioStatus::Active,
            created_at: now,
            expires_at: playbook
                .lifetime_hours
                .map(|hours| now + Duration::hours(i64::from(hours))),
            actions,
        })
    }
}

/// An eligible scenario kind and how far past its threshold it is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Eligible kind
    pub kind: ScenarioKind,
    /// Relative distance past the threshold
    pub excess: f32,
}

fn above(value: f32, threshold: f32) -> Option<f32> {
    (value.is_finite() && value > threshold).then(|| (value - threshold) / threshold.abs().max(1.0))
}

fn below(value: f32, threshold: f32) -> Option<f32> {
    (value.is_finite() && value < threshold).then(|| (threshold - value) / threshold.abs().max(1.0))
}

/// Scenario kinds the crop is currently eligible for.
///
/// Weather rules need `latest`; crop-state rules always apply.
#[must_use]
pub fn evaluate(
    crop: &Crop,
    latest: Option<&EnvironmentSample>,
    thresholds: &ScenarioThresholds,
) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    let mut push = |kind, excess: Option<f32>| {
        if let Some(excess) = excess {
            triggers.push(Trigger { kind, excess });
        }
    };

    if let Some(sample) = latest {
        let drought = below(sample.precipitation_rate, thresholds.drought_precipitation)
            .zip(below(crop.water_level, thresholds.drought_water_level))
            .map(|(rain, water)| rain.max(water));
        push(ScenarioKind::Drought, drought);
        push(
            ScenarioKind::Flood,
            above(sample.precipitation_rate, thresholds.flood_precipitation),
        );
        let pest = sample
            .humidity
            .and_then(|h| above(h, thresholds.pest_humidity))
            .zip(above(sample.temperature, thresholds.pest_temperature))
            .map(|(humidity, heat)| humidity.max(heat));
        push(ScenarioKind::Pest, pest);
        push(
            ScenarioKind::ExtremeWeather,
            sample.wind_speed.and_then(|w| above(w, thresholds.extreme_wind)),
        );
        push(
            ScenarioKind::HeatStress,
            above(sample.temperature, thresholds.heat_temperature),
        );
        push(
            ScenarioKind::ColdStress,
            below(sample.temperature, thresholds.cold_temperature),
        );
        push(
            ScenarioKind::LowLight,
            below(sample.solar_radiation, thresholds.low_light_solar),
        );
    }

    push(
        ScenarioKind::Disease,
        below(crop.health, thresholds.disease_health),
    );
    push(
        ScenarioKind::FertilizerShortage,
        below(crop.fertilizer_level, thresholds.fertilizer_level),
    );

    triggers
}

/// Every scenario a farm has raised, keyed by ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioBook {
    events: BTreeMap<ScenarioId, ScenarioEvent>,
}

impl ScenarioBook {
    /// Looks up a scenario.
    pub fn get(&self, id: ScenarioId) -> FarmResult<&ScenarioEvent> {
        self.events.get(&id).ok_or(FarmError::ScenarioNotFound(id))
    }

    /// Whether the crop already has an active scenario of this kind.
    #[must_use]
    pub fn has_active(&self, crop: CropId, kind: ScenarioKind) -> bool {
        self.events
            .values()
            .any(|e| e.crop == crop && e.kind == kind && e.is_active())
    }

    /// Records a newly raised scenario.
    pub fn raise(&mut self, event: ScenarioEvent) {
        self.events.insert(event.id, event);
    }

    /// Active scenarios, optionally for one crop, in ID order.
    #[must_use]
    pub fn active(&self, crop: Option<CropId>) -> Vec<&ScenarioEvent> {
        self.events
            .values()
            .filter(|e| e.is_active() && crop.map_or(true, |c| e.crop == c))
            .collect()
    }

    /// Marks a scenario resolved.
    pub fn resolve(
        &mut self,
        id: ScenarioId,
        action: ActionKind,
        at: DateTime<Utc>,
    ) -> FarmResult<()> {
        let event = self
            .events
            .get_mut(&id)
            .ok_or(FarmError::ScenarioNotFound(id))?;
        if !event.is_active() {
            return Err(FarmError::ScenarioAlreadyResolved(id));
        }
        event.status = ScenarioStatus::Resolved { action, at };
        Ok(())
    }

    /// Expires every active scenario past its expiry. Returns the expired IDs.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Vec<ScenarioId> {
        let mut expired = Vec::new();
        for event in self.events.values_mut() {
            if event.is_active() && event.is_past_expiry(now) {
                event.status = ScenarioStatus::Expired { at: now };
                expired.push(event.id);
            }
        }
        expired
    }

    /// Dismisses every active scenario on a crop. Returns the dismissed IDs.
    pub fn dismiss_for_crop(&mut self, crop: CropId, now: DateTime<Utc>) -> Vec<ScenarioId> {
        let mut dismissed = Vec::new();
        for event in self.events.values_mut() {
            if event.crop == crop && event.is_active() {
                event.status = ScenarioStatus::Dismissed { at: now };
                dismissed.push(event.id);
            }
        }
        dismissed
    }

    /// Number of scenarios ever raised.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no scenario was ever raised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fasal_common::{GridPosition, OwnerId};

    use crate::crops::CropType;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).single().expect("valid date")
    }

    fn crop() -> Crop {
        Crop::seedling(
            CropId::from_raw(1),
            OwnerId::new(1),
            CropType::Wheat,
            GridPosition::new(0, 0),
            None,
            1.0,
            now(),
        )
    }

    fn kinds(triggers: &[Trigger]) -> Vec<ScenarioKind> {
        triggers.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_drought_needs_dry_weather_and_low_water() {
        let thresholds = ScenarioThresholds::default();
        let dry = EnvironmentSample::new(22.0, 0.5, 12.0);
        let mut c = crop();
        assert!(evaluate(&c, Some(&dry), &thresholds).is_empty());

        c.water_level = 25.0;
        let triggers = evaluate(&c, Some(&dry), &thresholds);
        assert_eq!(kinds(&triggers), vec![ScenarioKind::Drought]);
        assert_eq!(Severity::from_excess(triggers[0].excess), Severity::Medium);
    }

    #[test]
    fn test_weather_rules() {
        let thresholds = ScenarioThresholds::default();
        let storm = EnvironmentSample::new(27.0, 20.0, 2.0)
            .with_humidity(92.0)
            .with_wind_speed(18.0);
        let found = kinds(&evaluate(&crop(), Some(&storm), &thresholds));
        assert!(found.contains(&ScenarioKind::Flood));
        assert!(found.contains(&ScenarioKind::Pest));
        assert!(found.contains(&ScenarioKind::ExtremeWeather));
        assert!(found.contains(&ScenarioKind::LowLight));
        assert!(!found.contains(&ScenarioKind::Drought));
    }

    #[test]
    fn test_crop_rules_apply_without_weather() {
        let mut c = crop();
        c.health = 30.0;
        c.fertilizer_level = 10.0;
        let found = kinds(&evaluate(&c, None, &ScenarioThresholds::default()));
        assert_eq!(
            found,
            vec![ScenarioKind::Disease, ScenarioKind::FertilizerShortage]
        );
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_excess(0.1), Severity::Low);
        assert_eq!(Severity::from_excess(0.5), Severity::Medium);
        assert_eq!(Severity::from_excess(0.9), Severity::High);
    }

    #[test]
    fn test_instantiate_scales_and_sorts_actions() {
        let config = ScenarioConfig::default();
        let trigger = Trigger {
            kind: ScenarioKind::HeatStress,
            excess: 0.8,
        };
        let event = config
            .instantiate(ScenarioId::from_raw(3), CropId::from_raw(1), trigger, now())
            .expect("playbook");
        assert_eq!(event.severity, Severity::High);
        let top = event.top_action().expect("actions");
        assert_eq!(top.kind, ActionKind::MistingSystem);
        assert_eq!(top.cost, 300);
        assert_eq!(top.reward, Reward::new(150, 75));
        assert_eq!(event.expires_at, Some(now() + Duration::hours(12)));
    }

    #[test]
    fn test_book_lifecycle() {
        let config = ScenarioConfig::default();
        let mut book = ScenarioBook::default();
        let trigger = Trigger {
            kind: ScenarioKind::ExtremeWeather,
            excess: 0.2,
        };
        let event = config
            .instantiate(ScenarioId::from_raw(1), CropId::from_raw(1), trigger, now())
            .expect("playbook");
        book.raise(event);
        assert!(book.has_active(CropId::from_raw(1), ScenarioKind::ExtremeWeather));

        assert!(book.expire(now() + Duration::hours(5)).is_empty());
        assert_eq!(book.expire(now() + Duration::hours(6)).len(), 1);
        assert!(book.active(None).is_empty());

        let resolved = book.resolve(ScenarioId::from_raw(1), ActionKind::Windbreak, now());
        assert!(matches!(resolved, Err(FarmError::ScenarioAlreadyResolved(_))));
    }

    #[test]
    fn test_available_action_checks() {
        let config = ScenarioConfig::default();
        let trigger = Trigger {
            kind: ScenarioKind::Drought,
            excess: 0.5,
        };
        let event = config
            .instantiate(ScenarioId::from_raw(1), CropId::from_raw(1), trigger, now())
            .expect("playbook");
        assert!(event.available_action(ActionKind::ApplyMulch, now()).is_ok());
        assert!(matches!(
            event.available_action(ActionKind::Windbreak, now()),
            Err(FarmError::ActionNotFound { .. })
        ));
        assert!(matches!(
            event.available_action(ActionKind::ApplyMulch, now() + Duration::hours(48)),
            Err(FarmError::ScenarioAlreadyResolved(_))
        ));
    }
}
