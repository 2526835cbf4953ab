//! Crops, care tiers and the per-owner crop field.
//!
//! A crop moves through `Growing -> Ready -> Harvested`. Harvested crops leave
//! the field, so every crop in a [`CropField`] is either growing or ready.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fasal_common::{CropId, GridPosition, Location, OwnerId};
use serde::{Deserialize, Serialize};

use crate::clock::elapsed_minutes;
use crate::error::{FarmError, FarmResult};
use crate::growth::{advance, GrowthRates, ResourceState, MAX_LEVEL};

/// Kinds of crop that can be planted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropType {
    /// Tomato
    Tomato,
    /// Wheat
    Wheat,
    /// Corn
    Corn,
    /// Carrot
    Carrot,
    /// Potato
    Potato,
    /// Lettuce
    Lettuce,
}

impl CropType {
    /// Every crop type.
    pub const ALL: [Self; 6] = [
        Self::Tomato,
        Self::Wheat,
        Self::Corn,
        Self::Carrot,
        Self::Potato,
        Self::Lettuce,
    ];

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tomato => "tomato",
            Self::Wheat => "wheat",
            Self::Corn => "corn",
            Self::Carrot => "carrot",
            Self::Potato => "potato",
            Self::Lettuce => "lettuce",
        }
    }
}

impl std::fmt::Display for CropType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CropType {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| FarmError::InvalidInput(format!("unknown crop type '{s}'")))
    }
}

/// Planting costs per crop type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropCatalog {
    /// Coin cost of planting each type
    pub planting_costs: BTreeMap<CropType, u64>,
    /// Cost for a type missing from the table
    pub fallback_cost: u64,
}

impl Default for CropCatalog {
    fn default() -> Self {
        let planting_costs = [
            (CropType::Tomato, 10),
            (CropType::Wheat, 5),
            (CropType::Corn, 15),
            (CropType::Carrot, 8),
            (CropType::Potato, 12),
            (CropType::Lettuce, 6),
        ]
        .into_iter()
        .collect();
        Self {
            planting_costs,
            fallback_cost: 10,
        }
    }
}

impl CropCatalog {
    /// Planting cost for a crop type.
    #[must_use]
    pub fn cost(&self, crop_type: CropType) -> u64 {
        self.planting_costs
            .get(&crop_type)
            .copied()
            .unwrap_or(self.fallback_cost)
    }
}

/// Lifecycle of an active crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Growth below 100
    Growing,
    /// Fully grown, awaiting harvest
    Ready,
}

/// A planted crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    /// Crop ID
    pub id: CropId,
    /// Owning player
    pub owner: OwnerId,
    /// Kind of crop
    pub crop_type: CropType,
    /// Plot on the owner's grid
    pub position: GridPosition,
    /// Growth stage (0-100)
    pub growth_stage: f32,
    /// Health (0-100)
    pub health: f32,
    /// Water level (0-100)
    pub water_level: f32,
    /// Fertilizer level (0-100)
    pub fertilizer_level: f32,
    /// When the crop was planted
    pub planted_at: DateTime<Utc>,
    /// Time the resources were last advanced to
    pub last_ticked_at: DateTime<Utc>,
    /// Growth and yield multiplier (>= 1.0)
    pub climate_bonus: f32,
    /// Location used for environment lookups
    pub location: Option<Location>,
}

impl Crop {
    /// Creates a seedling planted at `now`.
    #[must_use]
    pub fn seedling(
        id: CropId,
        owner: OwnerId,
        crop_type: CropType,
        position: GridPosition,
        location: Option<Location>,
        climate_bonus: f32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut crop = Self {
            id,
            owner,
            crop_type,
            position,
            growth_stage: 0.0,
            health: 0.0,
            water_level: 0.0,
            fertilizer_level: 0.0,
            planted_at: now,
            last_ticked_at: now,
            climate_bonus: 1.0,
            location,
        };
        crop.set_resources(ResourceState::seedling());
        crop.set_climate_bonus(climate_bonus);
        crop
    }

    /// Current resource levels.
    #[must_use]
    pub fn resources(&self) -> ResourceState {
        ResourceState {
            growth_stage: self.growth_stage,
            health: self.health,
            water_level: self.water_level,
            fertilizer_level: self.fertilizer_level,
        }
    }

    /// Replaces resource levels, clamping them into range.
    pub fn set_resources(&mut self, state: ResourceState) {
        let state = state.clamped();
        self.growth_stage = state.growth_stage;
        self.health = state.health;
        self.water_level = state.water_level;
        self.fertilizer_level = state.fertilizer_level;
    }

    /// Sets the climate bonus, never below 1.0.
    pub fn set_climate_bonus(&mut self, bonus: f32) {
        self.climate_bonus = if bonus.is_finite() { bonus.max(1.0) } else { 1.0 };
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        if self.growth_stage >= MAX_LEVEL {
            Lifecycle::Ready
        } else {
            Lifecycle::Growing
        }
    }

    /// Whether the crop can be harvested.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lifecycle() == Lifecycle::Ready
    }

    /// Advances resources to `now`. Returns true if the crop became ready.
    ///
    /// Times before `last_ticked_at` are ignored.
    pub fn advance_to(&mut self, now: DateTime<Utc>, rates: &GrowthRates) -> bool {
        if now <= self.last_ticked_at {
            return false;
        }
        let was_ready = self.is_ready();
        let dt = elapsed_minutes(self.last_ticked_at, now);
        self.set_resources(advance(self.resources(), dt, rates, self.climate_bonus));
        self.last_ticked_at = now;
        !was_ready && self.is_ready()
    }

    /// Applies a watering effect under the given care rules.
    pub fn apply_water(&mut self, effect: &CareEffect, care: &CareConfig) -> FarmResult<()> {
        let saturated = self.water_level >= care.saturation_threshold;
        let health_delta = care.health_delta(self.id, self.water_level, saturated, effect)?;
        self.water_level = (self.water_level + effect.level_boost).min(MAX_LEVEL);
        self.health = (self.health + health_delta).clamp(0.0, MAX_LEVEL);
        Ok(())
    }

    /// Applies a fertilizing effect under the given care rules.
    pub fn apply_fertilizer(&mut self, effect: &CareEffect, care: &CareConfig) -> FarmResult<()> {
        let saturated = self.fertilizer_level >= care.saturation_threshold;
        let health_delta =
            care.health_delta(self.id, self.fertilizer_level, saturated, effect)?;
        self.fertilizer_level = (self.fertilizer_level + effect.level_boost).min(MAX_LEVEL);
        self.health = (self.health + health_delta).clamp(0.0, MAX_LEVEL);
        Ok(())
    }
}

/// Watering quality tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterTier {
    /// Plain watering
    Basic,
    /// Filtered water
    Premium,
    /// Precision irrigation
    Expert,
}

impl FromStr for WaterTier {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "premium" => Ok(Self::Premium),
            "expert" => Ok(Self::Expert),
            _ => Err(FarmError::InvalidInput(format!("unknown water tier '{s}'"))),
        }
    }
}

/// Fertilizer tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FertilizerTier {
    /// Standard fertilizer
    Basic,
    /// Organic compost
    Organic,
    /// Premium blend
    Premium,
}

impl FromStr for FertilizerTier {
    type Err = FarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "organic" => Ok(Self::Organic),
            "premium" => Ok(Self::Premium),
            _ => Err(FarmError::InvalidInput(format!(
                "unknown fertilizer tier '{s}'"
            ))),
        }
    }
}

/// Cost and effect of one care tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CareEffect {
    /// Coin cost
    pub cost: u64,
    /// Resource level gained
    pub level_boost: f32,
    /// Health gained
    pub health_boost: f32,
}

impl CareEffect {
    /// Creates a care effect.
    #[must_use]
    pub const fn new(cost: u64, level_boost: f32, health_boost: f32) -> Self {
        Self {
            cost,
            level_boost,
            health_boost,
        }
    }
}

/// Watering tier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterTiers {
    /// Basic tier
    pub basic: CareEffect,
    /// Premium tier
    pub premium: CareEffect,
    /// Expert tier
    pub expert: CareEffect,
}

impl Default for WaterTiers {
    fn default() -> Self {
        Self {
            basic: CareEffect::new(5, 25.0, 3.0),
            premium: CareEffect::new(12, 40.0, 8.0),
            expert: CareEffect::new(20, 50.0, 15.0),
        }
    }
}

impl WaterTiers {
    /// Effect of a tier.
    #[must_use]
    pub const fn effect(&self, tier: WaterTier) -> &CareEffect {
        match tier {
            WaterTier::Basic => &self.basic,
            WaterTier::Premium => &self.premium,
            WaterTier::Expert => &self.expert,
        }
    }
}

/// Fertilizer tier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FertilizerTiers {
    /// Basic tier
    pub basic: CareEffect,
    /// Organic tier
    pub organic: CareEffect,
    /// Premium tier
    pub premium: CareEffect,
}

impl Default for FertilizerTiers {
    fn default() -> Self {
        Self {
            basic: CareEffect::new(15, 30.0, 8.0),
            organic: CareEffect::new(25, 45.0, 15.0),
            premium: CareEffect::new(40, 60.0, 25.0),
        }
    }
}

impl FertilizerTiers {
    /// Effect of a tier.
    #[must_use]
    pub const fn effect(&self, tier: FertilizerTier) -> &CareEffect {
        match tier {
            FertilizerTier::Basic => &self.basic,
            FertilizerTier::Organic => &self.organic,
            FertilizerTier::Premium => &self.premium,
        }
    }
}

/// What happens when care is applied to an already saturated crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationPolicy {
    /// Allowed, but costs health instead of boosting it
    #[default]
    Permissive,
    /// Rejected with `AlreadySaturated`
    Block,
}

/// Care tiers, saturation rules and action XP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    /// Watering tiers
    pub water: WaterTiers,
    /// Fertilizer tiers
    pub fertilizer: FertilizerTiers,
    /// Saturation handling
    pub saturation_policy: SaturationPolicy,
    /// Level at or above which a resource counts as saturated
    pub saturation_threshold: f32,
    /// Health lost when caring for a saturated crop
    pub oversaturation_health_penalty: f32,
    /// XP for planting
    pub plant_xp: u64,
    /// XP for watering
    pub water_xp: u64,
    /// XP for fertilizing
    pub fertilize_xp: u64,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self {
            water: WaterTiers::default(),
            fertilizer: FertilizerTiers::default(),
            saturation_policy: SaturationPolicy::Permissive,
            saturation_threshold: 90.0,
            oversaturation_health_penalty: 5.0,
            plant_xp: 10,
            water_xp: 5,
            fertilize_xp: 8,
        }
    }
}

impl CareConfig {
    /// Clamps thresholds and penalties into range.
    pub fn validate(&mut self) {
        if !self.saturation_threshold.is_finite() {
            self.saturation_threshold = 90.0;
        }
        self.saturation_threshold = self.saturation_threshold.clamp(0.0, MAX_LEVEL);
        if !self.oversaturation_health_penalty.is_finite() {
            self.oversaturation_health_penalty = 0.0;
        }
        self.oversaturation_health_penalty = self.oversaturation_health_penalty.max(0.0);
    }

    fn health_delta(
        &self,
        crop: CropId,
        level: f32,
        saturated: bool,
        effect: &CareEffect,
    ) -> FarmResult<f32> {
        if !saturated {
            return Ok(effect.health_boost);
        }
        match self.saturation_policy {
            SaturationPolicy::Permissive => Ok(-self.oversaturation_health_penalty),
            SaturationPolicy::Block => Err(FarmError::AlreadySaturated { crop, level }),
        }
    }
}

/// Harvest reward magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// XP for any harvest
    pub base_xp: u64,
    /// Coins for any harvest
    pub base_coins: u64,
    /// Extra XP scaled by health
    pub xp_health_pool: u64,
    /// Extra coins scaled by health
    pub coin_health_pool: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_xp: 50,
            base_coins: 100,
            xp_health_pool: 50,
            coin_health_pool: 100,
        }
    }
}

impl HarvestConfig {
    /// Computes the yield of a ready crop.
    #[must_use]
    pub fn yield_for(&self, crop: &Crop) -> HarvestResult {
        let health = f64::from(crop.health.clamp(0.0, MAX_LEVEL)) / 100.0;
        let bonus = f64::from(crop.climate_bonus.max(1.0));
        let health_bonus = (health * self.xp_health_pool as f64).floor() as u64;
        let coin_health_bonus = (health * self.coin_health_pool as f64).floor() as u64;
        HarvestResult {
            crop: crop.id,
            crop_type: crop.crop_type,
            xp: ((self.base_xp + health_bonus) as f64 * bonus).floor() as u64,
            coins: ((self.base_coins + coin_health_bonus) as f64 * bonus).floor() as u64,
            health_bonus,
            climate_bonus: crop.climate_bonus,
        }
    }
}

/// Outcome of a harvest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    /// Harvested crop
    pub crop: CropId,
    /// Kind of crop
    pub crop_type: CropType,
    /// XP credited
    pub xp: u64,
    /// Coins credited
    pub coins: u64,
    /// Health-derived XP bonus before the climate multiplier
    pub health_bonus: u64,
    /// Climate multiplier applied
    pub climate_bonus: f32,
}

/// A player's active crops, keyed by ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropField {
    crops: BTreeMap<CropId, Crop>,
}

impl CropField {
    /// Looks up a crop.
    #[must_use]
    pub fn get(&self, id: CropId) -> Option<&Crop> {
        self.crops.get(&id)
    }

    /// Looks up a crop mutably.
    pub fn get_mut(&mut self, id: CropId) -> FarmResult<&mut Crop> {
        self.crops.get_mut(&id).ok_or(FarmError::CropNotFound(id))
    }

    /// Crop occupying a plot, if any.
    #[must_use]
    pub fn at(&self, position: GridPosition) -> Option<&Crop> {
        self.crops.values().find(|c| c.position == position)
    }

    /// Adds a crop. The caller has checked the plot is free.
    pub fn insert(&mut self, crop: Crop) {
        self.crops.insert(crop.id, crop);
    }

    /// Removes a crop.
    pub fn remove(&mut self, id: CropId) -> FarmResult<Crop> {
        self.crops.remove(&id).ok_or(FarmError::CropNotFound(id))
    }

    /// All crops in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Crop> {
        self.crops.values()
    }

    /// All crops in ID order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Crop> {
        self.crops.values_mut()
    }

    /// Number of active crops.
    #[must_use]
    pub fn len(&self) -> usize {
        self.crops.len()
    }

    /// Whether the field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).single().expect("valid date")
    }

    fn tomato() -> Crop {
        Crop::seedling(
            CropId::from_raw(1),
            OwnerId::new(7),
            CropType::Tomato,
            GridPosition::new(0, 0),
            None,
            1.0,
            now(),
        )
    }

    #[test]
    fn test_seedling_defaults() {
        let crop = tomato();
        assert_eq!(crop.growth_stage, 0.0);
        assert_eq!(crop.health, 100.0);
        assert_eq!(crop.water_level, 100.0);
        assert_eq!(crop.lifecycle(), Lifecycle::Growing);
    }

    #[test]
    fn test_crop_type_parsing() {
        assert_eq!("Corn".parse::<CropType>().expect("parse"), CropType::Corn);
        assert!(matches!(
            "mango".parse::<CropType>(),
            Err(FarmError::InvalidInput(_))
        ));
        assert!("gold".parse::<WaterTier>().is_err());
        assert_eq!(
            "organic".parse::<FertilizerTier>().expect("parse"),
            FertilizerTier::Organic
        );
    }

    #[test]
    fn test_advance_to_reports_ready_once() {
        let rates = GrowthRates {
            growth_per_minute: 1.0,
            ..GrowthRates::default()
        };
        let mut crop = tomato();
        assert!(!crop.advance_to(now() + Duration::minutes(50), &rates));
        assert!(crop.advance_to(now() + Duration::minutes(100), &rates));
        assert!(!crop.advance_to(now() + Duration::minutes(150), &rates));
        assert!(crop.is_ready());
    }

    #[test]
    fn test_advance_ignores_past_times() {
        let mut crop = tomato();
        let before = crop.clone();
        crop.advance_to(now() - Duration::minutes(30), &GrowthRates::default());
        assert_eq!(crop, before);
    }

    #[test]
    fn test_water_boosts_below_saturation() {
        let care = CareConfig::default();
        let mut crop = tomato();
        crop.water_level = 20.0;
        crop.health = 50.0;
        crop.apply_water(care.water.effect(WaterTier::Basic), &care)
            .expect("water");
        assert_eq!(crop.water_level, 45.0);
        assert_eq!(crop.health, 53.0);
    }

    #[test]
    fn test_permissive_saturation_costs_health() {
        let care = CareConfig::default();
        let mut crop = tomato();
        crop.apply_water(care.water.effect(WaterTier::Expert), &care)
            .expect("water");
        assert_eq!(crop.water_level, 100.0);
        assert_eq!(crop.health, 95.0);
    }

    #[test]
    fn test_blocking_saturation_rejects() {
        let care = CareConfig {
            saturation_policy: SaturationPolicy::Block,
            ..CareConfig::default()
        };
        let mut crop = tomato();
        let result = crop.apply_fertilizer(care.fertilizer.effect(FertilizerTier::Basic), &care);
        assert!(matches!(result, Err(FarmError::AlreadySaturated { .. })));
        assert_eq!(crop.health, 100.0);
    }

    #[test]
    fn test_harvest_yield() {
        let config = HarvestConfig::default();
        let mut crop = tomato();
        crop.health = 80.0;
        crop.set_climate_bonus(1.5);
        let result = config.yield_for(&crop);
        assert_eq!(result.health_bonus, 40);
        assert_eq!(result.xp, 135);
        assert_eq!(result.coins, 270);
    }

    #[test]
    fn test_field_lookup_by_position() {
        let mut field = CropField::default();
        field.insert(tomato());
        assert!(field.at(GridPosition::new(0, 0)).is_some());
        assert!(field.at(GridPosition::new(1, 0)).is_none());
        assert!(field.remove(CropId::from_raw(9)).is_err());
        assert_eq!(field.len(), 1);
    }
}
