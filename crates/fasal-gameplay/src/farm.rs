//! The per-owner farm aggregate.
//!
//! A [`Farm`] holds everything one player owns: crops, scenarios, ledger,
//! challenge and achievement state, and activity counters. Commands on a crop
//! first age it to the command time, so they read the same levels a tick at
//! that time would have produced. Apart from that ageing, every command
//! validates before it mutates. Events produced by a command are buffered on
//! the farm and handed to the caller with [`Farm::take_events`].

use chrono::{DateTime, Utc};
use fasal_common::{
    AchievementId, ChallengeId, CropId, GridPosition, IdAllocator, Location, OwnerId, ScenarioId,
    SchemaVersion,
};
use serde::{Deserialize, Serialize};

use crate::achievements::{
    AchievementBook, AchievementContext, AchievementDefinition, AchievementView,
};
use crate::activity::{ActivityKind, ActivityStats};
use crate::challenges::{ChallengeBoard, ChallengeDefinition, ChallengeProgress};
use crate::climate::EnvironmentSample;
use crate::config::SimConfig;
use crate::crops::{Crop, CropField, CropType, FertilizerTier, HarvestResult, WaterTier};
use crate::error::{FarmError, FarmResult};
use crate::events::FarmEvent;
use crate::progression::{Credit, CreditSource, Ledger, LedgerEntry, PlayerProgress};
use crate::scenario::{evaluate, ActionKind, CompletionResult, ScenarioBook, ScenarioEvent};

/// What a tick changed on one farm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Crops whose resources were advanced
    pub crops_advanced: usize,
    /// Crops that became ready
    pub became_ready: Vec<CropId>,
    /// Scenarios that expired
    pub expired: Vec<ScenarioId>,
}

/// Everything one player owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    owner: OwnerId,
    version: SchemaVersion,
    created_at: DateTime<Utc>,
    ids: IdAllocator,
    crops: CropField,
    scenarios: ScenarioBook,
    ledger: Ledger,
    challenges: ChallengeBoard,
    achievements: AchievementBook,
    activity: ActivityStats,
    #[serde(skip)]
    pending: Vec<FarmEvent>,
}

impl Farm {
    /// Opens a new farm with the configured starting balance.
    #[must_use]
    pub fn new(owner: OwnerId, config: &SimConfig, now: DateTime<Utc>) -> Self {
        Self {
            owner,
            version: SchemaVersion::FARM_SNAPSHOT,
            created_at: now,
            ids: IdAllocator::new(),
            crops: CropField::default(),
            scenarios: ScenarioBook::default(),
            ledger: Ledger::open(config.ledger.starting_coins, now),
            challenges: ChallengeBoard::default(),
            achievements: AchievementBook::default(),
            activity: ActivityStats::default(),
            pending: Vec::new(),
        }
    }

    /// Farm owner.
    #[must_use]
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Schema version the farm was written with.
    #[must_use]
    pub const fn version(&self) -> SchemaVersion {
        self.version
    }

    /// When the farm was opened.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Active crops.
    #[must_use]
    pub const fn crops(&self) -> &CropField {
        &self.crops
    }

    /// Looks up a crop.
    pub fn crop(&self, id: CropId) -> FarmResult<&Crop> {
        self.crops.get(id).ok_or(FarmError::CropNotFound(id))
    }

    /// Every scenario ever raised.
    #[must_use]
    pub const fn scenarios(&self) -> &ScenarioBook {
        &self.scenarios
    }

    /// XP and coin ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Activity counters.
    #[must_use]
    pub const fn activity(&self) -> &ActivityStats {
        &self.activity
    }

    /// XP, level and coins.
    #[must_use]
    pub fn progress(&self, config: &SimConfig) -> PlayerProgress {
        PlayerProgress::from_ledger(self.owner, &self.ledger, &config.ledger)
    }

    /// Progress on every configured challenge.
    #[must_use]
    pub fn challenge_progress(&self, config: &SimConfig) -> Vec<ChallengeProgress> {
        self.challenges.view(&config.challenges)
    }

    /// Every configured achievement with unlock state.
    #[must_use]
    pub fn achievement_view(&self, config: &SimConfig) -> Vec<AchievementView> {
        self.achievements
            .view(&config.achievements, &self.achievement_context(config))
    }

    /// Active scenarios, optionally for one crop.
    #[must_use]
    pub fn active_scenarios(&self, crop: Option<CropId>) -> Vec<ScenarioEvent> {
        self.scenarios.active(crop).into_iter().cloned().collect()
    }

    /// Drains events produced since the last call.
    pub fn take_events(&mut self) -> Vec<FarmEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Plants a crop.
    pub fn plant(
        &mut self,
        config: &SimConfig,
        position: GridPosition,
        crop_type: CropType,
        location: Option<Location>,
        climate_bonus: f32,
        now: DateTime<Utc>,
    ) -> FarmResult<Crop> {
        let (rows, cols) = (config.grid.rows, config.grid.cols);
        if !position.within(rows, cols) {
            return Err(FarmError::PositionOutOfRange {
                position,
                rows,
                cols,
            });
        }
        if let Some(location) = location {
            if !location.is_valid() {
                return Err(FarmError::InvalidInput(format!(
                    "invalid location ({}, {})",
                    location.latitude, location.longitude
                )));
            }
        }
        if self.crops.at(position).is_some() {
            return Err(FarmError::SlotOccupied(position));
        }
        let cost = config.crops.cost(crop_type);
        self.ledger.ensure_funds(cost)?;

        let id = self.ids.next_crop();
        self.post(
            config,
            CreditSource::Planting { crop: id },
            Credit::new(config.care.plant_xp, 0).with_charge(cost),
            now,
        )?;
        let crop = Crop::seedling(
            id,
            self.owner,
            crop_type,
            position,
            location,
            climate_bonus,
            now,
        );
        self.crops.insert(crop.clone());
        self.pending.push(FarmEvent::CropPlanted {
            owner: self.owner,
            crop: id,
            crop_type,
            position,
        });

        self.activity.record(ActivityKind::Plant, now.date_naive());
        self.after_activity(config, ActivityKind::Plant, now)?;
        Ok(crop)
    }

    /// Waters a crop.
    pub fn water(
        &mut self,
        config: &SimConfig,
        id: CropId,
        tier: WaterTier,
        now: DateTime<Utc>,
    ) -> FarmResult<Crop> {
        let effect = *config.care.water.effect(tier);
        self.catch_up(config, id, now)?;
        self.ledger.ensure_funds(effect.cost)?;
        let crop = self.crops.get_mut(id)?;
        crop.apply_water(&effect, &config.care)?;
        let crop = crop.clone();

        self.post(
            config,
            CreditSource::Watering { crop: id, tier },
            Credit::new(config.care.water_xp, 0).with_charge(effect.cost),
            now,
        )?;
        self.activity.record_water(tier, now.date_naive());
        self.after_activity(config, ActivityKind::Water, now)?;
        Ok(crop)
    }

    /// Fertilizes a crop.
    pub fn fertilize(
        &mut self,
        config: &SimConfig,
        id: CropId,
        tier: FertilizerTier,
        now: DateTime<Utc>,
    ) -> FarmResult<Crop> {
        let effect = *config.care.fertilizer.effect(tier);
        self.catch_up(config, id, now)?;
        self.ledger.ensure_funds(effect.cost)?;
        let crop = self.crops.get_mut(id)?;
        crop.apply_fertilizer(&effect, &config.care)?;
        let crop = crop.clone();

        self.post(
            config,
            CreditSource::Fertilizing { crop: id, tier },
            Credit::new(config.care.fertilize_xp, 0).with_charge(effect.cost),
            now,
        )?;
        self.activity.record_fertilizer(tier, now.date_naive());
        self.after_activity(config, ActivityKind::Fertilize, now)?;
        Ok(crop)
    }

    /// Harvests a ready crop, dismissing its open scenarios.
    pub fn harvest(
        &mut self,
        config: &SimConfig,
        id: CropId,
        now: DateTime<Utc>,
    ) -> FarmResult<HarvestResult> {
        self.catch_up(config, id, now)?;
        let crop = self.crop(id)?;
        if !crop.is_ready() {
            return Err(FarmError::NotReady {
                crop: id,
                growth: crop.growth_stage,
            });
        }
        let result = config.harvest.yield_for(crop);

        self.crops.remove(id)?;
        for scenario in self.scenarios.dismiss_for_crop(id, now) {
            self.pending.push(FarmEvent::ScenarioDismissed {
                owner: self.owner,
                scenario,
            });
        }
        self.post(
            config,
            CreditSource::Harvest { crop: id },
            Credit::new(result.xp, 0).with_coins(result.coins),
            now,
        )?;
        self.pending.push(FarmEvent::CropHarvested {
            owner: self.owner,
            crop: id,
            xp: result.xp,
            coins: result.coins,
        });

        self.activity.record(ActivityKind::Harvest, now.date_naive());
        self.after_activity(config, ActivityKind::Harvest, now)?;
        Ok(result)
    }

    /// Advances every crop to `now` and expires stale scenarios.
    ///
    /// Never charges or credits.
    pub fn tick(&mut self, config: &SimConfig, now: DateTime<Utc>) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        for crop in self.crops.iter_mut() {
            if now > crop.last_ticked_at {
                outcome.crops_advanced += 1;
            }
            if crop.advance_to(now, &config.growth) {
                outcome.became_ready.push(crop.id);
            }
        }
        for &crop in &outcome.became_ready {
            self.pending.push(FarmEvent::CropReady {
                owner: self.owner,
                crop,
            });
        }
        outcome.expired = self.expire_scenarios(now);
        outcome
    }

    /// Raises one scenario per eligible kind the crop has no active scenario of.
    ///
    /// Returns only the newly raised scenarios, so a repeat call with the same
    /// inputs returns nothing.
    pub fn generate_scenarios(
        &mut self,
        config: &SimConfig,
        id: CropId,
        latest: Option<&EnvironmentSample>,
        now: DateTime<Utc>,
    ) -> FarmResult<Vec<ScenarioEvent>> {
        self.catch_up(config, id, now)?;
        let triggers = evaluate(self.crop(id)?, latest, &config.scenarios.thresholds);
        self.expire_scenarios(now);

        let mut raised = Vec::new();
        for trigger in triggers {
            if self.scenarios.has_active(id, trigger.kind)
                || config.scenarios.playbook(trigger.kind).is_none()
            {
                continue;
            }
            let scenario_id = self.ids.next_scenario();
            let Some(event) = config.scenarios.instantiate(scenario_id, id, trigger, now) else {
                continue;
            };
            self.pending.push(FarmEvent::ScenarioRaised {
                owner: self.owner,
                scenario: event.id,
                crop: id,
                kind: event.kind,
                severity: event.severity,
            });
            self.scenarios.raise(event.clone());
            raised.push(event);
        }
        Ok(raised)
    }

    /// Resolves a scenario with one of its actions.
    ///
    /// Charges the action cost, credits its reward and deactivates the
    /// scenario. A scenario can be completed only once.
    pub fn complete_scenario(
        &mut self,
        config: &SimConfig,
        scenario: ScenarioId,
        action: ActionKind,
        now: DateTime<Utc>,
    ) -> FarmResult<CompletionResult> {
        let chosen = self
            .scenarios
            .get(scenario)?
            .available_action(action, now)?
            .clone();
        self.ledger.ensure_funds(chosen.cost)?;

        if chosen.cost > 0 {
            self.post(
                config,
                CreditSource::ScenarioCost { scenario, action },
                Credit::charge(chosen.cost),
                now,
            )?;
        }
        self.post(
            config,
            CreditSource::ScenarioReward { scenario, action },
            chosen.reward.into(),
            now,
        )?;
        self.scenarios.resolve(scenario, action, now)?;
        self.pending.push(FarmEvent::ScenarioResolved {
            owner: self.owner,
            scenario,
            action,
        });

        self.activity
            .record(ActivityKind::ResolveScenario, now.date_naive());
        self.after_activity(config, ActivityKind::ResolveScenario, now)?;
        Ok(CompletionResult {
            scenario,
            action,
            cost: chosen.cost,
            rewards: chosen.reward,
            effectiveness: chosen.effectiveness,
        })
    }

    /// Records a climate check.
    pub fn record_climate_check(
        &mut self,
        config: &SimConfig,
        now: DateTime<Utc>,
    ) -> FarmResult<()> {
        self.activity
            .record(ActivityKind::ClimateCheck, now.date_naive());
        self.after_activity(config, ActivityKind::ClimateCheck, now)
    }

    /// Posts a direct credit.
    pub fn credit(
        &mut self,
        config: &SimConfig,
        credit: Credit,
        now: DateTime<Utc>,
    ) -> FarmResult<LedgerEntry> {
        let entry = self.post(config, CreditSource::Grant, credit, now)?;
        self.settle_achievements(config, now)?;
        Ok(entry)
    }

    /// Advances a challenge by `amount`.
    pub fn advance_challenge(
        &mut self,
        config: &SimConfig,
        id: ChallengeId,
        amount: u32,
        now: DateTime<Utc>,
    ) -> FarmResult<ChallengeProgress> {
        let definition = config
            .challenge(id)
            .ok_or(FarmError::ChallengeNotFound(id))?;
        self.advance_definition(config, definition, amount, now)?;
        self.settle_achievements(config, now)?;
        Ok(self
            .challenges
            .get(id)
            .copied()
            .unwrap_or_else(|| ChallengeProgress::new(definition)))
    }

    /// Unlocks an achievement. Returns false if it was already unlocked.
    pub fn unlock_achievement(
        &mut self,
        config: &SimConfig,
        id: AchievementId,
        now: DateTime<Utc>,
    ) -> FarmResult<bool> {
        let definition = config
            .achievement(id)
            .ok_or(FarmError::AchievementNotFound(id))?;
        let unlocked = self.unlock_definition(config, definition, now)?;
        self.settle_achievements(config, now)?;
        Ok(unlocked)
    }

    /// Ages one crop to `now` before a command reads its levels.
    fn catch_up(&mut self, config: &SimConfig, id: CropId, now: DateTime<Utc>) -> FarmResult<()> {
        if self.crops.get_mut(id)?.advance_to(now, &config.growth) {
            self.pending.push(FarmEvent::CropReady {
                owner: self.owner,
                crop: id,
            });
        }
        Ok(())
    }

    fn achievement_context(&self, config: &SimConfig) -> AchievementContext<'_> {
        AchievementContext {
            activity: &self.activity,
            xp: self.ledger.xp(),
            level: self.ledger.level(&config.ledger),
            coins_earned: self.ledger.coins_earned(),
        }
    }

    fn post(
        &mut self,
        config: &SimConfig,
        source: CreditSource,
        credit: Credit,
        now: DateTime<Utc>,
    ) -> FarmResult<LedgerEntry> {
        let before = self.ledger.level(&config.ledger);
        let entry = self.ledger.post(source, credit, now)?;
        let after = self.ledger.level(&config.ledger);
        if after > before {
            self.pending.push(FarmEvent::LevelUp {
                owner: self.owner,
                level: after,
            });
        }
        Ok(entry)
    }

    fn expire_scenarios(&mut self, now: DateTime<Utc>) -> Vec<ScenarioId> {
        let expired = self.scenarios.expire(now);
        for &scenario in &expired {
            self.pending.push(FarmEvent::ScenarioExpired {
                owner: self.owner,
                scenario,
            });
        }
        expired
    }

    fn after_activity(
        &mut self,
        config: &SimConfig,
        kind: ActivityKind,
        now: DateTime<Utc>,
    ) -> FarmResult<()> {
        for definition in config.challenges.iter().filter(|c| c.activity == kind) {
            self.advance_definition(config, definition, 1, now)?;
        }
        self.settle_achievements(config, now)
    }

    fn advance_definition(
        &mut self,
        config: &SimConfig,
        definition: &ChallengeDefinition,
        amount: u32,
        now: DateTime<Utc>,
    ) -> FarmResult<()> {
        if let Some(reward) = self.challenges.advance(definition, amount, now) {
            self.post(
                config,
                CreditSource::Challenge {
                    challenge: definition.id,
                },
                reward.into(),
                now,
            )?;
            self.pending.push(FarmEvent::ChallengeCompleted {
                owner: self.owner,
                challenge: definition.id,
            });
        }
        Ok(())
    }

    fn unlock_definition(
        &mut self,
        config: &SimConfig,
        definition: &AchievementDefinition,
        now: DateTime<Utc>,
    ) -> FarmResult<bool> {
        if !self.achievements.unlock(definition.id, now) {
            return Ok(false);
        }
        self.post(
            config,
            CreditSource::Achievement {
                achievement: definition.id,
            },
            definition.reward.into(),
            now,
        )?;
        self.pending.push(FarmEvent::AchievementUnlocked {
            owner: self.owner,
            achievement: definition.id,
        });
        Ok(true)
    }

    /// Unlocks achievements until none is newly eligible. An unlock's reward
    /// can make another achievement eligible.
    fn settle_achievements(&mut self, config: &SimConfig, now: DateTime<Utc>) -> FarmResult<()> {
        loop {
            let next = {
                let ctx = self.achievement_context(config);
                self.achievements.next_eligible(&config.achievements, &ctx)
            };
            let Some(definition) = next else {
                return Ok(());
            };
            self.unlock_definition(config, definition, now)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::progression::Reward;
    use crate::scenario::{ScenarioKind, ScenarioStatus};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 6, 0, 0).single().expect("valid date")
    }

    fn bare_config() -> SimConfig {
        SimConfig {
            challenges: Vec::new(),
            achievements: Vec::new(),
            ..SimConfig::default()
        }
    }

    fn farm(config: &SimConfig) -> Farm {
        Farm::new(OwnerId::new(1), config, t0())
    }

    #[test]
    fn test_plant_debits_cost_and_credits_xp() {
        let mut config = bare_config();
        config.ledger.starting_coins = 50;
        config.crops.planting_costs.insert(CropType::Tomato, 30);
        let mut farm = farm(&config);

        let crop = farm
            .plant(&config, GridPosition::new(0, 0), CropType::Tomato, None, 1.0, t0())
            .expect("plant");
        assert_eq!(crop.growth_stage, 0.0);
        assert_eq!(crop.health, 100.0);
        assert_eq!(farm.ledger().coins(), 20);
        assert_eq!(farm.ledger().xp(), config.care.plant_xp);
    }

    #[test]
    fn test_plant_rejections_leave_farm_untouched() {
        let config = bare_config();
        let mut farm = farm(&config);
        farm.plant(&config, GridPosition::new(1, 1), CropType::Corn, None, 1.0, t0())
            .expect("plant");
        farm.take_events();
        let before = farm.clone();

        let wheat = |farm: &mut Farm, position, location| {
            farm.plant(&config, position, CropType::Wheat, location, 1.0, t0())
        };

        let occupied = wheat(&mut farm, GridPosition::new(1, 1), None);
        assert!(matches!(occupied, Err(FarmError::SlotOccupied(_))));

        let outside = wheat(&mut farm, GridPosition::new(9, 0), None);
        assert!(matches!(outside, Err(FarmError::PositionOutOfRange { .. })));

        let bad_location = Some(Location::new(120.0, 0.0));
        let invalid = wheat(&mut farm, GridPosition::new(2, 2), bad_location);
        assert!(matches!(invalid, Err(FarmError::InvalidInput(_))));

        assert_eq!(farm, before);
    }

    #[test]
    fn test_harvest_before_ready_is_rejected() {
        let config = bare_config();
        let mut farm = farm(&config);
        let crop = farm
            .plant(&config, GridPosition::new(0, 0), CropType::Wheat, None, 1.0, t0())
            .expect("plant");
        let journal_len = farm.ledger().journal().len();

        let result = farm.harvest(&config, crop.id, t0());
        assert!(matches!(result, Err(FarmError::NotReady { .. })));
        assert_eq!(farm.ledger().journal().len(), journal_len);
    }

    #[test]
    fn test_tick_grows_crop_and_harvest_dismisses_scenarios() {
        let mut config = bare_config();
        config.growth.growth_per_minute = 1.0;
        let mut farm = farm(&config);
        let crop = farm
            .plant(&config, GridPosition::new(0, 0), CropType::Wheat, None, 1.0, t0())
            .expect("plant");

        // Low health raises a disease scenario without any weather data.
        farm.crops.get_mut(crop.id).expect("crop").health = 30.0;
        let raised = farm
            .generate_scenarios(&config, crop.id, None, t0())
            .expect("generate");
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].kind, ScenarioKind::Disease);

        let outcome = farm.tick(&config, t0() + Duration::minutes(100));
        assert_eq!(outcome.became_ready, vec![crop.id]);
        assert!(farm.crop(crop.id).expect("crop").is_ready());

        let coins_before = farm.ledger().coins();
        let result = farm
            .harvest(&config, crop.id, t0() + Duration::minutes(100))
            .expect("harvest");
        assert!(farm.crops().is_empty());
        assert_eq!(farm.ledger().coins(), coins_before + result.coins);
        let status = farm.scenarios().get(raised[0].id).expect("scenario").status;
        assert!(matches!(status, ScenarioStatus::Dismissed { .. }));
    }

    #[test]
    fn test_tick_never_credits() {
        let config = bare_config();
        let mut farm = farm(&config);
        farm.plant(&config, GridPosition::new(0, 0), CropType::Wheat, None, 1.0, t0())
            .expect("plant");
        let journal_len = farm.ledger().journal().len();
        farm.tick(&config, t0() + Duration::days(3));
        assert_eq!(farm.ledger().journal().len(), journal_len);
    }

    #[test]
    fn test_tick_expires_scenarios_without_reward() {
        let config = bare_config();
        let mut farm = farm(&config);
        let crop = farm
            .plant(&config, GridPosition::new(0, 0), CropType::Wheat, None, 1.0, t0())
            .expect("plant");
        farm.crops.get_mut(crop.id).expect("crop").fertilizer_level = 5.0;
        let raised = farm
            .generate_scenarios(&config, crop.id, None, t0())
            .expect("generate");
        assert_eq!(raised[0].kind, ScenarioKind::FertilizerShortage);

        let xp = farm.ledger().xp();
        let outcome = farm.tick(&config, t0() + Duration::hours(72));
        assert_eq!(outcome.expired, vec![raised[0].id]);
        assert_eq!(farm.ledger().xp(), xp);
        assert!(farm.active_scenarios(None).is_empty());
    }

    #[test]
    fn test_challenge_completion_credits_once() {
        let mut config = bare_config();
        config.challenges = crate::challenges::default_challenges();
        let mut farm = farm(&config);
        let plant_five = ChallengeId::new(1);

        farm.advance_challenge(&config, plant_five, 4, t0())
            .expect("advance");
        let coins = farm.ledger().coins();
        let progress = farm
            .advance_challenge(&config, plant_five, 2, t0())
            .expect("advance");
        assert!(progress.completed);
        assert_eq!(progress.progress, 5);
        assert_eq!(farm.ledger().coins(), coins + 100);

        farm.advance_challenge(&config, plant_five, 2, t0())
            .expect("advance");
        assert_eq!(farm.ledger().coins(), coins + 100);

        let missing = farm.advance_challenge(&config, ChallengeId::new(99), 1, t0());
        assert!(matches!(missing, Err(FarmError::ChallengeNotFound(_))));
    }

    #[test]
    fn test_achievements_cascade_to_fixpoint() {
        use crate::achievements::{AchievementDefinition, UnlockCondition};

        let mut config = bare_config();
        config.achievements = vec![
            AchievementDefinition {
                id: AchievementId::new(1),
                key: "first_plant".into(),
                title: "Green Thumb".into(),
                description: String::new(),
                condition: UnlockCondition::ActionCount {
                    action: ActivityKind::Plant,
                    count: 1,
                },
                reward: Reward::new(100, 0),
            },
            AchievementDefinition {
                id: AchievementId::new(2),
                key: "level_two".into(),
                title: "Sprout".into(),
                description: String::new(),
                condition: UnlockCondition::Level { level: 2 },
                reward: Reward::new(0, 5),
            },
        ];
        let mut farm = farm(&config);
        farm.plant(&config, GridPosition::new(0, 0), CropType::Wheat, None, 1.0, t0())
            .expect("plant");

        let view = farm.achievement_view(&config);
        assert!(view.iter().all(|a| a.unlocked));
        let events = farm.take_events();
        assert!(events.contains(&FarmEvent::LevelUp {
            owner: OwnerId::new(1),
            level: 2
        }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, FarmEvent::AchievementUnlocked { .. }))
                .count(),
            2
        );

        assert!(!farm
            .unlock_achievement(&config, AchievementId::new(1), t0())
            .expect("unlock"));
    }

    #[test]
    fn test_serde_round_trip_drops_pending_events() {
        let config = SimConfig::default();
        let mut farm = farm(&config);
        farm.plant(&config, GridPosition::new(0, 0), CropType::Potato, None, 1.2, t0())
            .expect("plant");
        let json = serde_json::to_string(&farm).expect("serialize");
        let restored: Farm = serde_json::from_str(&json).expect("deserialize");
        assert!(restored.pending.is_empty());
        farm.take_events();
        assert_eq!(restored, farm);
    }
}
