//! Engine facade.
//!
//! [`FarmEngine`] is the single entry point the UI collaborator calls. Each
//! command takes the owner's lock, loads the farm from the store, mutates the
//! loaded copy and commits it with one `save`. Events are published only after
//! the save succeeds, so a failed command leaves both the store and the event
//! bus untouched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use fasal_common::{AchievementId, ChallengeId, CropId, GridPosition, Location, OwnerId, ScenarioId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::achievements::AchievementView;
use crate::challenges::ChallengeProgress;
use crate::climate::{ClimateReport, EnvironmentSample};
use crate::clock::{Clock, SystemClock};
use crate::config::SimConfig;
use crate::crops::{Crop, CropType, FertilizerTier, HarvestResult, WaterTier};
use crate::environment::{DateRange, EnvironmentProvider, NoEnvironment};
use crate::error::{FarmError, FarmResult};
use crate::events::EventBus;
use crate::farm::{Farm, TickOutcome};
use crate::progression::{Credit, LedgerEntry, PlayerProgress};
use crate::scenario::{ActionKind, CompletionResult, ScenarioEvent};
use crate::store::FarmStore;

/// Result of a climate check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateCheck {
    /// Location checked
    pub location: Location,
    /// Averaged sample, if the provider had one
    pub sample: Option<EnvironmentSample>,
    /// Bonus breakdown
    pub report: ClimateReport,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based rank
    pub rank: usize,
    /// Player
    pub owner: OwnerId,
    /// Total XP
    pub xp: u64,
    /// Level
    pub level: u32,
    /// Coin balance
    pub coins: u64,
}

/// An owner whose tick could not be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickFailure {
    /// Affected owner
    pub owner: OwnerId,
    /// Error message
    pub message: String,
}

/// Summary of one tick across every farm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Time the farms were advanced to
    pub at: Option<DateTime<Utc>>,
    /// Farms committed
    pub farms: usize,
    /// Crops advanced
    pub crops_advanced: usize,
    /// Crops that became ready
    pub became_ready: Vec<CropId>,
    /// Scenarios that expired
    pub expired: Vec<ScenarioId>,
    /// Farms that failed to commit
    pub failures: Vec<TickFailure>,
}

impl TickReport {
    /// Whether every farm committed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The farming simulation engine.
pub struct FarmEngine<S: FarmStore> {
    config: Arc<SimConfig>,
    store: S,
    clock: Arc<dyn Clock>,
    environment: Arc<dyn EnvironmentProvider>,
    locks: DashMap<OwnerId, Arc<Mutex<()>>>,
    events: EventBus,
}

impl<S: FarmStore> FarmEngine<S> {
    /// Creates an engine on the system clock with no environment data.
    #[must_use]
    pub fn new(config: SimConfig, store: S) -> Self {
        Self {
            config: Arc::new(config),
            store,
            clock: Arc::new(SystemClock),
            environment: Arc::new(NoEnvironment),
            locks: DashMap::new(),
            events: EventBus::default(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the environment provider.
    #[must_use]
    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentProvider>) -> Self {
        self.environment = environment;
        self
    }

    /// Replaces the event bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Simulation config.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Event bus carrying committed events.
    ///
    /// The bus is bounded. Once it holds its capacity of undrained events,
    /// newer events are dropped with a warning while the commands themselves
    /// still succeed. Consumers that need every `ChallengeCompleted` or
    /// `AchievementUnlocked` notification must drain at least once per
    /// `capacity` events, or read them from [`EventBus::receiver`] on another
    /// thread. Farm state is unaffected either way.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Opens a new farm with the starting balance.
    pub fn open_farm(&self, owner: OwnerId) -> FarmResult<PlayerProgress> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock();
        if self.store.load(owner)?.is_some() {
            return Err(FarmError::FarmExists(owner));
        }
        let mut farm = Farm::new(owner, &self.config, self.clock.now());
        let events = farm.take_events();
        self.store.save(&farm)?;
        self.events.publish_all(events);
        info!("Opened farm for owner {}", owner.raw());
        Ok(farm.progress(&self.config))
    }

    /// Snapshot of an owner's farm.
    pub fn farm(&self, owner: OwnerId) -> FarmResult<Farm> {
        self.store.load(owner)?.ok_or(FarmError::FarmNotFound(owner))
    }

    /// Plants a crop. The climate bonus comes from the provider's recent
    /// average for `location`.
    pub fn plant(
        &self,
        owner: OwnerId,
        position: GridPosition,
        crop_type: CropType,
        location: Option<Location>,
    ) -> FarmResult<Crop> {
        let average = location
            .filter(Location::is_valid)
            .and_then(|l| self.average_sample(l));
        let bonus = ClimateReport::evaluate(average.as_ref(), &self.config.climate).multiplier;

        let crop = self.commit(owner, |farm, config, now| {
            farm.plant(config, position, crop_type, location, bonus, now)
        })?;
        info!(
            "Owner {} planted {} at ({}, {}) with climate bonus {:.2}",
            owner.raw(),
            crop_type,
            position.row,
            position.col,
            crop.climate_bonus
        );
        Ok(crop)
    }

    /// Waters a crop.
    pub fn water(&self, owner: OwnerId, crop: CropId, tier: WaterTier) -> FarmResult<Crop> {
        let crop = self.commit(owner, |farm, config, now| farm.water(config, crop, tier, now))?;
        debug!("Owner {} watered crop {} ({:?})", owner.raw(), crop.id.raw(), tier);
        Ok(crop)
    }

    /// Fertilizes a crop.
    pub fn fertilize(
        &self,
        owner: OwnerId,
        crop: CropId,
        tier: FertilizerTier,
    ) -> FarmResult<Crop> {
        let crop =
            self.commit(owner, |farm, config, now| farm.fertilize(config, crop, tier, now))?;
        debug!("Owner {} fertilized crop {} ({:?})", owner.raw(), crop.id.raw(), tier);
        Ok(crop)
    }

    /// Harvests a ready crop.
    pub fn harvest(&self, owner: OwnerId, crop: CropId) -> FarmResult<HarvestResult> {
        let result = self.commit(owner, |farm, config, now| farm.harvest(config, crop, now))?;
        info!(
            "Owner {} harvested crop {}: {} xp, {} coins",
            owner.raw(),
            crop.raw(),
            result.xp,
            result.coins
        );
        Ok(result)
    }

    /// Raises scenarios the crop is currently eligible for.
    ///
    /// Weather rules use the provider's latest reading for the crop's
    /// location. Calling again without new conditions raises nothing.
    pub fn generate_scenarios(
        &self,
        owner: OwnerId,
        crop: CropId,
    ) -> FarmResult<Vec<ScenarioEvent>> {
        let location = self.farm(owner)?.crop(crop)?.location;
        let latest = location.and_then(|l| self.latest_sample(l));

        let raised = self.commit(owner, |farm, config, now| {
            farm.generate_scenarios(config, crop, latest.as_ref(), now)
        })?;
        if !raised.is_empty() {
            info!(
                "Raised {} scenario(s) on crop {} for owner {}",
                raised.len(),
                crop.raw(),
                owner.raw()
            );
        }
        Ok(raised)
    }

    /// Active scenarios, optionally for one crop.
    pub fn active_scenarios(
        &self,
        owner: OwnerId,
        crop: Option<CropId>,
    ) -> FarmResult<Vec<ScenarioEvent>> {
        Ok(self.farm(owner)?.active_scenarios(crop))
    }

    /// Resolves a scenario with one of its actions.
    pub fn complete_scenario(
        &self,
        owner: OwnerId,
        scenario: ScenarioId,
        action: ActionKind,
    ) -> FarmResult<CompletionResult> {
        let result = self.commit(owner, |farm, config, now| {
            farm.complete_scenario(config, scenario, action, now)
        })?;
        info!(
            "Owner {} resolved scenario {} with {}",
            owner.raw(),
            scenario.raw(),
            action.display_name()
        );
        Ok(result)
    }

    /// Reports the climate bonus for a location and records the check.
    pub fn check_climate(&self, owner: OwnerId, location: Location) -> FarmResult<ClimateCheck> {
        if !location.is_valid() {
            return Err(FarmError::InvalidInput(format!(
                "invalid location ({}, {})",
                location.latitude, location.longitude
            )));
        }
        let sample = self.average_sample(location);
        let report = ClimateReport::evaluate(sample.as_ref(), &self.config.climate);
        self.commit(owner, |farm, config, now| farm.record_climate_check(config, now))?;
        Ok(ClimateCheck {
            location,
            sample,
            report,
        })
    }

    /// Posts a direct credit or charge.
    pub fn credit(&self, owner: OwnerId, credit: Credit) -> FarmResult<LedgerEntry> {
        let entry = self.commit(owner, |farm, config, now| farm.credit(config, credit, now))?;
        info!(
            "Credited owner {}: {} xp, {} coins",
            owner.raw(),
            credit.xp,
            credit.coins
        );
        Ok(entry)
    }

    /// Advances a challenge by `amount`.
    pub fn advance_challenge(
        &self,
        owner: OwnerId,
        challenge: ChallengeId,
        amount: u32,
    ) -> FarmResult<ChallengeProgress> {
        self.commit(owner, |farm, config, now| {
            farm.advance_challenge(config, challenge, amount, now)
        })
    }

    /// Unlocks an achievement. Returns false if it was already unlocked.
    pub fn unlock_achievement(
        &self,
        owner: OwnerId,
        achievement: AchievementId,
    ) -> FarmResult<bool> {
        self.commit(owner, |farm, config, now| {
            farm.unlock_achievement(config, achievement, now)
        })
    }

    /// Active crops in ID order.
    pub fn crops(&self, owner: OwnerId) -> FarmResult<Vec<Crop>> {
        Ok(self.farm(owner)?.crops().iter().cloned().collect())
    }

    /// XP, level and coins.
    pub fn progress(&self, owner: OwnerId) -> FarmResult<PlayerProgress> {
        Ok(self.farm(owner)?.progress(&self.config))
    }

    /// Progress on every challenge.
    pub fn challenges(&self, owner: OwnerId) -> FarmResult<Vec<ChallengeProgress>> {
        Ok(self.farm(owner)?.challenge_progress(&self.config))
    }

    /// Every achievement with unlock state and progress.
    pub fn achievements(&self, owner: OwnerId) -> FarmResult<Vec<AchievementView>> {
        Ok(self.farm(owner)?.achievement_view(&self.config))
    }

    /// Ledger journal, oldest first.
    pub fn journal(&self, owner: OwnerId) -> FarmResult<Vec<LedgerEntry>> {
        Ok(self.farm(owner)?.ledger().journal().to_vec())
    }

    /// Top `limit` owners by XP. Ties are broken by owner ID.
    pub fn leaderboard(&self, limit: usize) -> FarmResult<Vec<LeaderboardEntry>> {
        let mut rows = Vec::new();
        for owner in self.store.owners()? {
            if let Some(farm) = self.store.load(owner)? {
                let progress = farm.progress(&self.config);
                rows.push((progress.xp, owner, progress));
            }
        }
        rows.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(rows
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, (_, owner, progress))| LeaderboardEntry {
                rank: i + 1,
                owner,
                xp: progress.xp,
                level: progress.level,
                coins: progress.coins,
            })
            .collect())
    }

    /// Advances every farm to the clock's current time.
    pub fn tick(&self) -> TickReport {
        self.tick_at(self.clock.now())
    }

    /// Advances every farm to `now`.
    ///
    /// A farm that fails to load or save is logged and reported; the others
    /// still tick.
    pub fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport {
            at: Some(now),
            ..TickReport::default()
        };
        let owners = match self.store.owners() {
            Ok(owners) => owners,
            Err(e) => {
                warn!("Tick skipped, could not list farms: {e}");
                return report;
            },
        };

        for owner in owners {
            match self.tick_owner(owner, now) {
                Ok(outcome) => {
                    report.farms += 1;
                    report.crops_advanced += outcome.crops_advanced;
                    report.became_ready.extend(outcome.became_ready);
                    report.expired.extend(outcome.expired);
                },
                Err(e) => {
                    warn!("Tick failed for owner {}: {e}", owner.raw());
                    report.failures.push(TickFailure {
                        owner,
                        message: e.to_string(),
                    });
                },
            }
        }

        debug!(
            "Tick at {now}: {} farms, {} crops, {} ready, {} expired, {} failed",
            report.farms,
            report.crops_advanced,
            report.became_ready.len(),
            report.expired.len(),
            report.failures.len()
        );
        report
    }

    fn tick_owner(&self, owner: OwnerId, now: DateTime<Utc>) -> FarmResult<TickOutcome> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock();
        let mut farm = self.store.load(owner)?.ok_or(FarmError::FarmNotFound(owner))?;
        let outcome = farm.tick(&self.config, now);
        let events = farm.take_events();
        self.store.save(&farm)?;
        self.events.publish_all(events);
        Ok(outcome)
    }

    fn lock_for(&self, owner: OwnerId) -> Arc<Mutex<()>> {
        self.locks.entry(owner).or_default().clone()
    }

    /// Runs a command against the owner's farm and commits it.
    fn commit<T>(
        &self,
        owner: OwnerId,
        command: impl FnOnce(&mut Farm, &SimConfig, DateTime<Utc>) -> FarmResult<T>,
    ) -> FarmResult<T> {
        let lock = self.lock_for(owner);
        let _guard = lock.lock();
        let mut farm = self.store.load(owner)?.ok_or(FarmError::FarmNotFound(owner))?;
        let value = command(&mut farm, &self.config, self.clock.now())?;
        let events = farm.take_events();
        self.store.save(&farm)?;
        self.events.publish_all(events);
        Ok(value)
    }

    fn fetch_window(&self, location: Location) -> Option<crate::environment::EnvironmentSeries> {
        let range = DateRange::lookback(
            self.clock.now().date_naive(),
            self.config.climate.lookback_days,
            self.config.climate.lag_days,
        );
        match self.environment.fetch(location, range) {
            Ok(series) => Some(series),
            Err(e) => {
                warn!(
                    "Environment lookup failed for ({}, {}): {e}",
                    location.latitude, location.longitude
                );
                None
            },
        }
    }

    fn average_sample(&self, location: Location) -> Option<EnvironmentSample> {
        self.fetch_window(location)?.average()
    }

    fn latest_sample(&self, location: Location) -> Option<EnvironmentSample> {
        self.fetch_window(location)?.latest()
    }
}
