//! Clock driver.
//!
//! Polls the simulated clock on a real-time interval and ticks every farm
//! once the configured number of simulated minutes has passed. Ticks run on
//! the blocking pool so store IO never stalls the runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use fasal_gameplay::{FarmEngine, FarmEvent, FarmStore, TickDriver, TickReport};
use tracing::{debug, info, warn};

/// Runs the tick loop until `shutdown` resolves. Returns the number of ticks.
pub async fn run<S, F>(
    engine: Arc<FarmEngine<S>>,
    poll: Duration,
    tick_minutes: u32,
    shutdown: F,
) -> u64
where
    S: FarmStore + 'static,
    F: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut driver = TickDriver::new(tick_minutes);
    tokio::pin!(shutdown);

    info!(
        "Tick driver started: polling every {:?}, ticking every {} simulated minute(s)",
        poll,
        driver.interval_minutes()
    );

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = interval.tick() => {
                let now = engine.now();
                if !driver.is_due(now) {
                    continue;
                }
                let worker = Arc::clone(&engine);
                match tokio::task::spawn_blocking(move || worker.tick_at(now)).await {
                    Ok(report) => {
                        driver.mark(now);
                        log_report(&report);
                        log_events(&engine.events().drain());
                    },
                    Err(e) => warn!("Tick task failed: {e}"),
                }
            },
        }
    }

    info!("Tick driver stopped after {} tick(s)", driver.tick_count());
    driver.tick_count()
}

fn log_report(report: &TickReport) {
    if !report.became_ready.is_empty() || !report.expired.is_empty() {
        info!(
            "Tick: {} farm(s), {} crop(s) ready, {} scenario(s) expired",
            report.farms,
            report.became_ready.len(),
            report.expired.len()
        );
    }
    for failure in &report.failures {
        warn!("Farm {} was not ticked: {}", failure.owner.raw(), failure.message);
    }
}

fn log_events(events: &[FarmEvent]) {
    for event in events {
        debug!("Event for owner {}: {:?}", event.owner().raw(), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fasal_common::{GridPosition, OwnerId};
    use fasal_gameplay::{CropType, ManualClock, MemoryStore, SimConfig};

    #[tokio::test]
    async fn test_driver_ticks_until_shutdown() {
        let start = Utc.with_ymd_and_hms(2025, 5, 5, 5, 0, 0).single().expect("valid date");
        let clock = Arc::new(ManualClock::new(start));
        let engine = Arc::new(
            FarmEngine::new(SimConfig::default(), MemoryStore::new()).with_clock(clock.clone()),
        );
        let owner = OwnerId::new(1);
        engine.open_farm(owner).expect("open");
        engine
            .plant(owner, GridPosition::new(0, 0), CropType::Wheat, None)
            .expect("plant");
        clock.advance_minutes(30);

        let ticks = run(
            Arc::clone(&engine),
            Duration::from_millis(5),
            1,
            tokio::time::sleep(Duration::from_millis(60)),
        )
        .await;

        // The clock is frozen, so only the first poll is due.
        assert_eq!(ticks, 1);
        let crop = &engine.crops(owner).expect("crops")[0];
        assert!(crop.growth_stage > 0.0);
    }
}
