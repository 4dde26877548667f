//! Tick loop driver.
//!
//! One central interval task advances every session and the spawn queue; no
//! per-zone timer objects exist, so shutdown only has to stop this task and
//! call [`CaptureEngine::shutdown`]. Handlers must never block: the engine
//! tick is pure in-memory work.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, Instant};
use tracing::info;

use crate::capture::coordinator::CaptureEngine;
use crate::metrics::Metrics;

/// Seconds between periodic stats log lines
const STATS_LOG_INTERVAL_TICKS: u64 = 30;

/// Start the engine tick loop as a background task.
pub fn start_tick_loop(
    engine: Arc<RwLock<CaptureEngine>>,
    metrics: Arc<Metrics>,
    tick_interval_ms: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(tick_interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!("Capture tick loop started ({} ms per tick)", tick_interval_ms);
        let mut tick_count: u64 = 0;

        loop {
            ticker.tick().await;
            tick_count += 1;

            let tick_start = Instant::now();
            {
                let mut engine = engine.write().await;
                engine.tick();

                use std::sync::atomic::Ordering;
                let stats = engine.stats();
                metrics.zone_count.store(engine.zone_count() as u64, Ordering::Relaxed);
                metrics
                    .active_sessions
                    .store(engine.active_session_count() as u64, Ordering::Relaxed);
                metrics
                    .contested_sessions
                    .store(engine.contested_session_count() as u64, Ordering::Relaxed);
                metrics
                    .queued_spawns
                    .store(engine.queued_spawn_count() as u64, Ordering::Relaxed);
                metrics
                    .live_reinforcements
                    .store(engine.live_unit_count() as u64, Ordering::Relaxed);
                metrics.captures_completed.store(stats.captures_completed, Ordering::Relaxed);
                metrics.captures_cancelled.store(stats.captures_cancelled, Ordering::Relaxed);
                metrics.units_spawned.store(stats.units_spawned, Ordering::Relaxed);
                metrics.units_lost.store(stats.units_lost, Ordering::Relaxed);
                metrics.waves_queued.store(stats.waves_queued, Ordering::Relaxed);
                #[cfg(feature = "metrics_extended")]
                {
                    metrics
                        .spawns_granted_last_tick
                        .store(engine.last_drain_granted(), Ordering::Relaxed);
                    metrics
                        .retargets_issued
                        .store(stats.retargets_issued, Ordering::Relaxed);
                }
            }
            metrics.record_tick_time(tick_start.elapsed());

            if tick_count % STATS_LOG_INTERVAL_TICKS == 0 {
                let engine = engine.read().await;
                info!(
                    "Engine: tick {}, {} zones, {} sessions ({} contested), {} queued, {} live units",
                    engine.now(),
                    engine.zone_count(),
                    engine.active_session_count(),
                    engine.contested_session_count(),
                    engine.queued_spawn_count(),
                    engine.live_unit_count()
                );
            }
        }
    })
}
