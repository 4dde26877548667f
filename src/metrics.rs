//! Prometheus-compatible metrics endpoint
//!
//! Exposes capture-engine metrics in Prometheus format for Grafana dashboards.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Metrics registry for the capture engine
#[derive(Debug)]
pub struct Metrics {
    // Zone/session gauges
    pub zone_count: AtomicU64,
    pub active_sessions: AtomicU64,
    pub contested_sessions: AtomicU64,

    // Reinforcement gauges
    pub queued_spawns: AtomicU64,
    pub live_reinforcements: AtomicU64,

    // Lifetime counters
    pub captures_completed: AtomicU64,
    pub captures_cancelled: AtomicU64,
    pub units_spawned: AtomicU64,
    pub units_lost: AtomicU64,
    pub waves_queued: AtomicU64,

    // Tick timing (microseconds)
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // Tick counter
    pub tick_count: AtomicU64,

    // Extended counters (per-drain detail)
    #[cfg(feature = "metrics_extended")]
    pub spawns_granted_last_tick: AtomicU64,
    #[cfg(feature = "metrics_extended")]
    pub retargets_issued: AtomicU64,

    // Server uptime
    start_time: Instant,

    // Rolling tick times for percentile calculation (VecDeque for O(1) pop_front)
    tick_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            zone_count: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            contested_sessions: AtomicU64::new(0),
            queued_spawns: AtomicU64::new(0),
            live_reinforcements: AtomicU64::new(0),
            captures_completed: AtomicU64::new(0),
            captures_cancelled: AtomicU64::new(0),
            units_spawned: AtomicU64::new(0),
            units_lost: AtomicU64::new(0),
            waves_queued: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            #[cfg(feature = "metrics_extended")]
            spawns_granted_last_tick: AtomicU64::new(0),
            #[cfg(feature = "metrics_extended")]
            retargets_issued: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(1000)),
        }
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        // Update rolling history for percentiles
        let mut history = self.tick_history.write();
        history.push_back(us);

        // Keep last 1000 samples - O(1) with VecDeque
        while history.len() > 1000 {
            history.pop_front();
        }

        // Calculate percentiles
        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();

            let p95_idx = (sorted.len() as f32 * 0.95) as usize;
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;

            self.tick_time_p95_us.store(sorted[p95_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_p99_us.store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
            self.tick_time_max_us.store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);

        // Helper macro for metrics
        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        // Zone/session metrics
        metric!("territory_zones", "Number of registered capture zones", "gauge",
            self.zone_count.load(Ordering::Relaxed));
        metric!("territory_sessions_active", "Number of active capture sessions", "gauge",
            self.active_sessions.load(Ordering::Relaxed));
        metric!("territory_sessions_contested", "Number of contested capture sessions", "gauge",
            self.contested_sessions.load(Ordering::Relaxed));

        // Reinforcement metrics
        metric!("territory_spawn_queue_depth", "Queued reinforcement spawn requests", "gauge",
            self.queued_spawns.load(Ordering::Relaxed));
        metric!("territory_reinforcements_live", "Live reinforcement units across all zones", "gauge",
            self.live_reinforcements.load(Ordering::Relaxed));

        // Lifetime counters
        metric!("territory_captures_completed_total", "Completed captures since start", "counter",
            self.captures_completed.load(Ordering::Relaxed));
        metric!("territory_captures_cancelled_total", "Cancelled capture attempts since start", "counter",
            self.captures_cancelled.load(Ordering::Relaxed));
        metric!("territory_units_spawned_total", "Reinforcement units spawned since start", "counter",
            self.units_spawned.load(Ordering::Relaxed));
        metric!("territory_units_lost_total", "Reinforcement units killed since start", "counter",
            self.units_lost.load(Ordering::Relaxed));
        metric!("territory_waves_queued_total", "Reinforcement waves queued since start", "counter",
            self.waves_queued.load(Ordering::Relaxed));

        // Performance metrics
        metric!("territory_tick_time_microseconds", "Current tick time in microseconds", "gauge",
            self.tick_time_us.load(Ordering::Relaxed));
        metric!("territory_tick_time_p95_microseconds", "95th percentile tick time", "gauge",
            self.tick_time_p95_us.load(Ordering::Relaxed));
        metric!("territory_tick_time_p99_microseconds", "99th percentile tick time", "gauge",
            self.tick_time_p99_us.load(Ordering::Relaxed));
        metric!("territory_tick_time_max_microseconds", "Maximum tick time", "gauge",
            self.tick_time_max_us.load(Ordering::Relaxed));
        metric!("territory_tick_count", "Total ticks processed", "counter",
            self.tick_count.load(Ordering::Relaxed));
        metric!("territory_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        #[cfg(feature = "metrics_extended")]
        {
            metric!("territory_spawns_granted_last_tick", "Spawn requests granted in the last drain pass", "gauge",
                self.spawns_granted_last_tick.load(Ordering::Relaxed));
            metric!("territory_retargets_issued_total", "Retarget commands issued since start", "counter",
                self.retargets_issued.load(Ordering::Relaxed));
        }

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);

                    let response = if request.starts_with("GET /metrics") {
                        let body = metrics.to_prometheus();
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else if request.starts_with("GET /health") || request.starts_with("GET /") {
                        let body = "OK";
                        format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        )
                    } else {
                        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
