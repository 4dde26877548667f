//! Default tunables and setting paths for capture zones.
//!
//! Every value here is a fallback: the live value is always resolved through
//! [`ZoneSettings`](crate::zone::settings::ZoneSettings) so per-zone overrides
//! and the global template win over these constants.

/// World/chunk geometry constants
pub mod chunk {
    /// Side length of one chunk in blocks
    pub const BLOCKS_PER_CHUNK: i32 = 16;
}

/// Capture session timing defaults
pub mod capture {
    /// Warm-up before the capture timer starts depleting (minutes)
    pub const PREPARATION_MINUTES: i64 = 5;
    /// Time an owner must hold the zone to take it (minutes)
    pub const CAPTURE_MINUTES: i64 = 10;
    /// Zone not capturable again for this long after a capture (seconds)
    pub const COOLDOWN_SECONDS: i64 = 3600;
    /// Recapture lock against the just-deposed owner (seconds)
    pub const DEPOSED_LOCK_SECONDS: i64 = 1800;
    /// Recapture lock against the attacker that took the zone (seconds)
    pub const ATTACKER_LOCK_SECONDS: i64 = 0;
    /// Grace window when the capturing owner leaves the zone (seconds, 0 = none)
    pub const GRACE_SECONDS: i64 = 30;
    /// What happens to progress while the zone is contested
    pub const CONTESTED_POLICY: &str = "pause";
}

/// Reinforcement wave defaults
pub mod waves {
    /// Seconds of elapsed capture time between wave phases
    pub const INTERVAL_SECONDS: i64 = 30;
    /// Units queued by the first wave
    pub const BASE_MOBS_PER_WAVE: i64 = 2;
    /// Extra units per phase number
    pub const PHASE_INCREASE: i64 = 1;
    /// Hard cap on units queued by a single wave
    pub const MAX_MOBS_PER_WAVE: i64 = 8;
    /// Hard cap on live + pending units for one zone
    pub const MAX_MOBS_PER_POINT: i64 = 20;
    /// No waves fire once remaining capture time drops under this (seconds)
    pub const STOP_SPAWN_UNDER_SECONDS: i64 = 15;
    /// Queue drain cap per tick for a single zone
    pub const ZONE_MAX_PER_TICK: i64 = 3;
    /// Queue drain cap per tick across all zones
    pub const GLOBAL_MAX_PER_TICK: i64 = 10;
    /// Share of enhanced-pool units in a wave (0.0 - 1.0)
    pub const ENHANCED_SHARE: f64 = 0.25;
}

/// Reinforcement targeting defaults
pub mod targeting {
    /// Seconds between retarget passes for a zone
    pub const RETARGET_INTERVAL_SECONDS: i64 = 5;
    /// Extra chunks added around the zone when searching for targets
    pub const SEARCH_BUFFER_CHUNKS: i64 = 1;
    /// Which actors reinforcements attack: "capturing", "opposing", "anyone"
    pub const MODE: &str = "capturing";
}

/// Default spawn pools by mob type name
pub mod mobs {
    pub const VANILLA: &[&str] = &["zombie", "skeleton", "spider"];
    pub const ENHANCED: &[&str] = &["wither_skeleton", "vindicator", "ravager"];
}

/// Capture-timer reduction granted per reinforcement kill (seconds)
pub mod reduction {
    pub const VANILLA_MIN: f64 = 0.5;
    pub const VANILLA_MAX: f64 = 1.5;
    pub const ENHANCED_MIN: f64 = 2.0;
    pub const ENHANCED_MAX: f64 = 5.0;
}

/// Setting paths resolved through the zone settings cascade.
///
/// Kept as constants so the coordinator, wave engine, and tracker never
/// disagree on a spelling.
pub mod paths {
    pub const PREPARATION_MINUTES: &str = "capture.preparation-minutes";
    pub const CAPTURE_MINUTES: &str = "capture.capture-minutes";
    pub const COOLDOWN_SECONDS: &str = "capture.cooldown-seconds";
    pub const DEPOSED_LOCK_SECONDS: &str = "capture.deposed-lock-seconds";
    pub const ATTACKER_LOCK_SECONDS: &str = "capture.attacker-lock-seconds";
    pub const GRACE_SECONDS: &str = "capture.grace-seconds";
    pub const CONTESTED_POLICY: &str = "capture.contested-policy";
    pub const CAPTURABLE: &str = "capture.enabled";
    pub const OWNER_KIND: &str = "capture.owner-kind";

    pub const WAVE_INTERVAL_SECONDS: &str = "reinforcements.wave-interval-seconds";
    pub const BASE_MOBS_PER_WAVE: &str = "reinforcements.base-mobs-per-wave";
    pub const PHASE_INCREASE: &str = "reinforcements.phase-increase";
    pub const MAX_MOBS_PER_WAVE: &str = "reinforcements.max-mobs-per-wave";
    pub const MAX_MOBS_PER_POINT: &str = "reinforcements.max-mobs-per-point";
    pub const STOP_SPAWN_UNDER_SECONDS: &str = "reinforcements.stop-spawn-under-seconds";
    pub const ZONE_MAX_PER_TICK: &str = "reinforcements.zone-max-per-tick";
    pub const GLOBAL_MAX_PER_TICK: &str = "reinforcements.global-max-per-tick";
    pub const ENHANCED_SHARE: &str = "reinforcements.enhanced-share";
    pub const VANILLA_MOBS: &str = "reinforcements.vanilla-mobs";
    pub const ENHANCED_MOBS: &str = "reinforcements.enhanced-mobs";

    pub const RETARGET_INTERVAL_SECONDS: &str = "targeting.retarget-interval-seconds";
    pub const SEARCH_BUFFER_CHUNKS: &str = "targeting.search-buffer-chunks";
    pub const TARGETING_MODE: &str = "targeting.mode";

    pub const REDUCTION_VANILLA_MIN: &str = "reduction.vanilla-min-seconds";
    pub const REDUCTION_VANILLA_MAX: &str = "reduction.vanilla-max-seconds";
    pub const REDUCTION_ENHANCED_MIN: &str = "reduction.enhanced-min-seconds";
    pub const REDUCTION_ENHANCED_MAX: &str = "reduction.enhanced-max-seconds";
}
