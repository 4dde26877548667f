//! Wave phase scheduling.
//!
//! Waves are indexed by phase number, derived deterministically from elapsed
//! capture time: `expected_phase = elapsed / interval + 1`. A reinforcement
//! kill can jump elapsed time forward across several intervals at once, so
//! the scheduler hands back every phase between the last one fired and the
//! one now due, in ascending order. Phases advance even when the point cap
//! limits how many mobs a phase actually queues.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::zone::point::ZoneId;

/// Phase number due at a given elapsed capture time. Phase 1 is due the
/// moment the capture phase begins.
#[inline]
pub fn expected_phase(elapsed_secs: u64, interval_secs: u64) -> u64 {
    elapsed_secs / interval_secs.max(1) + 1
}

/// Units a single wave contributes before room-bounding.
#[inline]
pub fn mobs_per_wave(phase: u64, base: u64, phase_increase: u64, max_per_wave: u64) -> u64 {
    base.saturating_add(phase.saturating_mul(phase_increase))
        .min(max_per_wave)
}

/// Per-zone wave phase counters.
#[derive(Debug, Default)]
pub struct WaveScheduler {
    fired: FxHashMap<ZoneId, u64>,
}

impl WaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest phase already fired for a zone (0 = none yet).
    pub fn current_phase(&self, zone: &str) -> u64 {
        self.fired.get(zone).copied().unwrap_or(0)
    }

    /// Phases that must fire now, in ascending order, including every phase
    /// skipped by a timer jump. Marks them fired.
    pub fn due_phases(
        &mut self,
        zone: &ZoneId,
        elapsed_secs: u64,
        interval_secs: u64,
    ) -> SmallVec<[u64; 4]> {
        let expected = expected_phase(elapsed_secs, interval_secs);
        let current = self.current_phase(zone);
        if expected <= current {
            return SmallVec::new();
        }
        self.fired.insert(zone.clone(), expected);
        (current + 1..=expected).collect()
    }

    /// Forgets a zone's counter. Called when its session ends.
    pub fn remove_zone(&mut self, zone: &str) {
        self.fired.remove(zone);
    }

    pub fn clear(&mut self) {
        self.fired.clear();
    }
}
