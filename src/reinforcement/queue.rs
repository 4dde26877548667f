//! Global rate-limited spawn request queue.
//!
//! Wave triggers enqueue one request per unit; the coordinator drains the
//! queue once per tick under two caps: a global total and a per-zone total.
//! Requests over a zone's per-tick cap are re-enqueued in place, so other
//! zones are never starved and a zone's own requests keep their order.
//! Excess requests are backpressure, not losses: they stay queued until the
//! zone's cap frees up or its session ends, at which point they are purged
//! in one pass.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::zone::point::ZoneId;

/// Caller's verdict on a dequeued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDecision {
    /// Spawn this unit now
    Grant,
    /// Keep the request queued (e.g. roster momentarily full)
    Defer,
    /// The zone's session is gone: purge every request for the zone
    ZoneDead,
}

/// FIFO of pending spawn requests with per-zone pending counts.
#[derive(Debug, Default)]
pub struct ReinforcementSpawnQueue {
    requests: VecDeque<ZoneId>,
    pending: FxHashMap<ZoneId, usize>,
}

impl ReinforcementSpawnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Pending requests for one zone, tracked separately so purges are O(k).
    pub fn pending_for(&self, zone: &str) -> usize {
        self.pending.get(zone).copied().unwrap_or(0)
    }

    pub fn enqueue(&mut self, zone: &ZoneId) {
        self.requests.push_back(zone.clone());
        *self.pending.entry(zone.clone()).or_insert(0) += 1;
    }

    fn note_removed(&mut self, zone: &str) {
        if let Some(count) = self.pending.get_mut(zone) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.pending.remove(zone);
            }
        }
    }

    /// Removes every queued request for a zone. Returns how many were dropped.
    pub fn purge_zone(&mut self, zone: &str) -> usize {
        let dropped = self.pending.remove(zone).unwrap_or(0);
        if dropped > 0 {
            self.requests.retain(|z| z != zone);
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.requests.clear();
        self.pending.clear();
    }

    /// One tick's drain pass.
    ///
    /// Grants at most `global_max` requests in total and `zone_cap(zone)` per
    /// zone, asking `validate` before honoring each one. Deferred and
    /// over-cap requests survive in order; a `ZoneDead` verdict drops the
    /// zone's entire backlog in this pass.
    pub fn drain_for_tick(
        &mut self,
        global_max: usize,
        mut zone_cap: impl FnMut(&str) -> usize,
        mut validate: impl FnMut(&str) -> SpawnDecision,
    ) -> Vec<ZoneId> {
        let mut granted: Vec<ZoneId> = Vec::new();
        let mut granted_per_zone: FxHashMap<ZoneId, usize> = FxHashMap::default();
        let mut survivors: VecDeque<ZoneId> = VecDeque::with_capacity(self.requests.len());
        let mut dead_zones: FxHashSet<ZoneId> = FxHashSet::default();

        while let Some(zone) = self.requests.pop_front() {
            if dead_zones.contains(&zone) {
                self.note_removed(&zone);
                continue;
            }
            if granted.len() >= global_max {
                survivors.push_back(zone);
                continue;
            }
            let zone_granted = granted_per_zone.get(&zone).copied().unwrap_or(0);
            if zone_granted >= zone_cap(&zone) {
                // Over this zone's per-tick cap: re-enqueue, keep scanning so
                // other zones still get their share this tick.
                survivors.push_back(zone);
                continue;
            }
            match validate(&zone) {
                SpawnDecision::Grant => {
                    self.note_removed(&zone);
                    *granted_per_zone.entry(zone.clone()).or_insert(0) += 1;
                    granted.push(zone);
                }
                SpawnDecision::Defer => {
                    survivors.push_back(zone);
                }
                SpawnDecision::ZoneDead => {
                    self.note_removed(&zone);
                    dead_zones.insert(zone);
                }
            }
        }

        if !dead_zones.is_empty() {
            // Entries re-enqueued earlier in this pass may belong to a zone
            // declared dead later in the same pass.
            survivors.retain(|zone| {
                if dead_zones.contains(zone) {
                    self.note_removed(zone);
                    false
                } else {
                    true
                }
            });
        }

        self.requests = survivors;
        granted
    }
}
