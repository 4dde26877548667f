//! Live reinforcement roster and continuous retargeting.
//!
//! One roster per zone tracks every unit the spawn queue materialized, in
//! spawn order. Targeting is re-evaluated on an interval rather than only at
//! spawn time, because the nearest eligible actor changes as people move.
//! All roster state for a zone tears down in one call when its session ends.

use rustc_hash::FxHashMap;

use crate::util::vec3::Vec3;
use crate::zone::owner::ActorId;
use crate::zone::point::ZoneId;
use crate::reinforcement::spawner::{UnitAttributes, UnitId};

/// Who reinforcements attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingMode {
    /// Only actors matching the zone's capturing owner
    CapturingOwner,
    /// Only actors NOT matching the capturing owner
    OpposingOwners,
    /// Any actor physically inside the zone plus search buffer
    AnyoneInside,
}

impl TargetingMode {
    /// Parse the settings string; unknown values fall back to `CapturingOwner`.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "opposing" => Self::OpposingOwners,
            "anyone" => Self::AnyoneInside,
            _ => Self::CapturingOwner,
        }
    }
}

#[derive(Debug)]
struct RosterUnit {
    attrs: UnitAttributes,
    spawn_position: Vec3,
    target: Option<ActorId>,
}

#[derive(Debug, Default)]
struct ZoneRoster {
    /// Spawn order preserved for cap accounting and teardown
    order: Vec<UnitId>,
    units: FxHashMap<UnitId, RosterUnit>,
    next_retarget_at: u64,
}

/// Per-zone rosters of live reinforcement units.
#[derive(Debug, Default)]
pub struct ReinforcementTracker {
    rosters: FxHashMap<ZoneId, ZoneRoster>,
    /// unit -> zone reverse index for O(1) death handling
    unit_zones: FxHashMap<UnitId, ZoneId>,
}

impl ReinforcementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roster_size(&self, zone: &str) -> usize {
        self.rosters.get(zone).map(|r| r.order.len()).unwrap_or(0)
    }

    pub fn total_units(&self) -> usize {
        self.unit_zones.len()
    }

    pub fn zone_of(&self, unit: UnitId) -> Option<&ZoneId> {
        self.unit_zones.get(&unit)
    }

    pub fn unit_ids(&self, zone: &str) -> Vec<UnitId> {
        self.rosters
            .get(zone)
            .map(|r| r.order.clone())
            .unwrap_or_default()
    }

    /// Registers a freshly spawned unit under its zone.
    pub fn register(&mut self, attrs: UnitAttributes, spawn_position: Vec3) {
        let zone = attrs.zone_id.clone();
        let unit_id = attrs.unit_id;
        let roster = self.rosters.entry(zone.clone()).or_default();
        if roster.units.contains_key(&unit_id) {
            return;
        }
        roster.order.push(unit_id);
        roster.units.insert(
            unit_id,
            RosterUnit {
                attrs,
                spawn_position,
                target: None,
            },
        );
        self.unit_zones.insert(unit_id, zone);
    }

    /// Removes a dead unit. Returns its provenance if it was tracked.
    pub fn remove_unit(&mut self, unit: UnitId) -> Option<UnitAttributes> {
        let zone = self.unit_zones.remove(&unit)?;
        let roster = self.rosters.get_mut(&zone)?;
        roster.order.retain(|id| *id != unit);
        let removed = roster.units.remove(&unit).map(|u| u.attrs);
        if roster.order.is_empty() {
            self.rosters.remove(&zone);
        }
        removed
    }

    /// Tears down everything tracked for a zone. Returns the unit ids that
    /// were still live so the host can despawn them; nothing stays tagged to
    /// a dead zone.
    pub fn teardown_zone(&mut self, zone: &str) -> Vec<UnitId> {
        let Some(roster) = self.rosters.remove(zone) else {
            return Vec::new();
        };
        for unit in &roster.order {
            self.unit_zones.remove(unit);
        }
        roster.order
    }

    pub fn clear(&mut self) -> Vec<UnitId> {
        let all: Vec<UnitId> = self.unit_zones.keys().copied().collect();
        self.rosters.clear();
        self.unit_zones.clear();
        all
    }

    /// Whether the zone's retarget interval has elapsed.
    pub fn is_retarget_due(&self, zone: &str, now: u64) -> bool {
        self.rosters
            .get(zone)
            .map(|r| now >= r.next_retarget_at)
            .unwrap_or(false)
    }

    pub fn schedule_retarget(&mut self, zone: &str, at: u64) {
        if let Some(roster) = self.rosters.get_mut(zone) {
            roster.next_retarget_at = at;
        }
    }

    /// One retarget pass for a zone.
    ///
    /// Each unit is pointed at the nearest eligible candidate by straight-line
    /// distance from the unit's last known position. When no candidate is
    /// eligible the previous target stays assigned; a target is never
    /// force-cleared. Returns the assignments that changed.
    pub fn retarget_zone(
        &mut self,
        zone: &str,
        candidates: &[(ActorId, Vec3)],
        unit_position: impl Fn(UnitId) -> Option<Vec3>,
    ) -> Vec<(UnitId, ActorId)> {
        let Some(roster) = self.rosters.get_mut(zone) else {
            return Vec::new();
        };
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut changed = Vec::new();
        for unit_id in &roster.order {
            let Some(unit) = roster.units.get_mut(unit_id) else {
                continue;
            };
            let from = unit_position(*unit_id).unwrap_or(unit.spawn_position);
            let nearest = candidates
                .iter()
                .min_by(|(_, a), (_, b)| {
                    from.distance_sq_to(*a)
                        .partial_cmp(&from.distance_sq_to(*b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(actor, _)| *actor);

            if let Some(actor) = nearest {
                if unit.target != Some(actor) {
                    unit.target = Some(actor);
                    changed.push((*unit_id, actor));
                }
            }
        }
        changed
    }

    #[cfg(test)]
    fn target_of(&self, unit: UnitId) -> Option<ActorId> {
        let zone = self.unit_zones.get(&unit)?;
        self.rosters.get(zone)?.units.get(&unit)?.target
    }
}
