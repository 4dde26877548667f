//! Spawner boundary and unit provenance.
//!
//! The engine never materializes units itself. It hands a [`SpawnOrder`] to a
//! [`MobSpawner`] and gets back a handle or a failure; failures are logged by
//! the caller and dropped, never retried. Provenance travels as an explicit
//! [`UnitAttributes`] struct attached at spawn time, not a dynamic tag bag.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::vec3::Vec3;
use crate::zone::constants::{paths, reduction};
use crate::zone::owner::ActorId;
use crate::zone::point::{WorldId, ZoneId};
use crate::zone::settings::ZoneSettings;

/// Handle for a live reinforcement unit
pub type UnitId = Uuid;

/// Which spawn pool a unit was drawn from. The pool decides the
/// timer-reduction range granted when the unit dies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MobPool {
    /// Plain host-engine mobs
    Vanilla,
    /// Boosted mobs from the enhanced pool (per-type overrides allowed)
    Enhanced,
}

/// Provenance attached to every spawned unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitAttributes {
    pub unit_id: UnitId,
    pub zone_id: ZoneId,
    pub pool: MobPool,
    pub mob_type: String,
    /// Actor whose capture attempt provoked the spawn
    pub origin_actor: ActorId,
    /// Tick-second the unit entered the world
    pub spawned_at: u64,
}

/// Everything a spawner needs to materialize one unit.
#[derive(Debug, Clone)]
pub struct SpawnOrder {
    pub zone_id: ZoneId,
    pub world: WorldId,
    pub position: Vec3,
    pub pool: MobPool,
    pub mob_type: String,
    pub origin_actor: ActorId,
}

/// Engine-agnostic unit factory implemented by the host platform.
pub trait MobSpawner: Send + Sync {
    /// Materialize one unit. `None` means the spawn failed; the engine logs
    /// and drops the request.
    fn spawn_unit(&self, order: &SpawnOrder) -> Option<UnitId>;

    /// Point an existing unit at an actor. Absent units are ignored.
    fn retarget_unit(&self, unit: UnitId, target: ActorId);

    /// Remove a unit from the world (session teardown). Absent units are
    /// ignored.
    fn despawn_unit(&self, unit: UnitId);
}

/// Sample the capture-timer reduction (seconds) granted for killing a unit.
///
/// Vanilla-pool units use the zone's vanilla range. Enhanced-pool units use
/// the enhanced range unless the zone configures a per-mob-type override
/// (`reduction.overrides.<type>.min-seconds` / `.max-seconds`).
pub fn sample_reduction_secs(
    settings: &ZoneSettings,
    zone: &str,
    pool: MobPool,
    mob_type: &str,
) -> f64 {
    let (min, max) = match pool {
        MobPool::Vanilla => (
            settings.get_f64_in(zone, paths::REDUCTION_VANILLA_MIN, reduction::VANILLA_MIN, 0.0, 600.0),
            settings.get_f64_in(zone, paths::REDUCTION_VANILLA_MAX, reduction::VANILLA_MAX, 0.0, 600.0),
        ),
        MobPool::Enhanced => {
            let default_min = settings.get_f64_in(
                zone,
                paths::REDUCTION_ENHANCED_MIN,
                reduction::ENHANCED_MIN,
                0.0,
                600.0,
            );
            let default_max = settings.get_f64_in(
                zone,
                paths::REDUCTION_ENHANCED_MAX,
                reduction::ENHANCED_MAX,
                0.0,
                600.0,
            );
            let override_min = format!("reduction.overrides.{}.min-seconds", mob_type);
            let override_max = format!("reduction.overrides.{}.max-seconds", mob_type);
            (
                settings.get_f64_in(zone, &override_min, default_min, 0.0, 600.0),
                settings.get_f64_in(zone, &override_max, default_max, 0.0, 600.0),
            )
        }
    };

    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if hi <= lo {
        return lo;
    }
    rand::thread_rng().gen_range(lo..=hi)
}

/// Test/demo spawner that allocates handles and records every order.
#[derive(Debug, Default)]
pub struct RecordingSpawner {
    orders: parking_lot::Mutex<Vec<SpawnOrder>>,
    retargets: parking_lot::Mutex<Vec<(UnitId, ActorId)>>,
    despawned: parking_lot::Mutex<Vec<UnitId>>,
    /// When true, every spawn fails (transient-failure testing)
    pub fail_spawns: std::sync::atomic::AtomicBool,
}

impl RecordingSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().len()
    }

    pub fn orders(&self) -> Vec<SpawnOrder> {
        self.orders.lock().clone()
    }

    pub fn retargets(&self) -> Vec<(UnitId, ActorId)> {
        self.retargets.lock().clone()
    }

    pub fn despawned(&self) -> Vec<UnitId> {
        self.despawned.lock().clone()
    }
}

impl MobSpawner for RecordingSpawner {
    fn spawn_unit(&self, order: &SpawnOrder) -> Option<UnitId> {
        if self.fail_spawns.load(std::sync::atomic::Ordering::Relaxed) {
            return None;
        }
        self.orders.lock().push(order.clone());
        Some(Uuid::new_v4())
    }

    fn retarget_unit(&self, unit: UnitId, target: ActorId) {
        self.retargets.lock().push((unit, target));
    }

    fn despawn_unit(&self, unit: UnitId) {
        self.despawned.lock().push(unit);
    }
}
