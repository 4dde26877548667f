//! Capture point geometry and ownership record.
//!
//! A [`CapturePoint`] is the durable state for one zone: its shape, who
//! controls it, and the cooldown/lock instants that gate new attempts. The
//! session engine only writes the ownership and timestamp fields; points are
//! created and destroyed by administrative operations.

use serde::{Deserialize, Serialize};

use crate::util::vec3::Vec3;
use crate::zone::constants::chunk::BLOCKS_PER_CHUNK;
use crate::zone::owner::CaptureOwner;

/// Unique zone identifier
pub type ZoneId = String;

/// World name a zone or actor lives in. An empty name marks a world that no
/// longer exists; every containment test against it fails closed.
pub type WorldId = String;

/// Integer block coordinate (cuboid corners)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    fn min(self, other: BlockPos) -> Self {
        Self {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    fn max(self, other: BlockPos) -> Self {
        Self {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            z: self.z.max(other.z),
        }
    }
}

/// Buffer-expanded chunk-space bounding box (inclusive).
///
/// Callers pre-filter candidates from the chunk index with this box before
/// running the exact shape test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl ChunkBounds {
    pub fn contains_chunk(&self, chunk_x: i32, chunk_z: i32) -> bool {
        chunk_x >= self.min_x && chunk_x <= self.max_x && chunk_z >= self.min_z && chunk_z <= self.max_z
    }
}

#[inline]
fn block_to_chunk(block: i32) -> i32 {
    block.div_euclid(BLOCKS_PER_CHUNK)
}

/// Zone shape: a chunk-radius circle or an axis-aligned cuboid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ZoneShape {
    Circle {
        world: WorldId,
        center: Vec3,
        /// Radius in chunks, always >= 1
        chunk_radius: u32,
    },
    Cuboid {
        world: WorldId,
        /// Normalized: min <= max component-wise
        min: BlockPos,
        max: BlockPos,
    },
}

impl ZoneShape {
    /// Circle shape; radius is clamped to at least one chunk.
    pub fn circle(world: impl Into<WorldId>, center: Vec3, chunk_radius: u32) -> Self {
        Self::Circle {
            world: world.into(),
            center,
            chunk_radius: chunk_radius.max(1),
        }
    }

    /// Cuboid shape; corners are normalized so min <= max on every axis.
    pub fn cuboid(world: impl Into<WorldId>, a: BlockPos, b: BlockPos) -> Self {
        Self::Cuboid {
            world: world.into(),
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn world(&self) -> &WorldId {
        match self {
            Self::Circle { world, .. } => world,
            Self::Cuboid { world, .. } => world,
        }
    }

    /// Anchor position used for spawn placement and distance ordering.
    pub fn anchor(&self) -> Vec3 {
        match self {
            Self::Circle { center, .. } => *center,
            Self::Cuboid { min, max, .. } => Vec3::new(
                (min.x + max.x) as f64 / 2.0 + 0.5,
                min.y as f64,
                (min.z + max.z) as f64 / 2.0 + 0.5,
            ),
        }
    }

    /// Equivalent bounding radius in chunks, for legacy radius queries.
    pub fn bounding_chunk_radius(&self) -> u32 {
        match self {
            Self::Circle { chunk_radius, .. } => *chunk_radius,
            Self::Cuboid { min, max, .. } => {
                let half_x = (max.x - min.x + 1) as f64 / 2.0;
                let half_z = (max.z - min.z + 1) as f64 / 2.0;
                let blocks = half_x.max(half_z);
                ((blocks / BLOCKS_PER_CHUNK as f64).ceil() as u32).max(1)
            }
        }
    }

    /// Exact containment test.
    ///
    /// The buffer widens the horizontal bounds only; cuboid vertical bounds
    /// are never buffer-extended. A world mismatch or an invalid (empty)
    /// zone world always fails.
    pub fn contains(&self, world: &str, position: Vec3, extra_buffer_chunks: u32) -> bool {
        let zone_world = self.world();
        if zone_world.is_empty() || zone_world != world {
            return false;
        }
        if !position.is_finite() {
            return false;
        }
        let buffer_blocks = (extra_buffer_chunks as i32 * BLOCKS_PER_CHUNK) as f64;

        match self {
            Self::Circle {
                center, chunk_radius, ..
            } => {
                let radius = (*chunk_radius as i32 * BLOCKS_PER_CHUNK) as f64 + buffer_blocks;
                position.planar_distance_sq_to(*center) <= radius * radius
            }
            Self::Cuboid { min, max, .. } => {
                let x_ok = position.x >= min.x as f64 - buffer_blocks
                    && position.x <= (max.x + 1) as f64 + buffer_blocks;
                let z_ok = position.z >= min.z as f64 - buffer_blocks
                    && position.z <= (max.z + 1) as f64 + buffer_blocks;
                let y_ok = position.y >= min.y as f64 && position.y <= (max.y + 1) as f64;
                x_ok && z_ok && y_ok
            }
        }
    }

    /// Buffer-expanded chunk bounding box for coarse spatial queries.
    pub fn chunk_bounds(&self, extra_buffer_chunks: u32) -> ChunkBounds {
        let buf = extra_buffer_chunks as i32;
        match self {
            Self::Circle {
                center, chunk_radius, ..
            } => {
                let cx = block_to_chunk(center.x.floor() as i32);
                let cz = block_to_chunk(center.z.floor() as i32);
                let r = *chunk_radius as i32 + buf;
                ChunkBounds {
                    min_x: cx - r,
                    min_z: cz - r,
                    max_x: cx + r,
                    max_z: cz + r,
                }
            }
            Self::Cuboid { min, max, .. } => ChunkBounds {
                min_x: block_to_chunk(min.x) - buf,
                min_z: block_to_chunk(min.z) - buf,
                max_x: block_to_chunk(max.x) + buf,
                max_z: block_to_chunk(max.z) + buf,
            },
        }
    }
}

/// A timed restriction preventing one specific owner from retaking a zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecaptureLock {
    pub owner: CaptureOwner,
    /// Tick-second instant at which the lock releases
    pub expires_at: u64,
}

/// Durable state for one capture zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturePoint {
    pub id: ZoneId,
    pub name: String,
    pub shape: ZoneShape,
    /// Baseline used by the external reward payout subsystem
    pub reward_baseline: f64,
    pub controlling_owner: Option<CaptureOwner>,
    /// Mirrors the in-progress session's owner while one exists
    pub capturing_owner: Option<CaptureOwner>,
    /// Last known progress, used when no live session exists (0-100)
    capture_progress_percent: f64,
    /// Tick-second instant before which the zone cannot be attempted
    cooldown_until: Option<u64>,
    /// Lock against the owner deposed by the last capture
    deposed_lock: Option<RecaptureLock>,
    /// Lock against the attacker that performed the last capture
    attacker_lock: Option<RecaptureLock>,
}

impl CapturePoint {
    pub fn new(id: impl Into<ZoneId>, name: impl Into<String>, shape: ZoneShape) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            shape,
            reward_baseline: 0.0,
            controlling_owner: None,
            capturing_owner: None,
            capture_progress_percent: 0.0,
            cooldown_until: None,
            deposed_lock: None,
            attacker_lock: None,
        }
    }

    pub fn capture_progress_percent(&self) -> f64 {
        self.capture_progress_percent
    }

    /// Coordinator-owned: written once at session end.
    pub fn set_capture_progress_percent(&mut self, percent: f64) {
        self.capture_progress_percent = percent.clamp(0.0, 100.0);
    }

    pub fn cooldown_until(&self) -> Option<u64> {
        self.cooldown_until
    }

    pub fn is_on_cooldown(&self, now: u64) -> bool {
        self.cooldown_until.map(|until| now < until).unwrap_or(false)
    }

    /// Extends the cooldown window. Instants only move forward; an earlier
    /// instant than the current one is ignored.
    pub fn set_cooldown_until(&mut self, until: u64) {
        match self.cooldown_until {
            Some(current) if current >= until => {}
            _ => self.cooldown_until = Some(until),
        }
    }

    pub fn clear_cooldown(&mut self) {
        self.cooldown_until = None;
    }

    pub fn deposed_lock(&self) -> Option<&RecaptureLock> {
        self.deposed_lock.as_ref()
    }

    pub fn attacker_lock(&self) -> Option<&RecaptureLock> {
        self.attacker_lock.as_ref()
    }

    /// Locks the just-deposed owner out until `expires_at`. Expiries only
    /// move forward for the same owner; a different owner replaces the lock.
    pub fn lock_deposed_owner(&mut self, owner: CaptureOwner, expires_at: u64) {
        Self::apply_lock(&mut self.deposed_lock, owner, expires_at);
    }

    /// Locks the capturing attacker out until `expires_at`.
    pub fn lock_attacker(&mut self, owner: CaptureOwner, expires_at: u64) {
        Self::apply_lock(&mut self.attacker_lock, owner, expires_at);
    }

    fn apply_lock(slot: &mut Option<RecaptureLock>, owner: CaptureOwner, expires_at: u64) {
        match slot {
            Some(lock) if lock.owner.is_same_owner(&owner) && lock.expires_at >= expires_at => {}
            _ => *slot = Some(RecaptureLock { owner, expires_at }),
        }
    }

    pub fn clear_locks(&mut self) {
        self.deposed_lock = None;
        self.attacker_lock = None;
    }

    /// Whether a recapture lock currently bars this owner from attempting.
    pub fn is_locked_for(&self, owner: &CaptureOwner, now: u64) -> bool {
        let lock_blocks = |lock: &Option<RecaptureLock>| {
            lock.as_ref()
                .map(|l| now < l.expires_at && l.owner.is_same_owner(owner))
                .unwrap_or(false)
        };
        lock_blocks(&self.deposed_lock) || lock_blocks(&self.attacker_lock)
    }

    /// Drops expired locks; returns how many were released.
    pub fn expire_locks(&mut self, now: u64) -> usize {
        let mut released = 0;
        for slot in [&mut self.deposed_lock, &mut self.attacker_lock] {
            if slot.as_ref().map(|l| now >= l.expires_at).unwrap_or(false) {
                *slot = None;
                released += 1;
            }
        }
        released
    }

    pub fn contains(&self, world: &str, position: Vec3, extra_buffer_chunks: u32) -> bool {
        self.shape.contains(world, position, extra_buffer_chunks)
    }

    pub fn chunk_bounds(&self, extra_buffer_chunks: u32) -> ChunkBounds {
        self.shape.chunk_bounds(extra_buffer_chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::owner::OwnerKind;

    fn owner(name: &str) -> CaptureOwner {
        CaptureOwner::new(OwnerKind::Group, None, name)
    }

    #[test]
    fn test_circle_contains_planar() {
        // 1 chunk radius = 16 blocks around the center, ignoring y
        let shape = ZoneShape::circle("overworld", Vec3::new(0.0, 64.0, 0.0), 1);
        assert!(shape.contains("overworld", Vec3::new(10.0, 200.0, 10.0), 0));
        assert!(shape.contains("overworld", Vec3::new(16.0, 0.0, 0.0), 0));
        assert!(!shape.contains("overworld", Vec3::new(17.0, 64.0, 0.0), 0));
    }

    #[test]
    fn test_circle_buffer_extends_radius() {
        let shape = ZoneShape::circle("overworld", Vec3::ZERO, 1);
        assert!(!shape.contains("overworld", Vec3::new(30.0, 0.0, 0.0), 0));
        // +1 buffer chunk -> 32 block radius
        assert!(shape.contains("overworld", Vec3::new(30.0, 0.0, 0.0), 1));
    }

    #[test]
    fn test_circle_radius_clamped_to_one() {
        let shape = ZoneShape::circle("overworld", Vec3::ZERO, 0);
        assert_eq!(shape.bounding_chunk_radius(), 1);
    }

    #[test]
    fn test_cuboid_normalizes_corners() {
        let shape = ZoneShape::cuboid(
            "overworld",
            BlockPos::new(10, 70, 10),
            BlockPos::new(-10, 60, -10),
        );
        match &shape {
            ZoneShape::Cuboid { min, max, .. } => {
                assert_eq!(*min, BlockPos::new(-10, 60, -10));
                assert_eq!(*max, BlockPos::new(10, 70, 10));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_cuboid_bounds_inclusive_plus_one() {
        let shape = ZoneShape::cuboid(
            "overworld",
            BlockPos::new(0, 60, 0),
            BlockPos::new(15, 70, 15),
        );
        // max + 1 is inside on every horizontal axis
        assert!(shape.contains("overworld", Vec3::new(16.0, 65.0, 16.0), 0));
        assert!(!shape.contains("overworld", Vec3::new(16.1, 65.0, 0.0), 0));
    }

    #[test]
    fn test_cuboid_vertical_never_buffered() {
        let shape = ZoneShape::cuboid(
            "overworld",
            BlockPos::new(0, 60, 0),
            BlockPos::new(15, 70, 15),
        );
        assert!(shape.contains("overworld", Vec3::new(8.0, 71.0, 8.0), 0));
        // y is out of bounds no matter how large the buffer
        assert!(!shape.contains("overworld", Vec3::new(8.0, 72.0, 8.0), 4));
        // but the same buffer widens x/z
        assert!(shape.contains("overworld", Vec3::new(-60.0, 65.0, 8.0), 4));
    }

    #[test]
    fn test_world_mismatch_fails_closed() {
        let shape = ZoneShape::circle("overworld", Vec3::ZERO, 2);
        assert!(!shape.contains("nether", Vec3::ZERO, 0));
        let gone = ZoneShape::circle("", Vec3::ZERO, 2);
        assert!(!gone.contains("", Vec3::ZERO, 0));
    }

    #[test]
    fn test_nan_position_fails_closed() {
        let shape = ZoneShape::circle("overworld", Vec3::ZERO, 2);
        assert!(!shape.contains("overworld", Vec3::new(f64::NAN, 0.0, 0.0), 0));
    }

    #[test]
    fn test_chunk_bounds_circle() {
        let shape = ZoneShape::circle("overworld", Vec3::new(40.0, 64.0, -40.0), 2);
        let bounds = shape.chunk_bounds(1);
        // center chunk (2, -3), radius 2 + 1 buffer
        assert_eq!(
            bounds,
            ChunkBounds {
                min_x: -1,
                min_z: -6,
                max_x: 5,
                max_z: 0,
            }
        );
        assert!(bounds.contains_chunk(2, -3));
        assert!(!bounds.contains_chunk(6, -3));
    }

    #[test]
    fn test_chunk_bounds_cuboid() {
        let shape = ZoneShape::cuboid(
            "overworld",
            BlockPos::new(-17, 0, 0),
            BlockPos::new(31, 10, 15),
        );
        let bounds = shape.chunk_bounds(0);
        assert_eq!(
            bounds,
            ChunkBounds {
                min_x: -2,
                min_z: 0,
                max_x: 1,
                max_z: 0,
            }
        );
    }

    #[test]
    fn test_cuboid_bounding_radius() {
        let shape = ZoneShape::cuboid(
            "overworld",
            BlockPos::new(0, 0, 0),
            BlockPos::new(63, 10, 15),
        );
        // 64 blocks wide -> half extent 32 -> 2 chunks
        assert_eq!(shape.bounding_chunk_radius(), 2);
    }

    #[test]
    fn test_cooldown_moves_only_forward() {
        let mut point = CapturePoint::new("alpha", "Alpha", ZoneShape::circle("w", Vec3::ZERO, 1));
        point.set_cooldown_until(100);
        point.set_cooldown_until(50);
        assert_eq!(point.cooldown_until(), Some(100));
        point.set_cooldown_until(200);
        assert_eq!(point.cooldown_until(), Some(200));
        assert!(point.is_on_cooldown(150));
        assert!(!point.is_on_cooldown(200));
        point.clear_cooldown();
        assert!(!point.is_on_cooldown(0));
    }

    #[test]
    fn test_recapture_locks_are_independent() {
        let mut point = CapturePoint::new("alpha", "Alpha", ZoneShape::circle("w", Vec3::ZERO, 1));
        point.lock_deposed_owner(owner("OldGuard"), 300);
        point.lock_attacker(owner("Raiders"), 120);

        assert!(point.is_locked_for(&owner("oldguard"), 299));
        assert!(point.is_locked_for(&owner("Raiders"), 119));
        // a third owner is never blocked by either lock
        assert!(!point.is_locked_for(&owner("Bystanders"), 100));
        // each expires on its own schedule
        assert!(!point.is_locked_for(&owner("Raiders"), 120));
        assert!(point.is_locked_for(&owner("OldGuard"), 120));
    }

    #[test]
    fn test_lock_expiry_never_decreases_for_same_owner() {
        let mut point = CapturePoint::new("alpha", "Alpha", ZoneShape::circle("w", Vec3::ZERO, 1));
        point.lock_deposed_owner(owner("OldGuard"), 300);
        point.lock_deposed_owner(owner("OldGuard"), 100);
        assert_eq!(point.deposed_lock().unwrap().expires_at, 300);
        // a different owner replaces the lock outright
        point.lock_deposed_owner(owner("NewGuard"), 150);
        assert_eq!(point.deposed_lock().unwrap().expires_at, 150);
    }

    #[test]
    fn test_expire_locks() {
        let mut point = CapturePoint::new("alpha", "Alpha", ZoneShape::circle("w", Vec3::ZERO, 1));
        point.lock_deposed_owner(owner("OldGuard"), 100);
        point.lock_attacker(owner("Raiders"), 200);
        assert_eq!(point.expire_locks(150), 1);
        assert!(point.deposed_lock().is_none());
        assert!(point.attacker_lock().is_some());
    }

    #[test]
    fn test_progress_clamped() {
        let mut point = CapturePoint::new("alpha", "Alpha", ZoneShape::circle("w", Vec3::ZERO, 1));
        point.set_capture_progress_percent(150.0);
        assert_eq!(point.capture_progress_percent(), 100.0);
        point.set_capture_progress_percent(-5.0);
        assert_eq!(point.capture_progress_percent(), 0.0);
    }
}
