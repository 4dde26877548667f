//! Chunk-keyed zone index for coarse containment prefiltering.
//!
//! Exact shape tests are cheap, but running one per zone per movement event
//! does not scale. Zones register every chunk their bounding box covers;
//! a query only inspects the cells around the actor's chunk and hands the
//! candidate zones to the exact test. This is the required two-stage filter:
//! coarse chunk box, then exact shape.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::util::vec3::Vec3;
use crate::zone::constants::chunk::BLOCKS_PER_CHUNK;
use crate::zone::point::{CapturePoint, ZoneId};

/// Cell key: (chunk x, chunk z) within one world
type CellKey = (i32, i32);

#[inline]
fn chunk_of(coord: f64) -> i32 {
    (coord.floor() as i32).div_euclid(BLOCKS_PER_CHUNK)
}

/// Spatial index over all registered capture zones.
#[derive(Debug, Default)]
pub struct ZoneChunkIndex {
    /// world -> cell -> zones whose bounding box covers that cell
    worlds: FxHashMap<String, FxHashMap<CellKey, SmallVec<[ZoneId; 2]>>>,
}

impl ZoneChunkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a zone under every chunk cell its unbuffered bounding box
    /// covers. Call again after a shape change (remove first).
    pub fn insert(&mut self, point: &CapturePoint) {
        let bounds = point.chunk_bounds(0);
        let cells = self.worlds.entry(point.shape.world().clone()).or_default();
        for cx in bounds.min_x..=bounds.max_x {
            for cz in bounds.min_z..=bounds.max_z {
                let entry = cells.entry((cx, cz)).or_default();
                if !entry.contains(&point.id) {
                    entry.push(point.id.clone());
                }
            }
        }
    }

    /// Removes a zone from every cell it was registered under.
    pub fn remove(&mut self, point: &CapturePoint) {
        let bounds = point.chunk_bounds(0);
        if let Some(cells) = self.worlds.get_mut(point.shape.world()) {
            for cx in bounds.min_x..=bounds.max_x {
                for cz in bounds.min_z..=bounds.max_z {
                    if let Some(entry) = cells.get_mut(&(cx, cz)) {
                        entry.retain(|id| id != &point.id);
                        if entry.is_empty() {
                            cells.remove(&(cx, cz));
                        }
                    }
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.worlds.clear();
    }

    /// Candidate zones whose bounding box lies within `buffer_chunks` of the
    /// position's chunk. Callers must still run the exact containment test.
    pub fn candidates(&self, world: &str, position: Vec3, buffer_chunks: u32) -> Vec<ZoneId> {
        let Some(cells) = self.worlds.get(world) else {
            return Vec::new();
        };
        if !position.is_finite() {
            return Vec::new();
        }
        let cx = chunk_of(position.x);
        let cz = chunk_of(position.z);
        let b = buffer_chunks as i32;

        let mut found: Vec<ZoneId> = Vec::new();
        for dx in -b..=b {
            for dz in -b..=b {
                if let Some(entry) = cells.get(&(cx + dx, cz + dz)) {
                    for id in entry {
                        if !found.contains(id) {
                            found.push(id.clone());
                        }
                    }
                }
            }
        }
        found
    }
}
