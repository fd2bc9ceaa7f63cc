use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use thiserror::Error;

use parapet_core::constants::{
    LOCATION_CACHE_CAPACITY, OCCUPY_TEST_HEIGHT, OCCUPY_TEST_RADIUS, PATH_CACHE_SURFACES,
    SURFACE_SLOT_BLOCK,
};
use parapet_core::oracle::CollisionOracle;
use parapet_core::types::{CoverId, LocationId, OccupantId, Sample, SurfaceId};
use parapet_surface::{CoverPath, CoverSurface, ResolvedLocation, SurfaceError};

use crate::grid::LocationGrid;

/// Radius of the revalidation probe swept along a dynamic segment.
const REVALIDATE_RADIUS: f32 = 0.2;

/// How far behind the surface outline the revalidation probe sits.
const REVALIDATE_INSET: f32 = 0.1;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("no free surface slots")]
    SlotsExhausted,

    #[error("invalid surface id")]
    InvalidSurface,
}

struct SurfaceSlot {
    generation: u16,
    surface: Option<CoverSurface>,
}

struct OccupiedEntry {
    occupant: OccupantId,
    position: Vec3,
}

struct PathCacheEntry {
    surface: SurfaceId,
    paths: Vec<(u32, CoverPath)>,
}

/// Owns all cover surfaces and the indexes over them: slotted storage with
/// generation-tagged handles, a spatial grid of unoccupied locations, the
/// occupancy map, and two bounded query caches.
///
/// A location is in exactly one of {grid, occupancy map} at any time.
/// Cache-touching queries take `&mut self`; in a multi-threaded host all
/// access must be serialized by the caller.
pub struct CoverSystem {
    slots: Vec<SurfaceSlot>,
    free: Vec<u16>,
    grid: LocationGrid,
    occupied: HashMap<CoverId, OccupiedEntry>,
    location_cache: HashMap<CoverId, ResolvedLocation>,
    path_cache: VecDeque<PathCacheEntry>,
    dynamic_segments: Vec<(SurfaceId, usize)>,
}

impl Default for CoverSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverSystem {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            grid: LocationGrid::new(),
            occupied: HashMap::new(),
            location_cache: HashMap::new(),
            path_cache: VecDeque::new(),
            dynamic_segments: Vec::new(),
        }
    }

    /// Drop all surfaces, occupancy, and caches.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.grid = LocationGrid::new();
        self.occupied.clear();
        self.location_cache.clear();
        self.path_cache.clear();
        self.dynamic_segments.clear();
    }

    // --- Surface lifecycle ----------------------------------------------

    /// Generate a surface from a sample buffer and index its locations.
    pub fn add_surface(&mut self, samples: Vec<Sample>, flags: u8) -> Result<SurfaceId, SystemError> {
        let surface = CoverSurface::generate(samples, flags)?;
        let slot = self.alloc_slot().ok_or(SystemError::SlotsExhausted)?;
        let id = SurfaceId::new(slot, self.slots[slot as usize].generation);
        self.index_surface(id, &surface);
        self.slots[slot as usize].surface = Some(surface);
        Ok(id)
    }

    /// Replace a surface's geometry under the same handle. Occupants of the
    /// old surface are evicted and returned so their owners can react.
    pub fn update_surface(
        &mut self,
        id: SurfaceId,
        samples: Vec<Sample>,
        flags: u8,
    ) -> Result<Vec<(CoverId, OccupantId)>, SystemError> {
        if self.resolve_surface(id).is_none() {
            return Err(SystemError::InvalidSurface);
        }
        // Generate first so a bad buffer leaves the old surface intact.
        let surface = CoverSurface::generate(samples, flags)?;

        let evicted = self.evict_surface_occupants(id);
        self.clear_surface_locations(id);
        self.purge_surface_caches(id);
        self.index_surface(id, &surface);
        self.slots[id.slot()].surface = Some(surface);
        Ok(evicted)
    }

    /// Remove a surface. Locations leave the grid before the slot is
    /// touched, so a stale handle can never alias a newer surface; the slot
    /// generation is bumped on free. Returns the evicted occupants.
    pub fn remove_surface(&mut self, id: SurfaceId) -> Vec<(CoverId, OccupantId)> {
        if self.resolve_surface(id).is_none() {
            return Vec::new();
        }
        let evicted = self.evict_surface_occupants(id);
        self.clear_surface_locations(id);
        self.purge_surface_caches(id);

        let slot = &mut self.slots[id.slot()];
        slot.surface = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot() as u16);
        evicted
    }

    /// The surface behind a handle, if the handle is still current.
    pub fn surface(&self, id: SurfaceId) -> Option<&CoverSurface> {
        self.resolve_surface(id)
    }

    /// The sample buffer a surface was generated from.
    pub fn surface_samples(&self, id: SurfaceId) -> Option<&[Sample]> {
        self.resolve_surface(id).map(|s| s.samples())
    }

    pub fn surface_count(&self) -> usize {
        self.slots.iter().filter(|s| s.surface.is_some()).count()
    }

    // --- Queries --------------------------------------------------------

    /// Find up to `max_total` unoccupied locations within `radius` of
    /// `center` that are in cover from every eye. With a nonzero
    /// `max_per_surface`, candidates on the same surface are thinned to an
    /// evenly-spaced subset first so results spread across surfaces instead
    /// of clumping along one long wall.
    pub fn get_cover(
        &self,
        center: Vec3,
        radius: f32,
        eyes: &[Vec3],
        distance_to_cover: f32,
        max_total: usize,
        max_per_surface: usize,
    ) -> Vec<CoverId> {
        let mut candidates: Vec<(CoverId, Vec3)> = Vec::new();
        self.grid.query_circle(center, radius, &mut candidates);

        let mut out = Vec::new();
        if max_total == 0 {
            return out;
        }

        if max_per_surface == 0 {
            for (id, _) in candidates {
                if out.len() >= max_total {
                    break;
                }
                if self.location_in_cover(id, eyes, distance_to_cover) {
                    out.push(id);
                }
            }
            return out;
        }

        candidates.sort_by_key(|(id, _)| (id.surface().to_bits(), id.location().0));
        let mut i = 0;
        while i < candidates.len() && out.len() < max_total {
            let surface = candidates[i].0.surface();
            let mut j = i;
            while j < candidates.len() && candidates[j].0.surface() == surface {
                j += 1;
            }
            let run = &candidates[i..j];
            let stride = (run.len() / max_per_surface).max(1);
            let mut taken = 0;
            let mut k = stride / 2;
            while k < run.len() && taken < max_per_surface && out.len() < max_total {
                let id = run[k].0;
                if self.location_in_cover(id, eyes, distance_to_cover) {
                    out.push(id);
                    taken += 1;
                }
                k += stride;
            }
            i = j;
        }
        out
    }

    fn location_in_cover(&self, id: CoverId, eyes: &[Vec3], distance_to_cover: f32) -> bool {
        let Some(surface) = self.resolve_surface(id.surface()) else {
            return false;
        };
        let Some(location) = surface.resolve_location(id.location().0 as usize) else {
            return false;
        };
        let stand = location.position
            + location.normal * distance_to_cover
            + Vec3::Z * OCCUPY_TEST_HEIGHT;
        eyes
            .iter()
            .all(|eye| surface.is_circle_in_cover(*eye, stand, OCCUPY_TEST_RADIUS))
    }

    /// Resolve a cover id to position/normal/height through a bounded
    /// cache, with the position pushed `offset` along the normal (the
    /// caller's stand distance; zero for the raw location). The cache is
    /// cleared wholesale when full; rebuilding it from surface data is
    /// cheap.
    pub fn get_cover_location(&mut self, id: CoverId, offset: f32) -> Option<ResolvedLocation> {
        let raw = match self.location_cache.get(&id) {
            Some(cached) => *cached,
            None => {
                let resolved = self
                    .resolve_surface(id.surface())?
                    .resolve_location(id.location().0 as usize)?;
                if self.location_cache.len() >= LOCATION_CACHE_CAPACITY {
                    self.location_cache.clear();
                }
                self.location_cache.insert(id, resolved);
                resolved
            }
        };
        Some(ResolvedLocation {
            position: raw.position + raw.normal * offset,
            ..raw
        })
    }

    /// The surface's offset outline at `distance`, generated on first
    /// request and cached. The cache holds a bounded number of surface
    /// entries; a new surface entry evicts the oldest from the back, and a
    /// cache hit does not reorder entries.
    pub fn get_cover_path(&mut self, id: SurfaceId, distance: f32) -> Option<&CoverPath> {
        let key = Self::path_key(distance);
        let entry_exists = self.path_cache.iter().any(|e| e.surface == id);
        let path_cached = self
            .path_cache
            .iter()
            .find(|e| e.surface == id)
            .is_some_and(|e| e.paths.iter().any(|(k, _)| *k == key));

        if !path_cached {
            let path = self
                .resolve_surface(id)?
                .generate_cover_path(distance, false);
            if !entry_exists {
                if self.path_cache.len() >= PATH_CACHE_SURFACES {
                    self.path_cache.pop_back();
                }
                self.path_cache.push_front(PathCacheEntry {
                    surface: id,
                    paths: Vec::new(),
                });
            }
            if let Some(entry) = self.path_cache.iter_mut().find(|e| e.surface == id) {
                entry.paths.push((key, path));
            }
        }

        self.path_cache
            .iter()
            .find(|e| e.surface == id)
            .and_then(|e| e.paths.iter().find(|(k, _)| *k == key))
            .map(|(_, p)| p)
    }

    /// Path-distance cache keys quantize to centimetres.
    fn path_key(distance: f32) -> u32 {
        (distance.max(0.0) * 100.0).round() as u32
    }

    // --- Occupancy ------------------------------------------------------

    pub fn is_cover_occupied(&self, id: CoverId) -> bool {
        self.occupied.contains_key(&id)
    }

    pub fn occupant(&self, id: CoverId) -> Option<OccupantId> {
        self.occupied.get(&id).map(|e| e.occupant)
    }

    /// Advisory exclusive lease on one location. Occupying moves it out of
    /// the spatial grid; releasing moves it back. Conflicts (double occupy,
    /// release by a non-owner, invalid handle) warn and change nothing.
    pub fn set_cover_occupied(&mut self, id: CoverId, occupied: bool, occupant: OccupantId) {
        if occupied {
            if let Some(existing) = self.occupied.get(&id) {
                if existing.occupant != occupant {
                    log::warn!(
                        "cover {:?} already occupied by {:?}, occupy from {:?} ignored",
                        id,
                        existing.occupant,
                        occupant
                    );
                }
                return;
            }
            let Some(location) = self
                .resolve_surface(id.surface())
                .and_then(|s| s.resolve_location(id.location().0 as usize))
            else {
                log::warn!("occupy request for invalid cover {:?}", id);
                return;
            };
            self.grid.remove(id, location.position);
            self.occupied.insert(
                id,
                OccupiedEntry {
                    occupant,
                    position: location.position,
                },
            );
        } else {
            let owner = self.occupied.get(&id).map(|e| e.occupant);
            match owner {
                None => {
                    log::warn!("release of unoccupied cover {:?} by {:?}", id, occupant);
                }
                Some(o) if o != occupant => {
                    log::warn!(
                        "cover {:?} held by {:?}, release from {:?} ignored",
                        id,
                        o,
                        occupant
                    );
                }
                Some(_) => {
                    if let Some(entry) = self.occupied.remove(&id) {
                        if self.resolve_surface(id.surface()).is_some() {
                            self.grid.insert(id, entry.position);
                        }
                    }
                }
            }
        }
    }

    // --- Dynamic revalidation -------------------------------------------

    /// Sweep all registered dynamic segments against the oracle and disable
    /// those whose backing geometry is gone. The rest of each surface stays
    /// usable. Returns how many segments were disabled.
    pub fn revalidate_dynamic(&mut self, oracle: &dyn CollisionOracle) -> usize {
        let mut to_disable: Vec<(SurfaceId, usize)> = Vec::new();
        for &(sid, seg_idx) in &self.dynamic_segments {
            let Some(surface) = self.resolve_surface(sid) else {
                continue;
            };
            let Some(seg) = surface.segments().get(seg_idx) else {
                continue;
            };
            if seg.is_disabled() {
                continue;
            }
            // Quick reject: nothing at all left inside the surface bounds.
            let aabb = surface.aabb();
            let backing = oracle.entities_in_box(aabb.min, aabb.max);
            if backing.is_empty() {
                to_disable.push((sid, seg_idx));
                continue;
            }
            let l = &surface.samples()[seg.left as usize];
            let r = &surface.samples()[seg.right as usize];
            let Some(dir) = (r.position - l.position).try_normalize() else {
                continue;
            };
            let height = (l.height.min(r.height) * 0.5).max(0.1);
            let base = l.position + Vec3::Z * height - seg.normal * REVALIDATE_INSET;
            if !oracle.overlap_cylinder(base, dir, seg.length, REVALIDATE_RADIUS) {
                to_disable.push((sid, seg_idx));
            }
        }

        let count = to_disable.len();
        for (sid, seg_idx) in to_disable {
            let Some(slot) = self.slots.get_mut(sid.slot()) else {
                continue;
            };
            if slot.generation != sid.generation() {
                continue;
            }
            if let Some(surface) = slot.surface.as_mut() {
                surface.set_segment_disabled(seg_idx, true);
            }
        }
        count
    }

    // --- Introspection --------------------------------------------------

    pub fn location_cache_len(&self) -> usize {
        self.location_cache.len()
    }

    pub fn path_cache_stats(&self) -> (usize, usize) {
        let paths = self.path_cache.iter().map(|e| e.paths.len()).sum();
        (self.path_cache.len(), paths)
    }

    pub fn grid_len(&self) -> usize {
        self.grid.len()
    }

    // --- Internals ------------------------------------------------------

    fn resolve_surface(&self, id: SurfaceId) -> Option<&CoverSurface> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.surface.as_ref()
    }

    fn alloc_slot(&mut self) -> Option<u16> {
        if let Some(slot) = self.free.pop() {
            return Some(slot);
        }
        let start = self.slots.len();
        if start >= u16::MAX as usize {
            return None;
        }
        let end = (start + SURFACE_SLOT_BLOCK).min(u16::MAX as usize);
        for _ in start..end {
            self.slots.push(SurfaceSlot {
                generation: 0,
                surface: None,
            });
        }
        for i in ((start + 1)..end).rev() {
            self.free.push(i as u16);
        }
        Some(start as u16)
    }

    /// Insert a surface's locations into the grid and register its dynamic
    /// segments.
    fn index_surface(&mut self, id: SurfaceId, surface: &CoverSurface) {
        for i in 0..surface.locations().len() {
            if let Some(location) = surface.resolve_location(i) {
                self.grid
                    .insert(CoverId::new(id, LocationId(i as u16)), location.position);
            }
        }
        for (seg_idx, seg) in surface.segments().iter().enumerate() {
            if seg.is_dynamic() {
                self.dynamic_segments.push((id, seg_idx));
            }
        }
    }

    fn evict_surface_occupants(&mut self, id: SurfaceId) -> Vec<(CoverId, OccupantId)> {
        let evicted: Vec<(CoverId, OccupantId)> = self
            .occupied
            .iter()
            .filter(|(cid, _)| cid.surface() == id)
            .map(|(cid, e)| (*cid, e.occupant))
            .collect();
        for (cid, _) in &evicted {
            self.occupied.remove(cid);
        }
        evicted
    }

    fn clear_surface_locations(&mut self, id: SurfaceId) {
        let Some(surface) = self.resolve_surface(id) else {
            return;
        };
        let entries: Vec<(CoverId, Vec3)> = (0..surface.locations().len())
            .filter_map(|i| {
                let cid = CoverId::new(id, LocationId(i as u16));
                surface.resolve_location(i).map(|loc| (cid, loc.position))
            })
            .collect();
        for (cid, position) in entries {
            self.grid.remove(cid, position);
        }
    }

    fn purge_surface_caches(&mut self, id: SurfaceId) {
        self.location_cache.retain(|cid, _| cid.surface() != id);
        self.path_cache.retain(|e| e.surface != id);
        self.dynamic_segments.retain(|(sid, _)| *sid != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parapet_core::types::{SAMPLE_DYNAMIC, SURFACE_DYNAMIC};

    fn wall_samples(length: f32) -> Vec<Sample> {
        vec![
            Sample::new(Vec3::new(0.0, 0.0, 0.0), 1.0),
            Sample::new(Vec3::new(length, 0.0, 0.0), 1.0),
        ]
    }

    fn dynamic_wall_samples() -> Vec<Sample> {
        vec![
            Sample::with_flags(Vec3::new(0.0, 0.0, 0.0), 1.0, SAMPLE_DYNAMIC),
            Sample::with_flags(Vec3::new(5.0, 0.0, 0.0), 1.0, SAMPLE_DYNAMIC),
        ]
    }

    const EYE: Vec3 = Vec3::new(2.5, 6.0, 1.5);

    #[test]
    fn test_add_surface_indexes_locations() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        assert_eq!(system.surface_count(), 1);
        // 11 locations along a 5-unit wall.
        assert_eq!(system.grid_len(), 11);
        assert!(system.surface(id).is_some());
        assert_eq!(system.surface_samples(id).map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_add_invalid_samples_fails() {
        let mut system = CoverSystem::new();
        assert!(matches!(
            system.add_surface(vec![], 0),
            Err(SystemError::Surface(SurfaceError::NotEnoughSamples(0)))
        ));
        assert_eq!(system.surface_count(), 0);
        assert_eq!(system.grid_len(), 0);
    }

    #[test]
    fn test_remove_surface_clears_grid() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        assert_eq!(system.grid_len(), 11);
        let evicted = system.remove_surface(id);
        assert!(evicted.is_empty());
        assert_eq!(system.grid_len(), 0);
        assert_eq!(system.surface_count(), 0);
        // Second removal is a defensive no-op.
        assert!(system.remove_surface(id).is_empty());
    }

    #[test]
    fn test_stale_handle_rejected_after_reuse() {
        let mut system = CoverSystem::new();
        let old = system.add_surface(wall_samples(5.0), 0).expect("add");
        system.remove_surface(old);
        let new = system.add_surface(wall_samples(3.0), 0).expect("add");

        // Slot is reused, generation differs.
        assert_eq!(old.slot(), new.slot());
        assert_ne!(old.generation(), new.generation());

        assert!(system.surface(old).is_none());
        assert!(system.surface(new).is_some());
        let stale_cover = CoverId::new(old, LocationId(0));
        assert!(system.get_cover_location(stale_cover, 0.0).is_none());
    }

    #[test]
    fn test_get_cover_finds_locations_behind_wall() {
        let mut system = CoverSystem::new();
        system.add_surface(wall_samples(5.0), 0).expect("add");
        let found = system.get_cover(Vec3::new(2.5, 0.0, 0.0), 4.0, &[EYE], 0.4, 10, 0);
        assert!(!found.is_empty());
    }

    #[test]
    fn test_get_cover_rejects_exposed_eye_side() {
        let mut system = CoverSystem::new();
        system.add_surface(wall_samples(5.0), 0).expect("add");
        // Eye behind the wall face: nothing is covered from there.
        let behind_eye = Vec3::new(2.5, -6.0, 1.5);
        let found = system.get_cover(Vec3::new(2.5, 0.0, 0.0), 4.0, &[behind_eye], 0.4, 10, 0);
        assert!(found.is_empty());
    }

    #[test]
    fn test_get_cover_radius_containment() {
        let mut system = CoverSystem::new();
        system.add_surface(wall_samples(40.0), 0).expect("add");
        let center = Vec3::new(20.0, 0.0, 0.0);
        let radius = 6.0;
        let found = system.get_cover(center, radius, &[], 0.4, 100, 0);
        assert!(!found.is_empty());
        for id in found {
            let loc = system.get_cover_location(id, 0.0).expect("resolves");
            assert!(
                (loc.position - center).length() <= radius,
                "location outside query radius"
            );
        }
    }

    #[test]
    fn test_get_cover_max_total() {
        let mut system = CoverSystem::new();
        system.add_surface(wall_samples(40.0), 0).expect("add");
        let found = system.get_cover(Vec3::new(20.0, 0.0, 0.0), 15.0, &[], 0.4, 5, 0);
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn test_get_cover_max_per_surface() {
        let mut system = CoverSystem::new();
        let a = system.add_surface(wall_samples(40.0), 0).expect("add");
        let b = system
            .add_surface(
                vec![
                    Sample::new(Vec3::new(0.0, 10.0, 0.0), 1.0),
                    Sample::new(Vec3::new(40.0, 10.0, 0.0), 1.0),
                ],
                0,
            )
            .expect("add");

        let found = system.get_cover(Vec3::new(20.0, 5.0, 0.0), 30.0, &[], 0.4, 100, 2);
        assert!(!found.is_empty());
        let on_a = found.iter().filter(|c| c.surface() == a).count();
        let on_b = found.iter().filter(|c| c.surface() == b).count();
        assert!(on_a <= 2, "surface a contributed {on_a}");
        assert!(on_b <= 2, "surface b contributed {on_b}");
    }

    #[test]
    fn test_occupancy_mutual_exclusion() {
        let mut system = CoverSystem::new();
        let surface = system.add_surface(wall_samples(5.0), 0).expect("add");
        let cover = CoverId::new(surface, LocationId(5));
        let alice = OccupantId(1);
        let bob = OccupantId(2);

        let grid_before = system.grid_len();
        assert!(!system.is_cover_occupied(cover));

        system.set_cover_occupied(cover, true, alice);
        assert!(system.is_cover_occupied(cover));
        assert_eq!(system.occupant(cover), Some(alice));
        assert_eq!(system.grid_len(), grid_before - 1);

        // Double occupy by someone else: no-op.
        system.set_cover_occupied(cover, true, bob);
        assert_eq!(system.occupant(cover), Some(alice));

        // Release by a non-owner: no-op.
        system.set_cover_occupied(cover, false, bob);
        assert!(system.is_cover_occupied(cover));

        // Owner release restores the grid entry.
        system.set_cover_occupied(cover, false, alice);
        assert!(!system.is_cover_occupied(cover));
        assert_eq!(system.grid_len(), grid_before);

        // Release of unoccupied cover: no-op.
        system.set_cover_occupied(cover, false, alice);
        assert!(!system.is_cover_occupied(cover));
    }

    #[test]
    fn test_occupied_location_not_returned_by_get_cover() {
        let mut system = CoverSystem::new();
        system.add_surface(wall_samples(5.0), 0).expect("add");
        let all = system.get_cover(Vec3::new(2.5, 0.0, 0.0), 4.0, &[], 0.4, 100, 0);
        assert!(!all.is_empty());

        let taken = all[0];
        system.set_cover_occupied(taken, true, OccupantId(7));
        let remaining = system.get_cover(Vec3::new(2.5, 0.0, 0.0), 4.0, &[], 0.4, 100, 0);
        assert!(!remaining.contains(&taken));
        assert_eq!(remaining.len(), all.len() - 1);
    }

    #[test]
    fn test_remove_surface_evicts_occupants() {
        let mut system = CoverSystem::new();
        let surface = system.add_surface(wall_samples(5.0), 0).expect("add");
        let cover = CoverId::new(surface, LocationId(3));
        system.set_cover_occupied(cover, true, OccupantId(9));

        let evicted = system.remove_surface(surface);
        assert_eq!(evicted, vec![(cover, OccupantId(9))]);
        assert!(!system.is_cover_occupied(cover));
        assert_eq!(system.grid_len(), 0);
    }

    #[test]
    fn test_update_surface_replaces_geometry() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        let cover = CoverId::new(id, LocationId(2));
        system.set_cover_occupied(cover, true, OccupantId(4));

        let evicted = system
            .update_surface(id, wall_samples(10.0), 0)
            .expect("update");
        assert_eq!(evicted, vec![(cover, OccupantId(4))]);
        // 21 locations along the new 10-unit wall, all unoccupied.
        assert_eq!(system.grid_len(), 21);
        assert!(system.surface(id).is_some());

        // A bad buffer leaves the surface untouched.
        assert!(system.update_surface(id, vec![], 0).is_err());
        assert_eq!(system.grid_len(), 21);

        assert!(matches!(
            system.update_surface(
                SurfaceId::new(id.slot() as u16, id.generation().wrapping_add(1)),
                wall_samples(5.0),
                0
            ),
            Err(SystemError::InvalidSurface)
        ));
    }

    #[test]
    fn test_location_cache_bounded() {
        let mut system = CoverSystem::new();
        // A 2100-unit wall yields 4201 locations on one surface.
        let id = system.add_surface(wall_samples(2100.0), 0).expect("add");
        let count = system.surface(id).expect("surface").locations().len();
        assert!(count > LOCATION_CACHE_CAPACITY, "need {count} > capacity");

        for i in 0..=LOCATION_CACHE_CAPACITY {
            system
                .get_cover_location(CoverId::new(id, LocationId(i as u16)), 0.0)
                .expect("resolves");
            assert!(
                system.location_cache_len() <= LOCATION_CACHE_CAPACITY,
                "cache grew to {} after {} inserts",
                system.location_cache_len(),
                i + 1
            );
        }
        // The overflow insert cleared the cache wholesale.
        assert_eq!(system.location_cache_len(), 1);
    }

    #[test]
    fn test_location_cache_hit_is_stable() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        let cover = CoverId::new(id, LocationId(1));
        let first = system.get_cover_location(cover, 0.0).expect("resolves");
        let second = system.get_cover_location(cover, 0.0).expect("resolves");
        assert_eq!(first, second);
        assert_eq!(system.location_cache_len(), 1);
    }

    #[test]
    fn test_path_cache_generates_and_reuses() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        let length = {
            let path = system.get_cover_path(id, 0.4).expect("path");
            path.length()
        };
        assert!((length - 5.0).abs() < 1e-3);
        let (surfaces, paths) = system.path_cache_stats();
        assert_eq!((surfaces, paths), (1, 1));

        // Same distance hits the cache; a new distance adds a path.
        system.get_cover_path(id, 0.4).expect("path");
        assert_eq!(system.path_cache_stats(), (1, 1));
        system.get_cover_path(id, 1.0).expect("path");
        assert_eq!(system.path_cache_stats(), (1, 2));
    }

    #[test]
    fn test_path_cache_bounded_with_back_eviction() {
        let mut system = CoverSystem::new();
        let mut ids = Vec::new();
        for i in 0..(PATH_CACHE_SURFACES + 5) {
            let y = i as f32 * 3.0;
            let id = system
                .add_surface(
                    vec![
                        Sample::new(Vec3::new(0.0, y, 0.0), 1.0),
                        Sample::new(Vec3::new(5.0, y, 0.0), 1.0),
                    ],
                    0,
                )
                .expect("add");
            ids.push(id);
            system.get_cover_path(id, 0.4).expect("path");
            let (surfaces, _) = system.path_cache_stats();
            assert!(surfaces <= PATH_CACHE_SURFACES, "cache at {surfaces}");
        }
        // Oldest surfaces fell off the back; requesting one regenerates it.
        assert!(system.get_cover_path(ids[0], 0.4).is_some());
        let (surfaces, _) = system.path_cache_stats();
        assert_eq!(surfaces, PATH_CACHE_SURFACES);
    }

    #[test]
    fn test_path_cache_invalid_surface() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        system.remove_surface(id);
        assert!(system.get_cover_path(id, 0.4).is_none());
    }

    #[test]
    fn test_revalidate_disables_missing_geometry() {
        use parapet_sampler::test_harness::BoxWorld;

        let mut system = CoverSystem::new();
        let id = system
            .add_surface(dynamic_wall_samples(), SURFACE_DYNAMIC)
            .expect("add");

        let mut world = BoxWorld::new(0.0);
        // The breakable slab backing the surface, on its solid side.
        world.add_dynamic(Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 0.4, 1.2));

        // Geometry present: nothing disabled.
        assert_eq!(system.revalidate_dynamic(&world), 0);
        assert!(system
            .surface(id)
            .expect("surface")
            .is_point_in_cover(EYE, Vec3::new(2.5, 0.1, 0.3)));

        // Geometry gone: the segment is disabled, the surface survives.
        world.remove_box(0);
        assert_eq!(system.revalidate_dynamic(&world), 1);
        assert!(system.surface(id).is_some());
        assert!(!system
            .surface(id)
            .expect("surface")
            .is_point_in_cover(EYE, Vec3::new(2.5, 0.1, 0.3)));

        // Already disabled: revalidation converges.
        assert_eq!(system.revalidate_dynamic(&world), 0);
    }

    #[test]
    fn test_slot_reuse_from_free_list() {
        let mut system = CoverSystem::new();
        let a = system.add_surface(wall_samples(5.0), 0).expect("add");
        let b = system.add_surface(wall_samples(5.0), 0).expect("add");
        assert_ne!(a.slot(), b.slot());
        system.remove_surface(a);
        let c = system.add_surface(wall_samples(5.0), 0).expect("add");
        assert_eq!(c.slot(), a.slot(), "freed slot is reused");
        assert_ne!(c.generation(), a.generation());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut system = CoverSystem::new();
        let id = system.add_surface(wall_samples(5.0), 0).expect("add");
        system.set_cover_occupied(CoverId::new(id, LocationId(0)), true, OccupantId(1));
        system.get_cover_path(id, 0.4);
        system.clear();
        assert_eq!(system.surface_count(), 0);
        assert_eq!(system.grid_len(), 0);
        assert_eq!(system.location_cache_len(), 0);
        assert_eq!(system.path_cache_stats(), (0, 0));
    }

    #[test]
    fn test_load_persisted_surfaces_into_system() {
        use parapet_persist::{load, save, SurfaceRecord};

        let bytes = save(&[
            SurfaceRecord {
                samples: wall_samples(5.0),
                flags: 0,
            },
            SurfaceRecord {
                samples: dynamic_wall_samples(),
                flags: SURFACE_DYNAMIC,
            },
        ]);

        let mut system = CoverSystem::new();
        for record in load(&bytes).expect("valid file") {
            system
                .add_surface(record.samples, record.flags)
                .expect("add persisted surface");
        }
        assert_eq!(system.surface_count(), 2);
        assert_eq!(system.grid_len(), 22);
        let found = system.get_cover(Vec3::new(2.5, 0.0, 0.0), 4.0, &[EYE], 0.4, 10, 0);
        assert!(!found.is_empty());
    }

    #[test]
    fn test_end_to_end_sampled_wall() {
        use parapet_core::clock::ManualClock;
        use parapet_sampler::test_harness::BoxWorld;
        use parapet_sampler::{CoverSampler, SamplerParams, SamplerStatus, StartParams};
        use std::time::Duration;

        let mut world = BoxWorld::new(0.0);
        world.add_solid(Vec3::new(-3.0, 0.0, 0.0), Vec3::new(3.0, 0.4, 1.2));

        let mut sampler = CoverSampler::new(
            SamplerParams::default(),
            StartParams::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y),
        );
        let clock = ManualClock::new();
        let mut status = SamplerStatus::InProgress;
        while status == SamplerStatus::InProgress {
            status = sampler.update(
                &world,
                &clock,
                Duration::from_millis(10),
                Duration::from_secs(10),
            );
        }
        assert_eq!(status, SamplerStatus::Finished);

        let mut system = CoverSystem::new();
        system
            .add_surface(sampler.samples().to_vec(), sampler.surface_flags())
            .expect("add sampled surface");
        assert!(system.grid_len() > 0);

        // The threat stands beyond the wall slab; agents hide on the seeded
        // -Y side.
        let eye = Vec3::new(0.0, 6.0, 1.5);
        let found = system.get_cover(Vec3::new(0.0, -0.5, 0.0), 5.0, &[eye], 0.4, 10, 0);
        assert!(!found.is_empty(), "sampled wall yields cover locations");
    }
}
