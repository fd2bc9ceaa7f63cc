use std::collections::HashMap;

use glam::{IVec2, Vec3};
use parapet_core::constants::GRID_CELL_SIZE;
use parapet_core::types::CoverId;

/// Spatial hash over cover-location world positions, keyed by 2D cell.
/// Maintained incrementally on surface add/remove and occupancy changes;
/// never rebuilt wholesale.
pub struct LocationGrid {
    cells: HashMap<IVec2, Vec<(CoverId, Vec3)>>,
    cell_size: f32,
    len: usize,
}

impl Default for LocationGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationGrid {
    pub fn new() -> Self {
        Self::with_cell_size(GRID_CELL_SIZE)
    }

    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
            len: 0,
        }
    }

    fn cell_of(&self, position: Vec3) -> IVec2 {
        IVec2::new(
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, id: CoverId, position: Vec3) {
        self.cells
            .entry(self.cell_of(position))
            .or_default()
            .push((id, position));
        self.len += 1;
    }

    /// Remove one entry. Returns false when the id was not present at that
    /// position's cell.
    pub fn remove(&mut self, id: CoverId, position: Vec3) -> bool {
        let cell = self.cell_of(position);
        let Some(entries) = self.cells.get_mut(&cell) else {
            return false;
        };
        let Some(idx) = entries.iter().position(|(e, _)| *e == id) else {
            return false;
        };
        entries.swap_remove(idx);
        if entries.is_empty() {
            self.cells.remove(&cell);
        }
        self.len -= 1;
        true
    }

    /// Collect all entries within `radius` of `center` into `out`.
    pub fn query_circle(&self, center: Vec3, radius: f32, out: &mut Vec<(CoverId, Vec3)>) {
        let radius_sq = radius * radius;
        let min = self.cell_of(center - Vec3::splat(radius));
        let max = self.cell_of(center + Vec3::splat(radius));
        for cy in min.y..=max.y {
            for cx in min.x..=max.x {
                let Some(entries) = self.cells.get(&IVec2::new(cx, cy)) else {
                    continue;
                };
                for (id, position) in entries {
                    if (*position - center).length_squared() <= radius_sq {
                        out.push((*id, *position));
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
