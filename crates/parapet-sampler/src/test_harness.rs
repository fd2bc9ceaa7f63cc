//! Deterministic collision oracle over axis-aligned boxes on a flat floor.
//! Used by sampler and system tests and by the bench scenes; hosts supply
//! their own oracle in production.

use glam::Vec3;
use parapet_core::oracle::{
    CollisionOracle, EntityHandle, RayHit, SurfaceKind, SweepHit,
};

#[derive(Debug, Clone, Copy)]
pub struct BoxObstacle {
    pub min: Vec3,
    pub max: Vec3,
    pub kind: SurfaceKind,
}

/// A flat floor plane plus a set of axis-aligned box obstacles.
pub struct BoxWorld {
    pub floor_z: f32,
    pub boxes: Vec<BoxObstacle>,
}

impl BoxWorld {
    pub fn new(floor_z: f32) -> Self {
        Self {
            floor_z,
            boxes: Vec::new(),
        }
    }

    pub fn add_solid(&mut self, min: Vec3, max: Vec3) {
        self.boxes.push(BoxObstacle {
            min,
            max,
            kind: SurfaceKind::Solid,
        });
    }

    pub fn add_dynamic(&mut self, min: Vec3, max: Vec3) {
        self.boxes.push(BoxObstacle {
            min,
            max,
            kind: SurfaceKind::Dynamic,
        });
    }

    pub fn remove_box(&mut self, index: usize) {
        if index < self.boxes.len() {
            self.boxes.remove(index);
        }
    }

    /// Slab intersection of the ray `origin + t * dir` with a box expanded
    /// by `radius`. Returns (t_enter, t_exit, entry face normal); t_enter may
    /// be negative when the origin is inside.
    fn ray_box(
        origin: Vec3,
        dir: Vec3,
        bounds_min: Vec3,
        bounds_max: Vec3,
        radius: f32,
    ) -> Option<(f32, f32, Vec3)> {
        let bmin = (bounds_min - Vec3::splat(radius)).to_array();
        let bmax = (bounds_max + Vec3::splat(radius)).to_array();
        let o = origin.to_array();
        let d = dir.to_array();

        const AXES: [Vec3; 3] = [Vec3::X, Vec3::Y, Vec3::Z];

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            if d[axis].abs() < 1e-8 {
                if o[axis] < bmin[axis] || o[axis] > bmax[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t0 = (bmin[axis] - o[axis]) * inv;
            let mut t1 = (bmax[axis] - o[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_enter {
                t_enter = t0;
                // Entry is always through the face the ray approaches.
                normal = AXES[axis] * -d[axis].signum();
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }
        Some((t_enter, t_exit, normal))
    }
}

impl CollisionOracle for BoxWorld {
    fn raycast_down(&self, origin: Vec3, max_distance: f32) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        let mut best_distance = max_distance;

        // Box tops under the ray.
        for b in &self.boxes {
            if origin.x < b.min.x || origin.x > b.max.x || origin.y < b.min.y || origin.y > b.max.y
            {
                continue;
            }
            if origin.z < b.max.z {
                continue;
            }
            let distance = origin.z - b.max.z;
            if distance <= best_distance {
                best_distance = distance;
                best = Some(RayHit {
                    point: Vec3::new(origin.x, origin.y, b.max.z),
                    normal: Vec3::Z,
                    kind: b.kind,
                });
            }
        }

        // Floor plane.
        if origin.z >= self.floor_z {
            let distance = origin.z - self.floor_z;
            if distance <= best_distance {
                best = Some(RayHit {
                    point: Vec3::new(origin.x, origin.y, self.floor_z),
                    normal: Vec3::Z,
                    kind: SurfaceKind::Solid,
                });
            }
        }
        best
    }

    fn swept_sphere(
        &self,
        origin: Vec3,
        direction: Vec3,
        length: f32,
        radius: f32,
    ) -> Option<SweepHit> {
        let mut best: Option<SweepHit> = None;
        let mut best_t = length;
        for b in &self.boxes {
            let Some((t_enter, _, normal)) = Self::ray_box(origin, direction, b.min, b.max, radius)
            else {
                continue;
            };
            // Sweeps that start inside report nothing useful.
            if t_enter < 0.0 || normal == Vec3::ZERO {
                continue;
            }
            if t_enter <= best_t {
                best_t = t_enter;
                best = Some(SweepHit {
                    point: origin + direction * t_enter,
                    normal,
                    kind: b.kind,
                });
            }
        }
        best
    }

    fn overlap_cylinder(&self, base: Vec3, direction: Vec3, length: f32, radius: f32) -> bool {
        for b in &self.boxes {
            if let Some((t_enter, t_exit, _)) = Self::ray_box(base, direction, b.min, b.max, radius)
            {
                if t_enter <= length && t_exit >= 0.0 {
                    return true;
                }
            }
        }
        false
    }

    fn entities_in_box(&self, min: Vec3, max: Vec3) -> Vec<(EntityHandle, SurfaceKind)> {
        self.boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| {
                b.min.x <= max.x
                    && b.max.x >= min.x
                    && b.min.y <= max.y
                    && b.max.y >= min.y
                    && b.min.z <= max.z
                    && b.max.z >= min.z
            })
            .map(|(i, b)| (EntityHandle(i as u64), b.kind))
            .collect()
    }
}
