use glam::{Vec2, Vec3};
use parapet_core::math;

/// One vertex of a cover path with its cumulative distance from the start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub position: Vec3,
    pub distance: f32,
}

/// A distance-parameterized polyline, usually the outward offset outline of
/// a cover surface. Built once and treated as immutable; looped paths store
/// the closing vertex explicitly (last position equals the first).
#[derive(Debug, Clone)]
pub struct CoverPath {
    points: Vec<PathPoint>,
    looped: bool,
}

impl CoverPath {
    pub fn from_positions(positions: &[Vec3], looped: bool) -> Self {
        let mut points = Vec::with_capacity(positions.len());
        let mut distance = 0.0f32;
        for (i, p) in positions.iter().enumerate() {
            if i > 0 {
                distance += (*p - positions[i - 1]).length();
            }
            points.push(PathPoint {
                position: *p,
                distance,
            });
        }
        Self { points, looped }
    }

    pub fn is_looped(&self) -> bool {
        self.looped
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn length(&self) -> f32 {
        self.points.last().map_or(0.0, |p| p.distance)
    }

    /// Position at a distance along the path. Looped paths wrap; open paths
    /// clamp to their ends.
    pub fn point_at(&self, distance: f32) -> Vec3 {
        let Some(first) = self.points.first() else {
            return Vec3::ZERO;
        };
        let length = self.length();
        if length <= 0.0 {
            return first.position;
        }
        let d = if self.looped {
            distance.rem_euclid(length)
        } else {
            distance.clamp(0.0, length)
        };

        let idx = self.points.partition_point(|p| p.distance < d);
        if idx == 0 {
            return first.position;
        }
        let a = self.points[idx - 1];
        let b = self.points[idx.min(self.points.len() - 1)];
        let span = b.distance - a.distance;
        if span <= 0.0 {
            return a.position;
        }
        let t = (d - a.distance) / span;
        a.position.lerp(b.position, t)
    }

    /// Tangent direction at a distance along the path (unit, or zero for a
    /// degenerate path).
    pub fn direction_at(&self, distance: f32) -> Vec3 {
        if self.points.len() < 2 {
            return Vec3::ZERO;
        }
        let length = self.length();
        let d = if self.looped {
            distance.rem_euclid(length.max(f32::MIN_POSITIVE))
        } else {
            distance.clamp(0.0, length)
        };
        let idx = self
            .points
            .partition_point(|p| p.distance < d)
            .clamp(1, self.points.len() - 1);
        let a = self.points[idx - 1];
        let b = self.points[idx];
        (b.position - a.position).normalize_or_zero()
    }

    /// Horizontal normal at a distance along the path, pointing away from
    /// the surface the path was offset from.
    pub fn normal_at(&self, distance: f32) -> Vec3 {
        math::outward_normal(self.direction_at(distance))
    }

    /// Closest point on the path to `pos`, with its path distance.
    pub fn closest_point(&self, pos: Vec3) -> Option<(Vec3, f32)> {
        if self.points.is_empty() {
            return None;
        }
        if self.points.len() == 1 {
            return Some((self.points[0].position, 0.0));
        }
        let mut best: Option<(Vec3, f32)> = None;
        let mut best_dist_sq = f32::INFINITY;
        for w in self.points.windows(2) {
            let (point, t) = math::project_on_segment(pos, w[0].position, w[1].position);
            let dist_sq = (pos - point).length_squared();
            if dist_sq < best_dist_sq {
                best_dist_sq = dist_sq;
                let along = w[0].distance + (w[1].distance - w[0].distance) * t;
                best = Some((point, along));
            }
        }
        best
    }

    /// First crossing of the 2D ray `origin + t * dir` with the path,
    /// returned as a path distance.
    pub fn intersect_ray_2d(&self, origin: Vec2, dir: Vec2) -> Option<f32> {
        let mut best_t = f32::INFINITY;
        let mut best_along = None;
        for w in self.points.windows(2) {
            let a = math::flatten(w[0].position);
            let b = math::flatten(w[1].position);
            if let Some((t, u)) = math::ray_segment_intersect_2d(origin, dir, a, b) {
                if t < best_t {
                    best_t = t;
                    best_along = Some(w[0].distance + (w[1].distance - w[0].distance) * u);
                }
            }
        }
        best_along
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_loop() -> CoverPath {
        CoverPath::from_positions(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(4.0, 4.0, 0.0),
                Vec3::new(0.0, 4.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
            ],
            true,
        )
    }

    #[test]
    fn test_length_accumulates() {
        let path = CoverPath::from_positions(
            &[Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), Vec3::new(3.0, 4.0, 0.0)],
            false,
        );
        assert!((path.length() - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_at_interpolates() {
        let path =
            CoverPath::from_positions(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], false);
        assert_eq!(path.point_at(1.0), Vec3::new(1.0, 0.0, 0.0));
        // Open path clamps.
        assert_eq!(path.point_at(-1.0), Vec3::ZERO);
        assert_eq!(path.point_at(99.0), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn test_looped_wraparound() {
        let path = square_loop();
        assert!((path.length() - 16.0).abs() < 1e-6);
        let start = path.point_at(0.0);
        let end = path.point_at(path.length());
        assert!((start - end).length() < 1e-5, "loop start {start} end {end}");
        // Wrapping past the end continues around.
        let wrapped = path.point_at(path.length() + 2.0);
        assert!((wrapped - path.point_at(2.0)).length() < 1e-5);
    }

    #[test]
    fn test_closest_point() {
        let path =
            CoverPath::from_positions(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], false);
        let (point, along) = path.closest_point(Vec3::new(1.0, 2.0, 0.0)).expect("path");
        assert_eq!(point, Vec3::new(1.0, 0.0, 0.0));
        assert!((along - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_direction_and_normal() {
        let path =
            CoverPath::from_positions(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], false);
        assert!((path.direction_at(2.0) - Vec3::X).length() < 1e-6);
        assert!((path.normal_at(2.0) - Vec3::NEG_Y).length() < 1e-6);
    }

    #[test]
    fn test_intersect_ray() {
        let path =
            CoverPath::from_positions(&[Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)], false);
        let along = path
            .intersect_ray_2d(Vec2::new(3.0, -2.0), Vec2::new(0.0, 1.0))
            .expect("crosses path");
        assert!((along - 3.0).abs() < 1e-6);
        assert!(path
            .intersect_ray_2d(Vec2::new(9.0, -2.0), Vec2::new(0.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_empty_path_is_harmless() {
        let path = CoverPath::from_positions(&[], false);
        assert_eq!(path.length(), 0.0);
        assert_eq!(path.point_at(1.0), Vec3::ZERO);
        assert!(path.closest_point(Vec3::ONE).is_none());
    }
}
