use glam::{Vec2, Vec3};
use thiserror::Error;

use parapet_core::aabb::Aabb;
use parapet_core::constants::*;
use parapet_core::interval::Interval;
use parapet_core::math;
use parapet_core::types::{
    Sample, LOC_LEFT_EDGE, LOC_RIGHT_EDGE, SEGMENT_DISABLED, SEGMENT_DYNAMIC, SURFACE_LOOPED,
};

use crate::path::CoverPath;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("a cover surface needs at least 2 samples, got {0}")]
    NotEnoughSamples(usize),

    #[error("too many samples for one surface ({0}, limit 65535)")]
    TooManySamples(usize),

    #[error("too many locations for one surface ({0}, limit 65535)")]
    TooManyLocations(usize),
}

/// Span between two adjacent samples, with a precomputed horizontal outward
/// unit normal. Indices are plain 32-bit and always reference valid entries
/// in the owning surface's sample array.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub normal: Vec3,
    pub length: f32,
    pub left: u32,
    pub right: u32,
    pub flags: u8,
}

impl Segment {
    pub fn is_disabled(&self) -> bool {
        self.flags & SEGMENT_DISABLED != 0
    }

    pub fn is_dynamic(&self) -> bool {
        self.flags & SEGMENT_DYNAMIC != 0
    }
}

/// A discretized standable point along a segment, packed for density:
/// `offset` is a 16-bit fraction of the segment (1/65535 resolution),
/// `height` a 12-bit fraction of `LOCATION_HEIGHT_MAX` (~2mm resolution).
/// Surfaces routinely carry tens of thousands of these.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub segment: u16,
    pub offset: u16,
    pub height: u16,
    pub flags: u8,
}

/// A location resolved back to full-precision world data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedLocation {
    pub position: Vec3,
    pub normal: Vec3,
    pub height: f32,
}

/// A generated cover surface: samples, derived segments and locations, and
/// bounds. Either fully valid or not constructed; after generation the
/// only mutation is segment disabling.
pub struct CoverSurface {
    samples: Vec<Sample>,
    segments: Vec<Segment>,
    locations: Vec<Location>,
    aabb: Aabb,
    flags: u8,
}

impl CoverSurface {
    /// Build a surface from a flat sample buffer (a finished sampler's
    /// output, or deserialized storage). Looped buffers may either carry a
    /// closing duplicate of the first sample or rely on the flag alone; a
    /// closing segment is derived when needed.
    pub fn generate(samples: Vec<Sample>, flags: u8) -> Result<Self, SurfaceError> {
        if samples.len() < 2 {
            return Err(SurfaceError::NotEnoughSamples(samples.len()));
        }
        if samples.len() > u16::MAX as usize {
            return Err(SurfaceError::TooManySamples(samples.len()));
        }

        let mut segments = Vec::with_capacity(samples.len());
        for i in 0..samples.len() - 1 {
            if let Some(segment) = Self::make_segment(&samples, i as u32, (i + 1) as u32) {
                segments.push(segment);
            }
        }
        if flags & SURFACE_LOOPED != 0 {
            let first = samples[0].position;
            let last = samples[samples.len() - 1].position;
            if (first - last).length_squared() > 1e-8 {
                if let Some(segment) =
                    Self::make_segment(&samples, (samples.len() - 1) as u32, 0)
                {
                    segments.push(segment);
                }
            }
        }
        if segments.is_empty() {
            return Err(SurfaceError::NotEnoughSamples(samples.len()));
        }

        let locations = Self::generate_locations(&samples, &segments);
        if locations.len() > u16::MAX as usize {
            return Err(SurfaceError::TooManyLocations(locations.len()));
        }

        let mut aabb = Aabb::empty();
        for s in &samples {
            aabb.add_point(s.position);
            aabb.add_point(s.top());
        }

        Ok(Self {
            samples,
            segments,
            locations,
            aabb,
            flags,
        })
    }

    fn make_segment(samples: &[Sample], left: u32, right: u32) -> Option<Segment> {
        let l = &samples[left as usize];
        let r = &samples[right as usize];
        let span = r.position - l.position;
        let length = span.length();
        let normal = math::outward_normal(span);
        if length < 1e-5 || normal == Vec3::ZERO {
            return None;
        }
        let flags = if l.is_dynamic() && r.is_dynamic() {
            SEGMENT_DYNAMIC
        } else {
            0
        };
        Some(Segment {
            normal,
            length,
            left,
            right,
            flags,
        })
    }

    /// Locations are laid out along the surface at LOCATION_SPACING, with
    /// one location pinned to each end and tagged as an edge.
    fn generate_locations(samples: &[Sample], segments: &[Segment]) -> Vec<Location> {
        let total: f32 = segments.iter().map(|s| s.length).sum();

        let mut targets: Vec<(f32, u8)> = vec![(0.0, LOC_LEFT_EDGE)];
        let mut d = LOCATION_SPACING;
        while d < total - LOCATION_SPACING * 0.5 {
            targets.push((d, 0));
            d += LOCATION_SPACING;
        }
        targets.push((total, LOC_RIGHT_EDGE));

        let mut locations = Vec::with_capacity(targets.len());
        let mut seg_idx = 0usize;
        let mut seg_start = 0.0f32;
        for (d, flags) in targets {
            while seg_idx + 1 < segments.len() && d > seg_start + segments[seg_idx].length + 1e-6 {
                seg_start += segments[seg_idx].length;
                seg_idx += 1;
            }
            let seg = &segments[seg_idx];
            let offset = if seg.length > 0.0 {
                ((d - seg_start) / seg.length).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let l = &samples[seg.left as usize];
            let r = &samples[seg.right as usize];
            let height = l.height + (r.height - l.height) * offset;
            locations.push(Location {
                segment: seg_idx as u16,
                offset: math::offset_to_quantized(offset),
                height: math::height_to_quantized(height),
                flags,
            });
        }
        locations
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn is_looped(&self) -> bool {
        self.flags & SURFACE_LOOPED != 0
    }

    /// Resolve a location index back to full-precision position, outward
    /// normal, and standable height. Out-of-range indices resolve to None.
    pub fn resolve_location(&self, index: usize) -> Option<ResolvedLocation> {
        let loc = self.locations.get(index)?;
        let seg = self.segments.get(loc.segment as usize)?;
        let l = &self.samples[seg.left as usize];
        let r = &self.samples[seg.right as usize];
        let t = math::offset_from_quantized(loc.offset);
        Some(ResolvedLocation {
            position: l.position.lerp(r.position, t),
            normal: seg.normal,
            height: math::height_from_quantized(loc.height),
        })
    }

    /// Mark a segment as no longer backed by physical geometry (or restore
    /// it). Disabled segments occlude nothing. Returns false for an
    /// out-of-range index.
    pub fn set_segment_disabled(&mut self, index: usize, disabled: bool) -> bool {
        let Some(seg) = self.segments.get_mut(index) else {
            return false;
        };
        if disabled {
            seg.flags |= SEGMENT_DISABLED;
        } else {
            seg.flags &= !SEGMENT_DISABLED;
        }
        true
    }

    // --- Occlusion queries ----------------------------------------------

    /// True when any enabled segment occludes the ray from `eye` through
    /// `point`. The ray is unbounded beyond the point: cover locations sit
    /// fractionally outside their obstruction, so the geometry that hides
    /// them lies just past them.
    pub fn is_point_in_cover(&self, eye: Vec3, point: Vec3) -> bool {
        let dir = point - eye;
        if dir.length_squared() < 1e-12 {
            return false;
        }
        let eye2 = math::flatten(eye);
        let dir2 = math::flatten(dir);

        for seg in &self.segments {
            if seg.is_disabled() {
                continue;
            }
            let l = &self.samples[seg.left as usize];
            let r = &self.samples[seg.right as usize];
            // Cheap 2D footprint crossing before the triangle tests.
            if math::ray_segment_intersect_2d(
                eye2,
                dir2,
                math::flatten(l.position),
                math::flatten(r.position),
            )
            .is_none()
            {
                continue;
            }
            let (bl, br) = (l.position, r.position);
            let (tl, tr) = (l.top(), r.top());
            if math::ray_triangle_front(eye, dir, bl, tr, br).is_some()
                || math::ray_triangle_front(eye, dir, bl, tl, tr).is_some()
            {
                return true;
            }
        }
        false
    }

    /// Whole-footprint test: the center plus the two points offset by
    /// `radius` perpendicular to the eye direction must all be in cover.
    pub fn is_circle_in_cover(&self, eye: Vec3, center: Vec3, radius: f32) -> bool {
        if !self.is_point_in_cover(eye, center) {
            return false;
        }
        let to_center = math::flatten(center - eye);
        let perp = to_center.perp().normalize_or_zero();
        if perp == Vec2::ZERO {
            return true;
        }
        let offset = Vec3::new(perp.x, perp.y, 0.0) * radius;
        self.is_point_in_cover(eye, center + offset) && self.is_point_in_cover(eye, center - offset)
    }

    /// How much cover is above `point`: the squared vertical distance from
    /// the point up to the occluding silhouette (the interpolated top edge
    /// where the eye ray crosses the segment). None when nothing occludes.
    /// With several occluders the largest clearance wins.
    pub fn cover_occlusion_at(&self, eye: Vec3, point: Vec3) -> Option<f32> {
        let dir = point - eye;
        if dir.length_squared() < 1e-12 {
            return None;
        }
        let eye2 = math::flatten(eye);
        let dir2 = math::flatten(dir);

        let mut best: Option<f32> = None;
        for seg in &self.segments {
            if seg.is_disabled() {
                continue;
            }
            let l = &self.samples[seg.left as usize];
            let r = &self.samples[seg.right as usize];
            let Some((_, u)) = math::ray_segment_intersect_2d(
                eye2,
                dir2,
                math::flatten(l.position),
                math::flatten(r.position),
            ) else {
                continue;
            };
            let (bl, br) = (l.position, r.position);
            let (tl, tr) = (l.top(), r.top());
            if math::ray_triangle_front(eye, dir, bl, tr, br).is_none()
                && math::ray_triangle_front(eye, dir, bl, tl, tr).is_none()
            {
                continue;
            }
            let top_z = tl.z + (tr.z - tl.z) * u;
            let clearance = top_z - point.z;
            if clearance <= 0.0 {
                continue;
            }
            let sq = clearance * clearance;
            best = Some(best.map_or(sq, |b: f32| b.max(sq)));
        }
        best
    }

    // --- Cover path -----------------------------------------------------

    /// Offset outline of the surface at `distance_to_cover`: one point per
    /// segment's left sample, extruded along that segment's normal, with an
    /// averaged-normal point inserted at strongly divergent corners whose
    /// extrusions have separated visibly.
    pub fn generate_cover_path(&self, distance_to_cover: f32, skip_simplify: bool) -> CoverPath {
        if self.segments.is_empty() {
            return CoverPath::from_positions(&[], false);
        }
        let looped = self.is_looped();

        if self.segments.len() == 1 && !looped {
            let seg = &self.segments[0];
            let offset = seg.normal * distance_to_cover;
            let l = self.samples[seg.left as usize].position + offset;
            let r = self.samples[seg.right as usize].position + offset;
            return CoverPath::from_positions(&[l, r], false);
        }

        let mut positions: Vec<Vec3> = Vec::with_capacity(self.segments.len() + 4);
        for i in 0..self.segments.len() {
            let seg = &self.segments[i];
            let left = self.samples[seg.left as usize].position;
            if i > 0 {
                self.push_corner(&mut positions, i - 1, i, left, distance_to_cover);
            }
            positions.push(left + seg.normal * distance_to_cover);
        }

        if looped {
            let first_seg = &self.segments[0];
            let first_left = self.samples[first_seg.left as usize].position;
            self.push_corner(
                &mut positions,
                self.segments.len() - 1,
                0,
                first_left,
                distance_to_cover,
            );
            let closing = positions[0];
            positions.push(closing);
        } else {
            let last = &self.segments[self.segments.len() - 1];
            positions.push(self.samples[last.right as usize].position + last.normal * distance_to_cover);
        }

        let positions = if skip_simplify {
            positions
        } else {
            Self::simplify_path(&positions)
        };
        CoverPath::from_positions(&positions, looped)
    }

    fn push_corner(
        &self,
        out: &mut Vec<Vec3>,
        prev_idx: usize,
        next_idx: usize,
        corner: Vec3,
        distance: f32,
    ) {
        let prev = &self.segments[prev_idx];
        let next = &self.segments[next_idx];
        if prev.normal.dot(next.normal) >= PATH_CORNER_NORMAL_COS {
            return;
        }
        let a = corner + prev.normal * distance;
        let b = corner + next.normal * distance;
        if (a - b).length() <= PATH_CORNER_MERGE_DISTANCE {
            return;
        }
        let averaged = (prev.normal + next.normal).normalize_or_zero();
        if averaged == Vec3::ZERO {
            return;
        }
        out.push(corner + averaged * distance);
    }

    /// Collinearity reduction over a generated outline. The scratch storage
    /// is local to the call; concurrent path generation on different
    /// surfaces is safe.
    fn simplify_path(positions: &[Vec3]) -> Vec<Vec3> {
        if positions.len() <= 2 {
            return positions.to_vec();
        }
        let mut kept: Vec<Vec3> = Vec::with_capacity(positions.len());
        kept.push(positions[0]);
        for i in 1..positions.len() - 1 {
            let last = kept[kept.len() - 1];
            let (projected, _) = math::project_on_segment(positions[i], last, positions[i + 1]);
            if (positions[i] - projected).length() > PATH_SIMPLIFY_TOLERANCE {
                kept.push(positions[i]);
            }
        }
        kept.push(positions[positions.len() - 1]);
        kept
    }

    // --- Path coverage --------------------------------------------------

    /// Tangent directions from the eye grazing the surface extremes,
    /// adjusted until no sample lies outside the wedge. None when the eye
    /// is effectively surrounded and no tangents exist.
    fn find_cover_planes(&self, eye2: Vec2) -> Option<CoverPlanes> {
        let first = math::flatten(self.samples[0].position) - eye2;
        if first.length_squared() < 1e-10 {
            return None;
        }
        let mut cw = first;
        let mut ccw = first;
        for _ in 0..8 {
            let mut changed = false;
            for s in &self.samples {
                let d = math::flatten(s.position) - eye2;
                if d.length_squared() < 1e-10 {
                    continue;
                }
                if ccw.perp_dot(d) > 1e-6 {
                    ccw = d;
                    changed = true;
                }
                if cw.perp_dot(d) < -1e-6 {
                    cw = d;
                    changed = true;
                }
            }
            if !changed {
                return Some(CoverPlanes { cw, ccw });
            }
        }
        None
    }

    /// The interval of `path` distance that lies in this surface's shadow
    /// as seen from `eye`. For looped paths the interval wraps: when the
    /// entry distance exceeds the exit distance, the exit is advanced by
    /// one full path length. Open paths clamp an open end to the path
    /// start/end. None when the path never enters the shadow.
    pub fn calculate_path_coverage(&self, eye: Vec3, path: &CoverPath) -> Option<Interval> {
        let points = path.points();
        if points.len() < 2 {
            return None;
        }
        let eye2 = math::flatten(eye);
        let Some(planes) = self.find_cover_planes(eye2) else {
            // Surrounded by a looped surface: everything is covered.
            return self
                .is_looped()
                .then(|| Interval::new(0.0, path.length()));
        };

        // Inside the shadow wedge means on the positive side of both
        // boundary functions.
        let side = |p: Vec3| -> [f32; 2] {
            let d = math::flatten(p) - eye2;
            [planes.cw.perp_dot(d), -planes.ccw.perp_dot(d)]
        };

        // Every plane crossing along the path, as (distance, boundary,
        // sign-after). A single path segment may enter and exit between two
        // vertices, so crossings are collected per segment, not per vertex.
        let mut events: Vec<(f32, usize, bool)> = Vec::new();
        for i in 0..points.len() - 1 {
            let sa = side(points[i].position);
            let sb = side(points[i + 1].position);
            for k in 0..2 {
                if (sa[k] >= 0.0) != (sb[k] >= 0.0) {
                    let t = sa[k] / (sa[k] - sb[k]);
                    let d = points[i].distance + (points[i + 1].distance - points[i].distance) * t;
                    events.push((d, k, sb[k] >= 0.0));
                }
            }
        }
        events.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Walk the events accumulating covered runs.
        let start_side = side(points[0].position);
        let mut positive = [start_side[0] >= 0.0, start_side[1] >= 0.0];
        let mut inside = positive[0] && positive[1];
        let mut runs: Vec<(f32, f32)> = Vec::new();
        let mut run_start = 0.0f32;
        for (d, k, sign) in events {
            positive[k] = sign;
            let now_inside = positive[0] && positive[1];
            if now_inside && !inside {
                run_start = d;
            }
            if !now_inside && inside {
                runs.push((run_start, d));
            }
            inside = now_inside;
        }
        if inside {
            runs.push((run_start, path.length()));
        }

        let (first, last) = match (runs.first(), runs.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return None,
        };

        if path.is_looped() && runs.len() >= 2 && first.0 <= 0.0 && last.1 >= path.length() {
            // The covered run wraps through the loop seam: advance the exit
            // by one full length.
            return Some(Interval::new(last.0, first.1 + path.length()));
        }
        Some(Interval::new(first.0, last.1))
    }
}

struct CoverPlanes {
    cw: Vec2,
    ccw: Vec2,
}
