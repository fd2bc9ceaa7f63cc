use crate::constants::{
    LOCATION_HEIGHT_MAX, LOCATION_HEIGHT_QUANT_MAX, LOCATION_OFFSET_QUANT_MAX,
};
use glam::{Vec2, Vec3};

const EPSILON: f32 = 1e-6;

/// Drop the vertical component.
pub fn flatten(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Horizontal unit normal to the right of a direction (dir x up), projected
/// to the plane and normalized. For a surface walked left to right this
/// points away from the solid side. Zero for vertical directions.
pub fn outward_normal(dir: Vec3) -> Vec3 {
    Vec3::new(dir.y, -dir.x, 0.0).normalize_or_zero()
}

fn orient(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Proper 2D segment intersection. Touching endpoints and collinear overlap
/// do not count.
pub fn segments_intersect_2d(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> bool {
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

/// Intersect the ray `origin + t * dir` (t >= 0) with the segment [a, b].
/// Returns (t, u) where u in [0, 1] parameterizes the segment.
pub fn ray_segment_intersect_2d(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<(f32, f32)> {
    let e = b - a;
    let denom = dir.perp_dot(e);
    if denom.abs() < EPSILON {
        return None;
    }
    let ao = a - origin;
    let t = ao.perp_dot(e) / denom;
    let u = ao.perp_dot(dir) / denom;
    if t >= 0.0 && (0.0..=1.0).contains(&u) {
        Some((t, u))
    } else {
        None
    }
}

/// Closest point on segment [a, b] to `p`. Returns the point and the
/// clamped parameter t in [0, 1].
pub fn project_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Moller-Trumbore ray/triangle intersection, front faces only: the hit
/// counts only when the ray approaches against the winding normal e1 x e2.
/// Returns the ray parameter t >= 0.
pub fn ray_triangle_front(origin: Vec3, dir: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det < EPSILON {
        // Back face or parallel.
        return None;
    }
    let tvec = origin - v0;
    let u = tvec.dot(p);
    if u < 0.0 || u > det {
        return None;
    }
    let q = tvec.cross(e1);
    let v = dir.dot(q);
    if v < 0.0 || u + v > det {
        return None;
    }
    let t = e2.dot(q) / det;
    if t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

/// Quantize a segment offset fraction in [0, 1] to 16 bits.
pub fn offset_to_quantized(offset: f32) -> u16 {
    (offset.clamp(0.0, 1.0) * LOCATION_OFFSET_QUANT_MAX as f32).round() as u16
}

/// Recover a segment offset fraction from its 16-bit quantized form.
pub fn offset_from_quantized(quantized: u16) -> f32 {
    quantized as f32 / LOCATION_OFFSET_QUANT_MAX as f32
}

/// Quantize a location height in [0, LOCATION_HEIGHT_MAX] to 12 bits.
/// Clamps out-of-range heights.
pub fn height_to_quantized(height: f32) -> u16 {
    let clamped = height.clamp(0.0, LOCATION_HEIGHT_MAX);
    let ratio = clamped / LOCATION_HEIGHT_MAX;
    let quantized = (ratio * LOCATION_HEIGHT_QUANT_MAX as f32).round() as u16;
    quantized.min(LOCATION_HEIGHT_QUANT_MAX)
}

/// Recover a location height from its 12-bit quantized form.
pub fn height_from_quantized(quantized: u16) -> f32 {
    let clamped = quantized.min(LOCATION_HEIGHT_QUANT_MAX);
    (clamped as f32 / LOCATION_HEIGHT_QUANT_MAX as f32) * LOCATION_HEIGHT_MAX
}
