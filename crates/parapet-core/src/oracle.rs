use glam::Vec3;

/// Classification attached to every collision hit: what kind of geometry
/// backed it. Dynamic geometry (breakables, movables) produces dynamic
/// samples subject to revalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Solid,
    Dynamic,
}

/// Result of a raycast against world geometry.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub kind: SurfaceKind,
}

/// Result of a swept-sphere cast against world geometry.
#[derive(Debug, Clone, Copy)]
pub struct SweepHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub kind: SurfaceKind,
}

/// Opaque handle to a physical entity, as understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle(pub u64);

/// Collision queries the cover engine needs from its host. Supplied
/// explicitly to samplers and revalidation rather than reached through
/// engine globals.
pub trait CollisionOracle {
    /// Cast a vertical ray downward from `origin`, at most `max_distance`.
    fn raycast_down(&self, origin: Vec3, max_distance: f32) -> Option<RayHit>;

    /// Sweep a sphere of `radius` from `origin` along `direction` (unit) for
    /// `length`, returning the first hit.
    fn swept_sphere(&self, origin: Vec3, direction: Vec3, length: f32, radius: f32)
        -> Option<SweepHit>;

    /// True if any geometry overlaps the capsule-like cylinder from `base`
    /// along `direction` (unit) for `length` with `radius`.
    fn overlap_cylinder(&self, base: Vec3, direction: Vec3, length: f32, radius: f32) -> bool;

    /// Physical entities whose bounds intersect the box, with their kind.
    fn entities_in_box(&self, min: Vec3, max: Vec3) -> Vec<(EntityHandle, SurfaceKind)>;
}
