use glam::Vec3;

/// Sample flag: the sample lies on dynamic (breakable/movable) geometry.
pub const SAMPLE_DYNAMIC: u8 = 1 << 0;

/// Surface flag: the sample chain closes on itself.
pub const SURFACE_LOOPED: u8 = 1 << 0;

/// Surface flag: the surface was sampled from dynamic geometry.
pub const SURFACE_DYNAMIC: u8 = 1 << 1;

/// Segment flag: both endpoint samples are dynamic.
pub const SEGMENT_DYNAMIC: u8 = 1 << 0;

/// Segment flag: runtime revalidation has found this segment no longer
/// backed by physical geometry. Disabled segments occlude nothing.
pub const SEGMENT_DISABLED: u8 = 1 << 1;

/// Location flag: the location sits exactly at the surface's left end.
pub const LOC_LEFT_EDGE: u8 = 1 << 0;

/// Location flag: the location sits exactly at the surface's right end.
pub const LOC_RIGHT_EDGE: u8 = 1 << 1;

/// One point on a cover surface: a floor position, the standable obstruction
/// height above it, and flags. Z is up. Samples are produced by the sampler
/// (or deserialized) and are immutable once a surface is generated from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Vec3,
    pub height: f32,
    pub flags: u8,
}

impl Sample {
    pub fn new(position: Vec3, height: f32) -> Self {
        Self {
            position,
            height,
            flags: 0,
        }
    }

    pub fn with_flags(position: Vec3, height: f32, flags: u8) -> Self {
        Self {
            position,
            height,
            flags,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.flags & SAMPLE_DYNAMIC != 0
    }

    /// Top of the obstruction above this sample.
    pub fn top(&self) -> Vec3 {
        self.position + Vec3::Z * self.height
    }
}

/// Generation-tagged surface handle. The slot index is dense and reused via
/// a free list; the generation is bumped on every free, so a handle captured
/// before a remove/add cycle fails to resolve instead of aliasing the new
/// surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId {
    slot: u16,
    generation: u16,
}

impl SurfaceId {
    pub fn new(slot: u16, generation: u16) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> usize {
        self.slot as usize
    }

    pub fn generation(&self) -> u16 {
        self.generation
    }

    /// Pack into a u32: generation in the high half, slot in the low half.
    pub fn to_bits(self) -> u32 {
        ((self.generation as u32) << 16) | self.slot as u32
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            slot: (bits & 0xFFFF) as u16,
            generation: (bits >> 16) as u16,
        }
    }
}

/// Index of a location within its owning surface's location array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationId(pub u16);

/// Identifies one cover location globally: a surface handle plus a location
/// index, packed into 48 bits of a u64 (surface high, location low) for
/// compact storage in the spatial grid and occupancy map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoverId {
    surface: SurfaceId,
    location: LocationId,
}

impl CoverId {
    pub fn new(surface: SurfaceId, location: LocationId) -> Self {
        Self { surface, location }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn to_bits(self) -> u64 {
        ((self.surface.to_bits() as u64) << 16) | self.location.0 as u64
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            surface: SurfaceId::from_bits((bits >> 16) as u32),
            location: LocationId((bits & 0xFFFF) as u16),
        }
    }
}

/// Opaque occupant handle supplied by the host (an entity id, an agent id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OccupantId(pub u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_id_bits_roundtrip() {
        let id = SurfaceId::new(513, 7);
        let back = SurfaceId::from_bits(id.to_bits());
        assert_eq!(back, id);
        assert_eq!(back.slot(), 513);
        assert_eq!(back.generation(), 7);
    }

    #[test]
    fn test_cover_id_bits_roundtrip() {
        let id = CoverId::new(SurfaceId::new(12, 3), LocationId(4096));
        let back = CoverId::from_bits(id.to_bits());
        assert_eq!(back, id);
        assert_eq!(back.surface().slot(), 12);
        assert_eq!(back.location().0, 4096);
    }

    #[test]
    fn test_cover_id_distinct_per_generation() {
        let a = CoverId::new(SurfaceId::new(1, 0), LocationId(0));
        let b = CoverId::new(SurfaceId::new(1, 1), LocationId(0));
        assert_ne!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_sample_top() {
        let s = Sample::new(Vec3::new(1.0, 2.0, 3.0), 1.5);
        assert_eq!(s.top(), Vec3::new(1.0, 2.0, 4.5));
        assert!(!s.is_dynamic());
        let d = Sample::with_flags(Vec3::ZERO, 1.0, SAMPLE_DYNAMIC);
        assert!(d.is_dynamic());
    }
}
