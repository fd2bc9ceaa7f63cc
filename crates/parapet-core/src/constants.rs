//! Single source of truth for shared algorithm constants. Tunables that vary
//! per agent archetype live in `parapet_sampler::SamplerParams` instead.

/// Spacing between generated cover locations along a surface, in world units.
pub const LOCATION_SPACING: f32 = 0.5;

/// Number of bits used for location offset quantization (fraction of a segment).
pub const LOCATION_OFFSET_QUANT_BITS: u32 = 16;

/// Maximum quantized location offset value (2^16 - 1). Resolution: 1/65535.
pub const LOCATION_OFFSET_QUANT_MAX: u16 = 65535;

/// Number of bits used for location height quantization.
pub const LOCATION_HEIGHT_QUANT_BITS: u32 = 12;

/// Maximum quantized location height value (2^12 - 1).
pub const LOCATION_HEIGHT_QUANT_MAX: u16 = 4095;

/// Maximum representable location height in world units. Heights are stored
/// as a 12-bit fraction of this range (~2mm resolution).
pub const LOCATION_HEIGHT_MAX: f32 = 8.0;

/// Minimum vertical normal component for a downward ray hit to count as
/// standable floor rather than a wall face.
pub const FLOOR_NORMAL_MIN_Z: f32 = 0.7;

/// Maximum |normal.z| for a sweep hit to count as an obstruction wall face.
/// Above this the probe is skimming a top surface, not hitting cover.
pub const WALL_NORMAL_MAX_Z: f32 = 0.5;

/// Cosine of the maximum turn angle (~90.5 degrees) between consecutive
/// width-walk steps. Sharper turns are geometrically implausible spikes.
pub const MAX_TURN_COS: f32 = -0.0087;

/// Blend weight pulling the walk direction toward the discovered surface
/// tangent after each accepted sample.
pub const DIRECTION_ADJUST_WEIGHT: f32 = 0.25;

/// Small upward re-bias applied to the walk direction after blending, so the
/// normalized result never degenerates to zero on opposing directions.
pub const DIRECTION_UP_BIAS: f32 = 0.05;

/// Minimum distance between consecutive accepted raw samples.
pub const MIN_SAMPLE_DELTA: f32 = 0.05;

/// Dynamic samples within this distance of the last kept dynamic sample are
/// eligible for simplification; farther ones are always kept.
pub const DYNAMIC_KEEP_SPACING: f32 = 0.4;

/// Lower bound on the surface simplification tolerance.
pub const SIMPLIFY_THRESHOLD_FLOOR: f32 = 0.0025;

/// Extra slack beyond one width step when testing loop closure.
pub const LOOP_CLOSE_SLACK: f32 = 0.1;

/// Cosine threshold below which adjacent segment normals count as divergent
/// when generating an offset cover path (~15 degrees).
pub const PATH_CORNER_NORMAL_COS: f32 = 0.966;

/// Corner extrusions closer together than this are emitted as-is instead of
/// being merged through an averaged-normal point.
pub const PATH_CORNER_MERGE_DISTANCE: f32 = 0.35;

/// Perpendicular-distance tolerance when simplifying a generated cover path.
pub const PATH_SIMPLIFY_TOLERANCE: f32 = 0.015;

/// Bound on per-surface entries in the cover path cache.
pub const PATH_CACHE_SURFACES: usize = 15;

/// Bound on entries in the resolved cover-location cache. The cache is
/// cleared wholesale on overflow rather than evicted entry-by-entry.
pub const LOCATION_CACHE_CAPACITY: usize = 4096;

/// Surface slot storage grows in blocks of this many slots.
pub const SURFACE_SLOT_BLOCK: usize = 64;

/// Spatial grid cell size in world units.
pub const GRID_CELL_SIZE: f32 = 4.0;

/// Radius of the circle tested when filtering candidate locations in
/// `get_cover` (a crouched agent footprint).
pub const OCCUPY_TEST_RADIUS: f32 = 0.4;

/// Vertical offset of the in-cover test point above a candidate location
/// (a crouched torso proxy).
pub const OCCUPY_TEST_HEIGHT: f32 = 0.35;
