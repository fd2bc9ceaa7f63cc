use parapet_core::types::Sample;

/// Magic bytes identifying a cover surface file.
pub const MAGIC: [u8; 4] = *b"PCOV";

/// Current file format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Size of each per-surface header in bytes: sample count + flags.
pub const SURFACE_HEADER_SIZE: usize = 8;

/// Size of each sample record in bytes: position 3xf32, height f32,
/// flags u32, all little-endian.
pub const SAMPLE_RECORD_SIZE: usize = 20;

/// File header. Fixed 16 bytes, repr(C) for byte-level serialization.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub _pad0: u16,
    pub surface_count: u32,
    pub _pad1: u32,
}

/// One persisted surface: the flat sample buffer and surface flags, exactly
/// what `CoverSurface::generate` consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    pub samples: Vec<Sample>,
    pub flags: u8,
}
