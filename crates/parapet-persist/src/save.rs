use crate::format::*;

/// Serialize surface records to the binary cover file layout. The runtime
/// only consumes these files; this writer exists for tooling and tests.
pub fn save(surfaces: &[SurfaceRecord]) -> Vec<u8> {
    let body_size: usize = surfaces
        .iter()
        .map(|s| SURFACE_HEADER_SIZE + s.samples.len() * SAMPLE_RECORD_SIZE)
        .sum();
    let mut out = Vec::with_capacity(HEADER_SIZE + body_size);

    let header = FileHeader {
        magic: MAGIC,
        version: FORMAT_VERSION,
        _pad0: 0,
        surface_count: surfaces.len() as u32,
        _pad1: 0,
    };
    out.extend_from_slice(bytemuck::bytes_of(&header));

    for surface in surfaces {
        out.extend_from_slice(&(surface.samples.len() as u32).to_le_bytes());
        out.extend_from_slice(&(surface.flags as u32).to_le_bytes());
        for sample in &surface.samples {
            out.extend_from_slice(&sample.position.x.to_le_bytes());
            out.extend_from_slice(&sample.position.y.to_le_bytes());
            out.extend_from_slice(&sample.position.z.to_le_bytes());
            out.extend_from_slice(&sample.height.to_le_bytes());
            out.extend_from_slice(&(sample.flags as u32).to_le_bytes());
        }
    }
    out
}
