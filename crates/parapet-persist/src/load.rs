use glam::Vec3;
use parapet_core::types::Sample;

use crate::error::PersistError;
use crate::format::*;

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Parse a cover surface file. All fields are little-endian on disk and
/// normalized to host order here.
pub fn load(bytes: &[u8]) -> Result<Vec<SurfaceRecord>, PersistError> {
    if bytes.len() < HEADER_SIZE {
        return Err(PersistError::FileTooSmall(bytes.len(), HEADER_SIZE));
    }

    let header: FileHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
    if header.magic != MAGIC {
        return Err(PersistError::InvalidMagic);
    }
    if header.version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(header.version));
    }

    let surface_count = header.surface_count as usize;
    let mut surfaces = Vec::with_capacity(surface_count.min(1024));
    let mut offset = HEADER_SIZE;

    for surface_idx in 0..surface_count {
        if bytes.len() < offset + SURFACE_HEADER_SIZE {
            return Err(PersistError::TruncatedFile {
                expected: offset + SURFACE_HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let sample_count = read_u32(bytes, offset) as usize;
        let flags = read_u32(bytes, offset + 4);
        offset += SURFACE_HEADER_SIZE;

        if sample_count > u16::MAX as usize {
            return Err(PersistError::OversizedSurface {
                surface: surface_idx,
                count: sample_count,
            });
        }

        let records_end = offset + sample_count * SAMPLE_RECORD_SIZE;
        if bytes.len() < records_end {
            return Err(PersistError::TruncatedFile {
                expected: records_end,
                actual: bytes.len(),
            });
        }

        let mut samples = Vec::with_capacity(sample_count);
        for _ in 0..sample_count {
            let position = Vec3::new(
                read_f32(bytes, offset),
                read_f32(bytes, offset + 4),
                read_f32(bytes, offset + 8),
            );
            let height = read_f32(bytes, offset + 12);
            let sample_flags = read_u32(bytes, offset + 16) as u8;
            samples.push(Sample::with_flags(position, height, sample_flags));
            offset += SAMPLE_RECORD_SIZE;
        }

        surfaces.push(SurfaceRecord {
            samples,
            flags: flags as u8,
        });
    }

    Ok(surfaces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::save;
    use parapet_core::types::{SAMPLE_DYNAMIC, SURFACE_LOOPED};

    fn wall_record() -> SurfaceRecord {
        SurfaceRecord {
            samples: vec![
                Sample::new(Vec3::new(0.0, 0.0, 0.0), 1.0),
                Sample::with_flags(Vec3::new(2.5, 0.1, 0.0), 1.2, SAMPLE_DYNAMIC),
                Sample::new(Vec3::new(5.0, 0.0, 0.0), 1.0),
            ],
            flags: 0,
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let records = vec![
            wall_record(),
            SurfaceRecord {
                samples: vec![
                    Sample::new(Vec3::new(10.0, 0.0, 0.0), 0.8),
                    Sample::new(Vec3::new(10.0, 3.0, 0.0), 0.8),
                ],
                flags: SURFACE_LOOPED,
            },
        ];
        let bytes = save(&records);
        let loaded = load(&bytes).expect("load should succeed");
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_save_load_empty() {
        let bytes = save(&[]);
        assert_eq!(bytes.len(), HEADER_SIZE);
        let loaded = load(&bytes).expect("load should succeed");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut bytes = save(&[wall_record()]);
        bytes[0..4].copy_from_slice(b"NOPE");
        assert!(matches!(load(&bytes), Err(PersistError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = save(&[wall_record()]);
        bytes[4..6].copy_from_slice(&99u16.to_le_bytes());
        assert!(matches!(
            load(&bytes),
            Err(PersistError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_file_too_small_rejected() {
        assert!(matches!(
            load(&[0u8; 4]),
            Err(PersistError::FileTooSmall(4, HEADER_SIZE))
        ));
    }

    #[test]
    fn test_truncated_surface_table_rejected() {
        // Header claims a surface but the body is missing.
        let mut bytes = save(&[]);
        bytes[8..12].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(
            load(&bytes),
            Err(PersistError::TruncatedFile { .. })
        ));
    }

    #[test]
    fn test_truncated_records_rejected() {
        let bytes = save(&[wall_record()]);
        let cut = &bytes[..bytes.len() - 7];
        assert!(matches!(load(cut), Err(PersistError::TruncatedFile { .. })));
    }

    #[test]
    fn test_oversized_surface_rejected() {
        let mut bytes = save(&[wall_record()]);
        // Claim an absurd sample count for surface 0.
        bytes[HEADER_SIZE..HEADER_SIZE + 4].copy_from_slice(&1_000_000u32.to_le_bytes());
        assert!(matches!(
            load(&bytes),
            Err(PersistError::OversizedSurface { surface: 0, .. })
        ));
    }

    #[test]
    fn test_flags_roundtrip() {
        let records = vec![SurfaceRecord {
            samples: vec![
                Sample::with_flags(Vec3::ZERO, 1.0, SAMPLE_DYNAMIC),
                Sample::with_flags(Vec3::X, 1.0, SAMPLE_DYNAMIC),
            ],
            flags: SURFACE_LOOPED,
        }];
        let loaded = load(&save(&records)).expect("load");
        assert_eq!(loaded[0].flags, SURFACE_LOOPED);
        assert!(loaded[0].samples.iter().all(|s| s.is_dynamic()));
    }
}
