/// Errors that can occur while reading a cover surface file.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("invalid magic bytes (expected PCOV)")]
    InvalidMagic,

    #[error("unsupported cover file version {0}")]
    UnsupportedVersion(u16),

    #[error("file too small ({0} bytes, minimum {1})")]
    FileTooSmall(usize, usize),

    #[error("truncated file: expected {expected} bytes, got {actual}")]
    TruncatedFile { expected: usize, actual: usize },

    #[error("surface {surface} declares {count} samples, exceeding the per-surface limit")]
    OversizedSurface { surface: usize, count: usize },
}
