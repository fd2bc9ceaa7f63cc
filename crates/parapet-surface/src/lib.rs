pub mod path;
pub mod surface;

pub use path::CoverPath;
pub use surface::{CoverSurface, ResolvedLocation, Segment, SurfaceError};
