pub mod grid;
pub mod scorer;
pub mod system;

pub use grid::LocationGrid;
pub use scorer::{CoverCandidate, DefaultScorer, LocationScorer, ScoreContext, ScorerRegistry};
pub use system::{CoverSystem, SystemError};
