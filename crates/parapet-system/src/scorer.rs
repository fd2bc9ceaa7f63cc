use std::collections::HashMap;

use glam::Vec3;

/// A resolved cover location under consideration.
#[derive(Debug, Clone, Copy)]
pub struct CoverCandidate {
    pub position: Vec3,
    pub normal: Vec3,
    pub height: f32,
}

/// Everything a scorer may weigh a candidate against.
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext {
    /// Where the agent currently is.
    pub agent: Vec3,
    /// The threat the agent is hiding from.
    pub target: Vec3,
    /// Direction the agent would prefer to move (zero for no preference).
    pub preferred_direction: Vec3,
}

/// Scores a candidate cover location; higher is better. Implementations
/// must be pure with respect to their inputs.
pub trait LocationScorer {
    fn score(&self, candidate: &CoverCandidate, context: &ScoreContext) -> f32;
}

/// Weighs proximity to the agent, agreement with the preferred movement
/// direction, and distance from the target.
#[derive(Debug, Clone, Copy)]
pub struct DefaultScorer {
    pub distance_weight: f32,
    pub direction_weight: f32,
    pub target_distance_weight: f32,
}

impl Default for DefaultScorer {
    fn default() -> Self {
        Self {
            distance_weight: 1.0,
            direction_weight: 0.5,
            target_distance_weight: 0.5,
        }
    }
}

impl LocationScorer for DefaultScorer {
    fn score(&self, candidate: &CoverCandidate, context: &ScoreContext) -> f32 {
        let to_candidate = candidate.position - context.agent;
        let distance = to_candidate.length();
        // Closer cover scores higher, saturating.
        let distance_score = 1.0 / (1.0 + distance);

        let direction_score = match (
            to_candidate.try_normalize(),
            context.preferred_direction.try_normalize(),
        ) {
            (Some(a), Some(b)) => (a.dot(b) + 1.0) * 0.5,
            _ => 0.5,
        };

        // Farther from the threat scores higher, saturating.
        let target_distance = (candidate.position - context.target).length();
        let target_score = target_distance / (1.0 + target_distance);

        let weight_sum =
            self.distance_weight + self.direction_weight + self.target_distance_weight;
        if weight_sum <= 0.0 {
            return 0.0;
        }
        (distance_score * self.distance_weight
            + direction_score * self.direction_weight
            + target_score * self.target_distance_weight)
            / weight_sum
    }
}

/// Name-keyed scorer registry so hosts can select scoring behavior from
/// data.
pub struct ScorerRegistry {
    scorers: HashMap<String, Box<dyn LocationScorer>>,
}

impl Default for ScorerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self {
            scorers: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("default", Box::new(DefaultScorer::default()));
        registry
    }

    pub fn register(&mut self, name: &str, scorer: Box<dyn LocationScorer>) {
        self.scorers.insert(name.to_string(), scorer);
    }

    pub fn get(&self, name: &str) -> Option<&dyn LocationScorer> {
        self.scorers.get(name).map(|s| s.as_ref())
    }
}
