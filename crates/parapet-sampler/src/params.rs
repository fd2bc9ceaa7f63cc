use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tunable sampling parameters. These vary per agent archetype and are
/// loadable from RON profiles; per-run inputs (seed, direction) live in
/// `StartParams`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerParams {
    /// How far above a probe position the floor ray starts.
    pub floor_search_up: f32,
    /// How far below a probe position the floor ray may travel.
    pub floor_search_down: f32,
    /// Maximum obstruction height worth measuring; taller cover is capped.
    pub limit_height: f32,
    /// Minimum standable height for a sample to count as cover.
    pub min_height: f32,
    /// Lateral step between width-walk probes.
    pub width_interval: f32,
    /// Vertical step of the coarse height scan.
    pub height_interval: f32,
    /// Height subdivision stops once the bracket is within twice this.
    pub height_accuracy: f32,
    /// Radius of the swept-sphere obstruction probe.
    pub probe_radius: f32,
    /// How far the obstruction probe travels along the hide direction.
    pub probe_reach: f32,
    /// How far behind the floor point the obstruction probe starts.
    pub probe_back_off: f32,
    /// Maximum width walked from the seed toward the left.
    pub limit_left: f32,
    /// Maximum width walked from the seed toward the right.
    pub limit_right: f32,
    /// Maximum angle (radians) the walk direction may curve away from its
    /// starting direction. Zero disables the limit.
    pub max_curvature_angle: f32,
    /// Tolerance of the post-walk simplification pass.
    pub simplify_threshold: f32,
}

impl Default for SamplerParams {
    fn default() -> Self {
        Self {
            floor_search_up: 0.5,
            floor_search_down: 2.0,
            limit_height: 3.0,
            min_height: 0.5,
            width_interval: 0.5,
            height_interval: 0.25,
            height_accuracy: 0.05,
            probe_radius: 0.05,
            probe_reach: 1.0,
            probe_back_off: 0.25,
            limit_left: 10.0,
            limit_right: 10.0,
            max_curvature_angle: 0.0,
            simplify_threshold: 0.075,
        }
    }
}

impl SamplerParams {
    /// Check that the parameters describe a usable probe geometry.
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.width_interval <= 0.0 {
            return Err(format!("width_interval must be positive, got {}", self.width_interval));
        }
        if self.height_interval <= 0.0 {
            return Err(format!(
                "height_interval must be positive, got {}",
                self.height_interval
            ));
        }
        if self.height_accuracy <= 0.0 {
            return Err(format!(
                "height_accuracy must be positive, got {}",
                self.height_accuracy
            ));
        }
        if self.probe_radius <= 0.0 || self.probe_reach <= 0.0 {
            return Err("probe_radius and probe_reach must be positive".to_string());
        }
        if self.floor_search_up <= 0.0 || self.floor_search_down <= 0.0 {
            return Err("floor search distances must be positive".to_string());
        }
        if self.min_height < 0.0 || self.limit_height <= self.min_height {
            return Err(format!(
                "need 0 <= min_height < limit_height, got {} / {}",
                self.min_height, self.limit_height
            ));
        }
        if self.limit_left < 0.0 || self.limit_right < 0.0 {
            return Err("width limits must not be negative".to_string());
        }
        if self.simplify_threshold < 0.0 {
            return Err("simplify_threshold must not be negative".to_string());
        }
        Ok(())
    }
}

/// Per-run sampling inputs: where to start and which way the agent wants to
/// hide. `direction` points from the seed toward the expected obstruction.
#[derive(Debug, Clone, Copy)]
pub struct StartParams {
    pub position: Vec3,
    pub direction: Vec3,
}

impl StartParams {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_validate() {
        assert!(SamplerParams::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut p = SamplerParams::default();
        p.width_interval = 0.0;
        assert!(p.validate().is_err());

        let mut p = SamplerParams::default();
        p.limit_height = p.min_height;
        assert!(p.validate().is_err());

        let mut p = SamplerParams::default();
        p.height_accuracy = -0.1;
        assert!(p.validate().is_err());
    }
}
