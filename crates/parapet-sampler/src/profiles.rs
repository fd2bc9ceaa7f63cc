use std::collections::HashMap;

use thiserror::Error;

use crate::params::{SamplerParams, StartParams};
use crate::sampler::CoverSampler;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to parse sampler profiles RON: {0}")]
    ParseError(String),

    #[error("Sampler profile '{profile}' is invalid: {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("Unknown sampler profile '{0}'")]
    UnknownProfile(String),
}

/// Named sampler parameter presets. Hosts pick a profile by name when they
/// request cover discovery for an agent archetype; level data can override
/// or extend the built-in set from RON documents.
pub struct SamplerProfiles {
    profiles: HashMap<String, SamplerParams>,
}

impl SamplerProfiles {
    /// The built-in profile set.
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), SamplerParams::default());

        // Crouch-only cover: accepts lower obstructions.
        let mut low = SamplerParams::default();
        low.min_height = 0.4;
        low.limit_height = 1.2;
        profiles.insert("low".to_string(), low);

        // Standing cover only.
        let mut tall = SamplerParams::default();
        tall.min_height = 1.35;
        profiles.insert("tall".to_string(), tall);

        // Dense sampling for geometry-heavy areas.
        let mut fine = SamplerParams::default();
        fine.width_interval = 0.25;
        fine.height_accuracy = 0.025;
        fine.simplify_threshold = 0.025;
        profiles.insert("fine".to_string(), fine);

        Self { profiles }
    }

    /// Parse a profile map from a RON string. Every profile is validated;
    /// the first invalid one fails the load.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ProfileError> {
        let options = ron::Options::default();
        let profiles: HashMap<String, SamplerParams> = options
            .from_str(ron_str)
            .map_err(|e| ProfileError::ParseError(e.to_string()))?;
        for (name, params) in &profiles {
            params
                .validate()
                .map_err(|reason| ProfileError::InvalidProfile {
                    profile: name.clone(),
                    reason,
                })?;
        }
        Ok(Self { profiles })
    }

    /// Merge another profile set into this one. Colliding names are
    /// overridden by `other`.
    pub fn merge(&mut self, other: SamplerProfiles) {
        self.profiles.extend(other.profiles);
    }

    pub fn get(&self, name: &str) -> Option<&SamplerParams> {
        self.profiles.get(name)
    }

    /// Create a sampler configured from the named profile.
    pub fn create_sampler(
        &self,
        name: &str,
        start: StartParams,
    ) -> Result<CoverSampler, ProfileError> {
        let params = self
            .profiles
            .get(name)
            .ok_or_else(|| ProfileError::UnknownProfile(name.to_string()))?;
        Ok(CoverSampler::new(params.clone(), start))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
