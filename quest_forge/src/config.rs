//! Generation configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ForgeError;

/// Everything that shapes a generation run.
///
/// All fields have sensible defaults, so a config can be built from a
/// partial TOML file or constructed in code and tweaked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model name forwarded to the scene source.
    pub model: String,

    /// Sampling temperature forwarded to the scene source.
    pub temperature: f32,

    /// Token budget per scene-generation call.
    pub max_tokens: u32,

    /// Maximum number of sequential choice levels.
    pub branching_depth: usize,

    /// Candidate choices requested per scene.
    pub choices_per_scene: usize,

    /// Retries per scene before falling back.
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Concurrent scene generations allowed within one depth level.
    pub max_concurrent_scenes: usize,

    /// Whether to retrieve context snippets for prompts.
    pub use_retrieval: bool,

    /// Snippets requested per retrieval call.
    pub retrieval_top_k: usize,

    /// Whether to infer preconditions/effects for choices.
    pub enrich_logic: bool,

    /// Whether to ask the scene source for image prompts.
    pub request_image_prompts: bool,

    /// Whether to collapse near-duplicate sibling branches.
    pub merge_duplicates: bool,

    /// Similarity at which two scenes count as duplicates.
    pub merge_threshold: f64,

    /// Emit the quest despite validation violations, demoting them to
    /// warnings.
    pub best_effort: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_owned(),
            temperature: 0.8,
            max_tokens: 2000,
            branching_depth: 3,
            choices_per_scene: 2,
            max_retries: 3,
            retry_base_delay_ms: 250,
            max_concurrent_scenes: 4,
            use_retrieval: true,
            retrieval_top_k: 5,
            enrich_logic: false,
            request_image_prompts: false,
            merge_duplicates: true,
            merge_threshold: 0.95,
            best_effort: false,
        }
    }
}

impl GenerationConfig {
    /// Parse a config from TOML; missing keys keep their defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ForgeError> {
        let config: Self =
            toml::from_str(toml).map_err(|e| ForgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.branching_depth == 0 {
            return Err(ForgeError::Config(
                "branching_depth must be at least 1".to_owned(),
            ));
        }
        if self.choices_per_scene == 0 {
            return Err(ForgeError::Config(
                "choices_per_scene must be at least 1".to_owned(),
            ));
        }
        if self.max_concurrent_scenes == 0 {
            return Err(ForgeError::Config(
                "max_concurrent_scenes must be at least 1".to_owned(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ForgeError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.merge_threshold) {
            return Err(ForgeError::Config(format!(
                "merge_threshold must be within 0.0..=1.0, got {}",
                self.merge_threshold
            )));
        }
        Ok(())
    }

    /// Base backoff delay as a [`Duration`].
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GenerationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GenerationConfig::from_toml_str(
            r#"
            branching_depth = 2
            choices_per_scene = 3
            best_effort = true
            "#,
        )
        .unwrap();

        assert_eq!(config.branching_depth, 2);
        assert_eq!(config.choices_per_scene, 3);
        assert!(config.best_effort);
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(GenerationConfig::from_toml_str("branching_depth = 0").is_err());
        assert!(GenerationConfig::from_toml_str("temperature = 3.5").is_err());
        assert!(GenerationConfig::from_toml_str("merge_threshold = 1.5").is_err());
    }

    #[test]
    fn test_malformed_toml_rejected() {
        assert!(GenerationConfig::from_toml_str("branching_depth = ").is_err());
    }
}
