//! Error types for the generation pipeline.

use quest_graph::{SceneId, Violation};
use thiserror::Error;

/// Top-level error type for quest generation.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Scene generation failed beyond what retries and fallbacks can cover.
    #[error("scene generation failed for {scene}: {reason}")]
    Generation { scene: SceneId, reason: String },

    /// The finished graph failed structural validation.
    #[error("quest failed validation with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    /// The run was aborted; the partial graph was discarded.
    #[error("generation cancelled")]
    Cancelled,

    /// The generation configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A quest document could not be serialized or parsed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Persisting or loading a quest document failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error reported by an external scene source or snippet retriever.
///
/// The planner treats every source error as transient and retries with
/// backoff before falling back.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The service could not be reached or refused the call.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
