//! The scene-source seam - where drafts come from, and what happens when
//! they don't.
//!
//! The planner talks to a [`SceneSource`] and never to a concrete model
//! API. Transient failures are retried with exponential backoff and jitter;
//! once retries are exhausted the planner falls back to a deterministic
//! stand-in scene so a single flaky call cannot sink the whole run.

use async_trait::async_trait;
use quest_graph::{Ending, SceneId};
use rand::Rng;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::SourceError;
use crate::knowledge::GenreElements;
use crate::scenario::ScenarioInput;

/// Everything a scene source needs to draft one scene.
#[derive(Debug, Clone)]
pub struct ScenePrompt {
    /// ID the drafted scene will be stored under.
    pub scene_id: SceneId,

    /// Narrative stage hint (opening, development, climax, resolution).
    pub stage: String,

    /// The quest premise.
    pub scenario: ScenarioInput,

    /// Sampled genre material.
    pub elements: GenreElements,

    /// Retrieved context snippets, best first.
    pub snippets: Vec<String>,

    /// Text of the scene the player arrives from, if any.
    pub previous_text: Option<String>,

    /// Upper bound on candidate choices.
    pub max_choices: usize,

    /// Whether the source should also propose an image prompt.
    pub want_image_prompt: bool,
}

impl ScenePrompt {
    /// Render the prompt as the text handed to a model-backed source.
    pub fn to_prompt_string(&self) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Quest\n");
        prompt.push_str(&self.scenario.summary());
        prompt.push_str("\n\n");

        prompt.push_str("## Scene\n");
        prompt.push_str(&format!(
            "Stage: {} (id {})\n",
            self.stage, self.scene_id
        ));
        prompt.push_str(&format!("Offer up to {} choices.\n", self.max_choices));
        prompt.push('\n');

        if !self.elements.locations.is_empty() {
            prompt.push_str("## Genre Material\n");
            prompt.push_str(&format!(
                "Locations: {}\n",
                self.elements.locations.join(", ")
            ));
            if !self.elements.atmosphere.is_empty() {
                prompt.push_str(&format!(
                    "Atmosphere: {}\n",
                    self.elements.atmosphere.join(", ")
                ));
            }
            if !self.elements.items.is_empty() {
                prompt.push_str(&format!("Items: {}\n", self.elements.items.join(", ")));
            }
            prompt.push('\n');
        }

        if !self.snippets.is_empty() {
            prompt.push_str("## Background\n");
            for snippet in &self.snippets {
                prompt.push_str(&format!("- {}\n", snippet));
            }
            prompt.push('\n');
        }

        if let Some(previous) = &self.previous_text {
            prompt.push_str("## Previous Scene\n");
            prompt.push_str(previous);
            prompt.push('\n');
        }

        prompt
    }
}

/// What a scene source proposes for one scene.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneDraft {
    /// Narrative text.
    pub text: String,

    /// Candidate choice texts, in presentation order.
    pub choices: Vec<String>,

    pub mood: Option<String>,
    pub location: Option<String>,
    pub image_prompt: Option<String>,

    /// Set when the source wants the branch to conclude here.
    pub conclude: Option<Ending>,
}

impl SceneDraft {
    /// A draft with text and choices, for the common case.
    pub fn new(text: impl Into<String>, choices: Vec<String>) -> Self {
        Self {
            text: text.into(),
            choices,
            ..Self::default()
        }
    }

    /// A draft that ends the branch.
    pub fn concluding(text: impl Into<String>, ending: Ending) -> Self {
        Self {
            text: text.into(),
            conclude: Some(ending),
            ..Self::default()
        }
    }
}

/// The text-generation collaborator, seen from the planner.
#[async_trait]
pub trait SceneSource: Send + Sync {
    /// Draft one scene for the given prompt.
    async fn draft_scene(&self, prompt: &ScenePrompt) -> Result<SceneDraft, SourceError>;
}

/// Bounded-retry policy with exponential backoff and jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the given retry (1-based), doubled each attempt with
    /// up to 50% random jitter on top.
    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self.base_delay.saturating_mul(1u32 << (attempt - 1).min(8));
        let jitter = rand::thread_rng().gen_range(1.0..1.5);
        doubled.mul_f64(jitter)
    }
}

impl From<&GenerationConfig> for RetryPolicy {
    fn from(config: &GenerationConfig) -> Self {
        Self::new(config.max_retries, config.retry_base_delay())
    }
}

/// Call the source, retrying per the policy. Returns the last error once
/// retries are exhausted.
pub async fn draft_with_retries(
    source: &dyn SceneSource,
    prompt: &ScenePrompt,
    policy: &RetryPolicy,
) -> Result<SceneDraft, SourceError> {
    let mut attempt = 0u32;
    loop {
        match source.draft_scene(prompt).await {
            Ok(draft) => return Ok(draft),
            Err(err) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    return Err(err);
                }
                tracing::warn!(
                    scene = %prompt.scene_id,
                    attempt,
                    error = %err,
                    "scene draft failed, retrying"
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
        }
    }
}

/// Deterministic stand-in for a scene the source could not produce.
///
/// Terminates the branch: the stand-in keeps the scene ID and closes with a
/// neutral ending, so one unreachable service cannot leave the graph with
/// pending targets.
pub fn fallback_draft(prompt: &ScenePrompt) -> SceneDraft {
    let text = format!(
        "The {} draws to an uneasy close. {} can go no further toward the goal: {}.",
        prompt.stage, prompt.scenario.hero, prompt.scenario.goal
    );

    SceneDraft {
        text,
        choices: vec!["Let the tale end here".to_owned()],
        conclude: Some(Ending::Neutral),
        ..SceneDraft::default()
    }
}
