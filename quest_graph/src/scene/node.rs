//! Scene nodes and choice edges.

use serde::{Deserialize, Serialize};

use super::{ChoiceTarget, Ending, SceneId};
use crate::logic::ChoiceLogic;

/// A single choice offered to the player, leading to a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceEdge {
    /// Text shown to the player.
    pub text: String,

    /// Where the choice leads.
    #[serde(rename = "next_scene")]
    pub target: ChoiceTarget,

    /// Structured preconditions and effects, if logic enrichment ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<ChoiceLogic>,
}

impl ChoiceEdge {
    /// Create a choice leading to the given target.
    pub fn new(text: impl Into<String>, target: ChoiceTarget) -> Self {
        Self {
            text: text.into(),
            target,
            logic: None,
        }
    }

    /// Create a choice leading to another scene.
    pub fn to_scene(text: impl Into<String>, scene: SceneId) -> Self {
        Self::new(text, ChoiceTarget::Scene(scene))
    }

    /// Create a choice that concludes the branch.
    pub fn to_ending(text: impl Into<String>, ending: Ending) -> Self {
        Self::new(text, ChoiceTarget::Ending(ending))
    }

    /// Attach structured logic to this choice.
    pub fn with_logic(mut self, logic: ChoiceLogic) -> Self {
        self.logic = Some(logic);
        self
    }
}

/// A narrative unit: descriptive text plus the choices leading out of it.
///
/// Nodes are mutable while the graph is under construction and treated as
/// frozen once validation has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: SceneId,

    /// Narrative text of the scene.
    pub text: String,

    /// Ordered outgoing choices.
    #[serde(default)]
    pub choices: Vec<ChoiceEdge>,

    /// Atmosphere of the scene (tense, mysterious, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,

    /// Concrete place the scene happens in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Prompt handed to an image-generation adapter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,

    /// Whether the scene may legally be re-entered by a cycle.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub revisitable: bool,
}

impl SceneNode {
    /// Create a new scene with the given ID and text.
    pub fn new(id: SceneId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            choices: Vec::new(),
            mood: None,
            location: None,
            image_prompt: None,
            revisitable: false,
        }
    }

    /// Append a choice edge.
    pub fn with_choice(mut self, choice: ChoiceEdge) -> Self {
        self.choices.push(choice);
        self
    }

    /// Set the scene mood.
    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Set the scene location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the image-generation prompt.
    pub fn with_image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    /// Mark the scene as legally re-enterable.
    pub fn with_revisitable(mut self, revisitable: bool) -> Self {
        self.revisitable = revisitable;
        self
    }

    /// IDs of scenes this node links to (ending edges excluded).
    pub fn scene_targets(&self) -> impl Iterator<Item = &SceneId> {
        self.choices.iter().filter_map(|c| c.target.scene_id())
    }

    /// A true leaf: no choices, or every choice concludes the branch.
    pub fn is_terminal(&self) -> bool {
        self.choices.iter().all(|c| c.target.is_ending())
    }

    /// Whether a branch can end at this node (leaf, or at least one
    /// ending choice).
    pub fn can_conclude(&self) -> bool {
        self.choices.is_empty() || self.choices.iter().any(|c| c.target.is_ending())
    }
}
