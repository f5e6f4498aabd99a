//! Scene definitions - the narrative units of a quest.

mod node;

pub use node::*;

use serde::{Deserialize, Serialize};

/// Unique identifier for scenes within a quest graph.
///
/// Scene IDs are compact strings (`scene_1`, `scene_1_2`, ...) so the
/// persisted JSON stays human-readable. The reserved ending identifiers
/// (`end`, `game_over`, `victory`) are never valid scene IDs; they
/// deserialize as [`ChoiceTarget::Ending`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    /// Create a scene ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The conventional root scene ID.
    pub fn root() -> Self {
        Self("scene_1".to_owned())
    }

    /// Derive the ID of the `index`-th child scene (1-based).
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}_{}", self.0, index))
    }

    /// View the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal outcomes a quest branch can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ending {
    /// The hero achieved the goal.
    Success,
    /// The hero failed or died.
    Failure,
    /// The story concluded without a clear win or loss.
    Neutral,
}

impl Ending {
    /// The reserved identifier this ending serializes to in choice targets.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ending::Success => "victory",
            Ending::Failure => "game_over",
            Ending::Neutral => "end",
        }
    }

    /// Parse a reserved ending identifier.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "victory" => Some(Ending::Success),
            "game_over" => Some(Ending::Failure),
            "end" => Some(Ending::Neutral),
            _ => None,
        }
    }
}

impl std::fmt::Display for Ending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a choice leads: another scene, or out of the quest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChoiceTarget {
    /// Transition to a scene in the same graph.
    Scene(SceneId),
    /// Terminate the branch with the given ending.
    Ending(Ending),
}

impl ChoiceTarget {
    /// Create a scene target.
    pub fn scene(id: impl Into<String>) -> Self {
        ChoiceTarget::Scene(SceneId::new(id))
    }

    /// The scene ID if this target points at a scene.
    pub fn scene_id(&self) -> Option<&SceneId> {
        match self {
            ChoiceTarget::Scene(id) => Some(id),
            ChoiceTarget::Ending(_) => None,
        }
    }

    /// Whether this target terminates the branch.
    pub fn is_ending(&self) -> bool {
        matches!(self, ChoiceTarget::Ending(_))
    }

    /// The identifier written to the `next_scene` field.
    pub fn as_str(&self) -> &str {
        match self {
            ChoiceTarget::Scene(id) => id.as_str(),
            ChoiceTarget::Ending(e) => e.as_str(),
        }
    }
}

impl std::fmt::Display for ChoiceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Targets persist as the bare `next_scene` string; the reserved ending
// identifiers are recognized on the way back in.
impl Serialize for ChoiceTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChoiceTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match Ending::from_str(&raw) {
            Some(ending) => ChoiceTarget::Ending(ending),
            None => ChoiceTarget::Scene(SceneId::new(raw)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_id_children() {
        let root = SceneId::root();
        assert_eq!(root.as_str(), "scene_1");
        assert_eq!(root.child(2).as_str(), "scene_1_2");
        assert_eq!(root.child(1).child(3).as_str(), "scene_1_1_3");
    }

    #[test]
    fn test_ending_round_trip() {
        for ending in [Ending::Success, Ending::Failure, Ending::Neutral] {
            assert_eq!(Ending::from_str(ending.as_str()), Some(ending));
        }
        assert_eq!(Ending::from_str("scene_1"), None);
    }

    #[test]
    fn test_target_serialization() {
        let scene: ChoiceTarget = serde_json::from_str("\"scene_1_2\"").unwrap();
        assert_eq!(scene, ChoiceTarget::scene("scene_1_2"));

        let ending: ChoiceTarget = serde_json::from_str("\"game_over\"").unwrap();
        assert_eq!(ending, ChoiceTarget::Ending(Ending::Failure));

        assert_eq!(serde_json::to_string(&ending).unwrap(), "\"game_over\"");
    }
}
