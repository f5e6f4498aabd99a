//! Structured game logic - objects, states, and relations.
//!
//! Models the Story2Game-style logic layer: every interactable thing in a
//! quest is a [`GameObject`] with a state and relations, and choices can
//! carry [`ChoiceLogic`] describing what they require and what they change.

mod action;

pub use action::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Possible states of game objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectState {
    Exists,
    Destroyed,
    Open,
    Closed,
    Locked,
    Unlocked,
    Active,
    Inactive,
    Taken,
    Dropped,
}

/// Kinds of relations between objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Object is located somewhere.
    At,
    /// Character possesses an item.
    Has,
    /// Character knows a piece of information.
    Knows,
    /// Object blocks a path.
    Blocks,
    /// Action requires an object.
    Requires,
    /// Object opens another object.
    Unlocks,
}

/// Broad classification of game objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Item,
    Character,
    Location,
    Information,
}

/// A directed relation from the owning object to a target object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: String,
}

impl Relation {
    pub fn new(kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

/// An interactable object with state, relations, and free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    pub id: String,
    pub name: String,
    pub kind: ObjectKind,
    pub state: ObjectState,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl GameObject {
    /// Create a new object in the `Exists` state.
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            state: ObjectState::Exists,
            relations: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Set the initial state.
    pub fn with_state(mut self, state: ObjectState) -> Self {
        self.state = state;
        self
    }

    /// Add a relation to another object.
    pub fn with_relation(mut self, kind: RelationKind, target: impl Into<String>) -> Self {
        self.relations.push(Relation::new(kind, target));
        self
    }

    /// Set a free-form attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Check whether this object carries the given relation.
    pub fn has_relation(&self, kind: RelationKind, target: &str) -> bool {
        self.relations
            .iter()
            .any(|r| r.kind == kind && r.target == target)
    }
}

/// The logical state of the quest world: all objects and what has happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LogicState {
    /// All objects, keyed by ID.
    pub objects: HashMap<String, GameObject>,

    /// Ordered record of applied action IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<String>,
}

impl LogicState {
    /// Create a new empty logic state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object, returning its ID.
    pub fn add_object(&mut self, object: GameObject) -> String {
        let id = object.id.clone();
        self.objects.insert(id.clone(), object);
        id
    }

    /// Get an object by ID.
    pub fn object(&self, id: &str) -> Option<&GameObject> {
        self.objects.get(id)
    }

    /// Get a mutable object by ID.
    pub fn object_mut(&mut self, id: &str) -> Option<&mut GameObject> {
        self.objects.get_mut(id)
    }

    /// All objects of a given kind.
    pub fn objects_of_kind(&self, kind: ObjectKind) -> Vec<&GameObject> {
        self.objects.values().filter(|o| o.kind == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_builder() {
        let key = GameObject::new("rusty_key", "Rusty Key", ObjectKind::Item)
            .with_relation(RelationKind::At, "cellar")
            .with_relation(RelationKind::Unlocks, "iron_door");

        assert_eq!(key.state, ObjectState::Exists);
        assert!(key.has_relation(RelationKind::At, "cellar"));
        assert!(key.has_relation(RelationKind::Unlocks, "iron_door"));
        assert!(!key.has_relation(RelationKind::Has, "cellar"));
    }

    #[test]
    fn test_logic_state_lookup() {
        let mut state = LogicState::new();
        state.add_object(GameObject::new("hero", "Hero", ObjectKind::Character));
        state.add_object(GameObject::new("sword", "Sword", ObjectKind::Item));
        state.add_object(GameObject::new("cellar", "Cellar", ObjectKind::Location));

        assert!(state.object("hero").is_some());
        assert!(state.object("dragon").is_none());
        assert_eq!(state.objects_of_kind(ObjectKind::Item).len(), 1);
    }
}
