//! Preconditions and effects attached to choices.

use serde::{Deserialize, Serialize};

use super::{LogicState, ObjectState, RelationKind};

/// A condition that must hold before a choice becomes available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Precondition {
    /// The object must be in the given state.
    InState { object: String, state: ObjectState },

    /// The object must carry the given relation.
    HasRelation {
        object: String,
        relation: RelationKind,
        target: String,
    },

    /// The object attribute must equal the given value.
    AttributeEquals {
        object: String,
        key: String,
        value: serde_json::Value,
    },
}

impl Precondition {
    /// Check whether the condition holds in the given state.
    ///
    /// A condition on a missing object never holds.
    pub fn check(&self, state: &LogicState) -> bool {
        match self {
            Precondition::InState { object, state: s } => state
                .object(object)
                .map(|o| o.state == *s)
                .unwrap_or(false),
            Precondition::HasRelation {
                object,
                relation,
                target,
            } => state
                .object(object)
                .map(|o| o.has_relation(*relation, target))
                .unwrap_or(false),
            Precondition::AttributeEquals { object, key, value } => state
                .object(object)
                .and_then(|o| o.attributes.get(key))
                .map(|v| v == value)
                .unwrap_or(false),
        }
    }
}

/// A mutation a choice applies to the world when taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Move the object to a new state.
    SetState { object: String, state: ObjectState },

    /// Add a relation to the object.
    AddRelation {
        object: String,
        relation: RelationKind,
        target: String,
    },

    /// Remove a relation from the object.
    RemoveRelation {
        object: String,
        relation: RelationKind,
        target: String,
    },

    /// Set an object attribute.
    SetAttribute {
        object: String,
        key: String,
        value: serde_json::Value,
    },
}

impl Effect {
    /// Apply the effect to the given state. Effects on missing objects are
    /// silently skipped.
    pub fn apply(&self, state: &mut LogicState) {
        match self {
            Effect::SetState { object, state: s } => {
                if let Some(obj) = state.object_mut(object) {
                    obj.state = *s;
                }
            }
            Effect::AddRelation {
                object,
                relation,
                target,
            } => {
                if let Some(obj) = state.object_mut(object) {
                    if !obj.has_relation(*relation, target) {
                        obj.relations.push(super::Relation::new(*relation, target.clone()));
                    }
                }
            }
            Effect::RemoveRelation {
                object,
                relation,
                target,
            } => {
                if let Some(obj) = state.object_mut(object) {
                    obj.relations
                        .retain(|r| !(r.kind == *relation && r.target == *target));
                }
            }
            Effect::SetAttribute { object, key, value } => {
                if let Some(obj) = state.object_mut(object) {
                    obj.attributes.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

/// The full logic payload of a choice: what it requires and what it does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChoiceLogic {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preconditions: Vec<Precondition>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
}

impl ChoiceLogic {
    /// Create an empty logic payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a precondition.
    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Add an effect.
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether all preconditions hold in the given state.
    pub fn is_available(&self, state: &LogicState) -> bool {
        self.preconditions.iter().all(|p| p.check(state))
    }

    /// Apply all effects to the given state.
    pub fn apply(&self, state: &mut LogicState) {
        for effect in &self.effects {
            effect.apply(state);
        }
    }
}
