//! Structural validation - the integrity checks a finished graph must pass.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::QuestGraph;
use crate::scene::{ChoiceTarget, SceneId};

/// Limits a finished graph is validated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum distance from the root, in edges.
    pub max_depth: usize,
}

impl ValidationConfig {
    /// Validate against the given depth limit.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_depth: 3 }
    }
}

/// A specific integrity violation found in a quest graph.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Violation {
    /// A choice points at a scene that does not exist.
    #[error("scene {from} has a choice leading to missing scene {target}")]
    DanglingEdge { from: SceneId, target: SceneId },

    /// A non-root scene has no inbound choice edges.
    #[error("scene {0} has no inbound choices")]
    OrphanNode(SceneId),

    /// A scene cannot be reached from the root.
    #[error("scene {0} is unreachable from the root")]
    Unreachable(SceneId),

    /// A scene sits deeper than the configured limit.
    #[error("scene {id} is at depth {depth}, deeper than the limit of {max}")]
    DepthExceeded {
        id: SceneId,
        depth: usize,
        max: usize,
    },

    /// A choice closes a cycle onto a scene not marked revisitable.
    #[error("scene {from} re-enters {to}, which is not marked revisitable")]
    IllegalCycle { from: SceneId, to: SceneId },

    /// No reachable scene lets the story conclude.
    #[error("no reachable scene can conclude the story")]
    NoTerminal,
}

impl QuestGraph {
    /// Check every structural invariant of a finished graph.
    ///
    /// Returns all violations found rather than stopping at the first, so a
    /// caller can report the complete list.
    pub fn validate(&self, config: &ValidationConfig) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();

        // (a) every edge target resolves.
        for id in self.scene_ids() {
            let Some(node) = self.scene(id) else { continue };
            for choice in &node.choices {
                if let ChoiceTarget::Scene(target) = &choice.target {
                    if !self.contains(target) {
                        violations.push(Violation::DanglingEdge {
                            from: id.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        // (b) every non-root scene has an inbound edge, and is reachable.
        let inbound = self.inbound_counts();
        let reachable = self.reachable();
        for id in self.scene_ids() {
            if id == self.root() {
                continue;
            }
            if inbound.get(id).copied().unwrap_or(0) == 0 {
                violations.push(Violation::OrphanNode(id.clone()));
            }
            if !reachable.contains(id) {
                violations.push(Violation::Unreachable(id.clone()));
            }
        }

        // (c) depth limit.
        let depths = self.depth_map();
        let mut deep: Vec<_> = depths
            .iter()
            .filter(|(_, depth)| **depth > config.max_depth)
            .collect();
        deep.sort();
        for (id, depth) in deep {
            violations.push(Violation::DepthExceeded {
                id: id.clone(),
                depth: *depth,
                max: config.max_depth,
            });
        }

        // (d) cycles only onto revisitable scenes. A depth-first walk from
        // the root re-enters a scene exactly where a player could; every
        // such re-entry point must be marked revisitable.
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        self.check_cycles(self.root(), &mut visited, &mut on_stack, &mut violations);

        // (e) the story can end somewhere.
        let has_terminal = reachable
            .iter()
            .filter_map(|id| self.scene(id))
            .any(|node| node.can_conclude());
        if !has_terminal {
            violations.push(Violation::NoTerminal);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    fn check_cycles(
        &self,
        at: &SceneId,
        visited: &mut HashSet<SceneId>,
        on_stack: &mut HashSet<SceneId>,
        violations: &mut Vec<Violation>,
    ) {
        visited.insert(at.clone());
        on_stack.insert(at.clone());

        if let Some(node) = self.scene(at) {
            for target in node.scene_targets() {
                if !self.contains(target) {
                    continue;
                }
                if on_stack.contains(target) {
                    let revisitable = self.scene(target).map(|n| n.revisitable).unwrap_or(false);
                    if !revisitable {
                        violations.push(Violation::IllegalCycle {
                            from: at.clone(),
                            to: target.clone(),
                        });
                    }
                } else if !visited.contains(target) {
                    self.check_cycles(target, visited, on_stack, violations);
                }
            }
        }

        on_stack.remove(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ChoiceEdge, Ending, SceneNode};

    fn valid_graph() -> QuestGraph {
        let root_id = SceneId::root();
        let a = root_id.child(1);
        let b = root_id.child(2);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id, "A storm drives you into the lighthouse.")
                .with_choice(ChoiceEdge::to_scene("Climb the stairs", a.clone()))
                .with_choice(ChoiceEdge::to_scene("Search the cellar", b.clone())),
        );
        graph.add_scene(
            SceneNode::new(a, "The lamp room is empty.")
                .with_choice(ChoiceEdge::to_ending("Light the lamp", Ending::Success)),
        );
        graph.add_scene(
            SceneNode::new(b, "Water is rising fast.")
                .with_choice(ChoiceEdge::to_ending("Flee", Ending::Failure)),
        );
        graph
    }

    #[test]
    fn test_valid_graph_passes() {
        let graph = valid_graph();
        assert!(graph.validate(&ValidationConfig::with_max_depth(2)).is_ok());
    }

    #[test]
    fn test_dangling_edge_reported() {
        let mut graph = valid_graph();
        let a = SceneId::root().child(1);
        graph
            .scene_mut(&a)
            .unwrap()
            .choices
            .push(ChoiceEdge::to_scene("Jump", SceneId::new("nowhere")));

        let violations = graph
            .validate(&ValidationConfig::with_max_depth(2))
            .unwrap_err();
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::DanglingEdge { target, .. } if target.as_str() == "nowhere"
        )));
    }

    #[test]
    fn test_orphan_and_unreachable_reported() {
        let mut graph = valid_graph();
        graph.add_scene(SceneNode::new(SceneId::new("island"), "Forgotten."));

        let violations = graph
            .validate(&ValidationConfig::with_max_depth(2))
            .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::OrphanNode(id) if id.as_str() == "island")));
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::Unreachable(id) if id.as_str() == "island")));
    }

    #[test]
    fn test_depth_overflow_reported() {
        let graph = valid_graph();
        let violations = graph
            .validate(&ValidationConfig::with_max_depth(0))
            .unwrap_err();

        let deep: Vec<_> = violations
            .iter()
            .filter(|v| matches!(v, Violation::DepthExceeded { .. }))
            .collect();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_cycle_requires_revisitable() {
        let root_id = SceneId::root();
        let loop_scene = root_id.child(1);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id.clone(), "Foyer")
                .with_choice(ChoiceEdge::to_scene("Enter", loop_scene.clone()))
                .with_choice(ChoiceEdge::to_ending("Leave", Ending::Neutral)),
        );
        graph.add_scene(
            SceneNode::new(loop_scene.clone(), "Gallery")
                .with_choice(ChoiceEdge::to_scene("Return to foyer", root_id.clone())),
        );

        let violations = graph
            .validate(&ValidationConfig::with_max_depth(2))
            .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::IllegalCycle { to, .. } if *to == root_id)));

        // Marking the re-entered scene revisitable clears the violation.
        graph.scene_mut(&root_id).unwrap().revisitable = true;
        assert!(graph.validate(&ValidationConfig::with_max_depth(2)).is_ok());
    }

    #[test]
    fn test_no_terminal_reported() {
        let root_id = SceneId::root();
        let a = root_id.child(1);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id.clone(), "Stairs down")
                .with_revisitable(true)
                .with_choice(ChoiceEdge::to_scene("Descend", a.clone())),
        );
        graph.add_scene(
            SceneNode::new(a, "Stairs up")
                .with_choice(ChoiceEdge::to_scene("Ascend", root_id)),
        );

        let violations = graph
            .validate(&ValidationConfig::with_max_depth(2))
            .unwrap_err();
        assert!(violations.contains(&Violation::NoTerminal));
    }
}
