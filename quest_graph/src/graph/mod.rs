//! The quest graph - an arena of scenes connected by choices.
//!
//! The graph stores nodes in a flat map keyed by [`SceneId`] rather than as
//! nested references, so revisitable scenes (cycles) never create ownership
//! problems. It provides the traversals the planner and validator need:
//! reachability, depth, inbound-edge counts, and pending-target accounting.

mod merge;
mod paths;
mod validate;

pub use merge::*;
pub use paths::*;
pub use validate::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::scene::{SceneId, SceneNode};

/// A branching quest: a set of scenes plus a designated root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestGraph {
    /// The entry scene.
    root: SceneId,

    /// All scenes, keyed by ID.
    nodes: HashMap<SceneId, SceneNode>,
}

impl QuestGraph {
    /// Create a graph rooted at the given scene.
    pub fn new(root: SceneNode) -> Self {
        let root_id = root.id.clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), root);
        Self {
            root: root_id,
            nodes,
        }
    }

    /// The root scene ID.
    pub fn root(&self) -> &SceneId {
        &self.root
    }

    /// Add a scene to the graph, returning its ID. Replaces any existing
    /// scene with the same ID.
    pub fn add_scene(&mut self, node: SceneNode) -> SceneId {
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        id
    }

    /// Remove a scene from the graph. The root cannot be removed.
    pub fn remove_scene(&mut self, id: &SceneId) -> Option<SceneNode> {
        if *id == self.root {
            return None;
        }
        self.nodes.remove(id)
    }

    /// Get a scene by ID.
    pub fn scene(&self, id: &SceneId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Get a mutable scene by ID.
    pub fn scene_mut(&mut self, id: &SceneId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Whether a scene exists in the graph.
    pub fn contains(&self, id: &SceneId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of scenes.
    pub fn scene_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all scenes.
    pub fn scenes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.values()
    }

    /// All scene IDs in sorted order.
    pub fn scene_ids(&self) -> Vec<&SceneId> {
        let mut ids: Vec<_> = self.nodes.keys().collect();
        ids.sort();
        ids
    }

    /// Edge targets that point at scenes not yet in the arena, in sorted
    /// order. A graph under construction has pending targets; a finished
    /// graph must have none.
    pub fn pending_targets(&self) -> Vec<SceneId> {
        let pending: BTreeSet<SceneId> = self
            .nodes
            .values()
            .flat_map(SceneNode::scene_targets)
            .filter(|id| !self.nodes.contains_key(*id))
            .cloned()
            .collect();
        pending.into_iter().collect()
    }

    /// All scenes reachable from the root by following choice edges.
    pub fn reachable(&self) -> HashSet<SceneId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([self.root.clone()]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                for target in node.scene_targets() {
                    if self.nodes.contains_key(target) && !seen.contains(target) {
                        queue.push_back(target.clone());
                    }
                }
            }
        }

        seen
    }

    /// Shortest distance from the root to each reachable scene, in edges.
    pub fn depth_map(&self) -> HashMap<SceneId, usize> {
        let mut depths = HashMap::from([(self.root.clone(), 0usize)]);
        let mut queue = VecDeque::from([self.root.clone()]);

        while let Some(id) = queue.pop_front() {
            let depth = depths[&id];
            if let Some(node) = self.nodes.get(&id) {
                for target in node.scene_targets() {
                    if self.nodes.contains_key(target) && !depths.contains_key(target) {
                        depths.insert(target.clone(), depth + 1);
                        queue.push_back(target.clone());
                    }
                }
            }
        }

        depths
    }

    /// The deepest reachable scene, in edges from the root.
    pub fn max_depth(&self) -> usize {
        self.depth_map().into_values().max().unwrap_or(0)
    }

    /// Number of inbound choice edges per scene.
    pub fn inbound_counts(&self) -> HashMap<SceneId, usize> {
        let mut counts: HashMap<SceneId, usize> =
            self.nodes.keys().map(|id| (id.clone(), 0)).collect();

        for node in self.nodes.values() {
            for target in node.scene_targets() {
                if let Some(count) = counts.get_mut(target) {
                    *count += 1;
                }
            }
        }

        counts
    }

    /// Number of branching points (scenes with more than one choice).
    pub fn branch_count(&self) -> usize {
        self.nodes.values().filter(|n| n.choices.len() > 1).count()
    }

    /// Serialize the graph to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a graph back from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ChoiceEdge, Ending};

    /// root -> a -> c, root -> b; b and c conclude.
    fn diamond_free_graph() -> QuestGraph {
        let root_id = SceneId::root();
        let a = root_id.child(1);
        let b = root_id.child(2);
        let c = a.child(1);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id, "You wake in a cold cell.")
                .with_choice(ChoiceEdge::to_scene("Pick the lock", a.clone()))
                .with_choice(ChoiceEdge::to_scene("Call the guard", b.clone())),
        );
        graph.add_scene(
            SceneNode::new(a.clone(), "The corridor is empty.")
                .with_choice(ChoiceEdge::to_scene("Sneak out", c.clone())),
        );
        graph.add_scene(
            SceneNode::new(b, "The guard laughs and walks off.")
                .with_choice(ChoiceEdge::to_ending("Wait for dawn", Ending::Failure)),
        );
        graph.add_scene(
            SceneNode::new(c, "Freedom at last.")
                .with_choice(ChoiceEdge::to_ending("Run", Ending::Success)),
        );
        graph
    }

    #[test]
    fn test_add_and_get_scene() {
        let graph = diamond_free_graph();
        assert_eq!(graph.scene_count(), 4);
        assert!(graph.contains(graph.root()));
        assert!(graph
            .scene(&SceneId::root().child(2))
            .unwrap()
            .text
            .contains("guard"));
    }

    #[test]
    fn test_pending_targets() {
        let root_id = SceneId::root();
        let mut graph = QuestGraph::new(
            SceneNode::new(root_id.clone(), "Start")
                .with_choice(ChoiceEdge::to_scene("Go", root_id.child(1)))
                .with_choice(ChoiceEdge::to_scene("Stay", root_id.child(2))),
        );

        assert_eq!(graph.pending_targets().len(), 2);

        graph.add_scene(SceneNode::new(root_id.child(1), "Gone"));
        let pending = graph.pending_targets();
        assert_eq!(pending, vec![root_id.child(2)]);
    }

    #[test]
    fn test_reachability_and_depth() {
        let mut graph = diamond_free_graph();
        assert_eq!(graph.reachable().len(), 4);

        // An island is not reachable.
        graph.add_scene(SceneNode::new(SceneId::new("island"), "Nobody comes here."));
        assert_eq!(graph.reachable().len(), 4);

        let depths = graph.depth_map();
        assert_eq!(depths[&SceneId::root()], 0);
        assert_eq!(depths[&SceneId::root().child(1)], 1);
        assert_eq!(depths[&SceneId::root().child(1).child(1)], 2);
        assert_eq!(graph.max_depth(), 2);
    }

    #[test]
    fn test_inbound_counts() {
        let graph = diamond_free_graph();
        let inbound = graph.inbound_counts();

        assert_eq!(inbound[&SceneId::root()], 0);
        assert_eq!(inbound[&SceneId::root().child(1)], 1);
        assert_eq!(inbound[&SceneId::root().child(2)], 1);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut graph = diamond_free_graph();
        let root = graph.root().clone();
        assert!(graph.remove_scene(&root).is_none());
        assert!(graph.contains(&root));
    }

    #[test]
    fn test_json_round_trip_identity() {
        let graph = diamond_free_graph();
        let json = graph.to_json().unwrap();
        let back = QuestGraph::from_json(&json).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn test_branch_count() {
        let graph = diamond_free_graph();
        assert_eq!(graph.branch_count(), 1);
    }
}
