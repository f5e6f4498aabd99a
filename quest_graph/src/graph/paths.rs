//! Path tracing - every way a player can walk the quest.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::QuestGraph;
use crate::scene::{ChoiceTarget, Ending, SceneId};

/// One walk from the root to a terminal point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryPath {
    /// Visited scene IDs, root first.
    pub scenes: Vec<SceneId>,

    /// Number of scenes on the path.
    pub length: usize,

    /// Whether this is the main (longest) path.
    pub is_main: bool,

    /// How the walk ends.
    pub outcome: Ending,
}

impl QuestGraph {
    /// Trace every root-to-terminal path.
    ///
    /// Cycles are walked at most once per path: a choice leading back into
    /// the current path terminates the walk there with a neutral outcome.
    /// The longest paths are flagged as main.
    pub fn trace_paths(&self) -> Vec<StoryPath> {
        let mut paths = Vec::new();
        let mut current = vec![self.root().clone()];
        let mut on_path: HashSet<SceneId> = HashSet::from([self.root().clone()]);
        self.walk(self.root(), &mut current, &mut on_path, &mut paths);

        let longest = paths.iter().map(|p| p.length).max().unwrap_or(0);
        for path in &mut paths {
            path.is_main = path.length == longest;
        }

        paths
    }

    fn walk(
        &self,
        at: &SceneId,
        current: &mut Vec<SceneId>,
        on_path: &mut HashSet<SceneId>,
        out: &mut Vec<StoryPath>,
    ) {
        let Some(node) = self.scene(at) else {
            return;
        };

        if node.choices.is_empty() {
            out.push(StoryPath {
                scenes: current.clone(),
                length: current.len(),
                is_main: false,
                outcome: Ending::Neutral,
            });
            return;
        }

        for choice in &node.choices {
            match &choice.target {
                ChoiceTarget::Ending(ending) => {
                    out.push(StoryPath {
                        scenes: current.clone(),
                        length: current.len(),
                        is_main: false,
                        outcome: *ending,
                    });
                }
                ChoiceTarget::Scene(next) => {
                    if !self.contains(next) {
                        // Dangling edge; validation reports it, tracing skips it.
                        continue;
                    }
                    if on_path.contains(next) {
                        // Cycle: end the walk here rather than looping.
                        out.push(StoryPath {
                            scenes: current.clone(),
                            length: current.len(),
                            is_main: false,
                            outcome: Ending::Neutral,
                        });
                        continue;
                    }

                    current.push(next.clone());
                    on_path.insert(next.clone());
                    self.walk(next, current, on_path, out);
                    on_path.remove(next);
                    current.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ChoiceEdge, SceneNode};

    #[test]
    fn test_linear_path() {
        let root_id = SceneId::root();
        let next = root_id.child(1);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id.clone(), "Start")
                .with_choice(ChoiceEdge::to_scene("Continue", next.clone())),
        );
        graph.add_scene(
            SceneNode::new(next, "Finish")
                .with_choice(ChoiceEdge::to_ending("Done", Ending::Success)),
        );

        let paths = graph.trace_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].length, 2);
        assert_eq!(paths[0].outcome, Ending::Success);
        assert!(paths[0].is_main);
    }

    #[test]
    fn test_branching_paths_and_main_flag() {
        let root_id = SceneId::root();
        let long_a = root_id.child(1);
        let long_b = long_a.child(1);
        let short = root_id.child(2);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id, "Fork")
                .with_choice(ChoiceEdge::to_scene("Scenic route", long_a.clone()))
                .with_choice(ChoiceEdge::to_scene("Shortcut", short.clone())),
        );
        graph.add_scene(
            SceneNode::new(long_a, "Halfway")
                .with_choice(ChoiceEdge::to_scene("Keep going", long_b.clone())),
        );
        graph.add_scene(
            SceneNode::new(long_b, "Summit")
                .with_choice(ChoiceEdge::to_ending("Plant the flag", Ending::Success)),
        );
        graph.add_scene(
            SceneNode::new(short, "Dead end")
                .with_choice(ChoiceEdge::to_ending("Give up", Ending::Failure)),
        );

        let paths = graph.trace_paths();
        assert_eq!(paths.len(), 2);

        let main: Vec<_> = paths.iter().filter(|p| p.is_main).collect();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].length, 3);
        assert_eq!(main[0].outcome, Ending::Success);

        let side = paths.iter().find(|p| !p.is_main).unwrap();
        assert_eq!(side.outcome, Ending::Failure);
    }

    #[test]
    fn test_cycle_terminates_walk() {
        let root_id = SceneId::root();
        let loop_scene = root_id.child(1);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id.clone(), "Hall of mirrors")
                .with_choice(ChoiceEdge::to_scene("Step in", loop_scene.clone())),
        );
        graph.add_scene(
            SceneNode::new(loop_scene, "Another mirror")
                .with_revisitable(true)
                .with_choice(ChoiceEdge::to_scene("Step back", root_id)),
        );

        let paths = graph.trace_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].length, 2);
        assert_eq!(paths[0].outcome, Ending::Neutral);
    }

    #[test]
    fn test_leaf_without_choices_is_neutral() {
        let root_id = SceneId::root();
        let leaf = root_id.child(1);

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id, "Start")
                .with_choice(ChoiceEdge::to_scene("Walk", leaf.clone())),
        );
        graph.add_scene(SceneNode::new(leaf, "The trail just stops."));

        let paths = graph.trace_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].outcome, Ending::Neutral);
    }
}
