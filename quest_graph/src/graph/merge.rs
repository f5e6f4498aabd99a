//! Duplicate-branch merging - collapsing scenes that converged on the same
//! content.
//!
//! Generation can produce sibling branches whose scenes read almost
//! identically. Merging works as follows:
//!
//! 1. **Group**: scenes are grouped by their depth from the root
//! 2. **Compare**: scene texts within a group are scored pairwise
//! 3. **Collapse**: pairs above the similarity threshold collapse into the
//!    lexicographically-first scene, and inbound edges are rewritten
//! 4. **Prune**: subtrees left unreachable by the collapse are removed

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::QuestGraph;
use crate::scene::{ChoiceTarget, SceneId};

/// Cosine similarity between the token-frequency vectors of two texts.
///
/// Case-insensitive; punctuation is stripped. Returns a value in `[0, 1]`,
/// where `1.0` means the texts use exactly the same words in the same
/// proportions.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let freq_a = token_frequencies(a);
    let freq_b = token_frequencies(b);

    if freq_a.is_empty() && freq_b.is_empty() {
        return 1.0;
    }
    if freq_a.is_empty() || freq_b.is_empty() {
        return 0.0;
    }

    let dot: f64 = freq_a
        .iter()
        .filter_map(|(token, count)| freq_b.get(token).map(|other| count * other))
        .sum();

    let norm_a: f64 = freq_a.values().map(|c| c * c).sum::<f64>().sqrt();
    let norm_b: f64 = freq_b.values().map(|c| c * c).sum::<f64>().sqrt();

    dot / (norm_a * norm_b)
}

fn token_frequencies(text: &str) -> HashMap<String, f64> {
    let mut freq = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *freq.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    freq
}

/// One collapsed pair: `removed` was folded into `into`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedPair {
    pub removed: SceneId,
    pub into: SceneId,
}

/// What a merge pass did to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MergeReport {
    /// Scenes collapsed into a surviving duplicate.
    pub merged: Vec<MergedPair>,

    /// Scenes removed because the collapse left them unreachable.
    pub pruned: Vec<SceneId>,
}

impl MergeReport {
    /// Whether the pass changed anything.
    pub fn is_empty(&self) -> bool {
        self.merged.is_empty() && self.pruned.is_empty()
    }
}

impl QuestGraph {
    /// Collapse near-duplicate scenes at the same depth.
    ///
    /// Scenes whose text similarity reaches `threshold` are merged into the
    /// lexicographically-first of the pair; all edges into the duplicate are
    /// redirected to the survivor and subtrees left unreachable are pruned.
    /// Deterministic for a given graph.
    pub fn merge_duplicates(&mut self, threshold: f64) -> MergeReport {
        let mut report = MergeReport::default();

        // Group scene IDs by depth, sorted within each group.
        let mut by_depth: BTreeMap<usize, Vec<SceneId>> = BTreeMap::new();
        for (id, depth) in self.depth_map() {
            by_depth.entry(depth).or_default().push(id);
        }

        let mut remap: HashMap<SceneId, SceneId> = HashMap::new();

        for ids in by_depth.values_mut() {
            ids.sort();
            for i in 0..ids.len() {
                if remap.contains_key(&ids[i]) {
                    continue;
                }
                for j in (i + 1)..ids.len() {
                    if remap.contains_key(&ids[j]) {
                        continue;
                    }
                    let similar = match (self.scene(&ids[i]), self.scene(&ids[j])) {
                        (Some(a), Some(b)) => text_similarity(&a.text, &b.text) >= threshold,
                        _ => false,
                    };
                    if similar {
                        remap.insert(ids[j].clone(), ids[i].clone());
                        report.merged.push(MergedPair {
                            removed: ids[j].clone(),
                            into: ids[i].clone(),
                        });
                    }
                }
            }
        }

        if remap.is_empty() {
            return report;
        }

        // Redirect every edge into a duplicate onto its survivor.
        for node in self.nodes.values_mut() {
            for choice in &mut node.choices {
                let survivor = match &choice.target {
                    ChoiceTarget::Scene(target) => remap.get(target).cloned(),
                    ChoiceTarget::Ending(_) => None,
                };
                if let Some(survivor) = survivor {
                    choice.target = ChoiceTarget::Scene(survivor);
                }
            }
        }

        for removed in remap.keys() {
            self.remove_scene(removed);
        }

        // Drop whatever the collapse disconnected.
        let reachable = self.reachable();
        let unreachable: Vec<SceneId> = self
            .scene_ids()
            .into_iter()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        for id in &unreachable {
            self.remove_scene(id);
        }
        report.pruned = unreachable;

        report
    }
}
