//! Branch Manager - consolidation of a finished graph into a quest.
//!
//! Consolidation merges near-duplicate branches, checks every structural
//! invariant, traces the story paths, and assembles the final document.
//! Validation failures fail the run closed unless `best_effort` is set, in
//! which case they are demoted to warnings.

use quest_graph::{QuestGraph, ValidationConfig};

use crate::config::GenerationConfig;
use crate::error::ForgeError;
use crate::output::{Quest, QuestMetadata};
use crate::scenario::ScenarioInput;

/// Validates and assembles completed quest graphs.
pub struct BranchManager {
    config: GenerationConfig,
}

impl BranchManager {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    /// Consolidate a finished graph into a quest document.
    pub fn consolidate(
        &self,
        mut graph: QuestGraph,
        scenario: &ScenarioInput,
    ) -> Result<Quest, ForgeError> {
        let mut warnings = Vec::new();
        let mut merged_scenes = 0;

        if self.config.merge_duplicates {
            let report = graph.merge_duplicates(self.config.merge_threshold);
            merged_scenes = report.merged.len();
            for pair in &report.merged {
                warnings.push(format!(
                    "merged near-duplicate scene {} into {}",
                    pair.removed, pair.into
                ));
            }
            for id in &report.pruned {
                warnings.push(format!("pruned unreachable scene {id}"));
            }
            if !report.is_empty() {
                tracing::info!(
                    merged = report.merged.len(),
                    pruned = report.pruned.len(),
                    "collapsed duplicate branches"
                );
            }
        }

        let limits = ValidationConfig::with_max_depth(self.config.branching_depth);
        if let Err(violations) = graph.validate(&limits) {
            if self.config.best_effort {
                tracing::warn!(
                    count = violations.len(),
                    "emitting best-effort quest despite violations"
                );
                warnings.extend(violations.iter().map(ToString::to_string));
            } else {
                tracing::error!(count = violations.len(), "quest failed validation");
                return Err(ForgeError::Validation(violations));
            }
        }

        let paths = graph.trace_paths();
        let metadata = QuestMetadata {
            warnings,
            branch_count: graph.branch_count(),
            max_depth: graph.max_depth(),
            merged_scenes,
        };

        tracing::info!(
            scenes = graph.scene_count(),
            paths = paths.len(),
            "quest consolidated"
        );

        Ok(Quest {
            title: quest_title(scenario),
            genre: scenario.genre.clone(),
            hero: scenario.hero.clone(),
            goal: scenario.goal.clone(),
            graph,
            paths,
            metadata,
            logic: None,
        })
    }
}

/// Derive a display title from the scenario goal.
fn quest_title(scenario: &ScenarioInput) -> String {
    let goal: String = scenario.goal.chars().take(50).collect();
    format!("Quest: {goal}")
}
