//! Story Planner - iterative expansion of the quest graph.
//!
//! The planner grows the graph level by level:
//!
//! 1. **Draft**: every open scene at the current depth is drafted through
//!    the scene source, siblings concurrently under a permit bound
//! 2. **Realize**: drafts become scene nodes; writes to the shared graph
//!    happen serially after the level joins
//! 3. **Extend**: each accepted choice creates a placeholder target for the
//!    next level
//! 4. **Close**: at the depth limit, or when a draft concludes, the branch
//!    is sealed with an ending edge
//!
//! Every placeholder created at one level is drafted at the next, so a
//! finished graph has no pending targets by construction.

use quest_graph::{ChoiceEdge, Ending, QuestGraph, SceneId, SceneNode};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::GenerationConfig;
use crate::error::ForgeError;
use crate::generation::{
    draft_with_retries, fallback_draft, RetryPolicy, SceneDraft, ScenePrompt, SceneSource,
};
use crate::knowledge::{GenreElements, SnippetRetriever};
use crate::pipeline::CancelHandle;
use crate::scenario::ScenarioInput;

/// A finished expansion: the graph plus what it cost to build.
#[derive(Debug)]
pub struct PlannerOutcome {
    pub graph: QuestGraph,
    /// Scenes that had to be invented locally after retries ran out.
    pub fallback_scenes: usize,
}

/// Drives iterative expansion of a quest graph up to the configured depth.
pub struct StoryPlanner {
    source: Arc<dyn SceneSource>,
    retriever: Option<Arc<dyn SnippetRetriever>>,
    config: GenerationConfig,
}

impl StoryPlanner {
    /// Create a planner over the given scene source.
    pub fn new(source: Arc<dyn SceneSource>, config: GenerationConfig) -> Self {
        Self {
            source,
            retriever: None,
            config,
        }
    }

    /// Attach a snippet retriever for prompt context.
    pub fn with_retriever(mut self, retriever: Arc<dyn SnippetRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Build the full graph for a scenario.
    ///
    /// Aborts with [`ForgeError::Cancelled`] between levels when the cancel
    /// handle fires; the partial graph is dropped.
    pub async fn build_graph(
        &self,
        scenario: &ScenarioInput,
        elements: &GenreElements,
        cancel: &CancelHandle,
    ) -> Result<PlannerOutcome, ForgeError> {
        let policy = RetryPolicy::from(&self.config);
        let mut fallback_scenes = 0usize;
        let mut graph: Option<QuestGraph> = None;

        // Open scenes awaiting content, with the text that leads into them.
        let mut frontier: Vec<(SceneId, Option<String>)> = vec![(SceneId::root(), None)];

        for depth in 0..=self.config.branching_depth {
            if frontier.is_empty() {
                break;
            }
            if cancel.is_cancelled() {
                return Err(ForgeError::Cancelled);
            }

            tracing::debug!(depth, open_scenes = frontier.len(), "expanding level");

            let drafts = self
                .draft_level(scenario, elements, &frontier, &policy, depth)
                .await?;

            let mut next_frontier = Vec::new();
            for (id, draft, used_fallback) in drafts {
                if used_fallback {
                    fallback_scenes += 1;
                }
                let node = self.realize_scene(&id, draft, depth, &mut next_frontier);
                match &mut graph {
                    None => graph = Some(QuestGraph::new(node)),
                    Some(g) => {
                        g.add_scene(node);
                    }
                }
            }
            frontier = next_frontier;
        }

        let graph = graph.ok_or_else(|| ForgeError::Generation {
            scene: SceneId::root(),
            reason: "no scenes were generated".to_owned(),
        })?;

        Ok(PlannerOutcome {
            graph,
            fallback_scenes,
        })
    }

    /// Draft every open scene at one depth, siblings concurrently.
    async fn draft_level(
        &self,
        scenario: &ScenarioInput,
        elements: &GenreElements,
        frontier: &[(SceneId, Option<String>)],
        policy: &RetryPolicy,
        depth: usize,
    ) -> Result<Vec<(SceneId, SceneDraft, bool)>, ForgeError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_scenes));
        let mut tasks = JoinSet::new();

        for (id, previous) in frontier.iter().cloned() {
            let source = Arc::clone(&self.source);
            let retriever = self.retriever.clone();
            let semaphore = Arc::clone(&semaphore);
            let policy = policy.clone();
            let scenario = scenario.clone();
            let elements = elements.clone();
            let stage = stage_for_depth(depth, self.config.branching_depth);
            let max_choices = self.config.choices_per_scene;
            let want_image_prompt = self.config.request_image_prompts;
            let use_retrieval = self.config.use_retrieval;
            let top_k = self.config.retrieval_top_k;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                let snippets = match &retriever {
                    Some(retriever) if use_retrieval => {
                        let query = format!("{} {} {}", scenario.genre, stage, scenario.goal);
                        match retriever.retrieve(&query, top_k).await {
                            Ok(snippets) => snippets,
                            Err(err) => {
                                tracing::warn!(
                                    scene = %id,
                                    error = %err,
                                    "snippet retrieval failed, drafting without context"
                                );
                                Vec::new()
                            }
                        }
                    }
                    _ => Vec::new(),
                };

                let prompt = ScenePrompt {
                    scene_id: id.clone(),
                    stage,
                    scenario,
                    elements,
                    snippets,
                    previous_text: previous,
                    max_choices,
                    want_image_prompt,
                };

                match draft_with_retries(source.as_ref(), &prompt, &policy).await {
                    Ok(draft) => (id, draft, false),
                    Err(err) => {
                        tracing::warn!(
                            scene = %id,
                            error = %err,
                            "retries exhausted, substituting fallback scene"
                        );
                        let draft = fallback_draft(&prompt);
                        (id, draft, true)
                    }
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => {
                    return Err(ForgeError::Generation {
                        scene: SceneId::root(),
                        reason: format!("scene task failed: {err}"),
                    })
                }
            }
        }

        // Serialize writes in a stable order.
        results.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(results)
    }

    /// Turn a draft into a node, queueing placeholder targets for the next
    /// level or sealing the branch.
    fn realize_scene(
        &self,
        id: &SceneId,
        draft: SceneDraft,
        depth: usize,
        next_frontier: &mut Vec<(SceneId, Option<String>)>,
    ) -> SceneNode {
        let mut node = SceneNode::new(id.clone(), draft.text);
        if let Some(mood) = draft.mood {
            node = node.with_mood(mood);
        }
        if let Some(location) = draft.location {
            node = node.with_location(location);
        }
        if let Some(image_prompt) = draft.image_prompt {
            node = node.with_image_prompt(image_prompt);
        }

        let at_depth_limit = depth == self.config.branching_depth;
        let concludes = draft.conclude.is_some() || draft.choices.is_empty();

        if at_depth_limit || concludes {
            let ending = draft.conclude.unwrap_or(Ending::Neutral);
            let text = draft
                .choices
                .into_iter()
                .next()
                .unwrap_or_else(|| "Bring the story to its close".to_owned());
            node = node.with_choice(ChoiceEdge::to_ending(text, ending));
        } else {
            for (index, choice_text) in draft
                .choices
                .into_iter()
                .take(self.config.choices_per_scene)
                .enumerate()
            {
                let child = id.child(index + 1);
                node = node.with_choice(ChoiceEdge::to_scene(choice_text, child.clone()));
                next_frontier.push((child, Some(node.text.clone())));
            }
        }

        node
    }
}

/// Narrative stage hint for a depth level.
fn stage_for_depth(depth: usize, max_depth: usize) -> String {
    let stage = if depth == 0 {
        "opening"
    } else if depth == max_depth {
        "resolution"
    } else if depth + 1 == max_depth {
        "climax"
    } else {
        "development"
    };
    stage.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use async_trait::async_trait;
    use quest_graph::ValidationConfig;

    /// Source that drafts a distinct scene per ID with two choices.
    struct ScriptedSource;

    #[async_trait]
    impl SceneSource for ScriptedSource {
        async fn draft_scene(&self, prompt: &ScenePrompt) -> Result<SceneDraft, SourceError> {
            Ok(SceneDraft::new(
                format!("Scene {} in the {}.", prompt.scene_id, prompt.stage),
                vec!["Go left".to_owned(), "Go right".to_owned()],
            ))
        }
    }

    /// Source that always fails.
    struct DeadSource;

    #[async_trait]
    impl SceneSource for DeadSource {
        async fn draft_scene(&self, _prompt: &ScenePrompt) -> Result<SceneDraft, SourceError> {
            Err(SourceError::Unavailable("no route to host".to_owned()))
        }
    }

    /// Source that concludes every scene immediately.
    struct AbruptSource;

    #[async_trait]
    impl SceneSource for AbruptSource {
        async fn draft_scene(&self, _prompt: &ScenePrompt) -> Result<SceneDraft, SourceError> {
            Ok(SceneDraft::concluding(
                "It ends before it begins.",
                Ending::Failure,
            ))
        }
    }

    fn test_config(depth: usize, choices: usize) -> GenerationConfig {
        GenerationConfig {
            branching_depth: depth,
            choices_per_scene: choices,
            max_retries: 1,
            retry_base_delay_ms: 0,
            use_retrieval: false,
            ..GenerationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_depth_two_two_choices_bounds_node_count() {
        let planner = StoryPlanner::new(Arc::new(ScriptedSource), test_config(2, 2));
        let scenario = ScenarioInput::new("fantasy", "a scout", "map the valley");

        let outcome = planner
            .build_graph(&scenario, &GenreElements::default(), &CancelHandle::new())
            .await
            .unwrap();

        // 1 + 2 + 4 scenes, no placeholders left open.
        assert_eq!(outcome.graph.scene_count(), 7);
        assert!(outcome.graph.pending_targets().is_empty());
        assert_eq!(outcome.graph.max_depth(), 2);
        assert_eq!(outcome.fallback_scenes, 0);
        assert!(outcome
            .graph
            .validate(&ValidationConfig::with_max_depth(2))
            .is_ok());
    }

    #[tokio::test]
    async fn test_child_ids_follow_parent() {
        let planner = StoryPlanner::new(Arc::new(ScriptedSource), test_config(1, 2));
        let scenario = ScenarioInput::new("fantasy", "a scout", "map the valley");

        let outcome = planner
            .build_graph(&scenario, &GenreElements::default(), &CancelHandle::new())
            .await
            .unwrap();

        let root = outcome.graph.scene(outcome.graph.root()).unwrap();
        let targets: Vec<_> = root.scene_targets().map(SceneId::as_str).collect();
        assert_eq!(targets, vec!["scene_1_1", "scene_1_2"]);
    }

    #[tokio::test]
    async fn test_dead_source_falls_back_everywhere() {
        let planner = StoryPlanner::new(Arc::new(DeadSource), test_config(1, 2));
        let scenario = ScenarioInput::new("horror", "a caretaker", "lock the gates");

        let outcome = planner
            .build_graph(&scenario, &GenreElements::default(), &CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(outcome.fallback_scenes, outcome.graph.scene_count());
        assert!(outcome
            .graph
            .validate(&ValidationConfig::with_max_depth(1))
            .is_ok());
    }

    #[tokio::test]
    async fn test_concluding_draft_seals_branch_early() {
        let planner = StoryPlanner::new(Arc::new(AbruptSource), test_config(3, 2));
        let scenario = ScenarioInput::new("fantasy", "a scout", "map the valley");

        let outcome = planner
            .build_graph(&scenario, &GenreElements::default(), &CancelHandle::new())
            .await
            .unwrap();

        assert_eq!(outcome.graph.scene_count(), 1);
        let root = outcome.graph.scene(outcome.graph.root()).unwrap();
        assert!(root.is_terminal());

        let paths = outcome.graph.trace_paths();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].outcome, Ending::Failure);
    }

    #[tokio::test]
    async fn test_cancellation_discards_run() {
        let planner = StoryPlanner::new(Arc::new(ScriptedSource), test_config(2, 2));
        let scenario = ScenarioInput::new("fantasy", "a scout", "map the valley");

        let cancel = CancelHandle::new();
        cancel.cancel();

        let result = planner
            .build_graph(&scenario, &GenreElements::default(), &cancel)
            .await;
        assert!(matches!(result, Err(ForgeError::Cancelled)));
    }
}
