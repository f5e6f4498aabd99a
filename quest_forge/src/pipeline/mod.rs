//! The generation pipeline - from free text to a validated quest document.
//!
//! Stages: parse the scenario, sample genre material, expand the graph
//! through the planner, optionally infer choice logic, then consolidate.
//! Persistence is the caller's move (see [`crate::output::OutputFormatter`])
//! and only ever happens after consolidation, so an aborted run leaves
//! nothing behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::branching::BranchManager;
use crate::config::GenerationConfig;
use crate::error::ForgeError;
use crate::generation::SceneSource;
use crate::knowledge::{KnowledgeBase, SnippetRetriever};
use crate::logic::LogicEngine;
use crate::output::Quest;
use crate::planner::StoryPlanner;
use crate::scenario::ScenarioInput;

/// Cooperative cancellation for a generation run.
///
/// Cloneable; cancelling any clone aborts the run at the next level
/// boundary and the partial graph is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the run be abandoned.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// What a run cost and produced, beyond the quest itself.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Correlation ID for this run's log records.
    pub run_id: Uuid,

    /// Scenes in the final graph.
    pub scene_count: usize,

    /// Scenes substituted by the local fallback.
    pub fallback_scenes: usize,

    /// Near-duplicate scenes collapsed during consolidation.
    pub merged_scenes: usize,

    /// Wall-clock time for the whole run.
    pub elapsed: Duration,
}

/// The top-level generator: wires the planner, logic engine, and branch
/// manager over a scene source.
pub struct QuestForge {
    config: GenerationConfig,
    source: Arc<dyn SceneSource>,
    knowledge: Arc<KnowledgeBase>,
    retriever: Option<Arc<dyn SnippetRetriever>>,
}

impl QuestForge {
    /// Create a generator over the given scene source with the built-in
    /// knowledge packs.
    pub fn new(config: GenerationConfig, source: Arc<dyn SceneSource>) -> Result<Self, ForgeError> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            knowledge: Arc::new(KnowledgeBase::with_defaults()),
            retriever: None,
        })
    }

    /// Replace the knowledge base.
    pub fn with_knowledge(mut self, knowledge: KnowledgeBase) -> Self {
        self.knowledge = Arc::new(knowledge);
        self
    }

    /// Use an external snippet retriever instead of the built-in keyword
    /// scoring.
    pub fn with_retriever(mut self, retriever: Arc<dyn SnippetRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Generate a quest from free scenario text.
    pub async fn generate(
        &self,
        scenario_text: &str,
    ) -> Result<(Quest, GenerationReport), ForgeError> {
        self.generate_with_cancel(scenario_text, &CancelHandle::new())
            .await
    }

    /// Generate a quest, honoring the given cancel handle.
    pub async fn generate_with_cancel(
        &self,
        scenario_text: &str,
        cancel: &CancelHandle,
    ) -> Result<(Quest, GenerationReport), ForgeError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let scenario = ScenarioInput::parse(scenario_text);
        tracing::info!(
            %run_id,
            genre = %scenario.genre,
            depth = self.config.branching_depth,
            "starting quest generation"
        );

        let elements = {
            let mut rng = rand::thread_rng();
            self.knowledge.sample_elements(&scenario.genre, &mut rng)
        };

        let mut planner = StoryPlanner::new(Arc::clone(&self.source), self.config.clone());
        if let Some(retriever) = &self.retriever {
            planner = planner.with_retriever(Arc::clone(retriever));
        } else if self.config.use_retrieval {
            planner = planner.with_retriever(Arc::new(self.knowledge.retriever(&scenario.genre)));
        }

        let outcome = planner.build_graph(&scenario, &elements, cancel).await?;
        let mut graph = outcome.graph;
        tracing::info!(
            %run_id,
            scenes = graph.scene_count(),
            fallbacks = outcome.fallback_scenes,
            "graph expansion finished"
        );

        if cancel.is_cancelled() {
            return Err(ForgeError::Cancelled);
        }

        let logic = if self.config.enrich_logic {
            let engine = LogicEngine::new(Arc::clone(&self.knowledge));
            Some(engine.enrich(&mut graph, &scenario))
        } else {
            None
        };

        let mut quest = BranchManager::new(self.config.clone()).consolidate(graph, &scenario)?;
        quest.logic = logic;

        let report = GenerationReport {
            run_id,
            scene_count: quest.graph.scene_count(),
            fallback_scenes: outcome.fallback_scenes,
            merged_scenes: quest.metadata.merged_scenes,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            %run_id,
            scenes = report.scene_count,
            paths = quest.paths.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "quest generation finished"
        );

        Ok((quest, report))
    }
}
