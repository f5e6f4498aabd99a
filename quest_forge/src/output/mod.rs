//! The quest document - what a finished run persists.

use quest_graph::{LogicState, QuestGraph, StoryPath};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ForgeError;

/// Summary facts recorded alongside a consolidated quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QuestMetadata {
    /// Non-fatal findings from consolidation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Scenes offering more than one choice.
    pub branch_count: usize,

    /// Deepest scene, in edges from the root.
    pub max_depth: usize,

    /// Near-duplicate scenes collapsed during consolidation.
    pub merged_scenes: usize,
}

/// A complete, validated quest ready for play or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub title: String,
    pub genre: String,
    pub hero: String,
    pub goal: String,

    /// The validated scene graph.
    pub graph: QuestGraph,

    /// Every traced root-to-terminal path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<StoryPath>,

    pub metadata: QuestMetadata,

    /// Initial world logic, when logic enrichment ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<LogicState>,
}

impl Quest {
    /// Parse a quest back from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, ForgeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a quest document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForgeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Serializes quest documents, pretty by default.
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    pretty: bool,
}

impl Default for OutputFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl OutputFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Render a quest to JSON.
    pub fn to_json(&self, quest: &Quest) -> Result<String, ForgeError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(quest)?
        } else {
            serde_json::to_string(quest)?
        };
        Ok(json)
    }

    /// Persist a quest document to disk. Nothing is written if
    /// serialization fails.
    pub fn write(&self, quest: &Quest, path: impl AsRef<Path>) -> Result<(), ForgeError> {
        let json = self.to_json(quest)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
