//! Scenario input - extracting quest parameters from free text.

use serde::{Deserialize, Serialize};

/// The parsed premise of a quest: who, what, and in which world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInput {
    /// Genre of the quest (lowercased).
    pub genre: String,

    /// Description of the protagonist.
    pub hero: String,

    /// What the protagonist is trying to achieve.
    pub goal: String,
}

/// Label aliases recognized for each field, checked in order.
const GENRE_LABELS: &[&str] = &["genre", "setting", "style"];
const HERO_LABELS: &[&str] = &["hero", "protagonist", "main character", "character"];
const GOAL_LABELS: &[&str] = &["goal", "objective", "mission", "task"];

impl ScenarioInput {
    /// Create a scenario from explicit parts.
    pub fn new(
        genre: impl Into<String>,
        hero: impl Into<String>,
        goal: impl Into<String>,
    ) -> Self {
        Self {
            genre: genre.into().trim().to_lowercase(),
            hero: hero.into().trim().to_owned(),
            goal: goal.into().trim().to_owned(),
        }
    }

    /// Extract a scenario from free text.
    ///
    /// Lines of the form `Label: value` fill the matching field; the first
    /// match per field wins. Text with no recognized labels is treated as
    /// the goal in its entirety. Missing fields fall back to defaults.
    pub fn parse(text: &str) -> Self {
        let mut genre = None;
        let mut hero = None;
        let mut goal = None;

        for line in text.lines() {
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            let label = label.trim().to_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            if genre.is_none() && GENRE_LABELS.contains(&label.as_str()) {
                genre = Some(value.to_lowercase());
            } else if hero.is_none() && HERO_LABELS.contains(&label.as_str()) {
                hero = Some(value.to_owned());
            } else if goal.is_none() && GOAL_LABELS.contains(&label.as_str()) {
                goal = Some(value.to_owned());
            }
        }

        // Bare prose becomes the goal.
        if genre.is_none() && hero.is_none() && goal.is_none() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                goal = Some(trimmed.to_owned());
            }
        }

        Self {
            genre: genre.unwrap_or_else(|| "fantasy".to_owned()),
            hero: hero.unwrap_or_else(|| "a nameless wanderer".to_owned()),
            goal: goal.unwrap_or_else(|| "survive the adventure".to_owned()),
        }
    }

    /// One-line summary used in prompts and logs.
    pub fn summary(&self) -> String {
        format!("{} quest: {} must {}", self.genre, self.hero, self.goal)
    }
}
