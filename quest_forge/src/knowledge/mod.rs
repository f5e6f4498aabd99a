//! Genre knowledge - the material prompts are seasoned with.
//!
//! A [`KnowledgeBase`] holds per-genre packs of locations, atmosphere
//! words, items, and lore snippets. Snippet lookup goes through the
//! [`SnippetRetriever`] seam so an embedding-backed store can replace the
//! built-in keyword scoring without touching the planner.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ForgeError, SourceError};

/// Story material for one genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GenrePack {
    pub name: String,
    pub locations: Vec<String>,
    pub atmosphere: Vec<String>,
    pub items: Vec<String>,
    pub obstacles: Vec<String>,
    /// Short lore lines served by the built-in retriever.
    pub snippets: Vec<String>,
}

/// A sampled slice of a pack, small enough to fit a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenreElements {
    pub locations: Vec<String>,
    pub atmosphere: Vec<String>,
    pub items: Vec<String>,
    pub obstacles: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PackFile {
    #[serde(default)]
    packs: Vec<GenrePack>,
}

/// All genre packs known to the engine.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    packs: HashMap<String, GenrePack>,
}

impl KnowledgeBase {
    /// An empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in packs covering the common genres.
    pub fn with_defaults() -> Self {
        let mut kb = Self::new();
        for pack in default_packs() {
            kb.add_pack(pack);
        }
        kb
    }

    /// Load packs from a TOML document, e.g.:
    ///
    /// ```toml
    /// [[packs]]
    /// name = "fantasy"
    /// locations = ["ruined abbey", "moss-grown bridge"]
    /// ```
    pub fn from_toml_str(toml: &str) -> Result<Self, ForgeError> {
        let file: PackFile =
            toml::from_str(toml).map_err(|e| ForgeError::Config(e.to_string()))?;
        let mut kb = Self::new();
        for pack in file.packs {
            kb.add_pack(pack);
        }
        Ok(kb)
    }

    /// Register a pack under its (lowercased) name.
    pub fn add_pack(&mut self, pack: GenrePack) {
        self.packs.insert(pack.name.to_lowercase(), pack);
    }

    /// Look up the pack for a genre.
    pub fn pack(&self, genre: &str) -> Option<&GenrePack> {
        self.packs.get(&genre.to_lowercase())
    }

    /// Number of registered packs.
    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    /// Draw a few elements of each kind for prompt seasoning. Unknown
    /// genres yield empty elements.
    pub fn sample_elements(&self, genre: &str, rng: &mut impl Rng) -> GenreElements {
        let Some(pack) = self.pack(genre) else {
            return GenreElements::default();
        };

        let pick = |pool: &[String], count: usize, rng: &mut dyn rand::RngCore| {
            let mut picked: Vec<String> = pool
                .choose_multiple(rng, count.min(pool.len()))
                .cloned()
                .collect();
            picked.sort();
            picked
        };

        GenreElements {
            locations: pick(&pack.locations, 3, rng),
            atmosphere: pick(&pack.atmosphere, 4, rng),
            items: pick(&pack.items, 3, rng),
            obstacles: pick(&pack.obstacles, 2, rng),
        }
    }

    /// A keyword retriever over this base's snippets for the given genre.
    pub fn retriever(&self, genre: &str) -> KeywordRetriever {
        KeywordRetriever::new(
            self.pack(genre)
                .map(|p| p.snippets.clone())
                .unwrap_or_default(),
        )
    }
}

/// The retrieval seam: query in, ranked snippets out.
#[async_trait]
pub trait SnippetRetriever: Send + Sync {
    /// Return up to `top_k` snippets relevant to the query, best first.
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, SourceError>;
}

/// Built-in retriever: ranks snippets by shared-word count with the query.
/// Deterministic, no external service involved.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    snippets: Vec<String>,
}

impl KeywordRetriever {
    pub fn new(snippets: Vec<String>) -> Self {
        Self { snippets }
    }
}

#[async_trait]
impl SnippetRetriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>, SourceError> {
        let query_words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .map(str::to_lowercase)
            .collect();

        let mut scored: Vec<(usize, &String)> = self
            .snippets
            .iter()
            .map(|snippet| {
                let lower = snippet.to_lowercase();
                let score = query_words.iter().filter(|w| lower.contains(*w)).count();
                (score, snippet)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable order: score descending, then original order.
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

fn default_packs() -> Vec<GenrePack> {
    vec![
        GenrePack {
            name: "fantasy".to_owned(),
            locations: [
                "ruined abbey",
                "moss-grown bridge",
                "the old mill",
                "a smugglers' cave",
                "the king's road",
            ]
            .map(String::from)
            .to_vec(),
            atmosphere: ["mist", "candlelight", "cold iron", "distant bells", "wet stone"]
                .map(String::from)
                .to_vec(),
            items: ["tarnished amulet", "hunting knife", "sealed letter", "waystone"]
                .map(String::from)
                .to_vec(),
            obstacles: ["a collapsed passage", "a suspicious toll-keeper", "wolves on the road"]
                .map(String::from)
                .to_vec(),
            snippets: [
                "The abbey was abandoned after the red winter, and locals avoid it still.",
                "Waystones hum faintly near places where the old roads cross.",
                "Toll-keepers on the king's road answer to no lord but their purse.",
            ]
            .map(String::from)
            .to_vec(),
        },
        GenrePack {
            name: "cyberpunk".to_owned(),
            locations: [
                "the undercity market",
                "a rooftop garden dome",
                "the arcology lobby",
                "a flooded metro line",
            ]
            .map(String::from)
            .to_vec(),
            atmosphere: ["neon rain", "drone hum", "ozone", "flickering adverts"]
                .map(String::from)
                .to_vec(),
            items: ["burner deck", "spoofed keycard", "military stim", "cracked optic"]
                .map(String::from)
                .to_vec(),
            obstacles: ["a corporate checkpoint", "ice on the vault subnet", "a rival crew"]
                .map(String::from)
                .to_vec(),
            snippets: [
                "Arcology security rotates its door ciphers at four-hour marks.",
                "The undercity market trades in anything except loyalty.",
                "Flooded metro lines still carry maintenance power on the third rail.",
            ]
            .map(String::from)
            .to_vec(),
        },
        GenrePack {
            name: "horror".to_owned(),
            locations: ["the boarded chapel", "a root cellar", "the drowned orchard"]
                .map(String::from)
                .to_vec(),
            atmosphere: ["creaking timber", "stopped clocks", "breath in the cold"]
                .map(String::from)
                .to_vec(),
            items: ["cracked mirror", "salt jar", "funeral photograph"]
                .map(String::from)
                .to_vec(),
            obstacles: ["a door that opens by itself", "the thing in the walls"]
                .map(String::from)
                .to_vec(),
            snippets: [
                "Every clock in the house stopped at the same minute, years apart.",
                "Salt lines hold only while unbroken and freely given.",
            ]
            .map(String::from)
            .to_vec(),
        },
        GenrePack {
            name: "science fiction".to_owned(),
            locations: ["the cryo bay", "an orbital tether station", "the hydroponics ring"]
                .map(String::from)
                .to_vec(),
            atmosphere: ["recycled air", "coolant mist", "alarm strobes"]
                .map(String::from)
                .to_vec(),
            items: ["patch kit", "maintenance drone", "command wafer"]
                .map(String::from)
                .to_vec(),
            obstacles: ["a depressurized corridor", "a quarantine lockdown"]
                .map(String::from)
                .to_vec(),
            snippets: [
                "Tether stations run skeleton crews during solar storm watches.",
                "Quarantine lockdowns can only be lifted from the medical deck.",
            ]
            .map(String::from)
            .to_vec(),
        },
    ]
}
