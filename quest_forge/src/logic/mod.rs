//! Logic inference - deriving preconditions and effects from scene text.
//!
//! Works from keyword templates rather than a model call: choices are
//! classified by their verbs (take / open / defeat), matched against genre
//! objects recognized in the scene text, and annotated with the
//! corresponding precondition/effect template. Choices that fit no template
//! are left without logic rather than guessed at.

use quest_graph::{
    ChoiceLogic, Effect, GameObject, LogicState, ObjectKind, ObjectState, Precondition,
    QuestGraph, RelationKind, SceneId,
};
use std::sync::Arc;

use crate::knowledge::KnowledgeBase;
use crate::scenario::ScenarioInput;

const TAKE_WORDS: &[&str] = &["take", "grab", "pick up", "pocket", "collect"];
const OPEN_WORDS: &[&str] = &["unlock", "open", "force", "pry", "break through"];
const FIGHT_WORDS: &[&str] = &["attack", "fight", "defeat", "strike", "slay", "subdue"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Take,
    Open,
    Defeat,
}

fn classify(choice_text: &str) -> Option<ActionKind> {
    let lower = choice_text.to_lowercase();
    if TAKE_WORDS.iter().any(|w| lower.contains(w)) {
        Some(ActionKind::Take)
    } else if OPEN_WORDS.iter().any(|w| lower.contains(w)) {
        Some(ActionKind::Open)
    } else if FIGHT_WORDS.iter().any(|w| lower.contains(w)) {
        Some(ActionKind::Defeat)
    } else {
        None
    }
}

/// Turn an object name into a stable ID (`brass key` -> `brass_key`).
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    out.trim_end_matches('_').to_owned()
}

/// Annotates quest choices with structured logic.
pub struct LogicEngine {
    knowledge: Arc<KnowledgeBase>,
}

impl LogicEngine {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    /// Walk the graph, attach logic to choices that fit a template, and
    /// return the initial world state.
    pub fn enrich(&self, graph: &mut QuestGraph, scenario: &ScenarioInput) -> LogicState {
        let mut world = LogicState::new();
        world.add_object(GameObject::new(
            "hero",
            scenario.hero.clone(),
            ObjectKind::Character,
        ));

        let pack = self.knowledge.pack(&scenario.genre);
        let pack_items: Vec<String> = pack.map(|p| p.items.clone()).unwrap_or_default();
        let pack_obstacles: Vec<String> = pack.map(|p| p.obstacles.clone()).unwrap_or_default();

        let ids: Vec<SceneId> = graph.scene_ids().into_iter().cloned().collect();
        let mut annotated = 0usize;

        for id in ids {
            let Some(node) = graph.scene(&id) else { continue };
            let scene_text = node.text.to_lowercase();

            let items_here: Vec<String> = pack_items
                .iter()
                .filter(|i| scene_text.contains(&i.to_lowercase()))
                .cloned()
                .collect();
            let obstacles_here: Vec<String> = pack_obstacles
                .iter()
                .filter(|o| scene_text.contains(&o.to_lowercase()))
                .cloned()
                .collect();

            // Items found in a scene exist at that scene.
            for item in &items_here {
                let item_id = slug(item);
                if world.object(&item_id).is_none() {
                    world.add_object(
                        GameObject::new(item_id, item.clone(), ObjectKind::Item)
                            .with_relation(RelationKind::At, id.as_str()),
                    );
                }
            }

            let choice_texts: Vec<String> =
                node.choices.iter().map(|c| c.text.clone()).collect();

            let logics: Vec<Option<ChoiceLogic>> = choice_texts
                .iter()
                .map(|text| {
                    self.infer_choice_logic(
                        text,
                        &id,
                        &items_here,
                        &obstacles_here,
                        &mut world,
                    )
                })
                .collect();

            if let Some(node) = graph.scene_mut(&id) {
                for (choice, logic) in node.choices.iter_mut().zip(logics) {
                    if logic.is_some() {
                        annotated += 1;
                        choice.logic = logic;
                    }
                }
            }
        }

        tracing::debug!(choices = annotated, objects = world.objects.len(), "logic inferred");
        world
    }

    fn infer_choice_logic(
        &self,
        choice_text: &str,
        scene: &SceneId,
        items_here: &[String],
        obstacles_here: &[String],
        world: &mut LogicState,
    ) -> Option<ChoiceLogic> {
        let kind = classify(choice_text)?;
        let lower = choice_text.to_lowercase();

        // Prefer the object named in the choice itself; fall back to the
        // first one recognized in the scene.
        let named = |pool: &[String]| -> Option<String> {
            pool.iter()
                .find(|name| lower.contains(&name.to_lowercase()))
                .or_else(|| pool.first())
                .cloned()
        };

        match kind {
            ActionKind::Take => {
                let item = named(items_here)?;
                let item_id = slug(&item);
                Some(
                    ChoiceLogic::new()
                        .with_precondition(Precondition::InState {
                            object: item_id.clone(),
                            state: ObjectState::Exists,
                        })
                        .with_effect(Effect::SetState {
                            object: item_id.clone(),
                            state: ObjectState::Taken,
                        })
                        .with_effect(Effect::AddRelation {
                            object: "hero".to_owned(),
                            relation: RelationKind::Has,
                            target: item_id,
                        }),
                )
            }
            ActionKind::Open => {
                let barrier = named(obstacles_here)?;
                let barrier_id = slug(&barrier);
                self.register_obstacle(world, &barrier_id, &barrier, scene, ObjectState::Locked);

                let mut logic = ChoiceLogic::new().with_precondition(Precondition::InState {
                    object: barrier_id.clone(),
                    state: ObjectState::Locked,
                });
                // A key-like item in the same scene becomes a requirement.
                if let Some(item) = items_here.first() {
                    logic = logic.with_precondition(Precondition::HasRelation {
                        object: "hero".to_owned(),
                        relation: RelationKind::Has,
                        target: slug(item),
                    });
                }
                Some(logic.with_effect(Effect::SetState {
                    object: barrier_id,
                    state: ObjectState::Unlocked,
                }))
            }
            ActionKind::Defeat => {
                let foe = named(obstacles_here)?;
                let foe_id = slug(&foe);
                self.register_obstacle(world, &foe_id, &foe, scene, ObjectState::Active);

                Some(
                    ChoiceLogic::new()
                        .with_precondition(Precondition::InState {
                            object: foe_id.clone(),
                            state: ObjectState::Active,
                        })
                        .with_effect(Effect::SetState {
                            object: foe_id,
                            state: ObjectState::Destroyed,
                        }),
                )
            }
        }
    }

    fn register_obstacle(
        &self,
        world: &mut LogicState,
        object_id: &str,
        name: &str,
        scene: &SceneId,
        initial: ObjectState,
    ) {
        if world.object(object_id).is_none() {
            let kind = if initial == ObjectState::Active {
                ObjectKind::Character
            } else {
                ObjectKind::Item
            };
            world.add_object(
                GameObject::new(object_id, name, kind)
                    .with_state(initial)
                    .with_relation(RelationKind::At, scene.as_str()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::GenrePack;
    use quest_graph::{ChoiceEdge, Ending, SceneNode};

    fn knowledge() -> Arc<KnowledgeBase> {
        let mut kb = KnowledgeBase::new();
        kb.add_pack(GenrePack {
            name: "fantasy".to_owned(),
            items: vec!["brass key".to_owned()],
            obstacles: vec!["iron gate".to_owned()],
            ..GenrePack::default()
        });
        Arc::new(kb)
    }

    fn gate_graph() -> QuestGraph {
        let root_id = SceneId::root();
        let a = root_id.child(1);
        let b = root_id.child(2);

        let mut graph = QuestGraph::new(
            SceneNode::new(
                root_id,
                "A brass key glints in the mud beside the iron gate.",
            )
            .with_choice(ChoiceEdge::to_scene("Take the brass key", a.clone()))
            .with_choice(ChoiceEdge::to_scene("Force the iron gate", b.clone())),
        );
        graph.add_scene(
            SceneNode::new(a, "The key is cold in your hand.")
                .with_choice(ChoiceEdge::to_ending("Move on", Ending::Neutral)),
        );
        graph.add_scene(
            SceneNode::new(b, "The gate shrieks open.")
                .with_choice(ChoiceEdge::to_ending("Step through", Ending::Success)),
        );
        graph
    }

    #[test]
    fn test_take_and_open_templates() {
        let mut graph = gate_graph();
        let scenario = ScenarioInput::new("fantasy", "a locksmith", "enter the keep");

        let world = LogicEngine::new(knowledge()).enrich(&mut graph, &scenario);

        assert!(world.object("hero").is_some());
        assert!(world.object("brass_key").is_some());
        assert_eq!(
            world.object("iron_gate").map(|o| o.state),
            Some(ObjectState::Locked)
        );

        let root = graph.scene(graph.root()).unwrap();
        let take = root.choices[0].logic.as_ref().unwrap();
        let open = root.choices[1].logic.as_ref().unwrap();

        // Taking the key makes opening the gate available.
        let mut state = world.clone();
        assert!(take.is_available(&state));
        assert!(!open.is_available(&state));

        take.apply(&mut state);
        assert!(open.is_available(&state));

        open.apply(&mut state);
        assert_eq!(
            state.object("iron_gate").map(|o| o.state),
            Some(ObjectState::Unlocked)
        );
    }

    #[test]
    fn test_unmatched_choices_stay_plain() {
        let root_id = SceneId::root();
        let mut graph = QuestGraph::new(
            SceneNode::new(root_id, "The road stretches on.")
                .with_choice(ChoiceEdge::to_ending("Keep walking", Ending::Neutral)),
        );
        let scenario = ScenarioInput::new("fantasy", "a pilgrim", "reach the shrine");

        LogicEngine::new(knowledge()).enrich(&mut graph, &scenario);

        let root = graph.scene(graph.root()).unwrap();
        assert!(root.choices[0].logic.is_none());
    }

    #[test]
    fn test_defeat_template_registers_foe() {
        let root_id = SceneId::root();
        let mut kb = KnowledgeBase::new();
        kb.add_pack(GenrePack {
            name: "fantasy".to_owned(),
            obstacles: vec!["grave warden".to_owned()],
            ..GenrePack::default()
        });

        let mut graph = QuestGraph::new(
            SceneNode::new(root_id, "The grave warden bars the crypt stairs.")
                .with_choice(ChoiceEdge::to_ending("Fight the grave warden", Ending::Success)),
        );
        let scenario = ScenarioInput::new("fantasy", "a gravedigger", "rob the crypt");

        let world = LogicEngine::new(Arc::new(kb)).enrich(&mut graph, &scenario);

        let warden = world.object("grave_warden").unwrap();
        assert_eq!(warden.kind, ObjectKind::Character);
        assert_eq!(warden.state, ObjectState::Active);

        let logic = graph.scene(graph.root()).unwrap().choices[0]
            .logic
            .as_ref()
            .unwrap();
        let mut state = world.clone();
        logic.apply(&mut state);
        assert_eq!(
            state.object("grave_warden").map(|o| o.state),
            Some(ObjectState::Destroyed)
        );
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Brass Key"), "brass_key");
        assert_eq!(slug("a collapsed passage"), "a_collapsed_passage");
        assert_eq!(slug("ice -- on the vault!"), "ice_on_the_vault");
    }
}
