/// Declarative state deltas — the only input the mutation engine accepts.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::state::{CharacterId, MysteryFields, NodeId, PatternKind, RelationshipStatus};

/// A thought to surface to the player. Replaces an existing entry with the
/// same id, otherwise appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtTrigger {
    pub id: String,
    pub text: String,
}

/// The character-targeted slice of a change. At most one character per
/// `StateChange` by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterChange {
    pub id: CharacterId,
    #[serde(default)]
    pub trust_delta: Option<i32>,
    #[serde(default)]
    pub add_knowledge: Vec<String>,
    #[serde(default)]
    pub remove_knowledge: Vec<String>,
    /// Explicit relationship override; wins over trust-derived status.
    #[serde(default)]
    pub relationship: Option<RelationshipStatus>,
    #[serde(default)]
    pub schedule_check_in: Option<NodeId>,
}

/// A declarative, optional-field delta applied by
/// `core::mutate::apply_state_change`. Every field is independent; absent
/// fields are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    #[serde(default)]
    pub add_flags: Vec<String>,
    #[serde(default)]
    pub remove_flags: Vec<String>,
    /// Pattern deltas, applied before any trust delta in the same change.
    #[serde(default)]
    pub patterns: BTreeMap<PatternKind, u32>,
    /// A dialogue choice's single pattern increment. Also scopes resonance
    /// for a trust delta carried by the same change.
    #[serde(default)]
    pub choice_pattern: Option<PatternKind>,
    #[serde(default)]
    pub thought: Option<ThoughtTrigger>,
    #[serde(default)]
    pub character: Option<CharacterChange>,
    #[serde(default)]
    pub mystery: MysteryFields,
}

impl StateChange {
    /// A change that only adjusts one character's trust.
    pub fn trust(id: CharacterId, delta: i32) -> Self {
        Self {
            character: Some(CharacterChange {
                id,
                trust_delta: Some(delta),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// A change that only sets global flags.
    pub fn flags(add: &[&str]) -> Self {
        Self {
            add_flags: add.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add_flags.is_empty()
            && self.remove_flags.is_empty()
            && self.patterns.is_empty()
            && self.choice_pattern.is_none()
            && self.thought.is_none()
            && self.character.is_none()
            && self.mystery.is_empty()
    }
}
