/// Character and skill-combo registries — the fixed enumerations that
/// validate authored `StateChange`/`StateCondition` inputs.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::state::{CharacterId, PatternKind, SkillId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Which behavioral tendencies a character responds to. Trust deltas keyed
/// to a resonant pattern earn a bonus, to a dissonant pattern a penalty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternAffinity {
    #[serde(default)]
    pub resonant: Vec<PatternKind>,
    #[serde(default)]
    pub dissonant: Vec<PatternKind>,
}

impl PatternAffinity {
    pub fn is_resonant(&self, kind: PatternKind) -> bool {
        self.resonant.contains(&kind)
    }

    pub fn is_dissonant(&self, kind: PatternKind) -> bool {
        self.dissonant.contains(&kind)
    }
}

/// A registered character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDef {
    pub id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub affinity: PatternAffinity,
}

/// One skill requirement inside a combo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub skill: SkillId,
    pub min_level: u32,
}

/// A named combination of skill requirements, referenced by id from
/// `StateCondition::skill_combos`. Satisfied when every member skill
/// meets its minimum level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillCombo {
    pub id: String,
    pub requires: Vec<SkillRequirement>,
}

/// Registry of all characters and skill combos known to the content.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    characters: BTreeMap<CharacterId, CharacterDef>,
    combos: BTreeMap<String, SkillCombo>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_character(&mut self, def: CharacterDef) {
        self.characters.insert(def.id.clone(), def);
    }

    pub fn register_combo(&mut self, combo: SkillCombo) {
        self.combos.insert(combo.id.clone(), combo);
    }

    pub fn character(&self, id: &CharacterId) -> Option<&CharacterDef> {
        self.characters.get(id)
    }

    pub fn has_character(&self, id: &CharacterId) -> bool {
        self.characters.contains_key(id)
    }

    pub fn combo(&self, id: &str) -> Option<&SkillCombo> {
        self.combos.get(id)
    }

    pub fn character_ids(&self) -> impl Iterator<Item = &CharacterId> {
        self.characters.keys()
    }

    /// Load character definitions from a RON file containing a list of
    /// `CharacterDef`.
    pub fn load_characters_from_ron(&mut self, path: &Path) -> Result<(), RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        let defs: Vec<CharacterDef> = ron::from_str(&contents)?;
        for def in defs {
            self.register_character(def);
        }
        Ok(())
    }

    /// Load skill combos from a RON file containing a list of `SkillCombo`.
    pub fn load_combos_from_ron(&mut self, path: &Path) -> Result<(), RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        let combos: Vec<SkillCombo> = ron::from_str(&contents)?;
        for combo in combos {
            self.register_combo(combo);
        }
        Ok(())
    }
}
