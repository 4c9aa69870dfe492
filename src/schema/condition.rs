/// Condition specs gating dialogue nodes and choices. Pure data; the
/// AND-over-present-fields semantics live in `core::condition`.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::state::{MysteryFields, PatternKind, RelationshipStatus};

/// A conjunctive predicate over game state plus an optional character
/// scope. Absent fields are vacuously satisfied; present fields must all
/// pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateCondition {
    /// Character scope: inclusive trust bounds.
    #[serde(default)]
    pub trust_min: Option<i32>,
    #[serde(default)]
    pub trust_max: Option<i32>,
    /// Character scope: the relationship must be one of these.
    #[serde(default)]
    pub relationship: Option<Vec<RelationshipStatus>>,
    /// Character scope: knowledge flags that must be present / absent.
    #[serde(default)]
    pub has_knowledge: Vec<String>,
    #[serde(default)]
    pub missing_knowledge: Vec<String>,
    /// Global flags that must be present / absent.
    #[serde(default)]
    pub has_flags: Vec<String>,
    #[serde(default)]
    pub missing_flags: Vec<String>,
    /// Inclusive per-pattern bounds on the global pattern vector.
    #[serde(default)]
    pub patterns_min: BTreeMap<PatternKind, u32>,
    #[serde(default)]
    pub patterns_max: BTreeMap<PatternKind, u32>,
    /// Mystery tracks that must hold exact stages.
    #[serde(default)]
    pub mystery: MysteryFields,
    /// Skill combos (by registry id) that must all be satisfied.
    #[serde(default)]
    pub skill_combos: Vec<String>,
}

impl StateCondition {
    /// True when any character-scoped field is present. Such conditions
    /// fail closed without a resolvable character scope.
    pub fn needs_character(&self) -> bool {
        self.trust_min.is_some()
            || self.trust_max.is_some()
            || self.relationship.is_some()
            || !self.has_knowledge.is_empty()
            || !self.missing_knowledge.is_empty()
    }

    /// Convenience: a minimum-trust gate.
    pub fn min_trust(min: i32) -> Self {
        Self {
            trust_min: Some(min),
            ..Default::default()
        }
    }
}
