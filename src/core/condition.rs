/// Condition evaluation: the conjunctive predicate language gating
/// dialogue nodes and choices.
///
/// Pure and side-effect-free. The simulator calls this speculatively on
/// hypothetical states many times per step, so nothing here may allocate
/// per call beyond what short-circuiting avoids.
use std::collections::BTreeMap;

use crate::schema::condition::StateCondition;
use crate::schema::registry::Registry;
use crate::schema::state::{CharacterId, GameState, SkillId};

/// Evaluate a condition against a state. `None` is vacuously true.
/// Character-scoped checks read `state.characters[character]`; when that
/// character is absent (or no scope was given), those checks fail closed.
pub fn evaluate(
    condition: Option<&StateCondition>,
    state: &GameState,
    character: Option<&CharacterId>,
    skills: &BTreeMap<SkillId, u32>,
    registry: &Registry,
) -> bool {
    let condition = match condition {
        Some(c) => c,
        None => return true,
    };

    // Character-scoped checks.
    if condition.needs_character() {
        let scoped = match character.and_then(|id| state.character(id)) {
            Some(cs) => cs,
            None => return false,
        };
        if let Some(min) = condition.trust_min {
            if scoped.trust < min {
                return false;
            }
        }
        if let Some(max) = condition.trust_max {
            if scoped.trust > max {
                return false;
            }
        }
        if let Some(allowed) = &condition.relationship {
            if !allowed.contains(&scoped.relationship) {
                return false;
            }
        }
        if !condition
            .has_knowledge
            .iter()
            .all(|flag| scoped.knowledge_flags.contains(flag))
        {
            return false;
        }
        if condition
            .missing_knowledge
            .iter()
            .any(|flag| scoped.knowledge_flags.contains(flag))
        {
            return false;
        }
    }

    // Global flags.
    if !condition.has_flags.iter().all(|flag| state.has_flag(flag)) {
        return false;
    }
    if condition.missing_flags.iter().any(|flag| state.has_flag(flag)) {
        return false;
    }

    // Pattern bounds.
    for (kind, min) in &condition.patterns_min {
        if state.patterns.get(*kind) < *min {
            return false;
        }
    }
    for (kind, max) in &condition.patterns_max {
        if state.patterns.get(*kind) > *max {
            return false;
        }
    }

    // Mystery tracks.
    if !condition.mystery.matches(&state.mystery) {
        return false;
    }

    // Skill combos. An unregistered combo id fails closed.
    for combo_id in &condition.skill_combos {
        let combo = match registry.combo(combo_id) {
            Some(c) => c,
            None => return false,
        };
        let satisfied = combo
            .requires
            .iter()
            .all(|req| skills.get(&req.skill).copied().unwrap_or(0) >= req.min_level);
        if !satisfied {
            return false;
        }
    }

    true
}
