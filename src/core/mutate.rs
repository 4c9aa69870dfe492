/// The mutation engine. Every rule change — trust, flags, patterns,
/// relationship status, mysteries — flows through `apply_state_change`.
///
/// The processing order is a contract, not an implementation detail:
/// pattern deltas land before the character block so that a trust delta in
/// the same change resonates against the already-updated pattern vector.
use log::warn;

use crate::core::trust::{calculate_trust_change, TrustContext, TrustResult};
use crate::schema::change::StateChange;
use crate::schema::registry::Registry;
use crate::schema::state::{CheckIn, CharacterId, GameState, RelationshipStatus, ThoughtEntry};

/// A change dimension that could not be applied. The rest of the change
/// still applies; these are diagnostics, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedChange {
    /// The change targeted a character the registry does not know.
    UnknownCharacter(CharacterId),
}

impl std::fmt::Display for DroppedChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCharacter(id) => {
                write!(f, "unknown character '{}' — character block dropped", id.as_str())
            }
        }
    }
}

/// Result of one `apply_state_change` call. The input state is untouched;
/// `state` is the new value.
#[derive(Debug, Clone)]
pub struct Applied {
    pub state: GameState,
    /// Present when a trust delta ran, for callers that surface feedback.
    pub trust: Option<TrustResult>,
    pub dropped: Vec<DroppedChange>,
}

/// Apply a declarative change to a state, returning the new state. Total:
/// never fails. Invalid dimensions degrade to logged no-ops while the rest
/// of the change applies.
pub fn apply_state_change(state: &GameState, change: &StateChange, registry: &Registry) -> Applied {
    let mut next = state.clone();
    let mut trust = None;
    let mut dropped = Vec::new();

    // 1. Global flags.
    for flag in &change.add_flags {
        next.global_flags.insert(flag.clone());
    }
    for flag in &change.remove_flags {
        next.global_flags.remove(flag);
    }

    // 2. Pattern deltas, then the choice's single increment. The character
    //    block below reads this updated vector.
    for (kind, amount) in &change.patterns {
        next.patterns.add(*kind, *amount);
    }
    if let Some(kind) = change.choice_pattern {
        next.patterns.add(kind, 1);
    }

    // 3. Thought bookkeeping: replace by id, else append.
    if let Some(thought) = &change.thought {
        let entry = ThoughtEntry {
            id: thought.id.clone(),
            text: thought.text.clone(),
            session: next.session,
        };
        match next.thoughts.iter_mut().find(|t| t.id == thought.id) {
            Some(existing) => *existing = entry,
            None => next.thoughts.push(entry),
        }
    }

    // 4. Character block.
    if let Some(character_change) = &change.character {
        if registry.has_character(&character_change.id) {
            let affinity = registry
                .character(&character_change.id)
                .map(|def| &def.affinity);
            let session = next.session;
            let patterns = next.patterns;
            let entry = next
                .characters
                .entry(character_change.id.clone())
                .or_default();

            // 4a. Trust, through the pipeline.
            if let Some(delta) = character_change.trust_delta {
                let ctx = TrustContext {
                    patterns: &patterns,
                    affinity,
                    choice_pattern: change.choice_pattern,
                    momentum: entry.momentum,
                    session,
                    skip_resonance: false,
                };
                let result = calculate_trust_change(entry.trust, delta, &ctx);
                entry.trust = result.new_trust;
                entry.momentum = Some(result.momentum);
                trust = Some(result);
            }

            // 4b. Relationship: explicit override wins; otherwise derive
            //     from trust only when this change moved it.
            if let Some(status) = character_change.relationship {
                entry.relationship = status;
            } else if character_change.trust_delta.is_some() {
                entry.relationship = RelationshipStatus::from_trust(entry.trust);
            }

            // 4c. Knowledge flags.
            for flag in &character_change.add_knowledge {
                entry.knowledge_flags.insert(flag.clone());
            }
            for flag in &character_change.remove_knowledge {
                entry.knowledge_flags.remove(flag);
            }

            // 4d. Check-in queue.
            if let Some(node) = &character_change.schedule_check_in {
                entry.pending_check_ins.push(CheckIn {
                    node: node.clone(),
                    queued_at_session: session,
                });
            }
        } else {
            warn!(
                "state change targets unknown character '{}'; dropping character block",
                character_change.id.as_str()
            );
            dropped.push(DroppedChange::UnknownCharacter(character_change.id.clone()));
        }
    }

    // 5. Mystery overrides.
    change.mystery.apply_to(&mut next.mystery);

    Applied {
        state: next,
        trust,
        dropped,
    }
}
