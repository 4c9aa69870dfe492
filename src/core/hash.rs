/// Canonical state signatures for simulator deduplication.
///
/// The signature covers only the fields that can influence future
/// branching: the global flags, the pattern vector, the mystery tracks,
/// and the subject character's trust, relationship, and knowledge flags.
/// Sets are sorted before hashing so the signature is independent of
/// insertion order.
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

use crate::schema::state::{CharacterId, GameState, PatternKind};

/// Compute the branching-relevant signature of a state, scoped to the
/// graph's subject character.
pub fn state_signature(state: &GameState, subject: Option<&CharacterId>) -> u64 {
    let mut hasher = FxHasher::default();

    // Pattern vector in fixed order.
    for kind in PatternKind::ALL {
        state.patterns.get(kind).hash(&mut hasher);
    }

    // Global flags, sorted.
    let mut flags: Vec<&str> = state.global_flags.iter().map(String::as_str).collect();
    flags.sort_unstable();
    flags.len().hash(&mut hasher);
    for flag in flags {
        flag.hash(&mut hasher);
    }

    // Mystery tracks in fixed order.
    state.mystery.station_origin.hash(&mut hasher);
    state.mystery.missing_crew.hash(&mut hasher);
    state.mystery.signal_source.hash(&mut hasher);

    // Subject character, when present.
    match subject.and_then(|id| state.character(id)) {
        Some(scoped) => {
            1u8.hash(&mut hasher);
            scoped.trust.hash(&mut hasher);
            scoped.relationship.hash(&mut hasher);
            let mut knowledge: Vec<&str> =
                scoped.knowledge_flags.iter().map(String::as_str).collect();
            knowledge.sort_unstable();
            knowledge.len().hash(&mut hasher);
            for flag in knowledge {
                flag.hash(&mut hasher);
            }
        }
        None => 0u8.hash(&mut hasher),
    }

    hasher.finish()
}
