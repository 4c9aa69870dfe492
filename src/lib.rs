//! Station Engine — deterministic narrative state for branching dialogue.
//!
//! The engine owns the game-state model, the single mutation path through
//! which every rule change flows, the trust pipeline (resonance, momentum,
//! clamping), the condition predicate language gating dialogue content, and
//! a headless simulator that explores authored dialogue graphs to find
//! structurally broken content before a player does.

pub mod core;
pub mod schema;
