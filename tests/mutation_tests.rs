/// Mutation and trust integration tests — the reducer, the trust
/// pipeline, and the condition evaluator working against fixture content.
use station_engine::core::condition::evaluate;
use station_engine::core::mutate::apply_state_change;
use station_engine::schema::change::{CharacterChange, StateChange};
use station_engine::schema::condition::StateCondition;
use station_engine::schema::registry::Registry;
use station_engine::schema::state::{
    CharacterId, GameState, PatternKind, RelationshipStatus,
};
use std::path::Path;

fn fixture_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .load_characters_from_ron(Path::new("tests/fixtures/characters.ron"))
        .unwrap();
    registry
        .load_combos_from_ron(Path::new("tests/fixtures/skill_combos.ron"))
        .unwrap();
    registry
}

#[test]
fn registry_fixture_loads() {
    let registry = fixture_registry();
    let chief = registry.character(&CharacterId::new("chief")).unwrap();
    assert_eq!(chief.name, "Chief Okonkwo");
    assert!(chief.affinity.is_resonant(PatternKind::Building));
    assert!(chief.affinity.is_dissonant(PatternKind::Exploring));
    assert!(registry.combo("systems_diagnostics").is_some());
}

#[test]
fn trust_gates_open_as_trust_grows() {
    let registry = fixture_registry();
    let chief = CharacterId::new("chief");
    let mut state = GameState::default();

    let gate = StateCondition::min_trust(4);
    assert!(!evaluate(Some(&gate), &state, Some(&chief), &state.skills, &registry));

    for _ in 0..3 {
        state = apply_state_change(&state, &StateChange::trust(chief.clone(), 2), &registry).state;
    }

    assert!(evaluate(Some(&gate), &state, Some(&chief), &state.skills, &registry));
    let entry = state.character(&chief).unwrap();
    assert!(entry.trust >= 4);
    assert_ne!(entry.relationship, RelationshipStatus::Stranger);
}

#[test]
fn trust_never_escapes_bounds() {
    let registry = fixture_registry();
    let medic = CharacterId::new("medic");
    let mut state = GameState::default();
    for delta in [7, 7, 7, -3, -30, 2, 2, 2, 2, 2, 2, 15, -1] {
        state = apply_state_change(&state, &StateChange::trust(medic.clone(), delta), &registry).state;
        let entry = state.character(&medic).unwrap();
        assert!((0..=10).contains(&entry.trust));
        let momentum = entry.momentum.unwrap();
        assert!((-1.0..=1.0).contains(&momentum.momentum));
    }
}

#[test]
fn actual_delta_matches_trust_movement() {
    let registry = fixture_registry();
    let chief = CharacterId::new("chief");
    let mut state = GameState::default();
    for delta in [3, 9, -5, 0, -20, 6] {
        let before = state.character(&chief).map_or(0, |c| c.trust);
        let applied = apply_state_change(&state, &StateChange::trust(chief.clone(), delta), &registry);
        let result = applied.trust.unwrap();
        let after = applied.state.character(&chief).unwrap().trust;
        assert_eq!(result.actual_delta, after - before);
        assert_eq!(result.new_trust, after);
        state = applied.state;
    }
}

#[test]
fn clamped_overflow_lands_in_breakdown() {
    let registry = fixture_registry();
    let chief = CharacterId::new("chief");
    let mut state = GameState::default();
    state = apply_state_change(&state, &StateChange::trust(chief.clone(), 9), &registry).state;
    assert_eq!(state.character(&chief).unwrap().trust, 9);

    let applied = apply_state_change(&state, &StateChange::trust(chief.clone(), 5), &registry);
    let result = applied.trust.unwrap();
    assert_eq!(result.new_trust, 10);
    assert_eq!(result.actual_delta, 1);
    assert_eq!(result.breakdown.clamped, 4);
}

#[test]
fn momentum_multiplier_grows_across_a_streak() {
    let registry = fixture_registry();
    let medic = CharacterId::new("medic");
    let mut state = GameState::default();
    let mut last_multiplier = 0.0_f32;
    for i in 0..4 {
        let applied = apply_state_change(&state, &StateChange::trust(medic.clone(), 1), &registry);
        let breakdown = applied.trust.unwrap().breakdown;
        if i > 0 {
            assert!(
                breakdown.momentum_multiplier > last_multiplier,
                "streak should keep raising the multiplier"
            );
        }
        last_multiplier = breakdown.momentum_multiplier;
        state = applied.state;
    }
    let momentum = state.character(&medic).unwrap().momentum.unwrap();
    assert_eq!(momentum.consecutive_positive, 4);
    assert_eq!(momentum.consecutive_negative, 0);
}

#[test]
fn resonant_choice_earns_more_trust_than_dissonant() {
    let registry = fixture_registry();
    let chief = CharacterId::new("chief");

    // A history of building work makes the building share dominant.
    let mut resonant_state = GameState::default();
    resonant_state.patterns.add(PatternKind::Building, 9);
    let resonant = StateChange {
        choice_pattern: Some(PatternKind::Building),
        character: Some(CharacterChange {
            id: chief.clone(),
            trust_delta: Some(2),
            ..Default::default()
        }),
        ..Default::default()
    };
    let gained = apply_state_change(&resonant_state, &resonant, &registry)
        .state
        .character(&chief)
        .unwrap()
        .trust;

    // The same delta behind a pattern the chief is dissonant toward.
    let mut dissonant_state = GameState::default();
    dissonant_state.patterns.add(PatternKind::Exploring, 9);
    let dissonant = StateChange {
        choice_pattern: Some(PatternKind::Exploring),
        character: Some(CharacterChange {
            id: chief.clone(),
            trust_delta: Some(2),
            ..Default::default()
        }),
        ..Default::default()
    };
    let dampened = apply_state_change(&dissonant_state, &dissonant, &registry)
        .state
        .character(&chief)
        .unwrap()
        .trust;

    assert!(gained > dampened, "resonance must separate outcomes ({gained} vs {dampened})");
}

#[test]
fn momentum_decays_between_sessions() {
    let registry = fixture_registry();
    let medic = CharacterId::new("medic");
    let mut state = GameState::default();
    for _ in 0..3 {
        state = apply_state_change(&state, &StateChange::trust(medic.clone(), 2), &registry).state;
    }
    let hot = state.character(&medic).unwrap().momentum.unwrap().momentum;

    // Several idle sessions later, the next change sees decayed momentum.
    state.session += 4;
    let applied = apply_state_change(&state, &StateChange::trust(medic.clone(), 2), &registry);
    let cooled = applied.state.character(&medic).unwrap().momentum.unwrap();
    assert!(cooled.momentum < hot, "idle sessions must decay momentum");
}

#[test]
fn condition_vacuity_holds_for_any_state() {
    let registry = fixture_registry();
    let mut state = GameState::default();
    assert!(evaluate(None, &state, None, &state.skills, &registry));

    state = apply_state_change(
        &state,
        &StateChange::trust(CharacterId::new("chief"), 3),
        &registry,
    )
    .state;
    assert!(evaluate(
        None,
        &state,
        Some(&CharacterId::new("chief")),
        &state.skills,
        &registry
    ));
}

#[test]
fn unknown_character_reported_but_rest_applies() {
    let registry = fixture_registry();
    let state = GameState::default();
    let change = StateChange {
        add_flags: vec!["airlock_sealed".to_string()],
        character: Some(CharacterChange {
            id: CharacterId::new("stowaway"),
            trust_delta: Some(5),
            ..Default::default()
        }),
        ..Default::default()
    };
    let applied = apply_state_change(&state, &change, &registry);
    assert!(applied.state.has_flag("airlock_sealed"));
    assert!(applied.state.characters.is_empty());
    assert_eq!(applied.dropped.len(), 1);
}
