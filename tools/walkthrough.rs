/// Walkthrough — seeded random playthrough of one dialogue graph.
///
/// Picks a qualifying choice at random each step, applying consequences
/// through the engine, until a boundary node, a deadlock, or the step cap.
/// The same seed always replays the same path.
///
/// Usage: walkthrough <graph.ron> [--characters <ron>] [--combos <ron>]
///                    [--seed <n>] [--max-steps <n>]
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use station_engine::core::condition::evaluate;
use station_engine::core::mutate::apply_state_change;
use station_engine::core::sim::effective_change;
use station_engine::schema::graph::{DialogueChoice, DialogueGraph};
use station_engine::schema::registry::Registry;
use station_engine::schema::state::GameState;
use std::path::Path;
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!(
            "Usage: walkthrough <graph.ron> [--characters <ron>] [--combos <ron>] \
             [--seed <n>] [--max-steps <n>]"
        );
        process::exit(0);
    }

    let graph_path = &args[1];
    let mut characters_path = None;
    let mut combos_path = None;
    let mut seed: u64 = 42;
    let mut max_steps: u32 = 100;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--characters" if i + 1 < args.len() => {
                i += 1;
                characters_path = Some(args[i].clone());
            }
            "--combos" if i + 1 < args.len() => {
                i += 1;
                combos_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            "--max-steps" if i + 1 < args.len() => {
                i += 1;
                max_steps = args[i].parse().unwrap_or(100);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let graph = match DialogueGraph::load_from_ron(Path::new(graph_path)) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("ERROR: Failed to load graph {}: {}", graph_path, e);
            process::exit(1);
        }
    };

    let mut registry = Registry::new();
    if let Some(ref path) = characters_path {
        if let Err(e) = registry.load_characters_from_ron(Path::new(path)) {
            eprintln!("ERROR: Failed to load characters from {}: {}", path, e);
            process::exit(1);
        }
    }
    if let Some(ref path) = combos_path {
        if let Err(e) = registry.load_combos_from_ron(Path::new(path)) {
            eprintln!("ERROR: Failed to load skill combos from {}: {}", path, e);
            process::exit(1);
        }
    }

    println!("Walkthrough of '{}' (seed {})\n", graph_path, seed);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut state = GameState::default();
    let subject = graph.character.clone();
    let mut current = graph.start_node.clone();

    for step in 0..max_steps {
        if current.is_virtual() {
            println!("[{}] -> hand-off to {}", step, current.as_str());
            break;
        }
        let node = match graph.node(&current) {
            Some(node) => node,
            None => {
                println!("[{}] !! node '{}' not found in graph", step, current.as_str());
                break;
            }
        };

        if !evaluate(
            node.required_state.as_ref(),
            &state,
            subject.as_ref(),
            &state.skills,
            &registry,
        ) {
            println!(
                "[{}] !! required_state rejected entry to '{}'",
                step,
                current.as_str()
            );
            break;
        }

        state.current_node = Some(node.id.clone());
        for change in &node.on_enter {
            state = apply_state_change(&state, change, &registry).state;
        }

        let speaker = node
            .speaker
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or("narrator");
        if !node.text.is_empty() {
            println!("[{}] {}: {}", step, speaker, node.text);
        }

        if node.choices.is_empty() {
            if node.is_boundary() {
                println!("[{}] -- reached boundary node '{}'", step, current.as_str());
            } else {
                println!("[{}] !! dead end at '{}'", step, current.as_str());
            }
            break;
        }

        let mut qualifying: Vec<&DialogueChoice> = node
            .choices
            .iter()
            .filter(|choice| {
                evaluate(
                    choice.visible_if.as_ref(),
                    &state,
                    subject.as_ref(),
                    &state.skills,
                    &registry,
                ) && evaluate(
                    choice.enabled_if.as_ref(),
                    &state,
                    subject.as_ref(),
                    &state.skills,
                    &registry,
                )
            })
            .collect();
        qualifying.sort_by(|a, b| a.id.cmp(&b.id));

        if qualifying.is_empty() {
            println!("[{}] !! deadlock at '{}': no qualifying choices", step, current.as_str());
            break;
        }

        let choice = qualifying[rng.gen_range(0..qualifying.len())];
        println!("      > {}", if choice.text.is_empty() { &choice.id } else { &choice.text });

        if let Some(change) = effective_change(choice) {
            let applied = apply_state_change(&state, &change, &registry);
            if let Some(trust) = applied.trust {
                println!(
                    "        (trust {} -> {}, delta {})",
                    trust.new_trust - trust.actual_delta,
                    trust.new_trust,
                    trust.actual_delta
                );
            }
            state = applied.state;
        }
        for change in &node.on_exit {
            state = apply_state_change(&state, change, &registry).state;
        }

        current = choice.next_node.clone();
    }

    println!("\n=== Final state ===");
    if let Some(ref id) = subject {
        if let Some(character) = state.character(id) {
            println!(
                "{}: trust {}, {:?}, {} knowledge flags",
                id.as_str(),
                character.trust,
                character.relationship,
                character.knowledge_flags.len()
            );
        }
    }
    let mut flags: Vec<&str> = state.global_flags.iter().map(String::as_str).collect();
    flags.sort_unstable();
    println!("flags: {:?}", flags);
    println!("patterns: {:?}", state.patterns);
}
