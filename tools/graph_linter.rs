/// Graph Linter — simulates every dialogue graph and reports structural
/// defects (missing starts, dead ends, deadlocks) for CI gating.
///
/// Usage: graph_linter <graphs_path> [--characters <ron>] [--combos <ron>]
///                     [--json <out_path>] [--max-expansions <n>]
use station_engine::core::sim::{GraphSimulator, SimOptions};
use station_engine::schema::graph::DialogueGraph;
use station_engine::schema::registry::Registry;
use station_engine::schema::state::GameState;
use std::collections::BTreeMap;
use std::path::Path;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!(
            "Usage: graph_linter <graphs_path> [--characters <ron>] [--combos <ron>] \
             [--json <out_path>] [--max-expansions <n>]"
        );
        process::exit(0);
    }

    let graphs_path = &args[1];
    let mut characters_path = None;
    let mut combos_path = None;
    let mut json_path = None;
    let mut options = SimOptions::default();

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
            "--json" if i + 1 < args.len() => {
                i += 1;
                json_path = Some(args[i].clone());
            }
            "--max-expansions" if i + 1 < args.len() => {
                i += 1;
                options.max_expansions = args[i].parse().unwrap_or(options.max_expansions);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    // Load registries.
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

    let character_count = registry.character_ids().count();
    if character_count > 0 {
        println!("Loaded {} characters", character_count);
    }

    // Load all graphs, keyed by file stem.
    let mut graphs: BTreeMap<String, DialogueGraph> = BTreeMap::new();
    let root = Path::new(graphs_path);
    if root.is_file() {
        load_graph_file(root, &mut graphs);
    } else if root.is_dir() {
        load_graphs_recursive(root, &mut graphs);
    } else {
        eprintln!("ERROR: Path '{}' does not exist", graphs_path);
        process::exit(1);
    }

    if graphs.is_empty() {
        eprintln!("ERROR: No graph files found under '{}'", graphs_path);
        process::exit(1);
    }

    println!("Loaded {} dialogue graphs", graphs.len());

    let generated_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| format!("unix:{}", d.as_secs()))
        .unwrap_or_else(|_| "unix:0".to_string());

    let simulator = GraphSimulator::new(&registry, options);
    let report = simulator.run_all(&graphs, &GameState::default(), &generated_at);

    // Print report.
    println!("\n=== Dialogue Graph Lint Report ===\n");

    for (key, totals) in &report.per_graph {
        let mark = if totals.failures > 0 {
            "FAIL"
        } else if totals.truncated {
            "TRUNCATED"
        } else {
            "ok"
        };
        println!(
            "  {:<32} {:>6} expansions, {:>6} states, {} failures [{}]",
            key, totals.expansions, totals.visited_state_pairs, totals.failures, mark
        );
    }

    if report.failures.is_empty() && report.required_state_mismatches.is_empty() {
        println!("\nAll graphs structurally sound.");
    }

    for mismatch in &report.required_state_mismatches {
        println!(
            "WARNING: {}: node '{}' rejected the seed state (required_state mismatch)",
            mismatch.graph,
            mismatch.node.as_str()
        );
    }

    for failure in &report.failures {
        println!(
            "ERROR: {}: {:?} at node '{}' (path length {})",
            failure.graph,
            failure.kind,
            failure.node.as_str(),
            failure.trace.len()
        );
    }

    println!(
        "\nSummary: {} graphs, {} failures, {} required-state mismatches, {} expansions",
        report.totals.graphs,
        report.totals.failures,
        report.totals.required_state_mismatches,
        report.totals.expansions
    );

    if let Some(ref path) = json_path {
        match report.to_json() {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    eprintln!("ERROR: Failed to write report to {}: {}", path, e);
                    process::exit(1);
                }
                println!("Report written to {}", path);
            }
            Err(e) => {
                eprintln!("ERROR: Failed to serialize report: {}", e);
                process::exit(1);
            }
        }
    }

    if report.totals.failures == 0 {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn load_graph_file(path: &Path, graphs: &mut BTreeMap<String, DialogueGraph>) {
    let key = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();
    match DialogueGraph::load_from_ron(path) {
        Ok(graph) => {
            println!("  Loaded: {}", path.display());
            graphs.insert(key, graph);
        }
        Err(e) => {
            eprintln!("  ERROR loading {}: {}", path.display(), e);
        }
    }
}

fn load_graphs_recursive(dir: &Path, graphs: &mut BTreeMap<String, DialogueGraph>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                load_graphs_recursive(&path, graphs);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                load_graph_file(&path, graphs);
            }
        }
    }
}
