/// Headless dialogue-graph simulation.
///
/// A bounded breadth-first explorer that drives the mutation engine and
/// condition evaluator over an authored graph, deduplicating on
/// (node, state-signature) pairs, to find structurally broken content:
/// missing start nodes, hard dead ends, and soft deadlocks. Defects are
/// returned as data for CI gating, never raised.
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::core::condition::evaluate;
use crate::core::hash::state_signature;
use crate::core::mutate::apply_state_change;
use crate::schema::change::StateChange;
use crate::schema::graph::{DialogueChoice, DialogueGraph};
use crate::schema::registry::Registry;
use crate::schema::state::{GameState, NodeId};

/// Hard caps bounding one graph's exploration. Exceeding a cap truncates
/// the run; it never fails it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimOptions {
    /// Longest choice path followed from the start node.
    pub max_steps_per_path: u32,
    /// Total node expansions across the whole graph.
    pub max_expansions: u32,
    /// Distinct states explored per node before further variants are
    /// skipped.
    pub max_states_per_node: u32,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            max_steps_per_path: 64,
            max_expansions: 10_000,
            max_states_per_node: 32,
        }
    }
}

/// Classification of a structural content defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The declared start node does not exist; the graph is unusable.
    MissingStart,
    /// A node with choices, none currently visible and enabled.
    SoftDeadlock,
    /// A choiceless node that is not a recognized boundary.
    HardDeadEnd,
}

/// One step of the path that led the simulator somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub node: NodeId,
    pub choice: String,
    pub next: NodeId,
}

/// A structural defect found along one explored branch. First discovery
/// per node wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimFailure {
    pub graph: String,
    pub node: NodeId,
    pub kind: FailureKind,
    pub trace: Vec<TraceStep>,
}

/// A node whose `required_state` rejected the simulator's synthetic state.
/// Tracked apart from failures: it usually means the seed state lacks a
/// precondition real players would have satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateMismatch {
    pub graph: String,
    pub node: NodeId,
    pub trace: Vec<TraceStep>,
}

/// Per-graph counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphTotals {
    pub expansions: u64,
    pub visited_state_pairs: u64,
    pub failures: u64,
    pub required_state_mismatches: u64,
    pub truncated: bool,
}

/// The outcome of simulating one graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphRun {
    pub totals: GraphTotals,
    pub failures: Vec<SimFailure>,
    pub required_state_mismatches: Vec<StateMismatch>,
}

/// Aggregate counters across a whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub graphs: u64,
    pub expansions: u64,
    pub visited_state_pairs: u64,
    pub failures: u64,
    pub required_state_mismatches: u64,
}

/// Machine-readable simulation report, stable across runs with identical
/// inputs. Intended for CI gating on `totals.failures`.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeSimReport {
    pub generated_at: String,
    pub options: SimOptions,
    pub totals: ReportTotals,
    pub per_graph: BTreeMap<String, GraphTotals>,
    pub failures: Vec<SimFailure>,
    pub required_state_mismatches: Vec<StateMismatch>,
}

impl NarrativeSimReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A worklist entry: a node about to be expanded under a concrete state.
struct Frontier {
    node: NodeId,
    state: GameState,
    trace: Vec<TraceStep>,
    steps: u32,
}

/// The simulator. Holds no mutable state of its own; each `run_graph`
/// call owns its worklist and visited set, so graphs are independent.
pub struct GraphSimulator<'a> {
    registry: &'a Registry,
    options: SimOptions,
}

impl<'a> GraphSimulator<'a> {
    pub fn new(registry: &'a Registry, options: SimOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> SimOptions {
        self.options
    }

    /// Simulate every graph, in key order, against the same initial state.
    /// `generated_at` is stamped into the report verbatim so that callers
    /// control whether reports are reproducible.
    pub fn run_all(
        &self,
        graphs: &BTreeMap<String, DialogueGraph>,
        initial: &GameState,
        generated_at: &str,
    ) -> NarrativeSimReport {
        let mut report = NarrativeSimReport {
            generated_at: generated_at.to_string(),
            options: self.options,
            totals: ReportTotals::default(),
            per_graph: BTreeMap::new(),
            failures: Vec::new(),
            required_state_mismatches: Vec::new(),
        };

        for (key, graph) in graphs {
            debug!("simulating graph '{key}'");
            let run = self.run_graph(key, graph, initial);
            report.totals.graphs += 1;
            report.totals.expansions += run.totals.expansions;
            report.totals.visited_state_pairs += run.totals.visited_state_pairs;
            report.totals.failures += run.totals.failures;
            report.totals.required_state_mismatches += run.totals.required_state_mismatches;
            report.per_graph.insert(key.clone(), run.totals);
            report.failures.extend(run.failures);
            report
                .required_state_mismatches
                .extend(run.required_state_mismatches);
        }

        report
    }

    /// Explore one graph from its declared start node.
    pub fn run_graph(&self, key: &str, graph: &DialogueGraph, initial: &GameState) -> GraphRun {
        let mut run = GraphRun {
            totals: GraphTotals::default(),
            failures: Vec::new(),
            required_state_mismatches: Vec::new(),
        };
        let subject = graph.character.as_ref();

        // A virtual start means the whole graph is an out-of-graph
        // hand-off; nothing to simulate.
        if graph.start_node.is_virtual() {
            return run;
        }

        // A missing start makes the graph unusable; report and stop.
        if !graph.contains(&graph.start_node) {
            run.failures.push(SimFailure {
                graph: key.to_string(),
                node: graph.start_node.clone(),
                kind: FailureKind::MissingStart,
                trace: Vec::new(),
            });
            run.totals.failures = 1;
            return run;
        }

        let mut seed = initial.clone();
        if graph.revisit {
            self.seed_revisit(graph, &mut seed);
        }

        let mut queue: VecDeque<Frontier> = VecDeque::new();
        let mut visited: FxHashSet<(NodeId, u64)> = FxHashSet::default();
        let mut states_per_node: FxHashMap<NodeId, u32> = FxHashMap::default();
        let mut failed_nodes: FxHashSet<NodeId> = FxHashSet::default();
        let mut mismatched_nodes: FxHashSet<NodeId> = FxHashSet::default();

        let seed_signature = state_signature(&seed, subject);
        visited.insert((graph.start_node.clone(), seed_signature));
        states_per_node.insert(graph.start_node.clone(), 1);
        run.totals.visited_state_pairs = 1;
        queue.push_back(Frontier {
            node: graph.start_node.clone(),
            state: seed,
            trace: Vec::new(),
            steps: 0,
        });

        while let Some(item) = queue.pop_front() {
            if run.totals.expansions >= u64::from(self.options.max_expansions) {
                run.totals.truncated = true;
                break;
            }

            let node = match graph.node(&item.node) {
                Some(node) => node,
                // Only in-graph targets are enqueued; nothing to do.
                None => continue,
            };

            // First discovery per node wins; a failed node is not
            // expanded again under other states.
            if failed_nodes.contains(&item.node) {
                continue;
            }

            run.totals.expansions += 1;

            // Node gate. A rejection is informational, not a failure.
            if !evaluate(
                node.required_state.as_ref(),
                &item.state,
                subject,
                &item.state.skills,
                self.registry,
            ) {
                if mismatched_nodes.insert(item.node.clone()) {
                    run.required_state_mismatches.push(StateMismatch {
                        graph: key.to_string(),
                        node: item.node.clone(),
                        trace: item.trace.clone(),
                    });
                }
                continue;
            }

            // Enter the node.
            let mut state = item.state;
            state.current_node = Some(node.id.clone());
            if let Some(id) = subject {
                if let Some(entry) = state.characters.get_mut(id) {
                    entry.history.push(node.id.clone());
                }
            }
            for change in &node.on_enter {
                state = apply_state_change(&state, change, self.registry).state;
            }

            // Choiceless nodes are valid only as recognized boundaries.
            if node.choices.is_empty() {
                if !node.is_boundary() {
                    failed_nodes.insert(item.node.clone());
                    run.failures.push(SimFailure {
                        graph: key.to_string(),
                        node: item.node.clone(),
                        kind: FailureKind::HardDeadEnd,
                        trace: item.trace.clone(),
                    });
                }
                continue;
            }

            // Qualifying choices under the post-on_enter state, sorted by
            // choice id for determinism.
            let mut qualifying: Vec<&DialogueChoice> = node
                .choices
                .iter()
                .filter(|choice| {
                    evaluate(
                        choice.visible_if.as_ref(),
                        &state,
                        subject,
                        &state.skills,
                        self.registry,
                    ) && evaluate(
                        choice.enabled_if.as_ref(),
                        &state,
                        subject,
                        &state.skills,
                        self.registry,
                    )
                })
                .collect();
            qualifying.sort_by(|a, b| a.id.cmp(&b.id));

            if qualifying.is_empty() {
                failed_nodes.insert(item.node.clone());
                run.failures.push(SimFailure {
                    graph: key.to_string(),
                    node: item.node.clone(),
                    kind: FailureKind::SoftDeadlock,
                    trace: item.trace.clone(),
                });
                continue;
            }

            if item.steps >= self.options.max_steps_per_path {
                run.totals.truncated = true;
                continue;
            }

            for choice in qualifying {
                // Virtual targets are hand-off boundaries; cross-graph
                // links are outside this engine's responsibility. Neither
                // is followed.
                if choice.next_node.is_virtual() || !graph.contains(&choice.next_node) {
                    continue;
                }

                let mut branched = state.clone();
                if let Some(change) = effective_change(choice) {
                    branched = apply_state_change(&branched, &change, self.registry).state;
                }
                for change in &node.on_exit {
                    branched = apply_state_change(&branched, change, self.registry).state;
                }

                let signature = state_signature(&branched, subject);
                let visit_key = (choice.next_node.clone(), signature);
                if visited.contains(&visit_key) {
                    continue;
                }

                let seen = states_per_node.entry(choice.next_node.clone()).or_insert(0);
                if *seen >= self.options.max_states_per_node {
                    // Bounded blow-up from flag/pattern permutations;
                    // skip, do not fail.
                    continue;
                }

                visited.insert(visit_key);
                *seen += 1;
                run.totals.visited_state_pairs += 1;

                let mut trace = item.trace.clone();
                trace.push(TraceStep {
                    node: node.id.clone(),
                    choice: choice.id.clone(),
                    next: choice.next_node.clone(),
                });
                queue.push_back(Frontier {
                    node: choice.next_node.clone(),
                    state: branched,
                    trace,
                    steps: item.steps + 1,
                });
            }
        }

        run.totals.failures = run.failures.len() as u64;
        run.totals.required_state_mismatches = run.required_state_mismatches.len() as u64;
        run
    }

    /// Synthetic entry seed for revisit-only graphs: a representative
    /// arc-complete flag for the subject plus the first knowledge flag any
    /// branch condition requires. A documented approximation — revisit
    /// results are best-effort, not exhaustive.
    fn seed_revisit(&self, graph: &DialogueGraph, seed: &mut GameState) {
        let subject = match &graph.character {
            Some(subject) => subject,
            None => return,
        };
        seed.global_flags
            .insert(format!("{}_arc_complete", subject.as_str()));
        if let Some(flag) = first_required_knowledge(graph) {
            let entry = seed.characters.entry(subject.clone()).or_default();
            entry.knowledge_flags.insert(flag);
        }
    }
}

/// The state change a choice applies when taken: its consequence with the
/// single pattern increment folded in, so the mutation engine's ordering
/// (patterns before trust) holds within the one call.
pub fn effective_change(choice: &DialogueChoice) -> Option<StateChange> {
    match (&choice.consequence, choice.pattern) {
        (Some(consequence), pattern) => {
            let mut change = consequence.clone();
            if change.choice_pattern.is_none() {
                change.choice_pattern = pattern;
            }
            Some(change)
        }
        (None, Some(pattern)) => Some(StateChange {
            choice_pattern: Some(pattern),
            ..Default::default()
        }),
        (None, None) => None,
    }
}

/// First knowledge flag any node or choice condition requires, in node
/// order. Used by the revisit seeding rule.
fn first_required_knowledge(graph: &DialogueGraph) -> Option<String> {
    for node in graph.nodes.values() {
        let conditions = node
            .required_state
            .iter()
            .chain(node.choices.iter().flat_map(|choice| {
                choice.visible_if.iter().chain(choice.enabled_if.iter())
            }));
        for condition in conditions {
            if let Some(flag) = condition.has_knowledge.first() {
                return Some(flag.clone());
            }
        }
    }
    None
}
