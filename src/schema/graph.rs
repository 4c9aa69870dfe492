/// Authored dialogue graph types and RON loading.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::change::StateChange;
use super::condition::StateCondition;
use super::state::{CharacterId, NodeId, PatternKind};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Tags marking a node as an intentional leaf. Any tag makes a choiceless
/// node a recognized boundary instead of a dead end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeTag {
    Terminal,
    Ending,
    SessionBoundary,
    ArcComplete,
    /// Hand-off to simulation outside this graph's responsibility.
    Handoff,
}

/// One selectable option on a dialogue node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueChoice {
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Gate on whether the choice is shown at all.
    #[serde(default)]
    pub visible_if: Option<StateCondition>,
    /// Gate on whether a shown choice can be taken.
    #[serde(default)]
    pub enabled_if: Option<StateCondition>,
    #[serde(default)]
    pub consequence: Option<StateChange>,
    /// Single pattern increment recorded when the choice is taken.
    #[serde(default)]
    pub pattern: Option<PatternKind>,
    pub next_node: NodeId,
}

/// One node of the dialogue graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: NodeId,
    #[serde(default)]
    pub speaker: Option<CharacterId>,
    /// Authored line; opaque to the engine.
    #[serde(default)]
    pub text: String,
    /// Gate on entering the node itself.
    #[serde(default)]
    pub required_state: Option<StateCondition>,
    #[serde(default)]
    pub choices: Vec<DialogueChoice>,
    #[serde(default)]
    pub on_enter: Vec<StateChange>,
    #[serde(default)]
    pub on_exit: Vec<StateChange>,
    #[serde(default)]
    pub tags: Vec<NodeTag>,
}

impl DialogueNode {
    /// True when the node is an intentional leaf (ending, session
    /// boundary, hand-off) rather than unfinished content.
    pub fn is_boundary(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// A complete authored dialogue graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueGraph {
    pub start_node: NodeId,
    /// The graph's subject character; scopes character conditions and the
    /// simulator's state signature.
    #[serde(default)]
    pub character: Option<CharacterId>,
    /// Authored marker for revisit-only graphs that need synthetic
    /// seeding to be traversable from a fresh state.
    #[serde(default)]
    pub revisit: bool,
    pub nodes: BTreeMap<NodeId, DialogueNode>,
}

impl DialogueGraph {
    /// Load a dialogue graph from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<DialogueGraph, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a dialogue graph from a RON string.
    pub fn parse_ron(input: &str) -> Result<DialogueGraph, GraphError> {
        let graph: DialogueGraph = ron::from_str(input)?;
        Ok(graph)
    }

    pub fn node(&self, id: &NodeId) -> Option<&DialogueNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }
}
