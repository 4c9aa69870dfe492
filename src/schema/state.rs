/// Core save-point data model. Plain state with derivation helpers;
/// all mutation goes through `core::mutate::apply_state_change`.
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive trust floor.
pub const TRUST_MIN: i32 = 0;
/// Inclusive trust ceiling.
pub const TRUST_MAX: i32 = 10;
/// Trust at or above this derives `Confidant`.
pub const CONFIDANT_THRESHOLD: i32 = 8;
/// Trust at or above this derives `Acquaintance`.
pub const ACQUAINTANCE_THRESHOLD: i32 = 4;

/// Prefix marking out-of-graph hand-off targets (cross-scene transfers).
const VIRTUAL_NODE_PREFIX: &str = "virtual:";

/// Newtype wrapper for dialogue node IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this ID names an out-of-graph hand-off rather than
    /// an authored node. The simulator treats these as boundaries, not
    /// failures.
    pub fn is_virtual(&self) -> bool {
        self.0.starts_with(VIRTUAL_NODE_PREFIX)
    }
}

/// Newtype wrapper for character IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Newtype wrapper for skill IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(pub String);

impl SkillId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// The five tracked behavioral tendencies. Counters only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Analytical,
    Helping,
    Building,
    Patience,
    Exploring,
}

impl PatternKind {
    /// Fixed iteration order used by hashing and reporting.
    pub const ALL: [PatternKind; 5] = [
        Self::Analytical,
        Self::Helping,
        Self::Building,
        Self::Patience,
        Self::Exploring,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Analytical => "analytical",
            Self::Helping => "helping",
            Self::Building => "building",
            Self::Patience => "patience",
            Self::Exploring => "exploring",
        }
    }
}

/// The fixed-shape pattern vector: one non-negative counter per tendency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patterns {
    #[serde(default)]
    pub analytical: u32,
    #[serde(default)]
    pub helping: u32,
    #[serde(default)]
    pub building: u32,
    #[serde(default)]
    pub patience: u32,
    #[serde(default)]
    pub exploring: u32,
}

impl Patterns {
    pub fn get(&self, kind: PatternKind) -> u32 {
        match kind {
            PatternKind::Analytical => self.analytical,
            PatternKind::Helping => self.helping,
            PatternKind::Building => self.building,
            PatternKind::Patience => self.patience,
            PatternKind::Exploring => self.exploring,
        }
    }

    /// Saturating increment; patterns never decrease.
    pub fn add(&mut self, kind: PatternKind, amount: u32) {
        let slot = match kind {
            PatternKind::Analytical => &mut self.analytical,
            PatternKind::Helping => &mut self.helping,
            PatternKind::Building => &mut self.building,
            PatternKind::Patience => &mut self.patience,
            PatternKind::Exploring => &mut self.exploring,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn total(&self) -> u32 {
        PatternKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// A tendency's fraction of all recorded counts, 0.0 when nothing has
    /// been recorded yet.
    pub fn share(&self, kind: PatternKind) -> f32 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.get(kind) as f32 / total as f32
        }
    }

    /// The strongest tendency, ties broken by `PatternKind::ALL` order.
    /// `None` until at least one count is recorded.
    pub fn dominant(&self) -> Option<PatternKind> {
        let mut best: Option<(PatternKind, u32)> = None;
        for kind in PatternKind::ALL {
            let count = self.get(kind);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((kind, count));
            }
        }
        best.map(|(k, _)| k)
    }
}

/// Relationship tier with a character, derived from trust unless a
/// state change carries an explicit override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Stranger,
    Acquaintance,
    Confidant,
}

impl Default for RelationshipStatus {
    fn default() -> Self {
        Self::Stranger
    }
}

impl RelationshipStatus {
    /// Derive the tier from a trust score via the fixed thresholds.
    pub fn from_trust(trust: i32) -> Self {
        if trust >= CONFIDANT_THRESHOLD {
            Self::Confidant
        } else if trust >= ACQUAINTANCE_THRESHOLD {
            Self::Acquaintance
        } else {
            Self::Stranger
        }
    }
}

/// Streak-sensitive multiplier state for a character's trust changes.
/// Created lazily on the first trust delta; decays toward 0 across idle
/// sessions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrustMomentum {
    /// Current momentum in [-1, 1].
    pub momentum: f32,
    pub consecutive_positive: u32,
    pub consecutive_negative: u32,
    /// Session index of the last applied trust delta.
    pub last_change_session: u64,
}

impl TrustMomentum {
    pub fn new(session: u64) -> Self {
        Self {
            momentum: 0.0,
            consecutive_positive: 0,
            consecutive_negative: 0,
            last_change_session: session,
        }
    }
}

/// A pending check-in queued for a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub node: NodeId,
    pub queued_at_session: u64,
}

/// Per-character record inside a `GameState`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterState {
    pub trust: i32,
    #[serde(default)]
    pub relationship: RelationshipStatus,
    #[serde(default)]
    pub knowledge_flags: FxHashSet<String>,
    #[serde(default)]
    pub momentum: Option<TrustMomentum>,
    /// Append-only log of visited node IDs.
    #[serde(default)]
    pub history: Vec<NodeId>,
    #[serde(default)]
    pub pending_check_ins: Vec<CheckIn>,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            trust: TRUST_MIN,
            relationship: RelationshipStatus::Stranger,
            knowledge_flags: FxHashSet::default(),
            momentum: None,
            history: Vec::new(),
            pending_check_ins: Vec::new(),
        }
    }
}

/// Progress on one mystery track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MysteryStage {
    Unknown,
    Hinted,
    Partial,
    Solved,
}

impl Default for MysteryStage {
    fn default() -> Self {
        Self::Unknown
    }
}

/// The station's mystery tracks. Fixed shape; stages only move by
/// explicit override in a state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MysteryProgress {
    #[serde(default)]
    pub station_origin: MysteryStage,
    #[serde(default)]
    pub missing_crew: MysteryStage,
    #[serde(default)]
    pub signal_source: MysteryStage,
}

/// Partial view over the mystery tracks. Doubles as an override (shallow
/// merge of present tracks) and as a requirement (exact match on present
/// tracks).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MysteryFields {
    #[serde(default)]
    pub station_origin: Option<MysteryStage>,
    #[serde(default)]
    pub missing_crew: Option<MysteryStage>,
    #[serde(default)]
    pub signal_source: Option<MysteryStage>,
}

impl MysteryFields {
    pub fn is_empty(&self) -> bool {
        self.station_origin.is_none()
            && self.missing_crew.is_none()
            && self.signal_source.is_none()
    }

    /// Shallow-merge present tracks into `progress`.
    pub fn apply_to(&self, progress: &mut MysteryProgress) {
        if let Some(stage) = self.station_origin {
            progress.station_origin = stage;
        }
        if let Some(stage) = self.missing_crew {
            progress.missing_crew = stage;
        }
        if let Some(stage) = self.signal_source {
            progress.signal_source = stage;
        }
    }

    /// True when every present track matches `progress` exactly.
    pub fn matches(&self, progress: &MysteryProgress) -> bool {
        self.station_origin.map_or(true, |s| s == progress.station_origin)
            && self.missing_crew.map_or(true, |s| s == progress.missing_crew)
            && self.signal_source.map_or(true, |s| s == progress.signal_source)
    }
}

/// An entry in the player's thought list. The mutation engine replaces an
/// existing entry with the same id, otherwise appends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtEntry {
    pub id: String,
    pub text: String,
    pub session: u64,
}

/// The complete save-point. Owned by the caller; the engine never keeps a
/// reference across calls — every mutation returns a new value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub current_node: Option<NodeId>,
    #[serde(default)]
    pub characters: BTreeMap<CharacterId, CharacterState>,
    #[serde(default)]
    pub global_flags: FxHashSet<String>,
    #[serde(default)]
    pub patterns: Patterns,
    #[serde(default)]
    pub mystery: MysteryProgress,
    #[serde(default)]
    pub skills: BTreeMap<SkillId, u32>,
    #[serde(default)]
    pub thoughts: Vec<ThoughtEntry>,
    /// Session index, advanced by the caller between play sessions.
    /// Drives momentum decay.
    #[serde(default)]
    pub session: u64,
}

impl GameState {
    pub fn character(&self, id: &CharacterId) -> Option<&CharacterState> {
        self.characters.get(id)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.global_flags.contains(flag)
    }
}
