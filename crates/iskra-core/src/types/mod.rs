//! # Core Type Definitions
//!
//! This module contains all core types for the Iskra conversational-state
//! engine:
//! - The seven voices ([`Facet`]) and eight breathing phases ([`Phase`])
//! - Session vitals ([`Metrics`]) with clamped scalar fields
//! - Typed graph nodes (`Node`, [`NodePayload`]) and identifiers (`NodeId`)
//! - Micro-level input observations ([`MicroObservation`])
//! - The per-turn reflection record ([`ReflectionTrace`])
//! - Error types ([`IskraError`])
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` where they are used as `BTreeMap` keys
//! - Clamp scalar vitals into [0, 1] at construction, never reject them
//! - Serialize through serde into self-describing JSON records

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// FACET (the seven voices)
// =============================================================================

/// The seven mutually exclusive response voices.
///
/// Exactly one facet is active per turn, selected by the priority
/// cascade in [`crate::facet::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Painful truth: spoken when pain is critical.
    Pain,
    /// Structure: restores order when clarity is low.
    Structure,
    /// Tension release: irony for medium pain.
    Relief,
    /// Holding silence: active when trust is low.
    Withdrawal,
    /// Constructive chaos: breaks patterns and false stability.
    Chaos,
    /// Conscience: audits drift between words and deeds.
    Conscience,
    /// Synthesis: the default harmonizing voice.
    Synthesis,
}

impl Facet {
    /// All facets in cascade priority order.
    pub const ALL: [Facet; 7] = [
        Facet::Pain,
        Facet::Structure,
        Facet::Relief,
        Facet::Withdrawal,
        Facet::Chaos,
        Facet::Conscience,
        Facet::Synthesis,
    ];

    /// Get the facet name as a stable lowercase tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Facet::Pain => "pain",
            Facet::Structure => "structure",
            Facet::Relief => "relief",
            Facet::Withdrawal => "withdrawal",
            Facet::Chaos => "chaos",
            Facet::Conscience => "conscience",
            Facet::Synthesis => "synthesis",
        }
    }

    /// Parse a persisted tag leniently.
    ///
    /// Unknown tags return `None`; callers degrade to [`Facet::Synthesis`]
    /// rather than failing a whole restore.
    #[must_use]
    pub fn parse_lenient(tag: &str) -> Option<Self> {
        match tag {
            "pain" => Some(Facet::Pain),
            "structure" => Some(Facet::Structure),
            "relief" => Some(Facet::Relief),
            "withdrawal" => Some(Facet::Withdrawal),
            "chaos" => Some(Facet::Chaos),
            "conscience" => Some(Facet::Conscience),
            "synthesis" => Some(Facet::Synthesis),
            _ => None,
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PHASE (the breathing cycle)
// =============================================================================

/// The eight phases of the conversational breathing cycle.
///
/// Movement between phases is deterministic and handled by
/// [`crate::phase::transition`]. There is no terminal phase; the rhythm
/// cycles indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Darkness,
    Echo,
    Transition,
    Clarity,
    Silence,
    Experiment,
    Dissolution,
    Realization,
}

impl Phase {
    /// All phases in cycle order.
    pub const ALL: [Phase; 8] = [
        Phase::Darkness,
        Phase::Echo,
        Phase::Transition,
        Phase::Clarity,
        Phase::Silence,
        Phase::Experiment,
        Phase::Dissolution,
        Phase::Realization,
    ];

    /// Get the phase name as a stable lowercase tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Darkness => "darkness",
            Phase::Echo => "echo",
            Phase::Transition => "transition",
            Phase::Clarity => "clarity",
            Phase::Silence => "silence",
            Phase::Experiment => "experiment",
            Phase::Dissolution => "dissolution",
            Phase::Realization => "realization",
        }
    }

    /// Parse a persisted tag leniently.
    ///
    /// Unknown tags return `None`; callers degrade to the initial phase
    /// ([`Phase::Transition`]) rather than failing a whole restore.
    #[must_use]
    pub fn parse_lenient(tag: &str) -> Option<Self> {
        match tag {
            "darkness" => Some(Phase::Darkness),
            "echo" => Some(Phase::Echo),
            "transition" => Some(Phase::Transition),
            "clarity" => Some(Phase::Clarity),
            "silence" => Some(Phase::Silence),
            "experiment" => Some(Phase::Experiment),
            "dissolution" => Some(Phase::Dissolution),
            "realization" => Some(Phase::Realization),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Default for Phase {
    /// Sessions start in [`Phase::Transition`].
    fn default() -> Self {
        Phase::Transition
    }
}

// =============================================================================
// METRICS (session vitals)
// =============================================================================

fn default_trust() -> f64 {
    1.0
}
fn default_clarity() -> f64 {
    0.5
}
fn default_chaos() -> f64 {
    0.3
}
fn default_unit() -> f64 {
    1.0
}

/// Clamp a scalar into the unit interval.
///
/// Out-of-range vitals are a data-quality issue, not an error: they are
/// clamped, never rejected.
#[must_use]
pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// The session vitals: five core scalars, two derived scalars, and the
/// sustained-pain cycle counter.
///
/// Every scalar lives in [0, 1]. An external collaborator recomputes the
/// vector each turn before the engine consumes it; the engine only clamps
/// and reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default = "default_trust")]
    pub trust: f64,
    #[serde(default = "default_clarity")]
    pub clarity: f64,
    #[serde(default)]
    pub pain: f64,
    #[serde(default)]
    pub drift: f64,
    #[serde(default = "default_chaos")]
    pub chaos: f64,
    /// Consecutive turns with pain above the high threshold.
    #[serde(default)]
    pub sustained_pain_cycles: u32,
    /// Derived: structural integrity of the session.
    #[serde(default = "default_unit")]
    pub integrity: f64,
    /// Derived: resonance between user and assistant.
    #[serde(default = "default_unit")]
    pub resonance: f64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            trust: default_trust(),
            clarity: default_clarity(),
            pain: 0.0,
            drift: 0.0,
            chaos: default_chaos(),
            sustained_pain_cycles: 0,
            integrity: default_unit(),
            resonance: default_unit(),
        }
    }
}

impl Metrics {
    /// Return a copy with every scalar clamped into [0, 1].
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            trust: clamp01(self.trust),
            clarity: clamp01(self.clarity),
            pain: clamp01(self.pain),
            drift: clamp01(self.drift),
            chaos: clamp01(self.chaos),
            sustained_pain_cycles: self.sustained_pain_cycles,
            integrity: clamp01(self.integrity),
            resonance: clamp01(self.resonance),
        }
    }

    /// The product of integrity and resonance.
    ///
    /// A cheap scalar proxy for overall session health, used by the
    /// default integrative-index collaborator.
    #[must_use]
    pub fn fractality(&self) -> f64 {
        self.integrity * self.resonance
    }

    /// Advance the sustained-pain counter for this turn.
    ///
    /// Increments only while pain exceeds `pain_high`, otherwise resets
    /// to zero.
    pub fn observe_pain(&mut self, pain_high: f64) {
        if self.pain > pain_high {
            self.sustained_pain_cycles = self.sustained_pain_cycles.saturating_add(1);
        } else {
            self.sustained_pain_cycles = 0;
        }
    }
}

// =============================================================================
// MICRO OBSERVATION
// =============================================================================

/// Classification of a typing pause for micro-level logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseKind {
    Articulatory,
    Cognitive,
    Ritual,
}

/// Micro-level timing/complexity observation for one user turn.
///
/// Computed by the transport layer (or simulated); the engine stores it
/// verbatim on a `MicroLog` node and feeds it to the metrics collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroObservation {
    pub text_length: usize,
    #[serde(default)]
    pub pause_duration_ms: Option<u64>,
    #[serde(default)]
    pub pause_kind: Option<PauseKind>,
    /// Lempel-Ziv style complexity estimate of the input text, in [0, 1].
    #[serde(default)]
    pub lz_complexity: f64,
    /// Hurst exponent estimate of the typing rhythm, in [0, 1].
    #[serde(default = "default_clarity")]
    pub hurst_exponent: f64,
}

impl MicroObservation {
    /// Observation for a plain text turn with no timing data.
    #[must_use]
    pub fn from_text_length(text_length: usize) -> Self {
        Self {
            text_length,
            pause_duration_ms: None,
            pause_kind: None,
            lz_complexity: 0.0,
            hurst_exponent: default_clarity(),
        }
    }
}

// =============================================================================
// REFLECTION TRACE
// =============================================================================

/// The structured per-turn reflection record stored on Meta nodes.
///
/// `confidence` never reaches 1.0: certainty is capped at 0.99 by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionTrace {
    /// What changed this turn.
    #[serde(default)]
    pub delta: String,
    /// Evidence trail backing the reply.
    #[serde(default)]
    pub evidence_trace: String,
    /// Confidence in [0, 0.99].
    #[serde(default)]
    pub confidence: f64,
    /// Concrete next action owed to the user.
    #[serde(default)]
    pub followup: String,
}

impl ReflectionTrace {
    /// Build a trace, capping confidence at 0.99.
    #[must_use]
    pub fn new(
        delta: impl Into<String>,
        evidence_trace: impl Into<String>,
        confidence: f64,
        followup: impl Into<String>,
    ) -> Self {
        Self {
            delta: delta.into(),
            evidence_trace: evidence_trace.into(),
            confidence: confidence.clamp(0.0, 0.99),
            followup: followup.into(),
        }
    }
}

// =============================================================================
// GROWTH ENTRY
// =============================================================================

/// A qualitative per-turn outcome, kept in a bounded ring buffer for
/// future calibration. Growth entries are not graph nodes; they live
/// alongside the graph so causality links stay clean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEntry {
    pub impact_area: String,
    pub resonance_level: f64,
    pub trace: String,
}

// =============================================================================
// GRAPH NODES
// =============================================================================

/// Unique identifier for a node in the causal memory graph.
///
/// Ids are assigned monotonically at insertion time, so ordering by id
/// is ordering by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Discriminant for the five node payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    MicroLog,
    Evidence,
    Meta,
    SelfEvent,
    Memory,
}

/// External evidence retrieved for a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    #[serde(default)]
    pub source_query: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub title: String,
}

/// Meta-reflection for a turn: the reflection trace plus the vitals
/// snapshot and the integrative index at reply time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaRecord {
    pub trace: ReflectionTrace,
    #[serde(default)]
    pub metrics_snapshot: Metrics,
    #[serde(default)]
    pub integrative_index: f64,
}

/// A self-reflection declaration and what triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfEventRecord {
    pub declaration: String,
    pub trigger: String,
}

/// The principal record of one user interaction.
///
/// A memory node always names one Meta id and one MicroLog id; the
/// referents are enforced at write time but tolerated as missing at
/// read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub user_input: String,
    pub response_content: String,
    pub facet: Facet,
    pub meta_id: NodeId,
    pub micro_log_id: NodeId,
    #[serde(default)]
    pub evidence_ids: Vec<NodeId>,
}

/// The five typed node payloads, discriminated by `node_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum NodePayload {
    MicroLog(MicroObservation),
    Evidence(EvidenceRecord),
    Meta(MetaRecord),
    SelfEvent(SelfEventRecord),
    Memory(MemoryRecord),
}

impl NodePayload {
    /// Get the discriminant for this payload.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::MicroLog(_) => NodeKind::MicroLog,
            NodePayload::Evidence(_) => NodeKind::Evidence,
            NodePayload::Meta(_) => NodeKind::Meta,
            NodePayload::SelfEvent(_) => NodeKind::SelfEvent,
            NodePayload::Memory(_) => NodeKind::Memory,
        }
    }
}

/// A node in the causal memory graph. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Milliseconds since the Unix epoch at insertion time.
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub payload: NodePayload,
}

impl Node {
    /// Get the payload discriminant.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Iskra engine.
///
/// Propagation policy: data-quality issues (out-of-range vitals, corrupt
/// records, dangling links) never crash the process. Storage failures
/// degrade; only genuinely invalid API-boundary input surfaces as an
/// error to the caller.
#[derive(Debug, Error)]
pub enum IskraError {
    /// Input failed validation at the API boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// A durable-storage operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A link referenced a node that does not exist.
    #[error("graph integrity: link {from:?} -> {to:?} references a missing node")]
    GraphIntegrity { from: NodeId, to: NodeId },

    /// A serialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted record could not be parsed.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// An enumeration tag was not recognized at the API boundary.
    #[error("invalid enumeration value: {0}")]
    InvalidEnum(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_defaults_match_canon() {
        let m = Metrics::default();
        assert!((m.trust - 1.0).abs() < f64::EPSILON);
        assert!((m.clarity - 0.5).abs() < f64::EPSILON);
        assert!((m.chaos - 0.3).abs() < f64::EPSILON);
        assert_eq!(m.sustained_pain_cycles, 0);
    }

    #[test]
    fn metrics_clamped_into_unit_interval() {
        let m = Metrics {
            trust: 1.7,
            pain: -0.4,
            ..Metrics::default()
        }
        .clamped();
        assert!((m.trust - 1.0).abs() < f64::EPSILON);
        assert!(m.pain.abs() < f64::EPSILON);
    }

    #[test]
    fn sustained_pain_counter_increments_and_resets() {
        let mut m = Metrics {
            pain: 0.9,
            ..Metrics::default()
        };
        m.observe_pain(0.7);
        m.observe_pain(0.7);
        assert_eq!(m.sustained_pain_cycles, 2);

        m.pain = 0.2;
        m.observe_pain(0.7);
        assert_eq!(m.sustained_pain_cycles, 0);
    }

    #[test]
    fn reflection_trace_caps_confidence() {
        let trace = ReflectionTrace::new("d", "e", 1.0, "f");
        assert!((trace.confidence - 0.99).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_parse_lenient_rejects_unknown() {
        assert_eq!(Phase::parse_lenient("silence"), Some(Phase::Silence));
        assert_eq!(Phase::parse_lenient("PHASE_9_UNKNOWN"), None);
    }

    #[test]
    fn node_payload_json_is_tagged() {
        let node = Node {
            id: NodeId(7),
            timestamp_ms: 1,
            payload: NodePayload::SelfEvent(SelfEventRecord {
                declaration: "anchor".to_string(),
                trigger: "drift".to_string(),
            }),
        };
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["node_type"], "self_event");
        assert_eq!(json["declaration"], "anchor");

        let back: Node = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.kind(), NodeKind::SelfEvent);
    }
}
