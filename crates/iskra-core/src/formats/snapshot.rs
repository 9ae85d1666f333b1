//! # Session Record Format
//!
//! JSON serialization for session state.
//!
//! The record is self-describing text: every node carries its own
//! `node_type` tag and every field is individually defaulted, so a
//! record written by an older build (or damaged in storage) restores
//! to documented safe values instead of failing.
//!
//! Restore is an explicit collect-and-continue loop: each node payload
//! parses on its own, a failing node is skipped with a warning, and
//! link rows that reference skipped nodes are dropped. Only a record
//! that fails to parse as a whole counts as corrupt, and the store
//! maps that to "no session found".
//!
//! Pre-deserialization validation caps the payload size before any
//! parsing to prevent allocation exhaustion from corrupted rows.

use crate::graph::CausalMemoryGraph;
use crate::primitives::MAX_SESSION_RECORD_SIZE;
use crate::types::{GrowthEntry, IskraError, Metrics, Node, NodeId, Phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current record schema version.
pub const RECORD_VERSION: u32 = 1;

#[inline]
fn warn(message: &str) {
    crate::logging::warn("iskra_core::formats", message);
}

// =============================================================================
// GRAPH SNAPSHOT
// =============================================================================

/// Serialized form of a [`CausalMemoryGraph`].
///
/// Nodes are keyed by their id rendered as a string so each payload is
/// an independent JSON value: one unreadable node never poisons its
/// siblings during restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub links: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    pub growth: Vec<GrowthEntry>,
}

impl GraphSnapshot {
    /// Capture a graph into its serialized form.
    ///
    /// Node ids and the full adjacency are preserved so trace lookups
    /// keep working across a restart.
    pub fn capture(graph: &CausalMemoryGraph) -> Result<Self, IskraError> {
        let mut nodes = BTreeMap::new();
        for node in graph.nodes() {
            let value = serde_json::to_value(node)
                .map_err(|e| IskraError::Serialization(e.to_string()))?;
            nodes.insert(node.id.0.to_string(), value);
        }
        let links = graph
            .links()
            .map(|(from, targets)| {
                (
                    from.0.to_string(),
                    targets.iter().map(|t| t.0).collect::<Vec<u64>>(),
                )
            })
            .collect();
        let growth = graph.growth_entries().iter().cloned().collect();
        Ok(Self {
            nodes,
            links,
            growth,
        })
    }

    /// Rebuild a graph, skipping what cannot be restored.
    ///
    /// Each node parses individually through the tagged [`Node`]
    /// deserializer. A node with an unknown tag or a broken payload is
    /// skipped with a warning; links touching skipped nodes are dropped.
    #[must_use]
    pub fn restore(&self) -> CausalMemoryGraph {
        let mut graph = CausalMemoryGraph::new();
        for (key, value) in &self.nodes {
            let Ok(id) = key.parse::<u64>() else {
                warn(&format!("skipping node with non-numeric id {key:?}"));
                continue;
            };
            match serde_json::from_value::<Node>(value.clone()) {
                Ok(mut node) => {
                    // The map key is authoritative; a payload id that
                    // disagrees is stale data.
                    node.id = NodeId(id);
                    graph.insert_restored(node);
                }
                Err(e) => {
                    warn(&format!("skipping unreadable node {id}: {e}"));
                }
            }
        }
        for (key, targets) in &self.links {
            let Ok(from) = key.parse::<u64>() else {
                continue;
            };
            graph.insert_restored_links(
                NodeId(from),
                targets.iter().map(|t| NodeId(*t)).collect(),
            );
        }
        for entry in &self.growth {
            graph.log_growth_entry(entry.clone());
        }
        graph
    }
}

// =============================================================================
// SESSION RECORD
// =============================================================================

fn default_version() -> u32 {
    RECORD_VERSION
}

fn default_phase_tag() -> String {
    Phase::Transition.name().to_owned()
}

fn default_true() -> bool {
    true
}

/// The durable per-key session row.
///
/// The phase is stored as its lowercase tag rather than the enum so an
/// unknown tag from a future schema degrades to the initial phase
/// instead of failing the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub graph: GraphSnapshot,
    #[serde(default = "default_phase_tag")]
    pub phase: String,
    #[serde(default = "default_true")]
    pub first_contact: bool,
    /// Opaque extension mapping, round-tripped untouched.
    #[serde(default)]
    pub aux1: BTreeMap<String, serde_json::Value>,
    /// Opaque extension mapping, round-tripped untouched.
    #[serde(default)]
    pub aux2: BTreeMap<String, serde_json::Value>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            metrics: Metrics::default(),
            graph: GraphSnapshot::default(),
            phase: default_phase_tag(),
            first_contact: true,
            aux1: BTreeMap::new(),
            aux2: BTreeMap::new(),
        }
    }
}

impl SessionRecord {
    /// The persisted phase, degraded to [`Phase::Transition`] when the
    /// tag is unknown.
    #[must_use]
    pub fn phase(&self) -> Phase {
        Phase::parse_lenient(&self.phase).unwrap_or_else(|| {
            warn(&format!(
                "unknown phase tag {:?}, degrading to transition",
                self.phase
            ));
            Phase::Transition
        })
    }
}

/// Serialize a record to its textual row bytes.
pub fn encode_record(record: &SessionRecord) -> Result<Vec<u8>, IskraError> {
    let bytes =
        serde_json::to_vec(record).map_err(|e| IskraError::Serialization(e.to_string()))?;
    if bytes.len() > MAX_SESSION_RECORD_SIZE {
        return Err(IskraError::Serialization(format!(
            "session record of {} bytes exceeds limit {}",
            bytes.len(),
            MAX_SESSION_RECORD_SIZE
        )));
    }
    Ok(bytes)
}

/// Parse row bytes back into a record.
///
/// The size cap is enforced before parsing. Any failure is a
/// [`IskraError::Deserialization`]; callers treat it as "no session".
pub fn decode_record(bytes: &[u8]) -> Result<SessionRecord, IskraError> {
    if bytes.len() > MAX_SESSION_RECORD_SIZE {
        return Err(IskraError::Deserialization(format!(
            "stored record of {} bytes exceeds limit {}",
            bytes.len(),
            MAX_SESSION_RECORD_SIZE
        )));
    }
    serde_json::from_slice(bytes).map_err(|e| IskraError::Deserialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Facet, MicroObservation, NodeKind, NodePayload, ReflectionTrace, SelfEventRecord,
    };

    fn sample_graph() -> CausalMemoryGraph {
        let mut graph = CausalMemoryGraph::new();
        let memory = graph.log_interaction_cycle(
            "input",
            "reply",
            Facet::Relief,
            ReflectionTrace::new("d", "e", 0.7, "f"),
            Metrics::default(),
            0.6,
            MicroObservation::from_text_length(5),
            vec![],
        );
        graph.log_self_event("anchor", "drift_anchor", memory);
        graph.log_growth_entry(GrowthEntry {
            impact_area: "relief".into(),
            resonance_level: 0.6,
            trace: "t".into(),
        });
        graph
    }

    #[test]
    fn snapshot_restore_resnapshot_is_identical() {
        let graph = sample_graph();
        let first = GraphSnapshot::capture(&graph).expect("capture");
        let restored = first.restore();
        let second = GraphSnapshot::capture(&restored).expect("recapture");
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.links, second.links);
        assert_eq!(first.growth, second.growth);
    }

    #[test]
    fn broken_node_is_skipped_without_poisoning_siblings() {
        let graph = sample_graph();
        let mut snapshot = GraphSnapshot::capture(&graph).expect("capture");
        let total = snapshot.nodes.len();
        snapshot
            .nodes
            .insert("999".into(), serde_json::json!({"node_type": "wormhole"}));
        let restored = snapshot.restore();
        assert_eq!(restored.node_count(), total);
        assert!(restored.get_node(NodeId(999)).is_none());
    }

    #[test]
    fn links_to_skipped_nodes_are_dropped() {
        let mut graph = CausalMemoryGraph::new();
        let a = graph.add_node(NodePayload::SelfEvent(SelfEventRecord {
            declaration: "a".into(),
            trigger: "t".into(),
        }));
        let b = graph.add_node(NodePayload::SelfEvent(SelfEventRecord {
            declaration: "b".into(),
            trigger: "t".into(),
        }));
        graph.add_link(a, b);
        let mut snapshot = GraphSnapshot::capture(&graph).expect("capture");
        snapshot.nodes.remove(&b.0.to_string());
        let restored = snapshot.restore();
        assert!(restored.linked_nodes(a).is_empty());
    }

    #[test]
    fn record_roundtrip_preserves_aux_blobs() {
        let mut record = SessionRecord::default();
        record
            .aux1
            .insert("ritual".into(), serde_json::json!({"count": 3}));
        record.phase = Phase::Silence.name().to_owned();
        record.first_contact = false;
        let bytes = encode_record(&record).expect("encode");
        let back = decode_record(&bytes).expect("decode");
        assert_eq!(back.phase(), Phase::Silence);
        assert!(!back.first_contact);
        assert_eq!(back.aux1["ritual"]["count"], 3);
    }

    #[test]
    fn empty_object_decodes_to_fresh_defaults() {
        let back = decode_record(b"{}").expect("decode");
        assert!(back.first_contact);
        assert_eq!(back.phase(), Phase::Transition);
        assert!((back.metrics.trust - 1.0).abs() < 1e-12);
        assert_eq!(back.graph.restore().node_count(), 0);
    }

    #[test]
    fn unknown_phase_tag_degrades_to_transition() {
        let back = decode_record(br#"{"phase": "phase_9_unknown"}"#).expect("decode");
        assert_eq!(back.phase(), Phase::Transition);
    }

    #[test]
    fn garbage_bytes_fail_as_deserialization() {
        let err = decode_record(b"not json at all").expect_err("must fail");
        assert!(matches!(err, IskraError::Deserialization(_)));
    }

    #[test]
    fn restored_nodes_keep_their_kinds() {
        let snapshot = GraphSnapshot::capture(&sample_graph()).expect("capture");
        let restored = snapshot.restore();
        let kinds: Vec<NodeKind> = restored.nodes().map(Node::kind).collect();
        assert!(kinds.contains(&NodeKind::Memory));
        assert!(kinds.contains(&NodeKind::SelfEvent));
    }
}
