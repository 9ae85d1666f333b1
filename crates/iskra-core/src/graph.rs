//! # Causal Memory Graph
//!
//! The per-session directed graph of conversation artifacts.
//!
//! Every turn deposits one cluster of nodes (micro observation,
//! evidence, meta reflection, memory event) wired with causal links
//! from the memory node outward. All data structures use `BTreeMap`
//! for deterministic ordering.
//!
//! Growth entries live alongside the graph rather than inside it; they
//! summarize the qualitative effect of each cycle without polluting the
//! causal link structure, and their ring is bounded at
//! [`GROWTH_LOG_CAPACITY`](crate::primitives::GROWTH_LOG_CAPACITY).

use crate::primitives::{DEFAULT_CONTEXT_LIMIT, GROWTH_LOG_CAPACITY};
use crate::types::{
    EvidenceRecord, Facet, GrowthEntry, MemoryRecord, MetaRecord, Metrics, MicroObservation, Node,
    NodeId, NodeKind, NodePayload, ReflectionTrace, SelfEventRecord,
};
use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. Degrades to 0 on a pre-epoch clock.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[inline]
fn warn(message: &str) {
    crate::logging::warn("iskra_core::graph", message);
}

// =============================================================================
// CAUSAL MEMORY GRAPH
// =============================================================================

/// A directed graph capturing all conversation artifacts for one session.
#[derive(Debug, Clone, Default)]
pub struct CausalMemoryGraph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<NodeId, Vec<NodeId>>,
    growth: VecDeque<GrowthEntry>,
    next_id: u64,
}

impl CausalMemoryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a payload under a freshly allocated id. Ids are monotonic
    /// within a session and never reused, even after node removal.
    pub fn add_node(&mut self, payload: NodePayload) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                timestamp_ms: now_ms(),
                payload,
            },
        );
        id
    }

    /// Re-insert a node restored from a snapshot, keeping its original id
    /// so persisted trace links stay valid.
    pub fn insert_restored(&mut self, node: Node) {
        self.next_id = self.next_id.max(node.id.0 + 1);
        self.nodes.insert(node.id, node);
    }

    /// Restore a link row from a snapshot. Targets pointing at nodes that
    /// failed to restore are dropped silently.
    pub fn insert_restored_links(&mut self, from: NodeId, targets: Vec<NodeId>) {
        if !self.nodes.contains_key(&from) {
            return;
        }
        let kept: Vec<NodeId> = targets
            .into_iter()
            .filter(|t| self.nodes.contains_key(t))
            .collect();
        if !kept.is_empty() {
            self.links.insert(from, kept);
        }
    }

    /// Create a directed causal link if both endpoints exist.
    ///
    /// A missing endpoint is logged and skipped, never an error: link
    /// integrity problems must not break a live turn. Duplicate targets
    /// are ignored.
    pub fn add_link(&mut self, from: NodeId, to: NodeId) {
        if !self.nodes.contains_key(&from) || !self.nodes.contains_key(&to) {
            warn(&format!(
                "attempted to link unknown nodes {} -> {}",
                from.0, to.0
            ));
            return;
        }
        let targets = self.links.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    #[must_use]
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes reachable from `id` via one hop, in link insertion order.
    #[must_use]
    pub fn linked_nodes(&self, id: NodeId) -> Vec<&Node> {
        self.links
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|t| self.nodes.get(t))
            .collect()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate all nodes in id order. Used by snapshot serialization.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate all link rows in source id order.
    pub fn links(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> {
        self.links.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    #[must_use]
    pub fn growth_entries(&self) -> &VecDeque<GrowthEntry> {
        &self.growth
    }

    // -------------------------------------------------------------------------
    // Turn logging
    // -------------------------------------------------------------------------

    /// Record one full interaction cycle.
    ///
    /// Inserts the micro observation, any evidence, the meta reflection
    /// and the memory event, then links the memory node to each of them
    /// in that order. Returns the id of the new memory node.
    #[allow(clippy::too_many_arguments)]
    pub fn log_interaction_cycle(
        &mut self,
        user_input: &str,
        response_content: &str,
        facet: Facet,
        trace: ReflectionTrace,
        metrics_snapshot: Metrics,
        integrative_index: f64,
        micro: MicroObservation,
        evidence: Vec<EvidenceRecord>,
    ) -> NodeId {
        let micro_log_id = self.add_node(NodePayload::MicroLog(micro));
        let evidence_ids: Vec<NodeId> = evidence
            .into_iter()
            .map(|ev| self.add_node(NodePayload::Evidence(ev)))
            .collect();
        let meta_id = self.add_node(NodePayload::Meta(MetaRecord {
            trace,
            metrics_snapshot,
            integrative_index,
        }));
        let memory_id = self.add_node(NodePayload::Memory(MemoryRecord {
            user_input: user_input.to_owned(),
            response_content: response_content.to_owned(),
            facet,
            meta_id,
            micro_log_id,
            evidence_ids: evidence_ids.clone(),
        }));
        self.add_link(memory_id, meta_id);
        self.add_link(memory_id, micro_log_id);
        for ev_id in evidence_ids {
            self.add_link(memory_id, ev_id);
        }
        memory_id
    }

    /// Append a growth entry, evicting the oldest past capacity.
    pub fn log_growth_entry(&mut self, entry: GrowthEntry) {
        if self.growth.len() >= GROWTH_LOG_CAPACITY {
            self.growth.pop_front();
        }
        self.growth.push_back(entry);
    }

    /// Record a self-reflection event linked to the memory node that
    /// triggered it.
    pub fn log_self_event(
        &mut self,
        declaration: &str,
        trigger: &str,
        memory_id: NodeId,
    ) -> NodeId {
        let id = self.add_node(NodePayload::SelfEvent(SelfEventRecord {
            declaration: declaration.to_owned(),
            trigger: trigger.to_owned(),
        }));
        self.add_link(id, memory_id);
        id
    }

    // -------------------------------------------------------------------------
    // Retrieval
    // -------------------------------------------------------------------------

    /// The latest memory nodes, oldest first.
    ///
    /// Ties on timestamp resolve by id, which preserves insertion order
    /// for turns recorded within the same millisecond.
    #[must_use]
    pub fn retrieve_context(&self, limit: usize) -> Vec<&Node> {
        let mut memories: Vec<&Node> = self
            .nodes
            .values()
            .filter(|n| n.kind() == NodeKind::Memory)
            .collect();
        memories.sort_by_key(|n| (n.timestamp_ms, n.id));
        let skip = memories.len().saturating_sub(limit);
        memories.split_off(skip)
    }

    /// Recent context with the default window.
    #[must_use]
    pub fn recent_context(&self) -> Vec<&Node> {
        self.retrieve_context(DEFAULT_CONTEXT_LIMIT)
    }
}

// =============================================================================
// TESTS
// =============================================================================
