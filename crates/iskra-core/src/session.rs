//! # Session Aggregate
//!
//! The full per-user conversational state: vitals, causal memory graph,
//! current phase, the first-contact flag, and two opaque extension
//! blobs that round-trip through storage untouched.
//!
//! A session converts losslessly to and from the durable
//! [`SessionRecord`]; a record that restores partially (skipped nodes,
//! unknown phase tag) still yields a usable session.

use crate::formats::{GraphSnapshot, SessionRecord, RECORD_VERSION};
use crate::graph::CausalMemoryGraph;
use crate::types::{IskraError, Metrics, Phase};
use std::collections::BTreeMap;

/// Log a storage error and convert the result to `Option`.
///
/// Storage failures degrade rather than block a turn, but they are
/// always logged first; silent error swallowing is the thing this
/// helper exists to prevent.
#[inline]
pub(crate) fn log_and_warn<T>(result: Result<T, IskraError>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            crate::logging::warn(
                "iskra_core::session",
                &format!("storage error in {context}: {e}"),
            );
            None
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One user's complete conversational state.
#[derive(Debug, Clone)]
pub struct Session {
    pub metrics: Metrics,
    pub graph: CausalMemoryGraph,
    pub phase: Phase,
    pub first_contact: bool,
    pub aux1: BTreeMap<String, serde_json::Value>,
    pub aux2: BTreeMap<String, serde_json::Value>,
}

impl Session {
    /// A brand-new first-contact session in the initial phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Metrics::default(),
            graph: CausalMemoryGraph::new(),
            phase: Phase::Transition,
            first_contact: true,
            aux1: BTreeMap::new(),
            aux2: BTreeMap::new(),
        }
    }

    /// Rebuild a session from its durable record.
    ///
    /// Infallible: whatever the record failed to carry restores to
    /// documented defaults, and the graph restores node by node.
    #[must_use]
    pub fn from_record(record: SessionRecord) -> Self {
        let phase = record.phase();
        Self {
            metrics: record.metrics.clamped(),
            graph: record.graph.restore(),
            phase,
            first_contact: record.first_contact,
            aux1: record.aux1,
            aux2: record.aux2,
        }
    }

    /// Capture the session into its durable record.
    pub fn to_record(&self) -> Result<SessionRecord, IskraError> {
        Ok(SessionRecord {
            version: RECORD_VERSION,
            metrics: self.metrics.clone(),
            graph: GraphSnapshot::capture(&self.graph)?,
            phase: self.phase.name().to_owned(),
            first_contact: self.first_contact,
            aux1: self.aux1.clone(),
            aux2: self.aux2.clone(),
        })
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
