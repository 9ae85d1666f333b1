//! # iskra-core
//!
//! The deterministic conversational-state engine for Iskra - THE LOGIC.
//!
//! This crate implements the per-user state machine behind the Iskra
//! assistant: a facet classifier that picks which voice answers, an
//! eight-phase rhythm that paces the conversation, a slowly adapting
//! threshold layer, a causal memory graph of everything that happened,
//! and durable session storage.
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is deterministic: same session, same inputs, same outcome
//! - Owns all session state; model collaborators are injected traits
//! - Degrades on data-quality problems, never crashes on them
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod engine;
pub mod facet;
pub mod formats;
pub mod graph;
mod logging;
pub mod phase;
pub mod primitives;
pub mod session;
pub mod storage;
pub mod thresholds;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    EvidenceRecord, Facet, GrowthEntry, IskraError, MemoryRecord, MetaRecord, Metrics,
    MicroObservation, Node, NodeId, NodeKind, NodePayload, PauseKind, Phase, ReflectionTrace,
    SelfEventRecord, clamp01,
};

// =============================================================================
// RE-EXPORTS: Engine & Collaborators
// =============================================================================

pub use engine::{
    AdaptationScope, ContextItem, Engine, MetricsModel, Reply, ReplyModel, ReplyRequest,
    TurnOutcome,
};
pub use facet::{classify, voice};
pub use graph::CausalMemoryGraph;
pub use phase::{rhythm_instruction, transition};
pub use session::Session;
pub use thresholds::{
    BaseThresholds, ThresholdAdapter, ThresholdSet, Trigger,
};

// =============================================================================
// RE-EXPORTS: Formats & Storage
// =============================================================================

pub use formats::{GraphSnapshot, SessionRecord, decode_record, encode_record};
pub use storage::{MemoryStore, RedbStore, SessionStore};
