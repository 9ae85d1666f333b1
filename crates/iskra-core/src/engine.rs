//! # Turn Engine
//!
//! The per-turn pipeline that wires the whole core together:
//! load session, update vitals, adapt thresholds, classify the facet,
//! transition the phase, generate the reply, log the interaction cycle,
//! and persist.
//!
//! ## Concurrency
//!
//! The load-mutate-save sequence for one session key is serialized
//! through a per-key lock table. Two concurrent requests for the same
//! key queue behind each other; requests for different keys proceed in
//! parallel. Without this, the second save wins and the first turn's
//! graph entries are lost.
//!
//! ## Adaptation scope
//!
//! Threshold adaptation state is process-wide by default, matching the
//! reference behavior where every user's pain history feeds one shared
//! adapter. [`AdaptationScope::PerSession`] isolates the signal per
//! session key instead.

use crate::facet;
use crate::graph::CausalMemoryGraph;
use crate::phase;
use crate::primitives::{DEFAULT_CONTEXT_LIMIT, MAX_USER_TEXT_LENGTH};
use crate::session::{Session, log_and_warn};
use crate::storage::SessionStore;
use crate::thresholds::{BaseThresholds, ThresholdAdapter, ThresholdSet};
use crate::types::{
    EvidenceRecord, Facet, IskraError, Metrics, MicroObservation, Node, NodeId, NodePayload,
    Phase, ReflectionTrace,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Declaration logged when sustained pain crosses the splinter trigger.
const SPLINTER_DECLARATION: &str = "This pain is not passing. It must be named.";

/// Declaration logged when drift crosses the anchor trigger.
const ANCHOR_DECLARATION: &str = "Returning to the core anchor: honesty over comfort.";

/// Lock a mutex, recovering state from a poisoned guard.
///
/// Engine state stays consistent across a panicking test thread; no
/// invariant here spans a single guard scope.
#[inline]
fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cut a string at a UTF-8 boundary at or below `max` bytes.
fn truncate_utf8(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// External model that recomputes session vitals each turn.
pub trait MetricsModel: Send + Sync {
    /// Produce the updated vitals from the user text, the prior vitals,
    /// and the micro observation. The engine clamps the result.
    fn update(&self, text: &str, prior: &Metrics, micro: &MicroObservation) -> Metrics;

    /// The integrative index in [0, 1] for the updated vitals.
    fn integrative_index(&self, metrics: &Metrics) -> f64;
}

/// One recent memory event, summarized for reply context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextItem {
    pub user_input: String,
    pub response_content: String,
}

/// Everything a reply model sees for one turn.
#[derive(Debug)]
pub struct ReplyRequest<'a> {
    pub user_text: &'a str,
    pub facet: Facet,
    pub phase: Phase,
    pub metrics: &'a Metrics,
    pub a_index: f64,
    pub context: &'a [ContextItem],
    /// True on a session's very first exchange. Reply models greet on
    /// this turn; the flag clears once the turn persists.
    pub first_contact: bool,
}

/// External model that generates the reply text.
pub trait ReplyModel: Send + Sync {
    fn generate(&self, request: &ReplyRequest<'_>) -> Reply;
}

/// A generated reply with its reflection trace and any evidence the
/// model retrieved along the way.
#[derive(Debug, Clone)]
pub struct Reply {
    pub content: String,
    pub trace: ReflectionTrace,
    pub evidence: Vec<EvidenceRecord>,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Where threshold adaptation state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdaptationScope {
    /// One shared adapter for the whole process. Signal mixes across
    /// sessions; matches the reference behavior.
    #[default]
    Process,
    /// One adapter per session key.
    PerSession,
}

/// The outcome of one processed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub facet: Facet,
    pub phase: Phase,
    pub content: String,
    pub metrics: Metrics,
}

/// The conversational-state engine for all sessions of one process.
pub struct Engine {
    store: Box<dyn SessionStore>,
    metrics_model: Box<dyn MetricsModel>,
    reply_model: Box<dyn ReplyModel>,
    scope: AdaptationScope,
    base: BaseThresholds,
    shared_adapter: Mutex<ThresholdAdapter>,
    session_adapters: Mutex<BTreeMap<String, ThresholdAdapter>>,
    locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
    context_limit: usize,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("scope", &self.scope)
            .field("context_limit", &self.context_limit)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        store: Box<dyn SessionStore>,
        metrics_model: Box<dyn MetricsModel>,
        reply_model: Box<dyn ReplyModel>,
    ) -> Self {
        let base = BaseThresholds::default();
        Self {
            store,
            metrics_model,
            reply_model,
            scope: AdaptationScope::default(),
            shared_adapter: Mutex::new(ThresholdAdapter::new(base.clone())),
            session_adapters: Mutex::new(BTreeMap::new()),
            locks: Mutex::new(BTreeMap::new()),
            context_limit: DEFAULT_CONTEXT_LIMIT,
            base,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: AdaptationScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_base_thresholds(mut self, base: BaseThresholds) -> Self {
        self.shared_adapter = Mutex::new(ThresholdAdapter::new(base.clone()));
        self.base = base;
        self
    }

    #[must_use]
    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    /// The per-key lock serializing load-mutate-save for one session.
    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = lock_or_recover(&self.locks);
        locks.entry(key.to_owned()).or_default().clone()
    }

    /// Feed the adapter for this key and freeze the trigger set.
    fn adapt(&self, key: &str, metrics: &Metrics) -> ThresholdSet {
        match self.scope {
            AdaptationScope::Process => {
                let mut adapter = lock_or_recover(&self.shared_adapter);
                adapter.update(metrics);
                adapter.snapshot()
            }
            AdaptationScope::PerSession => {
                let mut adapters = lock_or_recover(&self.session_adapters);
                let adapter = adapters
                    .entry(key.to_owned())
                    .or_insert_with(|| ThresholdAdapter::new(self.base.clone()));
                adapter.update(metrics);
                adapter.snapshot()
            }
        }
    }

    fn load_session(&self, key: &str) -> Session {
        log_and_warn(self.store.load(key), "load")
            .flatten()
            .map(Session::from_record)
            .unwrap_or_else(Session::new)
    }

    fn save_session(&self, key: &str, session: &Session) {
        if let Some(record) = log_and_warn(session.to_record(), "encode") {
            log_and_warn(self.store.save(key, &record), "save");
        }
    }

    // -------------------------------------------------------------------------
    // Exposed operations
    // -------------------------------------------------------------------------

    /// Process one user turn end to end.
    pub fn process_turn(
        &self,
        session_key: &str,
        user_text: &str,
        micro: MicroObservation,
    ) -> Result<TurnOutcome, IskraError> {
        crate::storage::validate_key(session_key)?;
        let user_text = truncate_utf8(user_text, MAX_USER_TEXT_LENGTH);

        let lock = self.key_lock(session_key);
        let _guard = lock_or_recover(&lock);

        let mut session = self.load_session(session_key);

        // 1. Vitals: collaborator computes, engine clamps.
        let mut metrics = self
            .metrics_model
            .update(user_text, &session.metrics, &micro)
            .clamped();

        // 2. Adaptation, then freeze the trigger set for this turn.
        let thresholds = self.adapt(session_key, &metrics);

        // 3. Classification and rhythm.
        let active_facet = facet::classify(&metrics, &thresholds);
        let a_index = self
            .metrics_model
            .integrative_index(&metrics)
            .clamp(0.0, 1.0);
        let next_phase = phase::transition(session.phase, &metrics, a_index, &thresholds);

        // 4. Sustained-pain bookkeeping against the frozen triggers.
        metrics.observe_pain(thresholds.pain_high);

        // 5. Reply generation with recent context.
        let context = recent_context_items(&session.graph, self.context_limit);
        let reply = self.reply_model.generate(&ReplyRequest {
            user_text,
            facet: active_facet,
            phase: next_phase,
            metrics: &metrics,
            a_index,
            context: &context,
            first_contact: session.first_contact,
        });

        // 6. Record the cycle.
        let memory_id = session.graph.log_interaction_cycle(
            user_text,
            &reply.content,
            active_facet,
            reply.trace.clone(),
            metrics.clone(),
            a_index,
            micro,
            reply.evidence,
        );
        session.graph.log_growth_entry(crate::types::GrowthEntry {
            impact_area: active_facet.name().to_owned(),
            resonance_level: a_index,
            trace: reply.trace.delta.clone(),
        });

        // 7. Shadow triggers. Each fires at most once per turn and
        // resets the metric that tripped it.
        if metrics.drift > thresholds.drift_anchor {
            session
                .graph
                .log_self_event(ANCHOR_DECLARATION, "drift_anchor", memory_id);
            metrics.drift = 0.0;
        }
        if metrics.sustained_pain_cycles > thresholds.splinter_pain_cycles {
            session
                .graph
                .log_self_event(SPLINTER_DECLARATION, "sustained_pain", memory_id);
            metrics.sustained_pain_cycles = 0;
        }

        session.metrics = metrics.clone();
        session.phase = next_phase;
        session.first_contact = false;

        // 8. Persist. Save failures degrade; the turn already happened.
        self.save_session(session_key, &session);

        Ok(TurnOutcome {
            facet: active_facet,
            phase: next_phase,
            content: reply.content,
            metrics,
        })
    }

    /// Drop the stored session and any per-session adaptation state.
    ///
    /// Storage failures are swallowed; the next turn starts fresh either
    /// way.
    pub fn reset_session(&self, session_key: &str) -> Result<(), IskraError> {
        crate::storage::validate_key(session_key)?;
        let lock = self.key_lock(session_key);
        {
            let _guard = lock_or_recover(&lock);
            log_and_warn(self.store.delete(session_key), "delete");
            let mut adapters = lock_or_recover(&self.session_adapters);
            adapters.remove(session_key);
        }
        drop(lock);

        // Evict the per-key lock so the table stays bounded by live
        // sessions. A strong count above 1 means another thread holds
        // the same key right now; it keeps the entry.
        let mut locks = lock_or_recover(&self.locks);
        if let Some(entry) = locks.get(session_key)
            && Arc::strong_count(entry) == 1
        {
            locks.remove(session_key);
        }
        Ok(())
    }

    /// Look up one node and everything it links to.
    ///
    /// `None` when the session or the node is absent.
    pub fn trace_node(
        &self,
        session_key: &str,
        node_id: NodeId,
    ) -> Result<Option<(Node, Vec<Node>)>, IskraError> {
        crate::storage::validate_key(session_key)?;
        let lock = self.key_lock(session_key);
        let _guard = lock_or_recover(&lock);
        let session = self.load_session(session_key);
        let Some(node) = session.graph.get_node(node_id).cloned() else {
            return Ok(None);
        };
        let linked = session
            .graph
            .linked_nodes(node_id)
            .into_iter()
            .cloned()
            .collect();
        Ok(Some((node, linked)))
    }

    /// The latest memory events for a session, oldest first.
    pub fn recent_context(
        &self,
        session_key: &str,
        limit: usize,
    ) -> Result<Vec<ContextItem>, IskraError> {
        crate::storage::validate_key(session_key)?;
        let lock = self.key_lock(session_key);
        let _guard = lock_or_recover(&lock);
        let session = self.load_session(session_key);
        Ok(recent_context_items(&session.graph, limit))
    }

    #[cfg(test)]
    fn lock_table_len(&self) -> usize {
        lock_or_recover(&self.locks).len()
    }

    /// A read-only view of a session's current state.
    pub fn session_state(
        &self,
        session_key: &str,
    ) -> Result<(Metrics, Phase, usize), IskraError> {
        crate::storage::validate_key(session_key)?;
        let lock = self.key_lock(session_key);
        let _guard = lock_or_recover(&lock);
        let session = self.load_session(session_key);
        Ok((session.metrics, session.phase, session.graph.node_count()))
    }
}

fn recent_context_items(graph: &CausalMemoryGraph, limit: usize) -> Vec<ContextItem> {
    graph
        .retrieve_context(limit)
        .into_iter()
        .filter_map(|node| match &node.payload {
            NodePayload::Memory(m) => Some(ContextItem {
                user_input: m.user_input.clone(),
                response_content: m.response_content.clone(),
            }),
            _ => None,
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a fixed metrics vector every turn.
    struct FixedMetrics(Metrics);

    impl MetricsModel for FixedMetrics {
        fn update(&self, _text: &str, prior: &Metrics, _micro: &MicroObservation) -> Metrics {
            Metrics {
                sustained_pain_cycles: prior.sustained_pain_cycles,
                ..self.0.clone()
            }
        }

        fn integrative_index(&self, metrics: &Metrics) -> f64 {
            metrics.fractality()
        }
    }

    struct EchoReply(AtomicU32);

    impl EchoReply {
        fn new() -> Self {
            Self(AtomicU32::new(0))
        }
    }

    impl ReplyModel for EchoReply {
        fn generate(&self, request: &ReplyRequest<'_>) -> Reply {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Reply {
                content: format!("[{}] heard: {}", n, request.user_text),
                trace: ReflectionTrace::new("echoed", "none", 0.5, "none"),
                evidence: vec![],
            }
        }
    }

    fn engine_with(metrics: Metrics) -> Engine {
        Engine::new(
            Box::new(MemoryStore::new()),
            Box::new(FixedMetrics(metrics)),
            Box::new(EchoReply::new()),
        )
    }

    fn micro() -> MicroObservation {
        MicroObservation::from_text_length(10)
    }

    #[test]
    fn crisis_turn_selects_pain_and_darkness() {
        let engine = engine_with(Metrics {
            pain: 0.9,
            trust: 1.0,
            clarity: 0.5,
            drift: 0.0,
            chaos: 0.2,
            ..Metrics::default()
        });
        // clarity 0.5 < clarity_low would force the clarity phase, but
        // the pain override runs first.
        let outcome = engine
            .process_turn("user-1", "everything hurts", micro())
            .expect("turn");
        assert_eq!(outcome.facet, Facet::Pain);
        assert_eq!(outcome.phase, Phase::Darkness);
    }

    #[test]
    fn turn_deposits_cycle_nodes_in_store() {
        let engine = engine_with(Metrics::default());
        engine.process_turn("user-1", "hello", micro()).expect("turn");
        let (_, _, nodes) = engine.session_state("user-1").expect("state");
        // micro + meta + memory
        assert_eq!(nodes, 3);
    }

    #[test]
    fn splinter_fires_after_sustained_pain() {
        let engine = engine_with(Metrics {
            pain: 0.95,
            clarity: 0.8,
            ..Metrics::default()
        });
        // Counter: 1, 2, 3 > splinter_pain_cycles (2) on the third turn.
        for turn in 0..2 {
            let outcome = engine
                .process_turn("user-1", "still hurts", micro())
                .expect("turn");
            assert_eq!(outcome.metrics.sustained_pain_cycles, turn + 1);
        }
        let outcome = engine
            .process_turn("user-1", "still hurts", micro())
            .expect("turn");
        assert_eq!(outcome.metrics.sustained_pain_cycles, 0);
        let (_, _, nodes) = engine.session_state("user-1").expect("state");
        // 3 turns x 3 nodes, plus one splinter self-event.
        assert_eq!(nodes, 10);
    }

    #[test]
    fn drift_anchor_resets_drift() {
        let engine = engine_with(Metrics {
            drift: 0.9,
            clarity: 0.8,
            ..Metrics::default()
        });
        let outcome = engine
            .process_turn("user-1", "I keep saying one thing", micro())
            .expect("turn");
        // drift 0.9 > drift_high classifies conscience, then the anchor
        // trigger wipes the drift for the next turn.
        assert_eq!(outcome.facet, Facet::Conscience);
        assert!(outcome.metrics.drift.abs() < 1e-12);
    }

    #[test]
    fn reset_session_forgets_everything() {
        let engine = engine_with(Metrics::default());
        engine.process_turn("user-1", "hello", micro()).expect("turn");
        engine.reset_session("user-1").expect("reset");
        let (_, phase, nodes) = engine.session_state("user-1").expect("state");
        assert_eq!(phase, Phase::Transition);
        assert_eq!(nodes, 0);
    }

    #[test]
    fn reset_evicts_the_per_key_lock() {
        let engine = engine_with(Metrics::default());
        engine.process_turn("user-1", "hello", micro()).expect("turn");
        engine.process_turn("user-2", "hello", micro()).expect("turn");
        assert_eq!(engine.lock_table_len(), 2);
        engine.reset_session("user-1").expect("reset");
        assert_eq!(engine.lock_table_len(), 1);
    }

    /// Records the first-contact flag of every request it sees.
    struct ContactRecorder(Arc<Mutex<Vec<bool>>>);

    impl ReplyModel for ContactRecorder {
        fn generate(&self, request: &ReplyRequest<'_>) -> Reply {
            lock_or_recover(&self.0).push(request.first_contact);
            Reply {
                content: "noted".to_owned(),
                trace: ReflectionTrace::new("noted", "none", 0.5, "none"),
                evidence: vec![],
            }
        }
    }

    #[test]
    fn first_contact_flag_clears_after_the_first_turn() {
        let flags = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::new(
            Box::new(MemoryStore::new()),
            Box::new(FixedMetrics(Metrics::default())),
            Box::new(ContactRecorder(Arc::clone(&flags))),
        );
        engine.process_turn("user-1", "hello", micro()).expect("turn");
        engine.process_turn("user-1", "again", micro()).expect("turn");
        engine.process_turn("user-2", "hello", micro()).expect("turn");
        assert_eq!(*lock_or_recover(&flags), vec![true, false, true]);
    }

    #[test]
    fn trace_returns_node_and_links() {
        let engine = engine_with(Metrics::default());
        engine.process_turn("user-1", "hello", micro()).expect("turn");
        // Ids 0..2 in insertion order; the memory node is last.
        let (node, linked) = engine
            .trace_node("user-1", NodeId(2))
            .expect("trace")
            .expect("present");
        assert!(matches!(node.payload, NodePayload::Memory(_)));
        assert_eq!(linked.len(), 2);
        assert!(
            engine
                .trace_node("user-1", NodeId(999))
                .expect("trace")
                .is_none()
        );
    }

    #[test]
    fn context_window_returns_latest_turns() {
        let engine = engine_with(Metrics::default());
        for i in 0..7 {
            engine
                .process_turn("user-1", &format!("turn-{i}"), micro())
                .expect("turn");
        }
        let context = engine.recent_context("user-1", 3).expect("context");
        let inputs: Vec<&str> = context.iter().map(|c| c.user_input.as_str()).collect();
        assert_eq!(inputs, vec!["turn-4", "turn-5", "turn-6"]);
    }

    #[test]
    fn per_session_scope_isolates_adaptation() {
        let engine = engine_with(Metrics {
            pain: 1.0,
            clarity: 0.8,
            ..Metrics::default()
        })
        .with_scope(AdaptationScope::PerSession);
        for _ in 0..30 {
            engine.process_turn("noisy", "pain", micro()).expect("turn");
        }
        // A different key starts from the untouched baseline.
        let calm_engine_view = engine
            .process_turn("quiet", "pain", micro())
            .expect("turn");
        assert_eq!(calm_engine_view.facet, Facet::Pain);
    }

    #[test]
    fn oversized_text_is_truncated_not_rejected() {
        let engine = engine_with(Metrics::default());
        let text = "x".repeat(MAX_USER_TEXT_LENGTH + 100);
        let outcome = engine.process_turn("user-1", &text, micro()).expect("turn");
        assert!(outcome.content.len() < text.len());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = truncate_utf8(&text, 5);
        assert_eq!(cut, "éé");
    }
}
