//! # Turn Flow Tests
//!
//! End-to-end scenarios through the engine against a real redb-backed
//! store, including restart survival and corruption recovery.

use iskra_core::{
    Engine, Facet, Metrics, MetricsModel, MicroObservation, NodeId, NodePayload, Phase,
    RedbStore, Reply, ReplyModel, ReplyRequest, ReflectionTrace, SessionStore,
};
use std::path::Path;

/// Parses vitals out of the user text, e.g. "pain=0.9 clarity=0.5".
///
/// Keeps the scenarios readable: the text IS the metrics vector.
struct ScriptedMetrics;

impl MetricsModel for ScriptedMetrics {
    fn update(&self, text: &str, prior: &Metrics, _micro: &MicroObservation) -> Metrics {
        let mut metrics = Metrics {
            sustained_pain_cycles: prior.sustained_pain_cycles,
            ..prior.clone()
        };
        for token in text.split_whitespace() {
            let Some((name, value)) = token.split_once('=') else {
                continue;
            };
            let Ok(value) = value.parse::<f64>() else {
                continue;
            };
            match name {
                "pain" => metrics.pain = value,
                "trust" => metrics.trust = value,
                "clarity" => metrics.clarity = value,
                "drift" => metrics.drift = value,
                "chaos" => metrics.chaos = value,
                _ => {}
            }
        }
        metrics
    }

    fn integrative_index(&self, metrics: &Metrics) -> f64 {
        metrics.fractality() * (1.0 - metrics.pain) * 0.6
    }
}

struct CannedReply;

impl ReplyModel for CannedReply {
    fn generate(&self, request: &ReplyRequest<'_>) -> Reply {
        Reply {
            content: format!("[{}] noted", request.facet),
            trace: ReflectionTrace::new("scenario turn", "scripted", 0.6, "none"),
            evidence: vec![],
        }
    }
}

fn open_engine(path: &Path) -> Engine {
    let store = RedbStore::open(path).expect("open store");
    Engine::new(Box::new(store), Box::new(ScriptedMetrics), Box::new(CannedReply))
}

fn micro() -> MicroObservation {
    MicroObservation::from_text_length(20)
}

#[test]
fn crisis_vector_yields_pain_facet_and_darkness() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = open_engine(&dir.path().join("sessions.redb"));
    let outcome = engine
        .process_turn(
            "user-1",
            "pain=0.9 trust=1.0 clarity=0.5 drift=0.0 chaos=0.2",
            micro(),
        )
        .expect("turn");
    assert_eq!(outcome.facet, Facet::Pain);
    assert_eq!(outcome.phase, Phase::Darkness);
}

#[test]
fn session_survives_process_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.redb");
    {
        let engine = open_engine(&path);
        engine
            .process_turn("user-1", "pain=0.9 clarity=0.8", micro())
            .expect("turn one");
    }
    // A new engine over the same database continues the same session:
    // pain stays above the high trigger, so the counter keeps climbing.
    let engine = open_engine(&path);
    let outcome = engine
        .process_turn("user-1", "pain=0.9 clarity=0.8", micro())
        .expect("turn two");
    assert_eq!(outcome.metrics.sustained_pain_cycles, 2);
    let (_, _, nodes) = engine.session_state("user-1").expect("state");
    assert_eq!(nodes, 6);
}

#[test]
fn darkness_lifts_through_echo_when_pain_fades() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = open_engine(&dir.path().join("sessions.redb"));
    let first = engine
        .process_turn("user-1", "pain=0.9 clarity=0.8", micro())
        .expect("crisis turn");
    assert_eq!(first.phase, Phase::Darkness);
    let second = engine
        .process_turn("user-1", "pain=0.1 clarity=0.8", micro())
        .expect("recovery turn");
    assert_eq!(second.phase, Phase::Echo);
}

#[test]
fn trace_resolves_memory_to_meta_and_micro() {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = open_engine(&dir.path().join("sessions.redb"));
    engine
        .process_turn("user-1", "clarity=0.8", micro())
        .expect("turn");
    // One turn without evidence: micro (0), meta (1), memory (2).
    let (node, linked) = engine
        .trace_node("user-1", NodeId(2))
        .expect("trace")
        .expect("present");
    assert!(matches!(node.payload, NodePayload::Memory(_)));
    let kinds: Vec<_> = linked.iter().map(|n| n.kind()).collect();
    assert_eq!(kinds.len(), 2);
    assert!(engine
        .trace_node("user-1", NodeId(17))
        .expect("trace")
        .is_none());
}

#[test]
fn corrupted_row_becomes_a_fresh_session() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sessions.redb");
    let engine = open_engine(&path);
    engine
        .process_turn("user-1", "clarity=0.8", micro())
        .expect("turn");
    drop(engine);

    // Overwrite the row with garbage bytes through redb directly.
    {
        let db = redb::Database::create(&path).expect("open db");
        let table_def = redb::TableDefinition::<&str, &[u8]>::new("sessions");
        let txn = db.begin_write().expect("begin write");
        {
            let mut table = txn.open_table(table_def).expect("open table");
            table
                .insert("user-1", b"}}} not a record".as_slice())
                .expect("insert garbage");
        }
        txn.commit().expect("commit");
    }

    let engine = open_engine(&path);
    let (metrics, phase, nodes) = engine.session_state("user-1").expect("state");
    assert_eq!(phase, Phase::Transition);
    assert_eq!(nodes, 0);
    assert!((metrics.trust - 1.0).abs() < 1e-12);
}
