//! # Property-Based Tests
//!
//! Verification of the classifier cascade, threshold adaptation bounds,
//! graph invariants, and snapshot idempotence under arbitrary inputs.

use iskra_core::{
    CausalMemoryGraph, Facet, GraphSnapshot, GrowthEntry, Metrics, MicroObservation, NodeId,
    NodeKind, NodePayload, ReflectionTrace, SelfEventRecord, ThresholdAdapter, Trigger,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn arb_metrics() -> impl Strategy<Value = Metrics> {
    (
        0.0..=1.0f64,
        0.0..=1.0f64,
        0.0..=1.0f64,
        0.0..=1.0f64,
        0.0..=1.0f64,
    )
        .prop_map(|(trust, clarity, pain, drift, chaos)| Metrics {
            trust,
            clarity,
            pain,
            drift,
            chaos,
            ..Metrics::default()
        })
}

fn log_simple_turn(graph: &mut CausalMemoryGraph, input: &str) -> NodeId {
    graph.log_interaction_cycle(
        input,
        "reply",
        Facet::Synthesis,
        ReflectionTrace::new("d", "e", 0.5, "f"),
        Metrics::default(),
        0.5,
        MicroObservation::from_text_length(input.len()),
        vec![],
    )
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The cascade is order-deterministic: a vector satisfying both the
    /// pain rule and the trust rule always yields the pain facet.
    #[test]
    fn pain_rule_beats_trust_rule(
        pain in 0.7..=1.0f64,
        trust in 0.0..0.75f64,
        clarity in 0.2..0.85f64,
    ) {
        let thresholds = ThresholdAdapter::default().snapshot();
        // Keep the higher-priority rules quiet.
        let metrics = Metrics {
            pain,
            trust,
            clarity,
            drift: 0.0,
            chaos: 0.2,
            ..Metrics::default()
        };
        prop_assert_eq!(iskra_core::classify(&metrics, &thresholds), Facet::Pain);
    }

    /// Classification is a pure function: same inputs, same facet.
    #[test]
    fn classification_is_deterministic(metrics in arb_metrics()) {
        let thresholds = ThresholdAdapter::default().snapshot();
        let first = iskra_core::classify(&metrics, &thresholds);
        let second = iskra_core::classify(&metrics, &thresholds);
        prop_assert_eq!(first, second);
    }

    /// After any sequence of updates the enforced pain margin holds.
    #[test]
    fn pain_margin_survives_any_update_sequence(samples in vec(arb_metrics(), 1..120)) {
        let mut adapter = ThresholdAdapter::default();
        for metrics in &samples {
            adapter.update(metrics);
            let high = adapter.get(Trigger::PainHigh);
            let medium = adapter.get(Trigger::PainMedium);
            prop_assert!(medium < high - 0.1 + 1e-9);
            prop_assert!((0.4..=0.95).contains(&high));
            prop_assert!((0.1..=0.9).contains(&adapter.get(Trigger::DriftHigh)));
            prop_assert!((0.3..=0.95).contains(&adapter.get(Trigger::ClarityLow)));
        }
    }

    /// The growth ring never exceeds capacity and evicts oldest first.
    #[test]
    fn growth_ring_is_bounded(count in 1usize..350) {
        let mut graph = CausalMemoryGraph::new();
        for i in 0..count {
            graph.log_growth_entry(GrowthEntry {
                impact_area: format!("area-{i}"),
                resonance_level: 0.5,
                trace: String::new(),
            });
        }
        prop_assert!(graph.growth_entries().len() <= 100);
        if count > 100 {
            let expected_oldest = format!("area-{}", count - 100);
            prop_assert_eq!(&graph.growth_entries()[0].impact_area, &expected_oldest);
        }
    }

    /// Context retrieval returns exactly min(n, memory count), memory
    /// nodes only, oldest of the recent window first.
    #[test]
    fn retrieve_context_window_is_exact(turns in 0usize..20, limit in 0usize..10) {
        let mut graph = CausalMemoryGraph::new();
        for i in 0..turns {
            log_simple_turn(&mut graph, &format!("turn-{i}"));
        }
        let context = graph.retrieve_context(limit);
        prop_assert_eq!(context.len(), limit.min(turns));
        for window in context.windows(2) {
            prop_assert!(window[0].id < window[1].id);
        }
        for node in &context {
            prop_assert_eq!(node.kind(), NodeKind::Memory);
        }
    }

    /// Linking against an absent id never changes the link table.
    #[test]
    fn dangling_link_is_rejected(missing in 1000u64..2000) {
        let mut graph = CausalMemoryGraph::new();
        let a = graph.add_node(NodePayload::SelfEvent(SelfEventRecord {
            declaration: "a".into(),
            trigger: "t".into(),
        }));
        graph.add_link(a, NodeId(missing));
        graph.add_link(NodeId(missing), a);
        prop_assert!(graph.linked_nodes(a).is_empty());
        prop_assert!(graph.linked_nodes(NodeId(missing)).is_empty());
    }

    /// snapshot -> restore -> re-snapshot is structurally identical for
    /// any graph built from add_node/add_link calls.
    #[test]
    fn snapshot_roundtrip_is_idempotent(
        turns in 1usize..8,
        extra_events in 0usize..4,
    ) {
        let mut graph = CausalMemoryGraph::new();
        let mut last_memory = None;
        for i in 0..turns {
            last_memory = Some(log_simple_turn(&mut graph, &format!("turn-{i}")));
        }
        if let Some(memory) = last_memory {
            for i in 0..extra_events {
                graph.log_self_event(&format!("event-{i}"), "trigger", memory);
            }
        }
        let first = GraphSnapshot::capture(&graph).expect("capture");
        let second = GraphSnapshot::capture(&first.restore()).expect("recapture");
        prop_assert_eq!(&first.nodes, &second.nodes);
        prop_assert_eq!(&first.links, &second.links);
    }

    /// Clamping is total: any float vector lands every scalar in [0, 1].
    #[test]
    fn clamping_is_total(
        trust in -10.0..10.0f64,
        pain in -10.0..10.0f64,
        chaos in -10.0..10.0f64,
    ) {
        let metrics = Metrics { trust, pain, chaos, ..Metrics::default() }.clamped();
        for value in [metrics.trust, metrics.pain, metrics.chaos] {
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}
