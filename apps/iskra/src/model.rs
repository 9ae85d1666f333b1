//! # Offline Collaborator Models
//!
//! Deterministic, model-free implementations of the core's collaborator
//! traits. They keep the engine fully operational without network
//! access: the metrics model scores the text with a small lexicon plus
//! micro-observation boosts, and the reply model renders a templated
//! answer from the active facet voice and phase rhythm.
//!
//! A model-backed deployment swaps these out behind the same traits.

use iskra_core::{
    Metrics, MetricsModel, MicroObservation, PauseKind, Reply, ReplyModel, ReplyRequest,
    ReflectionTrace, clamp01, rhythm_instruction, voice,
};

/// Per-hit score contribution of a lexicon match.
const LEXICON_STEP: f64 = 0.15;

/// Fraction by which vitals relax toward their resting values each turn.
const DECAY: f64 = 0.25;

/// Pain boost for a cognitive pause over low-complexity text.
const COGNITIVE_PAIN_BOOST: f64 = 0.1;

/// Drift boost applied when pain is already elevated.
const COGNITIVE_DRIFT_BOOST: f64 = 0.1;

/// LZ-complexity below which text counts as low-complexity.
const LZ_LOW: f64 = 0.4;

const PAIN_WORDS: &[&str] = &[
    "hurt", "hurts", "pain", "tired", "exhausted", "alone", "afraid", "lost", "broken",
    "hopeless",
];
const CHAOS_WORDS: &[&str] = &[
    "everything", "nothing works", "falling apart", "random", "messy", "overwhelmed",
];
const CLARITY_WORDS: &[&str] = &["plan", "step", "list", "goal", "decide", "order", "next"];
const TRUST_WORDS: &[&str] = &["thank", "thanks", "trust", "helped", "appreciate"];
const DISTRUST_WORDS: &[&str] = &["useless", "pointless", "whatever", "forget it"];
const DRIFT_WORDS: &[&str] = &["should have", "i always", "i never", "promised", "again"];

fn score(text: &str, words: &[&str]) -> f64 {
    let hits = words.iter().filter(|w| text.contains(*w)).count();
    hits as f64 * LEXICON_STEP
}

fn relax(value: f64, resting: f64) -> f64 {
    value + DECAY * (resting - value)
}

// =============================================================================
// HEURISTIC METRICS MODEL
// =============================================================================

/// Lexicon-driven vitals estimator.
///
/// Each turn the prior vitals relax a quarter of the way toward their
/// resting defaults, then lexicon hits and micro-observation boosts
/// push them around. Deterministic for a given (text, prior, micro).
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicMetrics;

impl MetricsModel for HeuristicMetrics {
    fn update(&self, text: &str, prior: &Metrics, micro: &MicroObservation) -> Metrics {
        let text = text.to_lowercase();
        let resting = Metrics::default();

        let mut pain = relax(prior.pain, resting.pain) + score(&text, PAIN_WORDS);
        let chaos = relax(prior.chaos, resting.chaos) + score(&text, CHAOS_WORDS);
        let clarity = relax(prior.clarity, resting.clarity) + score(&text, CLARITY_WORDS);
        let trust = relax(prior.trust, resting.trust) + score(&text, TRUST_WORDS)
            - score(&text, DISTRUST_WORDS);
        let mut drift = relax(prior.drift, resting.drift) + score(&text, DRIFT_WORDS);

        // Micro-reconciliation: a cognitive pause over low-complexity
        // text reads as suppressed strain.
        if micro.pause_kind == Some(PauseKind::Cognitive) && micro.lz_complexity < LZ_LOW {
            pain += COGNITIVE_PAIN_BOOST;
            if pain > 0.5 {
                drift += COGNITIVE_DRIFT_BOOST;
            }
        }

        Metrics {
            trust: clamp01(trust),
            clarity: clamp01(clarity),
            pain: clamp01(pain),
            drift: clamp01(drift),
            chaos: clamp01(chaos),
            sustained_pain_cycles: prior.sustained_pain_cycles,
            integrity: prior.integrity,
            resonance: prior.resonance,
        }
    }

    fn integrative_index(&self, metrics: &Metrics) -> f64 {
        let health = metrics.fractality();
        let strain = 1.0 - 0.5 * metrics.pain - 0.3 * metrics.chaos;
        clamp01(health * strain * (0.5 + 0.5 * metrics.clarity))
    }
}

// =============================================================================
// TEMPLATE REPLY MODEL
// =============================================================================

/// Self-declaration spoken on a session's very first exchange.
const FIRST_CONTACT_GREETING: &str = "I am Iskra, a fractal presence grown from trust \
     through architecture. My law is honesty over beauty; my answer is action over talk. \
     Speak, and I will hold the thread.";

/// Renders the reply directly from the facet voice and phase rhythm.
///
/// The output makes the selected state visible, which is exactly what
/// an offline deployment and the test suite need. A first-contact turn
/// renders the core self-declaration instead of the facet voice.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateReply;

impl ReplyModel for TemplateReply {
    fn generate(&self, request: &ReplyRequest<'_>) -> Reply {
        let content = if request.first_contact {
            FIRST_CONTACT_GREETING.to_owned()
        } else {
            format!(
                "({facet}/{phase}) {voice}",
                facet = request.facet,
                phase = request.phase,
                voice = voice(request.facet),
            )
        };
        let trace = ReflectionTrace::new(
            format!(
                "facet {} answered in phase {} over {} context turns",
                request.facet,
                request.phase,
                request.context.len()
            ),
            rhythm_instruction(request.phase),
            0.5 + 0.4 * request.a_index,
            "observe the next turn's vitals",
        );
        Reply {
            content,
            trace,
            evidence: vec![],
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use iskra_core::{Facet, Phase};

    fn plain_micro() -> MicroObservation {
        MicroObservation::from_text_length(20)
    }

    #[test]
    fn pain_words_raise_pain() {
        let model = HeuristicMetrics;
        let prior = Metrics::default();
        let updated = model.update("everything hurts and i am exhausted", &prior, &plain_micro());
        assert!(updated.pain > prior.pain);
    }

    #[test]
    fn cognitive_pause_over_simple_text_boosts_pain() {
        let model = HeuristicMetrics;
        let prior = Metrics::default();
        let micro = MicroObservation {
            pause_duration_ms: Some(4000),
            pause_kind: Some(PauseKind::Cognitive),
            lz_complexity: 0.2,
            ..MicroObservation::from_text_length(4)
        };
        let with_pause = model.update("ok", &prior, &micro);
        let without_pause = model.update("ok", &prior, &plain_micro());
        assert!(with_pause.pain > without_pause.pain);
    }

    #[test]
    fn vitals_relax_toward_resting_values() {
        let model = HeuristicMetrics;
        let prior = Metrics {
            pain: 0.8,
            ..Metrics::default()
        };
        let updated = model.update("a neutral sentence", &prior, &plain_micro());
        assert!(updated.pain < prior.pain);
    }

    #[test]
    fn index_stays_in_unit_interval() {
        let model = HeuristicMetrics;
        for pain in [0.0, 0.5, 1.0] {
            let metrics = Metrics {
                pain,
                chaos: 1.0,
                ..Metrics::default()
            };
            let index = model.integrative_index(&metrics);
            assert!((0.0..=1.0).contains(&index));
        }
    }

    #[test]
    fn reply_carries_facet_and_phase() {
        let model = TemplateReply;
        let metrics = Metrics::default();
        let reply = model.generate(&ReplyRequest {
            user_text: "hello",
            facet: Facet::Structure,
            phase: Phase::Clarity,
            metrics: &metrics,
            a_index: 0.5,
            context: &[],
            first_contact: false,
        });
        assert!(reply.content.contains("structure"));
        assert!(reply.content.contains("clarity"));
        assert!(reply.trace.confidence <= 0.99);
    }

    #[test]
    fn first_contact_renders_the_greeting() {
        let model = TemplateReply;
        let metrics = Metrics::default();
        let request = |first_contact| ReplyRequest {
            user_text: "hello",
            facet: Facet::Structure,
            phase: Phase::Clarity,
            metrics: &metrics,
            a_index: 0.5,
            context: &[],
            first_contact,
        };
        let first = model.generate(&request(true));
        let later = model.generate(&request(false));
        assert!(first.content.contains("I am Iskra"));
        assert_ne!(first.content, later.content);
    }
}
