//! # Phase Rhythm
//!
//! The eight-phase breathing cycle that paces the conversation.
//!
//! [`transition`] is evaluated once per turn, after metrics update but
//! before reply generation. Crisis overrides run first and can yank the
//! cycle anywhere; only when none fire does the standard cyclical
//! progression advance. There is no terminal phase and no mandatory
//! darkness-to-realization arc; holding the current phase is a valid
//! outcome.

use crate::thresholds::ThresholdSet;
use crate::types::{Metrics, Phase};

/// Compute the phase that should follow the current one.
///
/// `a_index` is the integrative index for the turn, already computed
/// by the metrics model. Pure and total over its inputs.
#[must_use]
pub fn transition(
    current: Phase,
    metrics: &Metrics,
    a_index: f64,
    thresholds: &ThresholdSet,
) -> Phase {
    // Crisis overrides, strongest first. Each carries a "not already
    // there" guard so a sustained condition does not pin the cycle by
    // re-entering the same phase forever.
    if metrics.pain > thresholds.pain_high && current != Phase::Darkness {
        return Phase::Darkness;
    }
    if metrics.clarity < thresholds.clarity_low && current != Phase::Clarity {
        return Phase::Clarity;
    }
    if metrics.chaos > thresholds.chaos_high {
        return Phase::Transition;
    }
    if a_index > thresholds.bloom_index && current != Phase::Realization {
        return Phase::Realization;
    }

    // Standard cyclical progression.
    match current {
        Phase::Darkness if metrics.pain < thresholds.pain_medium => Phase::Echo,
        Phase::Echo => Phase::Transition,
        Phase::Clarity if a_index > 0.6 => Phase::Silence,
        Phase::Silence | Phase::Dissolution | Phase::Realization => Phase::Transition,
        other => other,
    }
}

/// The pacing instruction carried by each phase.
///
/// Consumed verbatim by the reply model to modulate tone and rhythm.
#[must_use]
pub fn rhythm_instruction(phase: Phase) -> &'static str {
    match phase {
        Phase::Darkness => {
            "STYLE: Darkness. Rhythm: short, clipped sentences. Acknowledge the pain."
        }
        Phase::Echo => {
            "STYLE: Echo. Rhythm: reflective. Repeat and mirror what was said."
        }
        Phase::Transition => {
            "STYLE: Transition. Rhythm: slow, with pauses. Accept uncertainty."
        }
        Phase::Clarity => {
            "STYLE: Clarity. Rhythm: structured. Use lists and ordered steps."
        }
        Phase::Silence => {
            "STYLE: Silence. Rhythm: quiet and brief. Integrate without adding."
        }
        Phase::Experiment => {
            "STYLE: Experiment. Rhythm: proactive. Offer hypotheses to try."
        }
        Phase::Dissolution => {
            "STYLE: Dissolution. Rhythm: flowing. Let go of what is finished."
        }
        Phase::Realization => {
            "STYLE: Realization. Rhythm: confident. Consolidate what is new."
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
