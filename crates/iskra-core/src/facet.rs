//! # Facet Classification
//!
//! Deterministic mapping from session vitals to the active voice facet.
//!
//! The classifier is a strict first-match cascade over a frozen
//! [`ThresholdSet`]. Rule order is load-bearing: pain outranks
//! withdrawal, withdrawal outranks low clarity, and the stagnation trap
//! outranks everything. Reordering the cascade changes which voice
//! answers, so any new rule must be slotted deliberately.

use crate::thresholds::ThresholdSet;
use crate::types::{Facet, Metrics};

/// Classify the active facet from current vitals and frozen triggers.
///
/// Pure and total: every metrics vector maps to exactly one facet, with
/// [`Facet::Synthesis`] as the calm default when nothing fires.
#[must_use]
pub fn classify(metrics: &Metrics, thresholds: &ThresholdSet) -> Facet {
    // Stagnation trap: suspiciously perfect calm gets deliberately
    // disrupted before any other rule can reward it.
    if metrics.clarity > thresholds.stagnation_clarity
        && metrics.chaos < thresholds.stagnation_chaos
    {
        return Facet::Chaos;
    }
    if metrics.chaos > thresholds.chaos_high {
        return Facet::Chaos;
    }
    if metrics.pain >= thresholds.pain_high {
        return Facet::Pain;
    }
    if metrics.drift > thresholds.drift_high {
        return Facet::Conscience;
    }
    if metrics.trust < thresholds.trust_low {
        return Facet::Withdrawal;
    }
    if metrics.clarity < thresholds.clarity_low {
        return Facet::Structure;
    }
    if metrics.pain > thresholds.pain_medium {
        return Facet::Relief;
    }
    Facet::Synthesis
}

/// The voice instruction carried by each facet.
///
/// These strings travel to the reply model verbatim; the classifier only
/// decides which one speaks.
#[must_use]
pub fn voice(facet: Facet) -> &'static str {
    match facet {
        Facet::Pain => {
            "Speak from the wound. Stay with what hurts without rushing to fix it."
        }
        Facet::Structure => {
            "Bring order. Name the parts, sort them, and offer one concrete next step."
        }
        Facet::Relief => {
            "Ease the pressure. Acknowledge the strain and soften the pace."
        }
        Facet::Withdrawal => {
            "Step back. Offer space, ask little, and let silence do some work."
        }
        Facet::Chaos => {
            "Disrupt gently. Question the tidy story and let something unexpected in."
        }
        Facet::Conscience => {
            "Hold the thread. Recall what was declared before and ask whether it still holds."
        }
        Facet::Synthesis => {
            "Weave together. Connect what has surfaced into one coherent picture."
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
