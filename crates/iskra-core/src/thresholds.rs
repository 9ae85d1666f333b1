//! # Threshold Adaptation
//!
//! Baseline trigger thresholds and their slow adaptation to recent
//! session trends.
//!
//! The canonical baselines ([`BaseThresholds`]) are immutable. Adaptation
//! writes into a separate [`AdaptedThresholds`] structure; the two are
//! merged through one explicit lookup ([`ThresholdAdapter::get`]) instead
//! of mutating a shared table in place.
//!
//! Adaptation is intentionally slow (20% of the observed delta) and
//! bounded: histories are fixed-capacity rings, every adapted value is
//! clamped to documented bounds, and the medium pain trigger always stays
//! at least [`PAIN_MARGIN`](crate::primitives::PAIN_MARGIN) below the
//! high one. This state lives only for the process lifetime; it is reset
//! on restart by design.

use crate::Metrics;
use crate::primitives::{ADAPTATION_RATE, EMA_ALPHA, HISTORY_WINDOW, PAIN_MARGIN};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

// =============================================================================
// NAMED TRIGGERS
// =============================================================================

/// The named scalar triggers consulted by the facet and phase engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trigger {
    PainHigh,
    PainMedium,
    ClarityLow,
    TrustLow,
    DriftHigh,
    ChaosHigh,
    StagnationClarity,
    StagnationChaos,
    BloomIndex,
    DriftAnchor,
}

/// The immutable canonical baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseThresholds {
    /// Pain facet activates when pain >= this value.
    pub pain_high: f64,
    /// Relief facet activates when pain > this value.
    pub pain_medium: f64,
    /// Structure facet activates when clarity < this value.
    pub clarity_low: f64,
    /// Withdrawal facet activates when trust < this value.
    pub trust_low: f64,
    /// Conscience facet activates when drift > this value.
    pub drift_high: f64,
    /// Chaos facet activates when chaos > this value.
    pub chaos_high: f64,
    /// Stagnation trap: chaos facet is forced when clarity > this...
    pub stagnation_clarity: f64,
    /// ...while chaos < this.
    pub stagnation_chaos: f64,
    /// Realization phase triggers when the integrative index > this.
    pub bloom_index: f64,
    /// A self-event anchor declaration fires when drift > this.
    pub drift_anchor: f64,
    /// Consecutive high-pain turns before the sustained-pain self-event.
    pub splinter_pain_cycles: u32,
}

impl Default for BaseThresholds {
    fn default() -> Self {
        Self {
            pain_high: 0.7,
            pain_medium: 0.5,
            clarity_low: 0.7,
            trust_low: 0.75,
            drift_high: 0.3,
            chaos_high: 0.6,
            stagnation_clarity: 0.9,
            stagnation_chaos: 0.1,
            bloom_index: 0.8,
            drift_anchor: 0.8,
            splinter_pain_cycles: 2,
        }
    }
}

/// The four triggers that drift with recent history. Everything else
/// always answers with the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptedThresholds {
    pub pain_high: f64,
    pub pain_medium: f64,
    pub drift_high: f64,
    pub clarity_low: f64,
}

/// A fully resolved set of trigger values, frozen for one turn.
///
/// The facet classifier and phase machine are pure functions over
/// `(Metrics, ThresholdSet)`; freezing the set keeps a turn internally
/// consistent even while the adapter keeps learning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    pub pain_high: f64,
    pub pain_medium: f64,
    pub clarity_low: f64,
    pub trust_low: f64,
    pub drift_high: f64,
    pub chaos_high: f64,
    pub stagnation_clarity: f64,
    pub stagnation_chaos: f64,
    pub bloom_index: f64,
    pub drift_anchor: f64,
    pub splinter_pain_cycles: u32,
}

// =============================================================================
// BOUNDED HISTORY
// =============================================================================

/// Fixed-capacity sample ring with explicit oldest-first eviction.
#[derive(Debug, Clone, Default)]
struct History {
    samples: VecDeque<f64>,
}

impl History {
    fn push(&mut self, value: f64) {
        if self.samples.len() >= HISTORY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    /// Exponential moving average recomputed from scratch.
    ///
    /// Starts an accumulator at 0 and folds the entire bounded history in
    /// chronological order. An incrementally carried EMA would weight
    /// evicted samples forever; the from-scratch fold forgets them.
    fn ema(&self, alpha: f64) -> f64 {
        let mut acc = 0.0;
        for value in &self.samples {
            acc = alpha * value + (1.0 - alpha) * acc;
        }
        acc
    }

    fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.samples.iter().sum();
        sum / self.samples.len() as f64
    }
}

// =============================================================================
// THRESHOLD ADAPTER
// =============================================================================

/// Adapts select triggers based on recent metric trends.
///
/// Never raises: with no history every lookup answers the baseline.
#[derive(Debug, Clone)]
pub struct ThresholdAdapter {
    base: BaseThresholds,
    adapted: Option<AdaptedThresholds>,
    pain: History,
    drift: History,
    clarity: History,
}

impl Default for ThresholdAdapter {
    fn default() -> Self {
        Self::new(BaseThresholds::default())
    }
}

impl ThresholdAdapter {
    /// Create an adapter over the given baselines.
    #[must_use]
    pub fn new(base: BaseThresholds) -> Self {
        Self {
            base,
            adapted: None,
            pain: History::default(),
            drift: History::default(),
            clarity: History::default(),
        }
    }

    /// Incorporate the latest vitals and recompute the adapted triggers.
    pub fn update(&mut self, metrics: &Metrics) {
        self.pain.push(metrics.pain);
        self.drift.push(metrics.drift);
        self.clarity.push(metrics.clarity);

        let ema_pain = self.pain.ema(EMA_ALPHA);
        let avg_drift = self.drift.mean();
        let avg_clarity = self.clarity.mean();

        // Pain high creeps toward the trend so sustained crisis does not
        // pin the pain facet on every single turn.
        let pain_high = (self.base.pain_high
            + ADAPTATION_RATE * (ema_pain - self.base.pain_high))
            .clamp(0.4, 0.95);

        // Pain medium follows the same trend but must keep its distance
        // from pain high or the relief/pain classification turns ambiguous.
        let pain_medium = (self.base.pain_medium
            + ADAPTATION_RATE * (ema_pain - self.base.pain_medium))
            .clamp(0.1, pain_high - PAIN_MARGIN);

        let drift_high = (self.base.drift_high
            + ADAPTATION_RATE * (avg_drift - self.base.drift_high))
            .clamp(0.1, 0.9);

        // Clarity adapts in the opposite direction: persistently low
        // clarity relaxes the trigger so structure arrives sooner.
        let clarity_low = (self.base.clarity_low
            - ADAPTATION_RATE * (avg_clarity - self.base.clarity_low))
            .clamp(0.3, 0.95);

        self.adapted = Some(AdaptedThresholds {
            pain_high,
            pain_medium,
            drift_high,
            clarity_low,
        });
    }

    /// Resolve one trigger: adapted value if tracked, baseline otherwise.
    #[must_use]
    pub fn get(&self, trigger: Trigger) -> f64 {
        match (trigger, self.adapted) {
            (Trigger::PainHigh, Some(a)) => a.pain_high,
            (Trigger::PainMedium, Some(a)) => a.pain_medium,
            (Trigger::DriftHigh, Some(a)) => a.drift_high,
            (Trigger::ClarityLow, Some(a)) => a.clarity_low,
            (Trigger::PainHigh, None) => self.base.pain_high,
            (Trigger::PainMedium, None) => self.base.pain_medium,
            (Trigger::DriftHigh, None) => self.base.drift_high,
            (Trigger::ClarityLow, None) => self.base.clarity_low,
            (Trigger::TrustLow, _) => self.base.trust_low,
            (Trigger::ChaosHigh, _) => self.base.chaos_high,
            (Trigger::StagnationClarity, _) => self.base.stagnation_clarity,
            (Trigger::StagnationChaos, _) => self.base.stagnation_chaos,
            (Trigger::BloomIndex, _) => self.base.bloom_index,
            (Trigger::DriftAnchor, _) => self.base.drift_anchor,
        }
    }

    /// Freeze the fully resolved trigger set for one turn.
    #[must_use]
    pub fn snapshot(&self) -> ThresholdSet {
        ThresholdSet {
            pain_high: self.get(Trigger::PainHigh),
            pain_medium: self.get(Trigger::PainMedium),
            clarity_low: self.get(Trigger::ClarityLow),
            trust_low: self.get(Trigger::TrustLow),
            drift_high: self.get(Trigger::DriftHigh),
            chaos_high: self.get(Trigger::ChaosHigh),
            stagnation_clarity: self.get(Trigger::StagnationClarity),
            stagnation_chaos: self.get(Trigger::StagnationChaos),
            bloom_index: self.get(Trigger::BloomIndex),
            drift_anchor: self.get(Trigger::DriftAnchor),
            splinter_pain_cycles: self.base.splinter_pain_cycles,
        }
    }

    /// The current pain EMA over the bounded history.
    #[must_use]
    pub fn pain_ema(&self) -> f64 {
        self.pain.ema(EMA_ALPHA)
    }

    /// Number of pain samples currently retained.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.pain.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
