//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Iskra engine.
//!
//! These values are compiled into the binary and immutable at runtime.
//! Baseline trigger thresholds live in [`crate::thresholds::BaseThresholds`];
//! this module holds the structural constants around them.

/// Bounded window for threshold-adaptation histories.
///
/// Pain, drift, and clarity samples are each kept in a ring of this
/// size; the oldest sample is evicted first.
pub const HISTORY_WINDOW: usize = 50;

/// Smoothing factor for the pain EMA.
///
/// The EMA is recomputed from scratch over the whole bounded history on
/// every update, folding `acc = alpha * sample + (1 - alpha) * acc`
/// in chronological order from an accumulator of 0.
pub const EMA_ALPHA: f64 = 0.1;

/// Fraction of the observed delta applied when adapting a threshold.
///
/// Kept at 20% so adapted triggers track trends without oscillating.
pub const ADAPTATION_RATE: f64 = 0.2;

/// Minimum gap between the adapted medium and high pain triggers.
///
/// Without this margin the relief and pain facets would become
/// ambiguous under heavy adaptation.
pub const PAIN_MARGIN: f64 = 0.1;

/// Capacity of the growth-entry ring buffer.
pub const GROWTH_LOG_CAPACITY: usize = 100;

/// Default number of memory nodes returned by context retrieval.
pub const DEFAULT_CONTEXT_LIMIT: usize = 5;

/// Maximum allowed size for a persisted session record.
///
/// Validated BEFORE deserialization so a corrupted or malicious record
/// cannot trigger allocation-based memory exhaustion.
pub const MAX_SESSION_RECORD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Maximum length for user input text accepted per turn.
pub const MAX_USER_TEXT_LENGTH: usize = 65536;

/// Maximum length for a session key.
pub const MAX_SESSION_KEY_LENGTH: usize = 256;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_window_is_fifty() {
        assert_eq!(HISTORY_WINDOW, 50);
    }

    #[test]
    fn pain_margin_is_one_tenth() {
        assert!((PAIN_MARGIN - 0.1).abs() < f64::EPSILON);
    }
}
