//! # API Request/Response Types
//!
//! JSON structures for the HTTP API.

use iskra_core::{
    Metrics, MicroObservation, Node, PauseKind, TurnOutcome,
    primitives::{MAX_SESSION_KEY_LENGTH, MAX_USER_TEXT_LENGTH},
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// TURN REQUEST/RESPONSE
// =============================================================================

/// Micro observation fields accepted over the wire.
///
/// Everything is optional; missing fields fall back to estimates
/// derived from the text itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MicroJson {
    pub pause_duration_ms: Option<u64>,
    pub pause_kind: Option<PauseKind>,
    pub lz_complexity: Option<f64>,
    pub hurst_exponent: Option<f64>,
}

/// Process-turn request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    pub session_key: String,
    pub text: String,
    #[serde(default)]
    pub micro: MicroJson,
}

impl TurnRequest {
    /// Validate field sizes at the API boundary, before the engine.
    pub fn validate(&self) -> Result<(), String> {
        if self.session_key.is_empty() || self.session_key.len() > MAX_SESSION_KEY_LENGTH {
            return Err(format!(
                "session_key must be 1..={MAX_SESSION_KEY_LENGTH} bytes"
            ));
        }
        if self.text.is_empty() {
            return Err("text must not be empty".to_string());
        }
        if self.text.len() > MAX_USER_TEXT_LENGTH {
            return Err(format!("text exceeds {MAX_USER_TEXT_LENGTH} bytes"));
        }
        Ok(())
    }

    /// Build the core observation, estimating what the client omitted.
    #[must_use]
    pub fn to_micro(&self) -> MicroObservation {
        let mut micro = MicroObservation::from_text_length(self.text.len());
        micro.pause_duration_ms = self.micro.pause_duration_ms;
        micro.pause_kind = self.micro.pause_kind;
        if let Some(lz) = self.micro.lz_complexity {
            micro.lz_complexity = lz.clamp(0.0, 1.0);
        }
        if let Some(hurst) = self.micro.hurst_exponent {
            micro.hurst_exponent = hurst.clamp(0.0, 1.0);
        }
        micro
    }
}

/// Process-turn response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub facet: String,
    pub phase: String,
    pub content: String,
    pub metrics: Metrics,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            facet: outcome.facet.name().to_string(),
            phase: outcome.phase.name().to_string(),
            content: outcome.content,
            metrics: outcome.metrics,
        }
    }
}

// =============================================================================
// SESSION STATUS RESPONSE
// =============================================================================

/// Per-session state response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub phase: String,
    pub metrics: Metrics,
    pub node_count: usize,
}

// =============================================================================
// RESET REQUEST/RESPONSE
// =============================================================================

/// Session reset request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub session_key: String,
}

/// Session reset acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub reset: bool,
}

// =============================================================================
// TRACE RESPONSE
// =============================================================================

/// One graph node plus everything it links to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResponse {
    pub node: Node,
    pub linked: Vec<Node>,
}

// =============================================================================
// CONTEXT RESPONSE
// =============================================================================

/// One recent memory event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub user_input: String,
    pub response_content: String,
}

/// Recent-context response, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub entries: Vec<ContextEntry>,
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
