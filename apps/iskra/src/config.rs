//! # Application Configuration
//!
//! TOML configuration file with environment overrides.
//!
//! Precedence, lowest to highest: built-in defaults, the config file
//! (if present), environment variables, CLI flags. Thresholds in the
//! `[thresholds]` section override individual baselines and flow into
//! the engine at startup.
//!
//! ## Environment Variables
//!
//! - `ISKRA_DB_PATH`: session database path
//! - `ISKRA_HOST` / `ISKRA_PORT`: server bind address
//! - `ISKRA_ADAPTATION_SCOPE`: "process" or "per_session"

use iskra_core::{AdaptationScope, BaseThresholds, IskraError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Partial threshold overrides from the config file.
///
/// Only the baselines named in the file change; everything else keeps
/// its canonical value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThresholdOverrides {
    pub pain_high: Option<f64>,
    pub pain_medium: Option<f64>,
    pub clarity_low: Option<f64>,
    pub trust_low: Option<f64>,
    pub drift_high: Option<f64>,
    pub chaos_high: Option<f64>,
    pub stagnation_clarity: Option<f64>,
    pub stagnation_chaos: Option<f64>,
    pub bloom_index: Option<f64>,
    pub drift_anchor: Option<f64>,
    pub splinter_pain_cycles: Option<u32>,
}

impl ThresholdOverrides {
    /// Apply the overrides on top of the canonical baselines.
    #[must_use]
    pub fn apply(&self, mut base: BaseThresholds) -> BaseThresholds {
        if let Some(v) = self.pain_high {
            base.pain_high = v;
        }
        if let Some(v) = self.pain_medium {
            base.pain_medium = v;
        }
        if let Some(v) = self.clarity_low {
            base.clarity_low = v;
        }
        if let Some(v) = self.trust_low {
            base.trust_low = v;
        }
        if let Some(v) = self.drift_high {
            base.drift_high = v;
        }
        if let Some(v) = self.chaos_high {
            base.chaos_high = v;
        }
        if let Some(v) = self.stagnation_clarity {
            base.stagnation_clarity = v;
        }
        if let Some(v) = self.stagnation_chaos {
            base.stagnation_chaos = v;
        }
        if let Some(v) = self.bloom_index {
            base.bloom_index = v;
        }
        if let Some(v) = self.drift_anchor {
            base.drift_anchor = v;
        }
        if let Some(v) = self.splinter_pain_cycles {
            base.splinter_pain_cycles = v;
        }
        base
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database() -> PathBuf {
    PathBuf::from("iskra.db")
}

/// Full application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// "process" (default) or "per_session".
    #[serde(default)]
    pub adaptation_scope: String,
    #[serde(default)]
    pub context_limit: Option<usize>,
    #[serde(default)]
    pub thresholds: ThresholdOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            host: default_host(),
            port: default_port(),
            adaptation_scope: String::new(),
            context_limit: None,
            thresholds: ThresholdOverrides::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply env overrides.
    ///
    /// A missing file is fine (defaults apply); an unreadable or
    /// malformed file is an error worth surfacing at startup.
    pub fn load(path: Option<&Path>) -> Result<Self, IskraError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| IskraError::Storage(format!("read config: {e}")))?;
                toml::from_str(&text)
                    .map_err(|e| IskraError::Validation(format!("parse config: {e}")))?
            }
            Some(path) => {
                tracing::warn!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(db) = std::env::var("ISKRA_DB_PATH") {
            self.database = PathBuf::from(db);
        }
        if let Ok(host) = std::env::var("ISKRA_HOST") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("ISKRA_PORT")
            && let Ok(port) = port.parse()
        {
            self.port = port;
        }
        if let Ok(scope) = std::env::var("ISKRA_ADAPTATION_SCOPE") {
            self.adaptation_scope = scope;
        }
    }

    /// Resolve the adaptation scope tag.
    ///
    /// Unknown tags fall back to process-wide with a warning rather
    /// than refusing to start.
    #[must_use]
    pub fn scope(&self) -> AdaptationScope {
        match self.adaptation_scope.as_str() {
            "" | "process" => AdaptationScope::Process,
            "per_session" => AdaptationScope::PerSession,
            other => {
                tracing::warn!(scope = other, "unknown adaptation scope, using process-wide");
                AdaptationScope::Process
            }
        }
    }

    /// The baselines with file overrides applied.
    #[must_use]
    pub fn base_thresholds(&self) -> BaseThresholds {
        self.thresholds.apply(BaseThresholds::default())
    }

    /// The server bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================
