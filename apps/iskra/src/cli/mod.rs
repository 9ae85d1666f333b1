//! # Iskra CLI Module
//!
//! This module implements the CLI interface for Iskra.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `turn` - Process one turn for a session
//! - `status` - Show a session's phase and vitals
//! - `context` - Show a session's recent memory events
//! - `trace` - Resolve one graph node and its causal links
//! - `reset` - Forget a session

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Iskra - Conversational-State Server
///
/// A deterministic per-user state engine: seven voices, eight phases,
/// adaptive triggers, and a causal memory of every exchange.
#[derive(Parser, Debug)]
#[command(name = "iskra")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the session database (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Process one turn for a session
    Turn {
        /// Session key
        #[arg(short, long)]
        session: String,

        /// User input text
        #[arg(short, long)]
        text: String,
    },

    /// Show a session's phase, vitals, and graph size
    Status {
        /// Session key
        #[arg(short, long)]
        session: String,
    },

    /// Show a session's recent memory events
    Context {
        /// Session key
        #[arg(short, long)]
        session: String,

        /// Maximum number of events
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Resolve one graph node and its causal links
    Trace {
        /// Session key
        #[arg(short, long)]
        session: String,

        /// Node id
        #[arg(short, long)]
        node: u64,
    },

    /// Forget a session
    Reset {
        /// Session key
        #[arg(short, long)]
        session: String,
    },
}
