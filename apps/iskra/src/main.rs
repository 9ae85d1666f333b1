//! # Iskra - Conversational-State Server
//!
//! The main binary for the Iskra per-user state engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for turns, traces, and session management
//! - Offline collaborator models (swappable behind core traits)
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  apps/iskra (THE BINARY)                  │
//! │                                                           │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────────┐  │
//! │  │   CLI       │   │   HTTP API  │   │  Collaborator  │  │
//! │  │  (clap)     │   │   (axum)    │   │  models        │  │
//! │  └──────┬──────┘   └──────┬──────┘   └───────┬────────┘  │
//! │         │                 │                  │           │
//! │         └─────────────────┼──────────────────┘           │
//! │                           ▼                              │
//! │                   ┌───────────────┐                      │
//! │                   │  iskra-core   │                      │
//! │                   │  (THE LOGIC)  │                      │
//! │                   └───────────────┘                      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! iskra server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! iskra turn -s user-1 -t "everything hurts"
//! iskra status -s user-1
//! iskra trace -s user-1 -n 2
//! ```

use clap::Parser;
use iskra::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — ISKRA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("ISKRA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "iskra=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Iskra startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗███████╗██╗  ██╗██████╗  █████╗
  ██║██╔════╝██║ ██╔╝██╔══██╗██╔══██╗
  ██║███████╗█████╔╝ ██████╔╝███████║
  ██║╚════██║██╔═██╗ ██╔══██╗██╔══██║
  ██║███████║██║  ██╗██║  ██║██║  ██║
  ╚═╝╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝╚═╝  ╚═╝

  Conversational-State Server v{}

  Seven voices • Eight phases • One memory
"#,
        env!("CARGO_PKG_VERSION")
    );
}
