//! # CLI Command Implementations

use crate::api;
use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::model::{HeuristicMetrics, TemplateReply};
use iskra_core::{
    Engine, IskraError, MicroObservation, NodeId, RedbStore,
};

/// Build the engine from resolved configuration.
fn build_engine(config: &AppConfig) -> Result<Engine, IskraError> {
    let store = RedbStore::open(&config.database)?;
    let mut engine = Engine::new(
        Box::new(store),
        Box::new(HeuristicMetrics),
        Box::new(TemplateReply),
    )
    .with_scope(config.scope())
    .with_base_thresholds(config.base_thresholds());
    if let Some(limit) = config.context_limit {
        engine = engine.with_context_limit(limit);
    }
    Ok(engine)
}

/// Resolve configuration from file, env, and CLI overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig, IskraError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    Ok(config)
}

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), IskraError> {
    let config = resolve_config(&cli)?;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            let mut config = config;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Turn { session, text }) => cmd_turn(&config, &session, &text, cli.json_mode),
        Some(Commands::Status { session }) => cmd_status(&config, &session, cli.json_mode),
        Some(Commands::Context { session, limit }) => {
            cmd_context(&config, &session, limit, cli.json_mode)
        }
        Some(Commands::Trace { session, node }) => {
            cmd_trace(&config, &session, node, cli.json_mode)
        }
        Some(Commands::Reset { session }) => cmd_reset(&config, &session),
        None => {
            println!("No command specified. Use --help for usage information.");
            Ok(())
        }
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
async fn cmd_server(config: &AppConfig) -> Result<(), IskraError> {
    let engine = build_engine(config)?;

    println!("Iskra Conversational-State Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", config.host);
    println!("  Port:       {}", config.port);
    println!("  Database:   {}", config.database.display());
    println!("  Adaptation: {:?}", config.scope());
    println!();

    api::run_server(&config.bind_addr(), engine).await
}

// =============================================================================
// TURN COMMAND
// =============================================================================

/// Process one turn from the command line.
fn cmd_turn(
    config: &AppConfig,
    session: &str,
    text: &str,
    json_mode: bool,
) -> Result<(), IskraError> {
    let engine = build_engine(config)?;
    let micro = MicroObservation::from_text_length(text.len());
    let outcome = engine.process_turn(session, text, micro)?;

    if json_mode {
        let response = api::TurnResponse::from(outcome);
        println!(
            "{}",
            serde_json::to_string_pretty(&response)
                .map_err(|e| IskraError::Serialization(e.to_string()))?
        );
    } else {
        println!("Facet: {}", outcome.facet);
        println!("Phase: {}", outcome.phase);
        println!();
        println!("{}", outcome.content);
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show a session's phase and vitals.
fn cmd_status(config: &AppConfig, session: &str, json_mode: bool) -> Result<(), IskraError> {
    let engine = build_engine(config)?;
    let (metrics, phase, node_count) = engine.session_state(session)?;

    if json_mode {
        let response = api::SessionStatusResponse {
            phase: phase.name().to_string(),
            metrics,
            node_count,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&response)
                .map_err(|e| IskraError::Serialization(e.to_string()))?
        );
    } else {
        println!("Session: {session}");
        println!("  Phase:   {phase}");
        println!("  Nodes:   {node_count}");
        println!("  Vitals:");
        println!("    trust:   {:.2}", metrics.trust);
        println!("    clarity: {:.2}", metrics.clarity);
        println!("    pain:    {:.2}", metrics.pain);
        println!("    drift:   {:.2}", metrics.drift);
        println!("    chaos:   {:.2}", metrics.chaos);
    }
    Ok(())
}

// =============================================================================
// CONTEXT COMMAND
// =============================================================================

/// Show recent memory events, oldest first.
fn cmd_context(
    config: &AppConfig,
    session: &str,
    limit: usize,
    json_mode: bool,
) -> Result<(), IskraError> {
    let engine = build_engine(config)?;
    let items = engine.recent_context(session, limit)?;

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(
                &items
                    .iter()
                    .map(|item| api::ContextEntry {
                        user_input: item.user_input.clone(),
                        response_content: item.response_content.clone(),
                    })
                    .collect::<Vec<_>>()
            )
            .map_err(|e| IskraError::Serialization(e.to_string()))?
        );
    } else if items.is_empty() {
        println!("No memory events for session {session}.");
    } else {
        for (i, item) in items.iter().enumerate() {
            println!("[{i}] User:  {}", item.user_input);
            println!("    Iskra: {}", item.response_content);
        }
    }
    Ok(())
}

// =============================================================================
// TRACE COMMAND
// =============================================================================

/// Resolve one node and its causal links.
fn cmd_trace(
    config: &AppConfig,
    session: &str,
    node: u64,
    json_mode: bool,
) -> Result<(), IskraError> {
    let engine = build_engine(config)?;
    match engine.trace_node(session, NodeId(node))? {
        Some((node, linked)) => {
            if json_mode {
                let response = api::TraceResponse { node, linked };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&response)
                        .map_err(|e| IskraError::Serialization(e.to_string()))?
                );
            } else {
                println!("Node {} ({:?})", node.id.0, node.kind());
                for link in &linked {
                    println!("  -> {} ({:?})", link.id.0, link.kind());
                }
            }
            Ok(())
        }
        None => {
            println!("Node {node} not found in session {session}.");
            Ok(())
        }
    }
}

// =============================================================================
// RESET COMMAND
// =============================================================================

/// Forget a session.
fn cmd_reset(config: &AppConfig, session: &str) -> Result<(), IskraError> {
    let engine = build_engine(config)?;
    engine.reset_session(session)?;
    println!("Session {session} reset.");
    Ok(())
}
