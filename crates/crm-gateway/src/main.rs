//! crm-gateway: CRM Gateway Main Binary
//!
//! HubSpot pass-through API with a tool-calling chat assistant.
//!
//! Usage:
//!   crm-gateway           - Start server mode (HTTP API)
//!   crm-gateway --cli     - Start interactive CLI chat mode
//!   crm-gateway --help    - Show help

mod cli;

use std::sync::Arc;

use crm_api::{AppState, Shutdown};
use crm_core::{Assistant, Config, LlmClient, ToolManager};
use crm_hubspot::HubSpotClient;
use crm_tools::{register_crm_tools, GatewayClient};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Server mode (HTTP API)
    Server,
    /// Interactive CLI mode
    Cli,
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let mode = parse_args(std::env::args().skip(1));

    match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("crm-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize logging; the REPL stays quiet unless RUST_LOG says otherwise
    let default_level = if mode == RunMode::Cli { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Load configuration (crm-gateway.toml, then environment)
    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting crm-gateway...");
    tracing::info!("Model: {}", config.llm.model);

    let state = build_state(&config)?;

    match mode {
        RunMode::Cli => {
            tracing::info!("Running in CLI mode");
            cli::run_cli(&config, state).await
        }
        RunMode::Server => run_server(&config, state).await,
        _ => Ok(()),
    }
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> RunMode {
    for arg in args {
        match arg.as_str() {
            "--cli" | "-c" => return RunMode::Cli,
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("crm-gateway - HubSpot CRM gateway with a chat assistant");
    println!();
    println!("Usage:");
    println!("  crm-gateway           Start server mode (HTTP API)");
    println!("  crm-gateway --cli     Start interactive CLI chat mode");
    println!("  crm-gateway --help    Show this help message");
    println!("  crm-gateway --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  HUBSPOT_ACCESS_TOKEN     HubSpot private app token (required)");
    println!("  HUBSPOT_BASE_URL         HubSpot API base (default: https://api.hubapi.com)");
    println!("  OPENAI_API_KEY           Chat model API key (required, or LLM_API_KEY)");
    println!("  LLM_MODEL                Model name (default: gpt-4o-mini)");
    println!("  LLM_BASE_URL             Custom OpenAI-compatible endpoint");
    println!("  API_HOST                 Bind address (default: 0.0.0.0)");
    println!("  API_PORT                 HTTP API port (default: 3001)");
    println!("  API_ALLOWED_ORIGINS      Comma-separated CORS origins (default: any)");
    println!("  STATIC_DIR               Directory served for non-API paths");
    println!("  SHUTDOWN_GRACE_SECS      Drain period on shutdown (default: 10)");
    println!("  GATEWAY_URL              Base URL the chat tools call (default: http://127.0.0.1:<port>)");
    println!("  ASSISTANT_SYSTEM_PROMPT  Override the assistant system prompt");
}

/// Wire the HubSpot client, the model client and the CRM tools together
fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let hubspot = HubSpotClient::new(&config.hubspot)
        .map_err(|e| anyhow::anyhow!("Failed to create HubSpot client: {}", e))?;

    let llm = LlmClient::new(config.llm_config())
        .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?;

    // Tools reach the CRM through this server's own REST API
    let gateway = GatewayClient::new(&config.gateway_url())
        .map_err(|e| anyhow::anyhow!("Failed to create gateway client: {}", e))?;

    let mut tool_manager = ToolManager::new();
    register_crm_tools(&mut tool_manager, gateway);
    tracing::info!(
        "Registered {} tools: {:?}",
        tool_manager.len(),
        tool_manager.tool_names()
    );

    let assistant = Assistant::new(
        llm,
        Arc::new(tool_manager),
        config.assistant.system_prompt.clone(),
    );

    Ok(AppState::new(hubspot, assistant))
}

/// Run server mode until SIGINT/SIGTERM or a handler panic
async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    tracing::info!("Press Ctrl+C to stop the server");

    crm_api::start_server(&config.api, state, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
