//! eSignature MCP Server - Entry point
//!
//! An MCP server for e-signature document workflows.

use esign_mcp_server::{run_server_with_config, WorkflowConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "esign_mcp_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = WorkflowConfig::default();
    if let Ok(dir) = std::env::var("ESIGN_INTAKE_DIR") {
        config.intake_dir = dir;
    }
    if let Ok(dir) = std::env::var("ESIGN_ORGANIZED_DIR") {
        config.organized_dir = dir;
    }
    if let Ok(name) = std::env::var("ESIGN_FIELD_NAME") {
        config.signature_field_name = name;
    }

    tracing::info!("Starting eSignature MCP Server");

    run_server_with_config(config).await
}
