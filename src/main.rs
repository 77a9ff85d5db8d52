use apsaradb_mongodb_mcp::config::Config;
use apsaradb_mongodb_mcp::mcp_server::ApsaraDbMcpServer;
use eyre::WrapErr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("apsaradb_mongodb_mcp=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if let Ok(path) = dotenvy::dotenv() {
        tracing::info!("Loaded environment from {}", path.display());
    }

    let config = Config::from_env().wrap_err("failed to load configuration")?;
    tracing::info!(
        mongodb_configured = config.mongodb_connection_string.is_some(),
        "Starting ApsaraDB MongoDB MCP server..."
    );

    let server = ApsaraDbMcpServer::from_config(&config).wrap_err("failed to build server")?;
    tracing::info!("Serving {} tools over stdio", server.registry().names().len());

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
