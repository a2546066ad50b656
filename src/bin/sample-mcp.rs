/// Sample MCP Server
///
/// Serves the echo and calculator tools with the echo resource and prompt.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "Sample-MCP")
/// - SERVER_VERSION: Version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "stdio")
/// - HOST / PORT: Bind address for HTTP mode (default: 0.0.0.0:3000)

use cml_mcp::core::{config::ServerConfig, logging, server};
use cml_mcp::tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = ServerConfig::from_env("Sample-MCP")?;
    let catalog = tools::sample_catalog()?;

    server::serve(config, catalog).await?;
    Ok(())
}
