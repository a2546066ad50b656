/// Hive MCP Server
///
/// Environment Variables (in addition to the server settings):
/// - CONNECTION_NAME: Beeline connection name or jdbc:hive2:// URL (required)
/// - USERNAME / PASSWORD: Credentials (required)
/// - HIVE_BEELINE_PATH: beeline executable (default: "beeline")

use cml_mcp::core::config::{HiveConfig, ServerConfig};
use cml_mcp::core::{logging, server};
use cml_mcp::tools::hive;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = ServerConfig::from_env("Hive MCP server")?;
    let hive_config = HiveConfig::from_env().inspect_err(|e| {
        error!("{}. Set CONNECTION_NAME, USERNAME and PASSWORD.", e);
    })?;
    info!(connection = %hive_config.connection_name, "starting Hive MCP server");

    let catalog = hive::catalog(hive_config)?;
    server::serve(config, catalog).await?;
    Ok(())
}
