/// Cloudera ML Workbench MCP Server
///
/// Environment Variables (in addition to the server settings):
/// - CLOUDERA_ML_HOST: Workbench URL (required)
/// - CLOUDERA_ML_API_KEY: API key (required)
/// - CLOUDERA_ML_PROJECT_ID: Default project for tools called without one
/// - CLOUDERA_ML_TIMEOUT_SECS: Request timeout in seconds (default: 30)

use cml_mcp::core::config::{ServerConfig, WorkbenchConfig};
use cml_mcp::core::{logging, server};
use cml_mcp::tools::workbench;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = ServerConfig::from_env("Cloudera ML MCP Server")?;
    let workbench_config = WorkbenchConfig::from_env().inspect_err(|e| {
        error!("{}. Set CLOUDERA_ML_HOST and CLOUDERA_ML_API_KEY.", e);
    })?;
    info!(
        host = %workbench_config.host,
        project = workbench_config.default_project_id.as_deref().unwrap_or("<none>"),
        "using Cloudera ML workbench"
    );

    let catalog = workbench::catalog(&workbench_config)?;
    server::serve(config, catalog).await?;
    Ok(())
}
