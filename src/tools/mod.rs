/// Tools Module
///
/// Each bundle is a module that exports a `register` function adding its
/// tools to a registry, plus a `catalog` builder used by its binary:
/// - echo.rs / calc.rs: the sample bundle
/// - workbench/: Cloudera ML workbench REST API
/// - hive/: Hive and Impala queries

pub mod calc;
pub mod echo;
pub mod hive;
pub mod workbench;

use crate::core::catalog::Catalog;
use crate::core::error::RegistryError;
use crate::core::registry::ToolRegistry;

/// Build the catalog served by the `sample-mcp` binary: the echo and
/// calculator tools plus the echo resource and prompt.
pub fn sample_catalog() -> Result<Catalog, RegistryError> {
    let mut registry = ToolRegistry::new();
    echo::register(&mut registry)?;
    calc::register(&mut registry)?;

    let mut catalog = Catalog::new(registry);
    echo::register_extras(&mut catalog)?;
    Ok(catalog)
}
