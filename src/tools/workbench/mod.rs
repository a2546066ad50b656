/// Cloudera ML Workbench Tools
///
/// Every tool in this bundle is a thin request against the workbench REST
/// API (`/api/v2`). The tools are grouped by resource:
/// - projects.rs: projects and runtimes
/// - files.rs: project files and uploads
/// - jobs.rs: jobs and job runs
/// - applications.rs: applications
/// - experiments.rs: experiments and experiment runs
/// - models.rs: models, builds and deployments
///
/// Handlers share one `WorkbenchClient` through an `Arc`.

use serde_json::{Map, Value, json};
use std::future::Future;
use std::sync::Arc;

use crate::core::args::Arguments;
use crate::core::catalog::Catalog;
use crate::core::config::WorkbenchConfig;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolDescriptor, ToolRegistry, context_handler};
use crate::core::schema::{InputSchema, ParamKind};

pub mod applications;
pub mod client;
pub mod experiments;
pub mod files;
pub mod jobs;
pub mod models;
pub mod projects;

pub use client::WorkbenchClient;

pub type SharedClient = Arc<WorkbenchClient>;

/// Runtime used by jobs and applications when none is given.
pub const DEFAULT_RUNTIME: &str =
    "docker.repository.cloudera.com/cloudera/cdsw/ml-runtime-jupyterlab-python3.10-standard:2024.10.1-b12";

/// Register every workbench tool.
pub fn register(registry: &mut ToolRegistry, client: SharedClient) -> Result<(), RegistryError> {
    projects::register(registry, &client)?;
    files::register(registry, &client)?;
    jobs::register(registry, &client)?;
    applications::register(registry, &client)?;
    experiments::register(registry, &client)?;
    models::register(registry, &client)?;
    Ok(())
}

/// Build the catalog served by the `workbench-mcp` binary.
pub fn catalog(config: &WorkbenchConfig) -> anyhow::Result<Catalog> {
    let client = Arc::new(WorkbenchClient::new(config)?);
    let mut registry = ToolRegistry::new();
    register(&mut registry, client)?;
    Ok(Catalog::new(registry))
}

/// Register one tool whose handler receives the shared client.
pub(crate) fn add_tool<F, Fut>(
    registry: &mut ToolRegistry,
    client: &SharedClient,
    name: &str,
    description: &str,
    schema: InputSchema,
    handler: F,
) -> Result<(), RegistryError>
where
    F: Fn(SharedClient, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Content, ToolError>> + Send + 'static,
{
    registry.register(
        ToolDescriptor::new(name, description, schema),
        context_handler(client.clone(), handler),
    )
}

/// Adds the optional `project_id` parameter shared by most tools.
pub(crate) fn with_project(schema: InputSchema) -> InputSchema {
    schema.optional(
        "project_id",
        ParamKind::String,
        "ID of the project (defaults to the configured project)",
    )
}

/// `{"message": ..., "data": ...}`, the shape most tools return.
pub(crate) fn reply(message: impl Into<String>, data: Value) -> Content {
    Content::Json(json!({
        "message": message.into(),
        "data": data,
    }))
}

/// JSON body holding only the supplied arguments among `names`.
pub(crate) fn body(args: &Arguments, names: &[&str]) -> Value {
    Value::Object(args.collect_json(names))
}

/// The array stored under `key` in a list response, or an empty one.
pub(crate) fn items<'a>(response: &'a Value, key: &str) -> &'a [Value] {
    response
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Copy `fields` out of an API object, keeping their names.
pub(crate) fn pick(item: &Value, fields: &[&str]) -> Value {
    let mut out = Map::new();
    for field in fields {
        out.insert((*field).to_string(), item.get(*field).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}
