/// Application Tools

use serde_json::{Value, json};

use super::{DEFAULT_RUNTIME, SharedClient, add_tool, body, items, reply, with_project};
use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolRegistry};
use crate::core::schema::{InputSchema, ParamKind};

const APPLICATION_FIELDS: [&str; 9] = [
    "name",
    "script",
    "subdomain",
    "description",
    "cpu",
    "memory",
    "nvidia_gpu",
    "runtime_identifier",
    "environment_variables",
];

fn application_id() -> InputSchema {
    InputSchema::new().required("application_id", ParamKind::String, "ID of the application")
}

pub fn register(registry: &mut ToolRegistry, client: &SharedClient) -> Result<(), RegistryError> {
    add_tool(
        registry,
        client,
        "create_application_tool",
        "Create a new application in a Cloudera ML project",
        with_project(
            InputSchema::new()
                .required("name", ParamKind::String, "Name for the application")
                .required("script", ParamKind::String, "Script to run in the application")
                .optional("subdomain", ParamKind::String, "Subdomain the application is served on")
                .optional("description", ParamKind::String, "Description for the application")
                .with_default("cpu", ParamKind::Integer, "CPU cores", json!(1))
                .with_default("memory", ParamKind::Integer, "Memory in GB", json!(1))
                .with_default("nvidia_gpu", ParamKind::Integer, "Number of GPUs", json!(0))
                .optional("runtime_identifier", ParamKind::String, "Runtime identifier for the application")
                .optional("environment_variables", ParamKind::Object, "Environment variables as a JSON object"),
        ),
        create_application,
    )?;
    add_tool(
        registry,
        client,
        "list_applications_tool",
        "List all applications in a Cloudera ML project",
        with_project(InputSchema::new()),
        list_applications,
    )?;
    add_tool(
        registry,
        client,
        "get_application_tool",
        "Get details of a specific application",
        with_project(application_id()),
        get_application,
    )?;
    add_tool(
        registry,
        client,
        "update_application_tool",
        "Update an existing application",
        with_project(
            application_id()
                .optional("name", ParamKind::String, "New name")
                .optional("description", ParamKind::String, "New description")
                .optional("script", ParamKind::String, "New script")
                .optional("subdomain", ParamKind::String, "New subdomain")
                .optional("cpu", ParamKind::Integer, "New CPU cores")
                .optional("memory", ParamKind::Integer, "New memory in GB")
                .optional("nvidia_gpu", ParamKind::Integer, "New number of GPUs")
                .optional("runtime_identifier", ParamKind::String, "New runtime identifier")
                .optional("environment_variables", ParamKind::Object, "Environment variables as a JSON object"),
        ),
        update_application,
    )?;
    add_tool(
        registry,
        client,
        "restart_application_tool",
        "Restart an application",
        with_project(application_id()),
        restart_application,
    )?;
    add_tool(
        registry,
        client,
        "stop_application_tool",
        "Stop a running application",
        with_project(application_id()),
        stop_application,
    )?;
    add_tool(
        registry,
        client,
        "delete_application_tool",
        "Delete an application",
        with_project(application_id()),
        delete_application,
    )
}

async fn create_application(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let name = args.required_str("name")?;
    let mut payload = body(&args, &APPLICATION_FIELDS);
    if args.str("runtime_identifier").is_none() {
        payload["runtime_identifier"] = Value::from(DEFAULT_RUNTIME);
    }

    let response = client
        .post(client.project_endpoint(project_id, &["applications"])?, &payload)
        .await?;
    Ok(reply(format!("Application '{}' created successfully", name), response))
}

async fn list_applications(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let response = client.get(client.project_endpoint(project_id, &["applications"])?).await?;
    let count = items(&response, "applications").len();
    Ok(reply(format!("Found {} applications", count), response))
}

async fn get_application(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("application_id")?;
    let response = client
        .get(client.project_endpoint(project_id, &["applications", id])?)
        .await?;
    Ok(reply(format!("Successfully retrieved application {}", id), response))
}

async fn update_application(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("application_id")?;
    let payload = body(&args, &APPLICATION_FIELDS);
    if payload.as_object().is_some_and(|m| m.is_empty()) {
        return Err(ToolError::Execution("No fields to update were provided".to_string()));
    }

    let response = client
        .patch(client.project_endpoint(project_id, &["applications", id])?, &payload)
        .await?;
    Ok(reply(format!("Application {} updated successfully", id), response))
}

async fn restart_application(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("application_id")?;
    let response = client
        .post(
            client.project_endpoint(project_id, &["applications", id, "restart"])?,
            &json!({}),
        )
        .await?;
    Ok(reply(format!("Application {} restarted", id), response))
}

async fn stop_application(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("application_id")?;
    let action = format!("{}:stop", id);
    let response = client
        .post(client.project_endpoint(project_id, &["applications", action.as_str()])?, &json!({}))
        .await?;
    Ok(reply(format!("Application {} stopped", id), response))
}

async fn delete_application(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("application_id")?;
    let response = client
        .delete(client.project_endpoint(project_id, &["applications", id])?)
        .await?;
    Ok(reply(format!("Application {} deleted successfully", id), response))
}
