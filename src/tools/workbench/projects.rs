use serde_json::{Value, json};

use super::{SharedClient, add_tool, body, items, reply, with_project};
use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolRegistry};
use crate::core::schema::{InputSchema, ParamKind};

pub fn register(registry: &mut ToolRegistry, client: &SharedClient) -> Result<(), RegistryError> {
    add_tool(
        registry,
        client,
        "list_projects_tool",
        "List all available projects in Cloudera ML",
        InputSchema::new(),
        list_projects,
    )?;
    add_tool(
        registry,
        client,
        "get_project_id_tool",
        "Get the ID of a project by its name. Use '*' to list all projects with their IDs",
        InputSchema::new().required("project_name", ParamKind::String, "Name of the project, or '*'"),
        get_project_id,
    )?;
    add_tool(
        registry,
        client,
        "batch_list_projects_tool",
        "Fetch several projects at once by ID",
        InputSchema::new().required("ids", ParamKind::StringList, "Project IDs"),
        batch_list_projects,
    )?;
    add_tool(
        registry,
        client,
        "update_project_tool",
        "Update a project's name, summary, template or visibility",
        with_project(
            InputSchema::new()
                .optional("name", ParamKind::String, "New project name")
                .optional("summary", ParamKind::String, "New project summary")
                .optional("template", ParamKind::String, "Project template")
                .optional("public", ParamKind::Boolean, "Whether the project is public")
                .optional("disable_git_repo", ParamKind::Boolean, "Disable the project's git repository"),
        ),
        update_project,
    )?;
    add_tool(
        registry,
        client,
        "get_runtimes_tool",
        "List the ML runtimes available in the workspace",
        InputSchema::new(),
        get_runtimes,
    )
}

async fn fetch_projects(client: &SharedClient) -> Result<Vec<Value>, ToolError> {
    let response = client.get(client.endpoint(&["projects"])?).await?;
    Ok(items(&response, "projects").to_vec())
}

fn summarize(project: &Value) -> Value {
    json!({
        "name": project.get("name").cloned().unwrap_or(Value::Null),
        "id": project.get("id").cloned().unwrap_or(Value::Null),
        "owner": project.pointer("/owner/username").cloned().unwrap_or(Value::Null),
    })
}

async fn list_projects(client: SharedClient, _args: Arguments) -> Result<Content, ToolError> {
    let projects = fetch_projects(&client).await?;
    if projects.is_empty() {
        return Err(ToolError::Execution(
            "No projects found or you don't have permission to list projects".to_string(),
        ));
    }

    let summaries: Vec<Value> = projects.iter().map(summarize).collect();
    Ok(Content::Json(json!({
        "message": format!("Found {} projects", summaries.len()),
        "count": summaries.len(),
        "projects": summaries,
    })))
}

async fn get_project_id(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let name = args.required_str("project_name")?;
    let projects = fetch_projects(&client).await?;

    if name == "*" {
        let summaries: Vec<Value> = projects.iter().map(summarize).collect();
        return Ok(reply(format!("Found {} projects", summaries.len()), Value::from(summaries)));
    }

    projects
        .iter()
        .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
        .map(|p| reply(format!("Found project '{}'", name), summarize(p)))
        .ok_or_else(|| ToolError::Execution(format!("No project found with name: {}", name)))
}

async fn batch_list_projects(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let ids = args.list("ids").unwrap_or_default();
    if ids.is_empty() {
        return Err(ToolError::invalid("ids", "must be a non-empty list of project IDs"));
    }

    let response = client
        .post(client.endpoint(&["projects", "batchList"])?, &json!({ "ids": ids }))
        .await?;
    let count = items(&response, "projects").len();
    Ok(reply(format!("Successfully retrieved {} projects", count), response))
}

async fn update_project(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let payload = body(&args, &["name", "summary", "template", "public", "disable_git_repo"]);
    if payload.as_object().is_some_and(|m| m.is_empty()) {
        return Err(ToolError::Execution("No fields to update were provided".to_string()));
    }

    let response = client.patch(client.project_endpoint(project_id, &[])?, &payload).await?;
    Ok(reply(format!("Successfully updated project '{}'", project_id), response))
}

async fn get_runtimes(client: SharedClient, _args: Arguments) -> Result<Content, ToolError> {
    let response = match client.get(client.endpoint(&["runtimes"])?).await {
        // Older workspaces only serve runtimes from the v1 API
        Err(ToolError::Api { status: 404, .. }) => {
            client.get(client.versioned_endpoint("v1", &["runtimes"])?).await?
        }
        other => other?,
    };

    let runtimes: Vec<Value> = items(&response, "runtimes")
        .iter()
        .map(|runtime| {
            let identifier = runtime
                .get("image_identifier")
                .or_else(|| runtime.get("runtime_identifier"))
                .cloned()
                .unwrap_or(Value::Null);
            let field = |key: &str, fallback: &str| {
                runtime
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| Value::from(fallback))
            };
            json!({
                "identifier": identifier,
                "edition": field("edition", "Unknown"),
                "type": field("image_type", "Unknown"),
                "description": field("short_description", "No description"),
            })
        })
        .collect();

    Ok(Content::Json(json!({
        "message": format!("Found {} available runtimes", runtimes.len()),
        "count": runtimes.len(),
        "runtimes": runtimes,
    })))
}
