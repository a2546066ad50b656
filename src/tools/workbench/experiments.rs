/// Experiment and Experiment Run Tools
///
/// Metrics and parameters are JSON objects (or strings holding one); tags
/// are a list or a comma-separated string.

use serde_json::{Value, json};

use super::{SharedClient, add_tool, body, items, reply, with_project};
use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolRegistry};
use crate::core::schema::{InputSchema, ParamKind};

const RUN_FIELDS: [&str; 5] = ["name", "description", "metrics", "parameters", "tags"];

fn experiment_id() -> InputSchema {
    InputSchema::new().required("experiment_id", ParamKind::String, "ID of the experiment")
}

fn run_fields(schema: InputSchema) -> InputSchema {
    schema
        .optional("name", ParamKind::String, "Name of the run")
        .optional("description", ParamKind::String, "Description of the run")
        .optional("metrics", ParamKind::Object, "Metrics as a JSON object")
        .optional("parameters", ParamKind::Object, "Parameters as a JSON object")
        .optional("tags", ParamKind::StringList, "Comma-separated list of tags")
}

pub fn register(registry: &mut ToolRegistry, client: &SharedClient) -> Result<(), RegistryError> {
    add_tool(
        registry,
        client,
        "create_experiment_tool",
        "Create a new experiment in a Cloudera ML project",
        with_project(
            InputSchema::new()
                .required("name", ParamKind::String, "Name of the experiment")
                .optional("description", ParamKind::String, "Description of the experiment"),
        ),
        create_experiment,
    )?;
    add_tool(
        registry,
        client,
        "list_experiments_tool",
        "List experiments in a Cloudera ML project",
        with_project(InputSchema::new()),
        list_experiments,
    )?;
    add_tool(
        registry,
        client,
        "get_experiment_tool",
        "Get details of a specific experiment",
        with_project(experiment_id()),
        get_experiment,
    )?;
    add_tool(
        registry,
        client,
        "update_experiment_tool",
        "Update an experiment's name or description",
        with_project(
            experiment_id()
                .optional("name", ParamKind::String, "New name")
                .optional("description", ParamKind::String, "New description"),
        ),
        update_experiment,
    )?;
    add_tool(
        registry,
        client,
        "delete_experiment_tool",
        "Delete an experiment",
        with_project(experiment_id()),
        delete_experiment,
    )?;
    add_tool(
        registry,
        client,
        "create_experiment_run_tool",
        "Create a new experiment run",
        run_fields(
            InputSchema::new()
                .required("project_id", ParamKind::String, "ID of the project")
                .required("experiment_id", ParamKind::String, "ID of the experiment for the run"),
        ),
        create_experiment_run,
    )?;
    add_tool(
        registry,
        client,
        "get_experiment_run_tool",
        "Get details of a specific experiment run",
        with_project(experiment_id().required("run_id", ParamKind::String, "ID of the run")),
        get_experiment_run,
    )?;
    add_tool(
        registry,
        client,
        "update_experiment_run_tool",
        "Update an experiment run",
        with_project(run_fields(
            experiment_id().required("run_id", ParamKind::String, "ID of the run"),
        )),
        update_experiment_run,
    )?;
    add_tool(
        registry,
        client,
        "delete_experiment_run_tool",
        "Delete an experiment run",
        with_project(experiment_id().required("run_id", ParamKind::String, "ID of the run")),
        delete_experiment_run,
    )?;
    add_tool(
        registry,
        client,
        "delete_experiment_run_batch_tool",
        "Delete several experiment runs at once",
        with_project(experiment_id().required("run_ids", ParamKind::StringList, "IDs of the runs to delete")),
        delete_experiment_run_batch,
    )?;
    add_tool(
        registry,
        client,
        "log_experiment_run_batch_tool",
        "Log metrics, parameters and tags for several experiment runs at once",
        with_project(experiment_id().required(
            "run_updates",
            ParamKind::ObjectList,
            "JSON array of run updates, each with an id and optional metrics, parameters and tags",
        )),
        log_experiment_run_batch,
    )
}

async fn create_experiment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let name = args.required_str("name")?;
    let payload = body(&args, &["name", "description"]);
    let response = client
        .post(client.project_endpoint(project_id, &["experiments"])?, &payload)
        .await?;
    Ok(reply(format!("Experiment '{}' created successfully", name), response))
}

async fn list_experiments(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let response = client.get(client.project_endpoint(project_id, &["experiments"])?).await?;
    let count = items(&response, "experiments").len();
    Ok(reply(format!("Found {} experiments", count), response))
}

async fn get_experiment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("experiment_id")?;
    let response = client
        .get(client.project_endpoint(project_id, &["experiments", id])?)
        .await?;
    Ok(reply(format!("Successfully retrieved experiment {}", id), response))
}

async fn update_experiment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("experiment_id")?;
    let payload = body(&args, &["name", "description"]);
    if payload.as_object().is_some_and(|m| m.is_empty()) {
        return Err(ToolError::Execution("No fields to update were provided".to_string()));
    }

    let response = client
        .patch(client.project_endpoint(project_id, &["experiments", id])?, &payload)
        .await?;
    Ok(reply(format!("Experiment {} updated successfully", id), response))
}

async fn delete_experiment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("experiment_id")?;
    let response = client
        .delete(client.project_endpoint(project_id, &["experiments", id])?)
        .await?;
    Ok(reply(format!("Experiment {} deleted successfully", id), response))
}

async fn create_experiment_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = args.required_str("project_id")?;
    let experiment_id = args.required_str("experiment_id")?;
    let payload = body(&args, &RUN_FIELDS);

    let response = client
        .post(
            client.project_endpoint(project_id, &["experiments", experiment_id, "runs"])?,
            &payload,
        )
        .await?;
    Ok(reply(
        format!("Successfully created run for experiment '{}'", experiment_id),
        response,
    ))
}

async fn get_experiment_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let experiment_id = args.required_str("experiment_id")?;
    let run_id = args.required_str("run_id")?;

    let response = client
        .get(client.project_endpoint(project_id, &["experiments", experiment_id, "runs", run_id])?)
        .await?;
    Ok(reply(format!("Successfully retrieved experiment run {}", run_id), response))
}

async fn update_experiment_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let experiment_id = args.required_str("experiment_id")?;
    let run_id = args.required_str("run_id")?;
    let payload = body(&args, &RUN_FIELDS);
    if payload.as_object().is_some_and(|m| m.is_empty()) {
        return Err(ToolError::Execution("No fields to update were provided".to_string()));
    }

    let response = client
        .patch(
            client.project_endpoint(project_id, &["experiments", experiment_id, "runs", run_id])?,
            &payload,
        )
        .await?;
    Ok(reply(format!("Experiment run {} updated successfully", run_id), response))
}

async fn delete_experiment_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let experiment_id = args.required_str("experiment_id")?;
    let run_id = args.required_str("run_id")?;

    let response = client
        .delete(client.project_endpoint(project_id, &["experiments", experiment_id, "runs", run_id])?)
        .await?;
    Ok(reply(format!("Experiment run {} deleted successfully", run_id), response))
}

async fn delete_experiment_run_batch(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let experiment_id = args.required_str("experiment_id")?;
    let run_ids = args.list("run_ids").unwrap_or_default();
    if run_ids.is_empty() {
        return Err(ToolError::invalid(
            "run_ids",
            "must be a non-empty list of experiment run IDs",
        ));
    }

    let response = client
        .delete_with_body(
            client.project_endpoint(project_id, &["experiments", experiment_id, "runs-batch"])?,
            &json!({ "ids": run_ids }),
        )
        .await?;
    Ok(reply(
        format!("Successfully deleted {} experiment runs", run_ids.len()),
        response,
    ))
}

async fn log_experiment_run_batch(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let experiment_id = args.required_str("experiment_id")?;
    let runs = args.records("run_updates").unwrap_or_default();
    if runs.is_empty() {
        return Err(ToolError::invalid("run_updates", "must contain at least one run update"));
    }
    if let Some(position) = runs.iter().position(|run| !run.contains_key("id")) {
        return Err(ToolError::invalid(
            "run_updates",
            format!("entry {} has no 'id'", position),
        ));
    }

    let runs: Vec<Value> = runs.iter().cloned().map(Value::Object).collect();
    let response = client
        .post(
            client.project_endpoint(project_id, &["experiments", experiment_id, "run-batch"])?,
            &json!({ "runs": runs }),
        )
        .await?;
    Ok(reply(
        format!("Successfully logged updates for {} experiment runs", runs.len()),
        response,
    ))
}
