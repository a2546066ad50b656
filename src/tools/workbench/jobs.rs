/// Job and Job Run Tools

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{DEFAULT_RUNTIME, SharedClient, add_tool, body, items, reply, with_project};
use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolRegistry};
use crate::core::schema::{InputSchema, ParamKind};

const JOB_FIELDS: [&str; 8] = [
    "name",
    "script",
    "kernel",
    "cpu",
    "memory",
    "nvidia_gpu",
    "runtime_identifier",
    "environment_variables",
];

pub fn register(registry: &mut ToolRegistry, client: &SharedClient) -> Result<(), RegistryError> {
    add_tool(
        registry,
        client,
        "create_job_tool",
        "Create a new Cloudera ML job",
        with_project(
            InputSchema::new()
                .required("name", ParamKind::String, "Job name")
                .required("script", ParamKind::String, "Script path relative to project root")
                .with_default("kernel", ParamKind::String, "Kernel type", json!("python3"))
                .with_default("cpu", ParamKind::Integer, "CPU cores", json!(1))
                .with_default("memory", ParamKind::Integer, "Memory in GB", json!(1))
                .with_default("nvidia_gpu", ParamKind::Integer, "Number of GPUs", json!(0))
                .optional("runtime_identifier", ParamKind::String, "Runtime environment identifier"),
        ),
        create_job,
    )?;
    add_tool(
        registry,
        client,
        "list_jobs_tool",
        "List all jobs in the Cloudera ML project",
        with_project(InputSchema::new()),
        list_jobs,
    )?;
    add_tool(
        registry,
        client,
        "get_job_tool",
        "Get details of a specific job",
        with_project(InputSchema::new().required("job_id", ParamKind::String, "ID of the job")),
        get_job,
    )?;
    add_tool(
        registry,
        client,
        "update_job_tool",
        "Update an existing job in Cloudera ML",
        with_project(
            InputSchema::new()
                .required("job_id", ParamKind::String, "ID of the job to update")
                .optional("name", ParamKind::String, "New job name")
                .optional("script", ParamKind::String, "New script path")
                .optional("kernel", ParamKind::String, "New kernel type")
                .optional("cpu", ParamKind::Integer, "New CPU cores")
                .optional("memory", ParamKind::Integer, "New memory in GB")
                .optional("nvidia_gpu", ParamKind::Integer, "New number of GPUs")
                .optional("runtime_identifier", ParamKind::String, "New runtime identifier")
                .optional("environment_variables", ParamKind::Object, "Environment variables as a JSON object"),
        ),
        update_job,
    )?;
    add_tool(
        registry,
        client,
        "delete_job_tool",
        "Delete a job by ID",
        with_project(InputSchema::new().required("job_id", ParamKind::String, "ID of the job to delete")),
        delete_job,
    )?;
    add_tool(
        registry,
        client,
        "delete_all_jobs_tool",
        "Delete every job in the project",
        with_project(InputSchema::new()),
        delete_all_jobs,
    )?;
    add_tool(
        registry,
        client,
        "create_job_run_tool",
        "Start a run of an existing job",
        InputSchema::new()
            .required("project_id", ParamKind::String, "ID of the project")
            .required("job_id", ParamKind::String, "ID of the job to run")
            .optional("runtime_identifier", ParamKind::String, "Runtime to use for this run")
            .optional("environment_variables", ParamKind::Object, "Environment variables as a JSON object")
            .optional("override_config", ParamKind::Object, "Configuration overrides as a JSON object"),
        create_job_run,
    )?;
    add_tool(
        registry,
        client,
        "list_job_runs_tool",
        "List the runs of a job",
        with_project(InputSchema::new().optional("job_id", ParamKind::String, "ID of the job")),
        list_job_runs,
    )?;
    add_tool(
        registry,
        client,
        "get_job_run_tool",
        "Get details of a specific job run",
        with_project(
            InputSchema::new()
                .required("job_id", ParamKind::String, "ID of the job containing the run")
                .required("run_id", ParamKind::String, "ID of the job run"),
        ),
        get_job_run,
    )?;
    add_tool(
        registry,
        client,
        "stop_job_run_tool",
        "Stop a running job run",
        with_project(
            InputSchema::new()
                .required("job_id", ParamKind::String, "ID of the job containing the run")
                .required("run_id", ParamKind::String, "ID of the job run to stop"),
        ),
        stop_job_run,
    )
}

async fn create_job(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let name = args.required_str("name")?;
    let mut payload = body(&args, &JOB_FIELDS);
    if args.str("runtime_identifier").is_none() {
        payload["runtime_identifier"] = Value::from(DEFAULT_RUNTIME);
    }

    let response = client.post(client.project_endpoint(project_id, &["jobs"])?, &payload).await?;
    info!("Created job '{}' in project {}", name, project_id);
    Ok(reply(format!("Job '{}' created successfully", name), response))
}

/// `2024-03-01T10:00:00Z` as `2024-03-01 10:00:00 UTC`. Unparseable input is
/// returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn summarize(job: &Value) -> Value {
    let created_at = match job.get("created_at").and_then(Value::as_str) {
        Some(raw) if !raw.is_empty() => format_timestamp(raw),
        _ => "Unknown".to_string(),
    };
    let field = |key: &str| job.get(key).cloned().unwrap_or(Value::Null);

    json!({
        "id": field("id"),
        "name": field("name"),
        "status": field("status"),
        "created_at": created_at,
        "script": field("script"),
        "cpu": field("cpu"),
        "memory": field("memory"),
        "gpu": field("nvidia_gpu"),
    })
}

async fn fetch_jobs(client: &SharedClient, project_id: &str) -> Result<Vec<Value>, ToolError> {
    let response = client.get(client.project_endpoint(project_id, &["jobs"])?).await?;
    Ok(items(&response, "jobs").to_vec())
}

async fn list_jobs(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let jobs: Vec<Value> = fetch_jobs(&client, project_id).await?.iter().map(summarize).collect();

    Ok(Content::Json(json!({
        "message": format!("Found {} jobs", jobs.len()),
        "count": jobs.len(),
        "jobs": jobs,
    })))
}

async fn get_job(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let job_id = args.required_str("job_id")?;
    let response = client.get(client.project_endpoint(project_id, &["jobs", job_id])?).await?;
    Ok(reply(format!("Successfully retrieved job {}", job_id), response))
}

async fn update_job(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let job_id = args.required_str("job_id")?;
    let payload = body(&args, &JOB_FIELDS);
    if payload.as_object().is_some_and(|m| m.is_empty()) {
        return Err(ToolError::Execution("No fields to update were provided".to_string()));
    }

    let response = client
        .patch(client.project_endpoint(project_id, &["jobs", job_id])?, &payload)
        .await?;
    Ok(reply(format!("Job {} updated successfully", job_id), response))
}

async fn delete_job(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let job_id = args.required_str("job_id")?;
    let url = client.project_endpoint(project_id, &["jobs", job_id])?;

    // The name is only used in the reply; a failed lookup does not stop the delete
    let name = match client.get(url.clone()).await {
        Ok(job) => job.get("name").and_then(Value::as_str).map(String::from),
        Err(_) => None,
    };
    client.delete(url).await?;

    let label = name.unwrap_or_else(|| job_id.to_string());
    Ok(Content::Json(json!({
        "message": format!("Job '{}' deleted successfully", label),
        "job_id": job_id,
    })))
}

async fn delete_all_jobs(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let jobs = fetch_jobs(&client, project_id).await?;

    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for job in &jobs {
        let Some(id) = job.get("id").and_then(Value::as_str) else {
            continue;
        };
        let name = job.get("name").and_then(Value::as_str).unwrap_or(id);
        match client.delete(client.project_endpoint(project_id, &["jobs", id])?).await {
            Ok(_) => deleted.push(json!({ "id": id, "name": name })),
            Err(e) => {
                warn!("Failed to delete job {}: {}", id, e);
                failed.push(json!({ "id": id, "name": name, "error": e.to_string() }));
            }
        }
    }

    Ok(Content::Json(json!({
        "message": format!("Deleted {} of {} jobs", deleted.len(), jobs.len()),
        "deleted_jobs": deleted,
        "failed_jobs": failed,
    })))
}

async fn create_job_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = args.required_str("project_id")?;
    let job_id = args.required_str("job_id")?;
    let payload = body(&args, &["runtime_identifier", "environment_variables", "override_config"]);

    let response = client
        .post(client.project_endpoint(project_id, &["jobs", job_id, "runs"])?, &payload)
        .await?;
    Ok(reply(format!("Successfully created run for job '{}'", job_id), response))
}

async fn list_job_runs(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let Some(job_id) = args.str("job_id") else {
        return Err(ToolError::invalid(
            "job_id",
            "runs can only be listed for a specific job",
        ));
    };

    let response = client
        .get(client.project_endpoint(project_id, &["jobs", job_id, "runs"])?)
        .await?;
    let count = items(&response, "job_runs").len();
    Ok(reply(format!("Found {} runs for job {}", count, job_id), response))
}

async fn get_job_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let job_id = args.required_str("job_id")?;
    let run_id = args.required_str("run_id")?;

    let response = client
        .get(client.project_endpoint(project_id, &["jobs", job_id, "runs", run_id])?)
        .await?;
    Ok(reply(format!("Successfully retrieved job run {}", run_id), response))
}

async fn stop_job_run(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let job_id = args.required_str("job_id")?;
    let run_id = args.required_str("run_id")?;

    let action = format!("{}:stop", run_id);
    let response = client
        .post(
            client.project_endpoint(project_id, &["jobs", job_id, "runs", action.as_str()])?,
            &json!({}),
        )
        .await?;
    Ok(reply(format!("Job run {} stopped", run_id), response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_normalized_to_utc() {
        assert_eq!(format_timestamp("2024-03-01T10:00:00Z"), "2024-03-01 10:00:00 UTC");
        assert_eq!(format_timestamp("2024-03-01T12:30:00+02:00"), "2024-03-01 10:30:00 UTC");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }

    #[test]
    fn job_summary_renames_gpu_and_defaults_date() {
        let job = json!({"id": "j1", "name": "train", "nvidia_gpu": 2, "cpu": 4});
        let summary = summarize(&job);
        assert_eq!(summary["gpu"], json!(2));
        assert_eq!(summary["created_at"], json!("Unknown"));
        assert_eq!(summary["status"], Value::Null);
    }
}
