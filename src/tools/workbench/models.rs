/// Model, Model Build and Model Deployment Tools

use serde_json::{Value, json};
use tracing::warn;

use super::{SharedClient, add_tool, body, items, pick, reply, with_project};
use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolRegistry};
use crate::core::schema::{InputSchema, ParamKind};

const BUILD_FIELDS: [&str; 11] = [
    "file_path",
    "function_name",
    "kernel",
    "runtime_identifier",
    "replica_size",
    "cpu",
    "memory",
    "nvidia_gpu",
    "use_custom_docker_image",
    "custom_docker_image",
    "environment_variables",
];

const DEPLOYMENT_FIELDS: [&str; 10] = [
    "name",
    "cpu",
    "memory",
    "replica_count",
    "min_replica_count",
    "max_replica_count",
    "nvidia_gpu",
    "enable_auth",
    "target_node_selector",
    "environment_variables",
];

fn model_id() -> InputSchema {
    InputSchema::new().required("model_id", ParamKind::String, "ID of the model")
}

pub fn register(registry: &mut ToolRegistry, client: &SharedClient) -> Result<(), RegistryError> {
    add_tool(
        registry,
        client,
        "list_models_tool",
        "List models in a Cloudera ML project",
        with_project(InputSchema::new()),
        list_models,
    )?;
    add_tool(
        registry,
        client,
        "get_model_tool",
        "Get details of a specific model",
        with_project(model_id()),
        get_model,
    )?;
    add_tool(
        registry,
        client,
        "delete_model_tool",
        "Delete a model",
        with_project(model_id()),
        delete_model,
    )?;
    add_tool(
        registry,
        client,
        "create_model_build_tool",
        "Create a new build of a model",
        InputSchema::new()
            .required("project_id", ParamKind::String, "ID of the project")
            .required("model_id", ParamKind::String, "ID of the model to build")
            .required("file_path", ParamKind::String, "Script containing the model function")
            .required("function_name", ParamKind::String, "Function that serves predictions")
            .with_default("kernel", ParamKind::String, "Kernel type", json!("python3"))
            .optional("runtime_identifier", ParamKind::String, "Runtime for the build")
            .optional("replica_size", ParamKind::String, "Replica size")
            .with_default("cpu", ParamKind::Integer, "CPU cores", json!(1))
            .with_default("memory", ParamKind::Integer, "Memory in GB", json!(2))
            .with_default("nvidia_gpu", ParamKind::Integer, "Number of GPUs", json!(0))
            .with_default(
                "use_custom_docker_image",
                ParamKind::Boolean,
                "Build from a custom docker image",
                json!(false),
            )
            .optional("custom_docker_image", ParamKind::String, "Custom docker image")
            .optional("environment_variables", ParamKind::Object, "Environment variables as a JSON object"),
        create_model_build,
    )?;
    add_tool(
        registry,
        client,
        "list_model_builds_tool",
        "List builds of a model, or every build in the project",
        with_project(InputSchema::new().optional("model_id", ParamKind::String, "ID of the model")),
        list_model_builds,
    )?;
    add_tool(
        registry,
        client,
        "get_model_build_tool",
        "Get details of a specific model build",
        with_project(model_id().required("build_id", ParamKind::String, "ID of the build")),
        get_model_build,
    )?;
    add_tool(
        registry,
        client,
        "create_model_deployment_tool",
        "Deploy a model build",
        InputSchema::new()
            .required("project_id", ParamKind::String, "ID of the project")
            .required("model_id", ParamKind::String, "ID of the model to deploy")
            .required("build_id", ParamKind::String, "ID of the model build to deploy")
            .required("name", ParamKind::String, "Name of the deployment")
            .with_default("cpu", ParamKind::Integer, "CPU cores", json!(1))
            .with_default("memory", ParamKind::Integer, "Memory in GB", json!(2))
            .with_default("replica_count", ParamKind::Integer, "Number of replicas", json!(1))
            .optional("min_replica_count", ParamKind::Integer, "Minimum number of replicas")
            .optional("max_replica_count", ParamKind::Integer, "Maximum number of replicas")
            .with_default("nvidia_gpu", ParamKind::Integer, "Number of GPUs", json!(0))
            .with_default("enable_auth", ParamKind::Boolean, "Require authentication", json!(true))
            .optional("target_node_selector", ParamKind::String, "Node selector")
            .optional("environment_variables", ParamKind::Object, "Environment variables as a JSON object"),
        create_model_deployment,
    )?;
    add_tool(
        registry,
        client,
        "list_model_deployments_tool",
        "List model deployments, narrowed by model and build when given",
        with_project(
            InputSchema::new()
                .optional("model_id", ParamKind::String, "ID of the model")
                .optional("build_id", ParamKind::String, "ID of the build"),
        ),
        list_model_deployments,
    )?;
    add_tool(
        registry,
        client,
        "get_model_deployment_tool",
        "Get details of a specific model deployment",
        with_project(model_id().required("deployment_id", ParamKind::String, "ID of the deployment")),
        get_model_deployment,
    )?;
    add_tool(
        registry,
        client,
        "stop_model_deployment_tool",
        "Stop a model deployment",
        with_project(
            model_id()
                .required("deployment_id", ParamKind::String, "ID of the deployment to stop")
                .optional("build_id", ParamKind::String, "ID of the build that was deployed"),
        ),
        stop_model_deployment,
    )
}

async fn list_models(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let response = client.get(client.project_endpoint(project_id, &["models"])?).await?;
    let count = items(&response, "models").len();
    Ok(reply(format!("Found {} models", count), response))
}

async fn get_model(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("model_id")?;
    let response = client.get(client.project_endpoint(project_id, &["models", id])?).await?;
    Ok(reply(format!("Successfully retrieved model {}", id), response))
}

async fn delete_model(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let id = args.required_str("model_id")?;
    let response = client.delete(client.project_endpoint(project_id, &["models", id])?).await?;
    Ok(reply(format!("Model {} deleted successfully", id), response))
}

async fn create_model_build(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = args.required_str("project_id")?;
    let model_id = args.required_str("model_id")?;
    if args.bool("use_custom_docker_image") == Some(true) && args.str("custom_docker_image").is_none() {
        return Err(ToolError::MissingArgument("custom_docker_image".to_string()));
    }

    let payload = body(&args, &BUILD_FIELDS);
    let response = client
        .post(client.project_endpoint(project_id, &["models", model_id, "builds"])?, &payload)
        .await?;
    Ok(reply(format!("Successfully created build for model '{}'", model_id), response))
}

async fn list_model_builds(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let url = match args.str("model_id") {
        Some(model_id) => client.project_endpoint(project_id, &["models", model_id, "builds"])?,
        None => client.project_endpoint(project_id, &["model-builds"])?,
    };

    let response = client.get(url).await?;
    let count = items(&response, "model_builds").len();
    Ok(reply(format!("Found {} model builds", count), response))
}

async fn get_model_build(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let model_id = args.required_str("model_id")?;
    let build_id = args.required_str("build_id")?;
    let response = client
        .get(client.project_endpoint(project_id, &["models", model_id, "builds", build_id])?)
        .await?;
    Ok(reply(format!("Successfully retrieved model build {}", build_id), response))
}

async fn create_model_deployment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = args.required_str("project_id")?;
    let model_id = args.required_str("model_id")?;
    let build_id = args.required_str("build_id")?;

    let mut payload = body(&args, &DEPLOYMENT_FIELDS);
    payload["build_id"] = Value::from(build_id);

    let response = client
        .post(client.project_endpoint(project_id, &["models", model_id, "deployments"])?, &payload)
        .await?;
    Ok(reply(
        format!("Successfully created deployment for model '{}'", model_id),
        response,
    ))
}

/// Deployments of one model, narrowed to one build when given.
async fn model_deployments(
    client: &SharedClient,
    project_id: &str,
    model_id: &str,
    build_id: Option<&str>,
) -> Result<Vec<Value>, ToolError> {
    let url = match build_id {
        Some(build_id) => client.project_endpoint(
            project_id,
            &["models", model_id, "builds", build_id, "deployments"],
        )?,
        None => client.project_endpoint(project_id, &["models", model_id, "deployments"])?,
    };
    let response = client.get(url).await?;
    Ok(items(&response, "model_deployments").to_vec())
}

async fn list_model_deployments(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let build_id = args.str("build_id");

    let deployments = match args.str("model_id") {
        Some(model_id) => model_deployments(&client, project_id, model_id, build_id).await?,
        None if build_id.is_some() => {
            return Err(ToolError::MissingArgument("model_id".to_string()));
        }
        None => {
            // No model given: walk every model in the project
            let models = client.get(client.project_endpoint(project_id, &["models"])?).await?;
            let mut all = Vec::new();
            for model in items(&models, "models") {
                let Some(model_id) = model.get("id").and_then(Value::as_str) else {
                    continue;
                };
                match model_deployments(&client, project_id, model_id, None).await {
                    Ok(found) => all.extend(found),
                    Err(e) => warn!("Could not list deployments of model {}: {}", model_id, e),
                }
            }
            all
        }
    };

    let summaries: Vec<Value> = deployments
        .iter()
        .map(|d| pick(d, &["id", "model_id", "build_id", "status", "cpu", "memory", "replicas"]))
        .collect();
    Ok(Content::Json(json!({
        "message": format!("Found {} model deployments", summaries.len()),
        "count": summaries.len(),
        "deployments": summaries,
    })))
}

async fn get_model_deployment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let model_id = args.required_str("model_id")?;
    let deployment_id = args.required_str("deployment_id")?;
    let response = client
        .get(client.project_endpoint(project_id, &["models", model_id, "deployments", deployment_id])?)
        .await?;
    Ok(reply(
        format!("Successfully retrieved model deployment {}", deployment_id),
        response,
    ))
}

async fn stop_model_deployment(client: SharedClient, args: Arguments) -> Result<Content, ToolError> {
    let project_id = client.project_id(&args)?;
    let model_id = args.required_str("model_id")?;
    let deployment_id = args.required_str("deployment_id")?;
    let action = format!("{}:stop", deployment_id);

    let url = match args.str("build_id") {
        Some(build_id) => client.project_endpoint(
            project_id,
            &["models", model_id, "builds", build_id, "deployments", action.as_str()],
        )?,
        None => client.project_endpoint(project_id, &["models", model_id, "deployments", action.as_str()])?,
    };
    let response = client.post(url, &json!({})).await?;
    Ok(reply(format!("Model deployment {} stopped", deployment_id), response))
}
