use mockito::{Matcher, Server};
use serde_json::{Value, json};
use std::time::Duration;
use url::Url;

use cml_mcp::core::catalog::Catalog;
use cml_mcp::core::config::WorkbenchConfig;
use cml_mcp::core::registry::{Content, ToolResult};
use cml_mcp::tools::workbench;

fn catalog_for(host: &str, default_project: Option<&str>) -> Catalog {
    let config = WorkbenchConfig {
        host: Url::parse(host).unwrap(),
        api_key: "test-key".to_string(),
        default_project_id: default_project.map(String::from),
        timeout: Duration::from_secs(5),
    };
    workbench::catalog(&config).unwrap()
}

async fn call(catalog: &Catalog, tool: &str, args: Value) -> ToolResult {
    catalog.tools.invoke(tool, args.as_object().unwrap()).await
}

fn json_content(result: ToolResult) -> Value {
    match result {
        ToolResult::Success { content: Content::Json(value) } => value,
        other => panic!("expected JSON success, got {:?}", other),
    }
}

fn failure_message(result: ToolResult) -> String {
    match result {
        ToolResult::Failure { message } => message,
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn list_jobs_formats_summaries() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v2/projects/p1/jobs")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "jobs": [
                    {
                        "id": "j1",
                        "name": "nightly",
                        "status": "ENGINE_SUCCEEDED",
                        "created_at": "2024-05-01T08:15:30Z",
                        "script": "train.py",
                        "cpu": 2,
                        "memory": 4,
                        "nvidia_gpu": 0
                    },
                    { "id": "j2", "name": "adhoc" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(call(&catalog, "list_jobs_tool", json!({})).await);

    mock.assert_async().await;
    assert_eq!(value["count"], json!(2));
    assert_eq!(value["message"], json!("Found 2 jobs"));
    assert_eq!(value["jobs"][0]["created_at"], json!("2024-05-01 08:15:30 UTC"));
    assert_eq!(value["jobs"][0]["gpu"], json!(0));
    assert_eq!(value["jobs"][1]["created_at"], json!("Unknown"));
}

#[tokio::test]
async fn api_error_message_is_surfaced() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/projects/p1/jobs/missing")
        .with_status(404)
        .with_body(r#"{"message": "job not found"}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), None);
    let result = call(
        &catalog,
        "get_job_tool",
        json!({"project_id": "p1", "job_id": "missing"}),
    )
    .await;

    assert_eq!(failure_message(result), "API error (HTTP 404): job not found");
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status_text() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/projects/p1/applications")
        .with_status(500)
        .with_body("internal failure")
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let message = failure_message(call(&catalog, "list_applications_tool", json!({})).await);
    assert_eq!(message, "API error (HTTP 500): HTTP Error 500: internal failure");
}

#[tokio::test]
async fn unreachable_host_is_a_failure_not_a_crash() {
    // Nothing listens on port 1
    let catalog = catalog_for("http://127.0.0.1:1", Some("p1"));
    let message = failure_message(call(&catalog, "list_jobs_tool", json!({})).await);
    assert!(message.starts_with("API request error"), "{}", message);
}

#[tokio::test]
async fn missing_project_id_fails_before_any_request() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), None);
    let message = failure_message(call(&catalog, "list_experiments_tool", json!({})).await);

    assert_eq!(message, "Missing required argument: project_id");
    mock.assert_async().await;
}

#[tokio::test]
async fn create_job_fills_defaults() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/projects/p1/jobs")
        .match_body(Matcher::PartialJson(json!({
            "name": "etl",
            "script": "etl.py",
            "kernel": "python3",
            "cpu": 1,
            "memory": 1,
            "nvidia_gpu": 0,
            "runtime_identifier": workbench::DEFAULT_RUNTIME,
        })))
        .with_status(200)
        .with_body(r#"{"id": "j9"}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(
        call(&catalog, "create_job_tool", json!({"name": "etl", "script": "etl.py"})).await,
    );

    mock.assert_async().await;
    assert_eq!(value["data"]["id"], json!("j9"));
}

#[tokio::test]
async fn upload_file_sends_multipart_put() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("model.py");
    std::fs::write(&local, "print('hello')\n").unwrap();

    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/api/v2/projects/p1/files")
        .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
        .match_body(Matcher::Regex(r#"name="src/model.py""#.into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(
        call(
            &catalog,
            "upload_file_tool",
            json!({"file_path": local.to_str().unwrap(), "target_dir": "src"}),
        )
        .await,
    );

    mock.assert_async().await;
    assert_eq!(value["file_path"], json!("src/model.py"));
    assert_eq!(value["size"], json!(15));
}

#[tokio::test]
async fn upload_folder_reports_per_file_failures() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.py"), "ok").unwrap();
    std::fs::write(dir.path().join("bad.py"), "no").unwrap();
    std::fs::create_dir(dir.path().join(".git")).unwrap();
    std::fs::write(dir.path().join(".git").join("HEAD"), "ref").unwrap();

    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/api/v2/projects/p1/files")
        .match_body(Matcher::Regex(r#"name="good.py""#.into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("PUT", "/api/v2/projects/p1/files")
        .match_body(Matcher::Regex(r#"name="bad.py""#.into()))
        .with_status(413)
        .with_body(r#"{"message": "too large"}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(
        call(
            &catalog,
            "upload_folder_tool",
            json!({"folder_path": dir.path().to_str().unwrap()}),
        )
        .await,
    );

    assert_eq!(value["uploaded_files"], json!(["good.py"]));
    assert_eq!(value["failed_uploads"][0]["file"], json!("bad.py"));
    assert_eq!(
        value["failed_uploads"][0]["error"],
        json!("API error (HTTP 413): too large")
    );
}

#[tokio::test]
async fn delete_project_file_passes_path_as_query() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/v2/projects/p1/files")
        .match_query(Matcher::UrlEncoded("path".into(), "data/old file.csv".into()))
        .with_status(200)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let result = call(
        &catalog,
        "delete_project_file_tool",
        json!({"file_path": "data/old file.csv"}),
    )
    .await;

    mock.assert_async().await;
    assert!(result.is_success());
}

#[tokio::test]
async fn runtimes_fall_back_to_v1() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/runtimes")
        .with_status(404)
        .create_async()
        .await;
    server
        .mock("GET", "/api/v1/runtimes")
        .with_status(200)
        .with_body(
            json!({"runtimes": [{"runtime_identifier": "rt-1", "edition": "Standard"}]}).to_string(),
        )
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), None);
    let value = json_content(call(&catalog, "get_runtimes_tool", json!({})).await);

    assert_eq!(value["count"], json!(1));
    assert_eq!(value["runtimes"][0]["identifier"], json!("rt-1"));
    assert_eq!(value["runtimes"][0]["type"], json!("Unknown"));
}

#[tokio::test]
async fn get_project_id_looks_up_by_name() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/projects")
        .with_status(200)
        .with_body(
            json!({"projects": [
                {"id": "a1", "name": "alpha", "owner": {"username": "ann"}},
                {"id": "b2", "name": "beta", "owner": {"username": "bob"}}
            ]})
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), None);
    let value = json_content(call(&catalog, "get_project_id_tool", json!({"project_name": "beta"})).await);
    assert_eq!(value["data"], json!({"name": "beta", "id": "b2", "owner": "bob"}));

    let message = failure_message(
        call(&catalog, "get_project_id_tool", json!({"project_name": "gamma"})).await,
    );
    assert_eq!(message, "No project found with name: gamma");
}

#[tokio::test]
async fn run_batch_delete_sends_ids() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/api/v2/projects/p1/experiments/e1/runs-batch")
        .match_body(Matcher::Json(json!({"ids": ["r1", "r2"]})))
        .with_status(200)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let result = call(
        &catalog,
        "delete_experiment_run_batch_tool",
        json!({"experiment_id": "e1", "run_ids": "r1, r2"}),
    )
    .await;

    mock.assert_async().await;
    assert!(result.is_success(), "{:?}", result);
}

#[tokio::test]
async fn error_object_in_a_success_body_is_a_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/projects/p1/jobs/j1")
        .with_status(200)
        .with_body(r#"{"error": {"code": 9, "message": "quota exceeded"}}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let message = failure_message(call(&catalog, "get_job_tool", json!({"job_id": "j1"})).await);
    assert_eq!(message, "API error (HTTP 200): quota exceeded");
}

#[tokio::test]
async fn stop_actions_post_to_colon_stop_paths() {
    let mut server = Server::new_async().await;
    let paths = [
        "/api/v2/projects/p1/jobs/j1/runs/r1:stop",
        "/api/v2/projects/p1/applications/a1:stop",
        "/api/v2/projects/p1/models/m1/deployments/d1:stop",
        "/api/v2/projects/p1/models/m1/builds/b1/deployments/d2:stop",
    ];
    let mut mocks = Vec::new();
    for path in paths {
        mocks.push(
            server
                .mock("POST", path)
                .with_status(200)
                .with_body("{}")
                .create_async()
                .await,
        );
    }

    let catalog = catalog_for(&server.url(), Some("p1"));
    let calls = [
        ("stop_job_run_tool", json!({"job_id": "j1", "run_id": "r1"})),
        ("stop_application_tool", json!({"application_id": "a1"})),
        ("stop_model_deployment_tool", json!({"model_id": "m1", "deployment_id": "d1"})),
        (
            "stop_model_deployment_tool",
            json!({"model_id": "m1", "deployment_id": "d2", "build_id": "b1"}),
        ),
    ];
    for (tool, args) in calls {
        let result = call(&catalog, tool, args).await;
        assert!(result.is_success(), "{}: {:?}", tool, result);
    }
    for mock in mocks {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn restart_application_posts_to_restart() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/projects/p1/applications/a1/restart")
        .with_status(200)
        .with_body(r#"{"status": "starting"}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(
        call(&catalog, "restart_application_tool", json!({"application_id": "a1"})).await,
    );

    mock.assert_async().await;
    assert_eq!(value["message"], json!("Application a1 restarted"));
    assert_eq!(value["data"]["status"], json!("starting"));
}

#[tokio::test]
async fn delete_all_jobs_collects_failures() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/projects/p1/jobs")
        .with_status(200)
        .with_body(
            json!({"jobs": [{"id": "j1", "name": "first"}, {"id": "j2", "name": "second"}]})
                .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("DELETE", "/api/v2/projects/p1/jobs/j1")
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("DELETE", "/api/v2/projects/p1/jobs/j2")
        .with_status(409)
        .with_body(r#"{"message": "job is running"}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(call(&catalog, "delete_all_jobs_tool", json!({})).await);

    assert_eq!(value["message"], json!("Deleted 1 of 2 jobs"));
    assert_eq!(value["deleted_jobs"], json!([{"id": "j1", "name": "first"}]));
    assert_eq!(value["failed_jobs"][0]["id"], json!("j2"));
    assert_eq!(
        value["failed_jobs"][0]["error"],
        json!("API error (HTTP 409): job is running")
    );
}

#[tokio::test]
async fn deployments_without_model_walk_every_model() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/v2/projects/p1/models")
        .with_status(200)
        .with_body(json!({"models": [{"id": "m1"}, {"id": "m2"}]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/v2/projects/p1/models/m1/deployments")
        .with_status(200)
        .with_body(
            json!({"model_deployments": [{"id": "d1", "model_id": "m1", "status": "deployed"}]})
                .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/v2/projects/p1/models/m2/deployments")
        .with_status(403)
        .with_body(r#"{"message": "forbidden"}"#)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let value = json_content(call(&catalog, "list_model_deployments_tool", json!({})).await);

    assert_eq!(value["count"], json!(1));
    assert_eq!(value["deployments"][0]["id"], json!("d1"));
    assert_eq!(value["deployments"][0]["status"], json!("deployed"));
}

#[tokio::test]
async fn run_batch_log_requires_an_id_per_entry() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let message = failure_message(
        call(
            &catalog,
            "log_experiment_run_batch_tool",
            json!({
                "experiment_id": "e1",
                "run_updates": [{"id": "r1", "metrics": {"loss": 0.1}}, {"metrics": {"loss": 0.2}}]
            }),
        )
        .await,
    );

    assert_eq!(message, "Invalid argument 'run_updates': entry 1 has no 'id'");
    mock.assert_async().await;
}

#[tokio::test]
async fn file_metadata_update_needs_a_field() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PATCH", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let catalog = catalog_for(&server.url(), Some("p1"));
    let message = failure_message(
        call(
            &catalog,
            "update_project_file_metadata_tool",
            json!({"file_path": "data/train.csv"}),
        )
        .await,
    );

    assert_eq!(message, "No fields to update were provided");
    mock.assert_async().await;
}
