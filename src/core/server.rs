/// MCP Server Implementation
///
/// This module contains the MCP hosting layer:
/// - JSON-RPC 2.0 request/response structures
/// - A single `dispatch` routine shared by both transports
/// - HTTP server setup with Actix Web
/// - STDIO server implementation for line-based communication
///
/// Tool semantics live in the registry; this layer only decodes requests,
/// routes them, and encodes `ToolResult`s into MCP content blocks.

use actix_web::{
    web, App, HttpServer, HttpResponse, Result,
    middleware::{Compress, Logger, DefaultHeaders},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::catalog::Catalog;
use crate::core::config::{ServerConfig, TransportMode};
use crate::core::registry::ToolResult;

/// MCP protocol revision implemented by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

/// Application state shared across all worker threads and both transports.
#[derive(Clone)]
pub struct AppState {
    /// Server name as reported in MCP initialize responses
    pub server_name: String,
    /// Server version string as reported in MCP initialize responses
    pub server_version: String,
    /// Tools, prompts and resources served by this process
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(config: &ServerConfig, catalog: Arc<Catalog>) -> Self {
        Self {
            server_name: config.name.clone(),
            server_version: config.version.clone(),
            catalog,
        }
    }
}

/// JSON-RPC 2.0 request structure for MCP protocol.
///
/// `id` is None for notifications, which never receive a response.
#[derive(Deserialize, Debug, Clone)]
pub struct MCPRequest {
    #[allow(dead_code)]
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure for MCP protocol.
///
/// Exactly one of `result` or `error` is present.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MCPResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MCPError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl MCPResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(MCPError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// Route one request to its method handler.
///
/// Returns None for notifications (requests without an id).
pub async fn dispatch(state: &AppState, req: MCPRequest) -> Option<MCPResponse> {
    let Some(id) = req.id else {
        tracing::debug!(method = %req.method, "notification received");
        return None;
    };
    let id = Some(id);

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(state, id),
        "ping" => MCPResponse::success(id, json!({})),
        "tools/list" => handle_tools_list(state, id),
        "tools/call" => handle_tools_call(state, id, req.params).await,
        "prompts/list" => handle_prompts_list(state, id),
        "prompts/get" => handle_prompts_get(state, id, req.params),
        "resources/list" => MCPResponse::success(id, json!({ "resources": [] })),
        "resources/templates/list" => handle_resource_templates_list(state, id),
        "resources/read" => handle_resources_read(state, id, req.params),
        _ => {
            tracing::debug!(method = %req.method, "unknown method");
            MCPResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {}", req.method))
        }
    };
    Some(response)
}

/// Handle MCP initialize method.
///
/// Advertises prompts and resources only when the catalog has any.
fn handle_initialize(state: &AppState, id: Option<Value>) -> MCPResponse {
    let mut capabilities = json!({ "tools": {} });
    if !state.catalog.prompts().is_empty() {
        capabilities["prompts"] = json!({});
    }
    if !state.catalog.resources().is_empty() {
        capabilities["resources"] = json!({});
    }

    MCPResponse::success(
        id,
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "serverInfo": {
                "name": state.server_name,
                "version": state.server_version
            }
        }),
    )
}

/// Handle MCP tools/list method.
fn handle_tools_list(state: &AppState, id: Option<Value>) -> MCPResponse {
    MCPResponse::success(id, json!({ "tools": state.catalog.tools.tools() }))
}

/// Handle MCP tools/call method.
///
/// Validation, dispatch and error capture all happen in the registry; here
/// the `ToolResult` is folded into an MCP content block.
async fn handle_tools_call(state: &AppState, id: Option<Value>, params: Option<Value>) -> MCPResponse {
    let Some(params) = params else {
        return MCPResponse::error(id, INVALID_PARAMS, "Invalid params");
    };

    let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
        return MCPResponse::error(id, INVALID_PARAMS, "Invalid params: missing tool name");
    };

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return MCPResponse::error(id, INVALID_PARAMS, "Invalid params: arguments must be an object");
        }
    };

    tracing::info!(tool = %tool_name, "tools/call");
    let (text, is_error) = match state.catalog.tools.invoke(tool_name, &arguments).await {
        ToolResult::Success { content } => (content.to_text(), false),
        ToolResult::Failure { message } => (format!("Error: {}", message), true),
    };

    MCPResponse::success(
        id,
        json!({
            "content": [
                {
                    "type": "text",
                    "text": text
                }
            ],
            "isError": is_error
        }),
    )
}

fn handle_prompts_list(state: &AppState, id: Option<Value>) -> MCPResponse {
    let prompts: Vec<Value> = state.catalog.prompts().iter().map(|p| p.to_json()).collect();
    MCPResponse::success(id, json!({ "prompts": prompts }))
}

fn handle_prompts_get(state: &AppState, id: Option<Value>, params: Option<Value>) -> MCPResponse {
    let params = params.unwrap_or(Value::Null);
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return MCPResponse::error(id, INVALID_PARAMS, "Invalid params: missing prompt name");
    };
    let Some(prompt) = state.catalog.prompt(name) else {
        return MCPResponse::error(id, INVALID_PARAMS, format!("Unknown prompt: {}", name));
    };

    let arguments = params
        .get("arguments")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(missing) = prompt
        .arguments
        .iter()
        .find(|arg| arg.required && !arguments.contains_key(arg.name))
    {
        return MCPResponse::error(
            id,
            INVALID_PARAMS,
            format!("Missing required argument: {}", missing.name),
        );
    }

    match (prompt.render)(&arguments) {
        Ok(text) => MCPResponse::success(
            id,
            json!({
                "description": prompt.description,
                "messages": [
                    {
                        "role": "user",
                        "content": { "type": "text", "text": text }
                    }
                ]
            }),
        ),
        Err(message) => MCPResponse::error(id, INVALID_PARAMS, message),
    }
}

fn handle_resource_templates_list(state: &AppState, id: Option<Value>) -> MCPResponse {
    let templates: Vec<Value> = state.catalog.resources().iter().map(|r| r.to_json()).collect();
    MCPResponse::success(id, json!({ "resourceTemplates": templates }))
}

fn handle_resources_read(state: &AppState, id: Option<Value>, params: Option<Value>) -> MCPResponse {
    let Some(uri) = params.as_ref().and_then(|p| p.get("uri")).and_then(Value::as_str) else {
        return MCPResponse::error(id, INVALID_PARAMS, "Invalid params: missing uri");
    };

    match state.catalog.read_resource(uri) {
        Some((resource, text)) => MCPResponse::success(
            id,
            json!({
                "contents": [
                    {
                        "uri": uri,
                        "mimeType": resource.mime_type,
                        "text": text
                    }
                ]
            }),
        ),
        None => MCPResponse::error(id, INVALID_PARAMS, format!("Resource not found: {}", uri)),
    }
}

/// Health check endpoint handler.
async fn health(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": state.server_name
    })))
}

/// MCP JSON-RPC request handler for HTTP mode.
///
/// Counts every request for the metrics endpoint. Notifications are
/// acknowledged with 202 and no body.
async fn mcp_handler(
    state: web::Data<AppState>,
    counter: web::Data<AtomicU64>,
    req: web::Json<MCPRequest>,
) -> Result<HttpResponse> {
    counter.fetch_add(1, Ordering::Relaxed);

    match dispatch(&state, req.into_inner()).await {
        Some(response) => Ok(HttpResponse::Ok().json(response)),
        None => Ok(HttpResponse::Accepted().finish()),
    }
}

/// Metrics endpoint handler: total requests since start.
async fn metrics_handler(counter: web::Data<AtomicU64>) -> Result<HttpResponse> {
    let count = counter.load(Ordering::Relaxed);
    Ok(HttpResponse::Ok().json(json!({
        "requests_total": count,
        "status": "ok"
    })))
}

/// Run the configured transports until they exit.
pub async fn serve(config: ServerConfig, catalog: Catalog) -> std::io::Result<()> {
    let state = AppState::new(&config, Arc::new(catalog));
    tracing::info!(
        name = %state.server_name,
        version = %state.server_version,
        tools = state.catalog.tools.len(),
        transport = ?config.transport,
        "starting MCP server"
    );

    match config.transport {
        TransportMode::Stdio => run_server_stdio(state).await,
        TransportMode::Http => run_server_http(state, &config).await,
        TransportMode::Both => {
            // STDIO in the background so clients can use either transport
            let stdio_state = state.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = run_server_stdio(stdio_state).await {
                    tracing::error!(error = %e, "STDIO server error");
                }
            });

            let http_result = run_server_http(state, &config).await;
            stdio_handle.abort();
            http_result
        }
    }
}

/// Run the MCP server in HTTP mode.
///
/// The server is configured with:
/// - Worker threads: from config (CPU count, max 16, by default)
/// - Max connections: 10,000 concurrent connections
/// - Connection rate limit: 1,000 connections per second
/// - Keep-alive and request timeout: 30 seconds
/// - Disconnect timeout: 2 seconds
/// - Shutdown timeout: 10 seconds
pub async fn run_server_http(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    use std::time::Duration;

    let bind_addr = format!("{}:{}", config.host, config.port);
    let app_state = web::Data::new(state);
    let request_count = web::Data::new(AtomicU64::new(0));

    tracing::info!(bind = %bind_addr, workers = config.workers, "HTTP transport listening");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(request_count.clone())
            // Enable compression for JSON responses (gzip/brotli)
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block"))
            )
            // %r = request line, %s = status, %Dms = duration in milliseconds
            .wrap(Logger::new("%r %s %Dms"))
            .route("/health", web::get().to(health))
            .route("/metrics", web::get().to(metrics_handler))
            .route("/mcp", web::post().to(mcp_handler))
            .route("/", web::post().to(mcp_handler))
            .route("/", web::get().to(health))
    })
    .workers(config.workers)
    .max_connections(10000)
    .max_connection_rate(1000)
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_secs(30))
    .client_disconnect_timeout(Duration::from_secs(2))
    .shutdown_timeout(10)
    .bind(&bind_addr)?
    .run()
    .await
}

/// Run the MCP server in STDIO mode.
///
/// Reads JSON-RPC requests line by line from stdin and writes one response
/// line per request to stdout, flushing after each. Requests are processed
/// one at a time.
pub async fn run_server_stdio(state: AppState) -> std::io::Result<()> {
    use tokio::io::{AsyncBufReadExt, BufReader, BufWriter};

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::with_capacity(8192, stdin).lines();
    let mut stdout = BufWriter::with_capacity(8192, tokio::io::stdout());

    tracing::info!("STDIO transport ready");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<MCPRequest>(&line) {
            Ok(req) => dispatch(&state, req).await,
            Err(e) => {
                tracing::warn!(error = %e, "parse error");
                // Only answer when the id can be recovered from the raw JSON
                serde_json::from_str::<Value>(&line)
                    .ok()
                    .and_then(|partial| partial.get("id").cloned())
                    .map(|id| MCPResponse::error(Some(id), PARSE_ERROR, format!("Parse error: {}", e)))
            }
        };

        if let Some(response) = response {
            if let Err(e) = write_response(&mut stdout, &response).await {
                tracing::error!(error = %e, "error writing to stdout");
                break;
            }
        }
    }

    tracing::info!("STDIO input closed");
    Ok(())
}

/// Write one response as a single line and flush.
async fn write_response<W>(out: &mut W, response: &MCPResponse) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    use tokio::io::AsyncWriteExt;

    let response_json = serde_json::to_string(response)?;
    out.write_all(response_json.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
