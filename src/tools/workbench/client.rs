/// Workbench REST Client
///
/// Thin wrapper over a shared `reqwest::Client` that knows the workbench
/// base URL, the bearer token and how the API reports errors. Every tool in
/// the workbench bundle goes through here.

use reqwest::{Method, RequestBuilder, StatusCode, multipart};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::core::args::Arguments;
use crate::core::config::WorkbenchConfig;
use crate::core::error::ToolError;

pub struct WorkbenchClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    default_project_id: Option<String>,
}

impl WorkbenchClient {
    pub fn new(config: &WorkbenchConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cml-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base: config.host.clone(),
            api_key: config.api_key.clone(),
            default_project_id: config.default_project_id.clone(),
        })
    }

    /// `project_id` from the call, else the configured default.
    pub fn project_id<'a>(&'a self, args: &'a Arguments) -> Result<&'a str, ToolError> {
        args.str("project_id")
            .or(self.default_project_id.as_deref())
            .ok_or_else(|| ToolError::MissingArgument("project_id".to_string()))
    }

    /// `{base}/api/v2/<segments...>`. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ToolError> {
        self.versioned_endpoint("v2", segments)
    }

    /// `{base}/api/v2/projects/<project_id>/<segments...>`
    pub fn project_endpoint(&self, project_id: &str, segments: &[&str]) -> Result<Url, ToolError> {
        let mut all = vec!["projects", project_id];
        all.extend_from_slice(segments);
        self.endpoint(&all)
    }

    pub fn versioned_endpoint(&self, version: &str, segments: &[&str]) -> Result<Url, ToolError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ToolError::Execution(format!("{} cannot be used as a base URL", self.base)))?
            .pop_if_empty()
            .extend(["api", version])
            .extend(segments);
        Ok(url)
    }

    pub async fn get(&self, url: Url) -> Result<Value, ToolError> {
        self.send(self.request(Method::GET, url)).await
    }

    pub async fn post(&self, url: Url, body: &Value) -> Result<Value, ToolError> {
        self.send(self.request(Method::POST, url).json(body)).await
    }

    pub async fn patch(&self, url: Url, body: &Value) -> Result<Value, ToolError> {
        self.send(self.request(Method::PATCH, url).json(body)).await
    }

    pub async fn delete(&self, url: Url) -> Result<Value, ToolError> {
        self.send(self.request(Method::DELETE, url)).await
    }

    pub async fn delete_with_body(&self, url: Url, body: &Value) -> Result<Value, ToolError> {
        self.send(self.request(Method::DELETE, url).json(body)).await
    }

    /// Upload one file as a multipart `PUT`. The form field name is the
    /// destination path inside the project.
    pub async fn put_file(&self, url: Url, target_path: &str, bytes: Vec<u8>) -> Result<Value, ToolError> {
        let file_name = target_path.rsplit('/').next().unwrap_or(target_path).to_string();
        let part = multipart::Part::bytes(bytes).file_name(file_name);
        let form = multipart::Form::new().part(target_path.to_string(), part);
        self.send(self.request(Method::PUT, url).multipart(form)).await
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http.request(method, url).bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ToolError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(body) => body,
            Err(_) => return Ok(Value::String(text)),
        };

        // Some endpoints answer 200 with an embedded error object
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error")
                .to_string();
            return Err(ToolError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }
}

/// Prefer the API's own `message`; fall back to the raw body.
fn api_error(status: StatusCode, body: &str) -> ToolError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| format!("HTTP Error {}: {}", status.as_u16(), body));

    ToolError::Api {
        status: status.as_u16(),
        message,
    }
}
