/// Tool Registry and Dispatcher
///
/// The registry maps tool names to a descriptor and a handler. It is filled
/// once during start-up and then shared read-only between transports, so
/// `invoke` needs no locking.
///
/// `invoke` is the single entry point for tool calls: look up, validate the
/// arguments against the declared schema, run the handler, and fold whatever
/// comes back (value, error, or panic) into a `ToolResult`.

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::core::args::Arguments;
use crate::core::error::{RegistryError, ToolError};
use crate::core::schema::InputSchema;

/// Tool metadata advertised through `tools/list`.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Unique tool identifier (e.g., "echo_tool", "list_jobs_tool")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// Declared parameters, used for discovery and validation
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: InputSchema) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

// inputSchema must be camelCase per the MCP wire format
impl Serialize for ToolDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ToolDescriptor", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("inputSchema", &self.input_schema.to_json_schema())?;
        state.end()
    }
}

/// Successful tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Json(Value),
}

impl Content {
    /// Text form sent to clients. JSON is pretty-printed.
    pub fn to_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success { content: Content },
    Failure { message: String },
}

impl ToolResult {
    pub fn failure(message: impl Into<String>) -> Self {
        ToolResult::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }
}

/// The concrete work behind a tool.
///
/// Handlers receive arguments that already passed schema validation.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Arguments) -> Result<Content, ToolError>;
}

/// Adapter for in-process tools written as plain functions.
struct FnHandler<F>(F);

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Arguments) -> Result<Content, ToolError> + Send + Sync,
{
    async fn call(&self, args: Arguments) -> Result<Content, ToolError> {
        (self.0)(args)
    }
}

/// Adapter for async tools that need a shared context (HTTP client,
/// database connector, ...). The context is cloned into each call.
struct ContextHandler<C, F> {
    context: C,
    f: F,
}

#[async_trait]
impl<C, F, Fut> ToolHandler for ContextHandler<C, F>
where
    C: Clone + Send + Sync,
    F: Fn(C, Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Content, ToolError>> + Send,
{
    async fn call(&self, args: Arguments) -> Result<Content, ToolError> {
        (self.f)(self.context.clone(), args).await
    }
}

/// Wrap a synchronous function as a handler.
pub fn sync_handler<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Arguments) -> Result<Content, ToolError> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Wrap an async function taking a shared context as a handler.
pub fn context_handler<C, F, Fut>(context: C, f: F) -> Arc<dyn ToolHandler>
where
    C: Clone + Send + Sync + 'static,
    F: Fn(C, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Content, ToolError>> + Send + 'static,
{
    Arc::new(ContextHandler { context, f })
}

/// Registry of available tools.
///
/// `tools` keeps registration order for `tools/list`; `handlers` maps names
/// to their implementations for `tools/call`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    handlers: HashMap<String, (usize, Arc<dyn ToolHandler>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique.
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        let index = self.tools.len();
        self.handlers.insert(descriptor.name.clone(), (index, handler));
        self.tools.push(descriptor);
        Ok(())
    }

    /// All descriptors in registration order.
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate, run, and normalize a tool call.
    pub async fn invoke(&self, tool_name: &str, arguments: &Map<String, Value>) -> ToolResult {
        let Some((index, handler)) = self.handlers.get(tool_name) else {
            tracing::warn!(tool = %tool_name, "call to unregistered tool");
            return ToolResult::failure(ToolError::NotRegistered(tool_name.to_string()).to_string());
        };
        let descriptor = &self.tools[*index];

        let args = match descriptor.input_schema.validate(arguments) {
            Ok(args) => args,
            Err(e) => {
                tracing::debug!(tool = %tool_name, error = %e, "argument validation failed");
                return ToolResult::failure(e.to_string());
            }
        };

        let outcome = AssertUnwindSafe(handler.call(args)).catch_unwind().await;
        match outcome {
            Ok(Ok(content)) => {
                tracing::debug!(tool = %tool_name, "tool call succeeded");
                ToolResult::Success { content }
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %tool_name, error = %e, "tool call failed");
                ToolResult::failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(tool = %tool_name, %reason, "tool handler panicked");
                ToolResult::failure(format!("Tool '{}' failed unexpectedly: {}", tool_name, reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ParamKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn recording_registry(called: Arc<AtomicBool>) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        let schema = InputSchema::new().required("message", ParamKind::String, "message");
        registry
            .register(
                ToolDescriptor::new("record", "records calls", schema),
                sync_handler(move |args| {
                    called.store(true, Ordering::SeqCst);
                    Ok(Content::Text(args.required_str("message")?.to_string()))
                }),
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn complete_arguments_reach_the_handler() {
        let called = Arc::new(AtomicBool::new(false));
        let registry = recording_registry(called.clone());

        let result = registry.invoke("record", &args(json!({"message": "hi"}))).await;
        assert_eq!(result, ToolResult::Success { content: Content::Text("hi".into()) });
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn missing_argument_never_calls_handler() {
        let called = Arc::new(AtomicBool::new(false));
        let registry = recording_registry(called.clone());

        let result = registry.invoke("record", &Map::new()).await;
        assert_eq!(result, ToolResult::failure("Missing required argument: message"));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_as_unregistered() {
        let registry = ToolRegistry::new();
        let result = registry.invoke("nope", &Map::new()).await;
        assert_eq!(result, ToolResult::failure("Tool not registered: nope"));
    }

    #[tokio::test]
    async fn handler_errors_become_failures() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("flaky", "always fails", InputSchema::new()),
                context_handler("backend".to_string(), |name: String, _args| async move {
                    Err(ToolError::Execution(format!("{} unreachable", name)))
                }),
            )
            .unwrap();

        let result = registry.invoke("flaky", &Map::new()).await;
        assert_eq!(result, ToolResult::failure("backend unreachable"));
    }

    #[tokio::test]
    async fn handler_panics_are_contained() {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDescriptor::new("boom", "panics", InputSchema::new()),
                sync_handler(|_| panic!("kaboom")),
            )
            .unwrap();

        match registry.invoke("boom", &Map::new()).await {
            ToolResult::Failure { message } => assert!(message.contains("kaboom")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ToolRegistry::new();
        let handler = sync_handler(|_| Ok(Content::Text(String::new())));
        registry
            .register(ToolDescriptor::new("dup", "first", InputSchema::new()), handler.clone())
            .unwrap();
        let err = registry
            .register(ToolDescriptor::new("dup", "second", InputSchema::new()), handler)
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("dup".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.tools()[0].description, "first");
    }

    #[test]
    fn descriptor_serializes_camel_case_schema() {
        let descriptor = ToolDescriptor::new(
            "echo_tool",
            "Echo a message",
            InputSchema::new().required("message", ParamKind::String, "text"),
        );
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["name"], "echo_tool");
        assert_eq!(value["inputSchema"]["required"], json!(["message"]));
    }
}
