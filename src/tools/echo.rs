/// Echo Tool, Prompt and Resource
///
/// The simplest possible adapter: the tool hands its message back unchanged.
/// The same message can also be fetched as an `echo://` resource or turned
/// into a prompt.

use serde_json::{Map, Value};

use crate::core::args::ArgValue;
use crate::core::catalog::{Catalog, Prompt, PromptArgument, ResourceTemplate};
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolDescriptor, ToolRegistry, sync_handler};
use crate::core::schema::{InputSchema, ParamKind};

/// Register the echo tool with the tool registry.
pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    let tool = ToolDescriptor::new(
        "echo_tool",
        "Echo a message as a tool",
        InputSchema::new().required("message", ParamKind::String, "The message to echo"),
    );

    registry.register(
        tool,
        // Empty messages are echoed too, so read the raw value
        sync_handler(|args| match args.get("message") {
            Some(ArgValue::Str(message)) => Ok(Content::Text(message.clone())),
            _ => Err(ToolError::MissingArgument("message".to_string())),
        }),
    )
}

/// Register the `echo://{message}` resource and the `echo_prompt` prompt.
pub fn register_extras(catalog: &mut Catalog) -> Result<(), RegistryError> {
    catalog.add_resource(ResourceTemplate {
        uri_template: "echo://{message}",
        name: "echo_resource",
        description: "Echo a message as a resource",
        mime_type: "text/plain",
        read: |message| format!("Resource echo: {}", message),
    })?;

    catalog.add_prompt(Prompt {
        name: "echo_prompt",
        description: "Create an echo prompt",
        arguments: vec![PromptArgument {
            name: "message",
            description: "The message to process",
            required: true,
        }],
        render: render_prompt,
    })
}

fn render_prompt(args: &Map<String, Value>) -> Result<String, String> {
    match args.get("message") {
        Some(Value::String(message)) => Ok(format!("Please process this message: {}", message)),
        _ => Err("message must be a string".to_string()),
    }
}
