/// Server Catalog
///
/// Everything one adapter process exposes: its tool registry plus optional
/// prompts and resource templates. Built once per bundle at start-up.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::core::error::RegistryError;
use crate::core::registry::ToolRegistry;

/// Renders a prompt from its arguments.
pub type PromptRender = fn(&Map<String, Value>) -> Result<String, String>;

/// Reads a resource given the value captured by its URI template.
pub type ResourceRead = fn(&str) -> String;

#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// A named prompt template.
#[derive(Clone)]
pub struct Prompt {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgument>,
    pub render: PromptRender,
}

impl Prompt {
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "arguments": self.arguments,
        })
    }
}

/// A resource addressed by a URI template with a single `{placeholder}`,
/// e.g. `echo://{message}`.
#[derive(Clone)]
pub struct ResourceTemplate {
    pub uri_template: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub read: ResourceRead,
}

impl ResourceTemplate {
    pub fn to_json(&self) -> Value {
        json!({
            "uriTemplate": self.uri_template,
            "name": self.name,
            "description": self.description,
            "mimeType": self.mime_type,
        })
    }

    /// Extract the placeholder value if `uri` matches this template.
    pub fn matches<'a>(&self, uri: &'a str) -> Option<&'a str> {
        let open = self.uri_template.find('{')?;
        let close = self.uri_template.rfind('}')?;
        let prefix = &self.uri_template[..open];
        let suffix = &self.uri_template[close + 1..];
        let rest = uri.strip_prefix(prefix)?;
        let captured = rest.strip_suffix(suffix)?;
        (!captured.is_empty()).then_some(captured)
    }
}

/// Tools, prompts and resources served by one process.
#[derive(Default)]
pub struct Catalog {
    pub tools: ToolRegistry,
    prompts: Vec<Prompt>,
    resources: Vec<ResourceTemplate>,
}

impl Catalog {
    pub fn new(tools: ToolRegistry) -> Self {
        Self {
            tools,
            prompts: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn add_prompt(&mut self, prompt: Prompt) -> Result<(), RegistryError> {
        if self.prompts.iter().any(|p| p.name == prompt.name) {
            return Err(RegistryError::DuplicatePrompt(prompt.name.to_string()));
        }
        self.prompts.push(prompt);
        Ok(())
    }

    pub fn add_resource(&mut self, resource: ResourceTemplate) -> Result<(), RegistryError> {
        if self
            .resources
            .iter()
            .any(|r| r.uri_template == resource.uri_template)
        {
            return Err(RegistryError::DuplicateResource(resource.uri_template.to_string()));
        }
        self.resources.push(resource);
        Ok(())
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn prompt(&self, name: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.name == name)
    }

    pub fn resources(&self) -> &[ResourceTemplate] {
        &self.resources
    }

    /// Read the first resource template matching `uri`.
    pub fn read_resource(&self, uri: &str) -> Option<(&ResourceTemplate, String)> {
        self.resources
            .iter()
            .find_map(|r| r.matches(uri).map(|captured| (r, (r.read)(captured))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_resource() -> ResourceTemplate {
        ResourceTemplate {
            uri_template: "echo://{message}",
            name: "echo",
            description: "echo",
            mime_type: "text/plain",
            read: |message| format!("Resource echo: {}", message),
        }
    }

    #[test]
    fn template_captures_placeholder() {
        let resource = echo_resource();
        assert_eq!(resource.matches("echo://hello"), Some("hello"));
        assert_eq!(resource.matches("echo://"), None);
        assert_eq!(resource.matches("file://hello"), None);
    }

    #[test]
    fn read_resource_renders_match() {
        let mut catalog = Catalog::default();
        catalog.add_resource(echo_resource()).unwrap();
        let (resource, text) = catalog.read_resource("echo://hi").unwrap();
        assert_eq!(resource.name, "echo");
        assert_eq!(text, "Resource echo: hi");
        assert!(catalog.add_resource(echo_resource()).is_err());
    }
}
