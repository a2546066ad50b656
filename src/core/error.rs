/// Error Types
///
/// Every failure a tool call can produce is a `ToolError`. Its `Display`
/// output is what the client sees as the failure message, so each variant
/// names the argument, the backend, or the status involved.

use thiserror::Error;

/// Failure raised while validating or executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with this name exists in the registry
    #[error("Tool not registered: {0}")]
    NotRegistered(String),

    /// A required argument was absent or null
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// An argument was present but could not be converted to its declared kind
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    /// Transport-level HTTP failure (connection refused, timeout, TLS, ...)
    #[error("API request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// A SQL statement failed in the Hive client
    #[error("Query failed: {0}")]
    Query(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other handler-level failure (division by zero, bad local path, ...)
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failure while building a registry at start-up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
    #[error("Prompt already registered: {0}")]
    DuplicatePrompt(String),
    #[error("Resource template already registered: {0}")]
    DuplicateResource(String),
}

/// Failure while reading configuration from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or empty
    #[error("Missing configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable is set but its value cannot be used
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
