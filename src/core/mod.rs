/// Core Server Framework Module
///
/// This module contains the protocol-independent building blocks and the
/// MCP server itself:
/// - args.rs / schema.rs: declared parameters and validated argument values
/// - registry.rs: tool registry and the `invoke` dispatcher
/// - catalog.rs: prompts and resource templates served next to the tools
/// - server.rs: MCP server implementation with HTTP and STDIO transport
/// - config.rs: environment-based configuration
/// - logging.rs: tracing subscriber setup
/// - error.rs: error types

pub mod args;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod schema;
pub mod server;
