/// MCP adapter servers for a set of sample tools, the Cloudera ML workbench
/// API and Hive.
///
/// `core` holds the protocol layer and the tool registry; `tools` holds the
/// bundles. Each binary under `src/bin` builds one bundle's catalog and hands
/// it to `core::server::serve`.

pub mod core;
pub mod tools;
