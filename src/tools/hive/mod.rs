/// Hive Query Tools
///
/// Three tools over a `HiveConnector`: a table preview, a read-only query and
/// a write statement. Every call opens its own connection and closes it
/// before returning, whether the statement succeeded or not.

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::core::args::Arguments;
use crate::core::catalog::Catalog;
use crate::core::config::HiveConfig;
use crate::core::error::{RegistryError, ToolError};
use crate::core::registry::{Content, ToolDescriptor, ToolRegistry, context_handler};
use crate::core::schema::{InputSchema, ParamKind};

pub mod connector;

pub use connector::{BeelineConnector, HiveConnection, HiveConnector, Record};

pub type SharedConnector = Arc<dyn HiveConnector>;

const READ_ONLY_KEYWORDS: [&str; 6] = ["SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"];

pub fn register(registry: &mut ToolRegistry, connector: SharedConnector) -> Result<(), RegistryError> {
    registry.register(
        ToolDescriptor::new(
            "hive_table_return_top_3_rows",
            "Describe a table and return its first 3 rows",
            InputSchema::new().required(
                "table",
                ParamKind::String,
                "Fully qualified table name (e.g. default.customer)",
            ),
        ),
        context_handler(connector.clone(), top_rows),
    )?;
    registry.register(
        ToolDescriptor::new(
            "hive_or_impala_execute_readonly_sql_query",
            "Execute a read-only SQL query and return the rows. \
             Do not use this tool for write/insert/update/delete queries.",
            InputSchema::new().required("query", ParamKind::String, "SQL query to execute"),
        ),
        context_handler(connector.clone(), readonly_query),
    )?;
    registry.register(
        ToolDescriptor::new(
            "hive_or_impala_execute_write_sql_query",
            "Execute a SQL statement for write/insert/update/delete operations",
            InputSchema::new().required("query", ParamKind::String, "SQL query to execute"),
        ),
        context_handler(connector, write_query),
    )
}

/// Build the catalog served by the `hive-mcp` binary.
pub fn catalog(config: HiveConfig) -> Result<Catalog, RegistryError> {
    let mut registry = ToolRegistry::new();
    register(&mut registry, Arc::new(BeelineConnector::new(config)))?;
    Ok(Catalog::new(registry))
}

/// `name` or `schema.name`, each part made of letters, digits and `_`.
pub fn validate_table_name(table: &str) -> Result<&str, ToolError> {
    let table = table.trim();
    let parts: Vec<&str> = table.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(table)
    } else {
        Err(ToolError::invalid(
            "table",
            format!("'{}' is not a valid table name", table),
        ))
    }
}

/// Drop leading whitespace and `--` or `/* */` comments.
fn skip_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest;
        }
    }
}

/// Byte offset of the first `;` that is not inside a quoted string,
/// a quoted identifier or a comment.
fn statement_end(sql: &str) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b';' => return Some(i),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    i = sql[i..].find('\n').map_or(bytes.len(), |n| i + n);
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = sql[i + 2..].find("*/").map_or(bytes.len(), |n| i + n + 3);
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Accept a single statement that starts with a read-only keyword.
/// Leading comments and one trailing `;` are stripped.
pub fn check_read_only(query: &str) -> Result<&str, ToolError> {
    let statement = skip_comments(query);
    let statement = match statement_end(statement) {
        Some(end) if !skip_comments(&statement[end + 1..]).is_empty() => {
            return Err(ToolError::invalid("query", "only a single statement is allowed"));
        }
        Some(end) => &statement[..end],
        None => statement,
    }
    .trim_end();

    let keyword = statement
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    if READ_ONLY_KEYWORDS.contains(&keyword.as_str()) {
        Ok(statement)
    } else {
        Err(ToolError::invalid(
            "query",
            format!(
                "read-only queries must start with one of {}",
                READ_ONLY_KEYWORDS.join(", ")
            ),
        ))
    }
}

/// Close `connection`, logging rather than failing if that goes wrong.
async fn release(mut connection: Box<dyn HiveConnection>) {
    if let Err(e) = connection.close().await {
        warn!("Failed to close Hive connection: {}", e);
    }
}

fn records(rows: Vec<Record>) -> Content {
    Content::Json(Value::Array(rows.into_iter().map(Value::Object).collect()))
}

async fn top_rows(connector: SharedConnector, args: Arguments) -> Result<Content, ToolError> {
    let table = validate_table_name(args.required_str("table")?)?;

    let mut connection = connector.connect().await?;
    let result = async {
        let mut rows = connection.query(&format!("DESCRIBE {}", table)).await?;
        rows.extend(connection.query(&format!("SELECT * FROM {} LIMIT 3", table)).await?);
        Ok::<_, ToolError>(rows)
    }
    .await;
    release(connection).await;

    result.map(records)
}

async fn readonly_query(connector: SharedConnector, args: Arguments) -> Result<Content, ToolError> {
    let query = check_read_only(args.required_str("query")?)?;

    let mut connection = connector.connect().await?;
    let result = connection.query(query).await;
    release(connection).await;

    result.map(records)
}

async fn write_query(connector: SharedConnector, args: Arguments) -> Result<Content, ToolError> {
    let query = args.required_str("query")?;

    let mut connection = connector.connect().await?;
    let result = connection.execute(query).await;
    release(connection).await;

    result.map(|()| Content::Text("Query executed successfully".to_string()))
}
