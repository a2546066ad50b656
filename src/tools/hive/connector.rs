/// Hive Connectors
///
/// Tools talk to Hive through the `HiveConnector` / `HiveConnection` traits.
/// The default implementation drives the `beeline` command-line client and
/// parses its `tsv2` output into JSON records.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::core::config::HiveConfig;
use crate::core::error::ToolError;

/// One result row, column name to value.
pub type Record = Map<String, Value>;

/// Opens connections to a Hive (or Impala) endpoint.
#[async_trait]
pub trait HiveConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn HiveConnection>, ToolError>;
}

/// A live connection. Callers must `close` it when done, also after a
/// failed statement.
#[async_trait]
pub trait HiveConnection: Send {
    /// Run a statement that returns rows.
    async fn query(&mut self, sql: &str) -> Result<Vec<Record>, ToolError>;

    /// Run a statement for its side effects.
    async fn execute(&mut self, sql: &str) -> Result<(), ToolError>;

    async fn close(&mut self) -> Result<(), ToolError>;
}

/// Runs each statement through the `beeline` client.
pub struct BeelineConnector {
    config: Arc<HiveConfig>,
}

impl BeelineConnector {
    pub fn new(config: HiveConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl HiveConnector for BeelineConnector {
    async fn connect(&self) -> Result<Box<dyn HiveConnection>, ToolError> {
        debug!("Opening beeline session for {}", self.config.connection_name);
        Ok(Box::new(BeelineConnection {
            config: self.config.clone(),
            closed: false,
        }))
    }
}

struct BeelineConnection {
    config: Arc<HiveConfig>,
    closed: bool,
}

impl BeelineConnection {
    fn command_args(&self, password_file: &Path, sql: &str) -> Vec<String> {
        let target = if self.config.connection_name.starts_with("jdbc:") {
            "-u"
        } else {
            "-c"
        };
        vec![
            target.to_string(),
            self.config.connection_name.clone(),
            "-n".to_string(),
            self.config.username.clone(),
            "-w".to_string(),
            password_file.display().to_string(),
            "--silent=true".to_string(),
            "--showHeader=true".to_string(),
            "--outputformat=tsv2".to_string(),
            "-e".to_string(),
            sql.to_string(),
        ]
    }

    async fn run(&self, sql: &str) -> Result<String, ToolError> {
        if self.closed {
            return Err(ToolError::Query("connection is closed".to_string()));
        }
        debug!("beeline: {}", sql);

        // Created with mode 0600 and removed when dropped, after beeline exits
        let mut password_file = NamedTempFile::new()?;
        password_file.write_all(self.config.password.as_bytes())?;
        password_file.flush()?;

        let output = Command::new(&self.config.beeline_path)
            .args(self.command_args(password_file.path(), sql))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ToolError::Query(format!(
                    "could not start {}: {}",
                    self.config.beeline_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = if stderr.trim().is_empty() { stdout } else { stderr };
            return Err(ToolError::Query(detail.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl HiveConnection for BeelineConnection {
    async fn query(&mut self, sql: &str) -> Result<Vec<Record>, ToolError> {
        let output = self.run(sql).await?;
        Ok(parse_tsv(&output))
    }

    async fn execute(&mut self, sql: &str) -> Result<(), ToolError> {
        self.run(sql).await.map(|_| ())
    }

    async fn close(&mut self) -> Result<(), ToolError> {
        self.closed = true;
        Ok(())
    }
}

/// How the cells of one column are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

fn is_null(cell: &str) -> bool {
    cell.trim() == "NULL"
}

/// Integers in canonical form only, so `00501` or `+7` stay text.
fn integer(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>().ok().filter(|i| i.to_string() == cell)
}

/// Decimals as Hive prints doubles: a `.` is required, leading zeros are not allowed.
fn float(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let digits = cell.trim_start_matches('-');
    let (whole, _) = digits.split_once('.')?;
    if whole.is_empty() || (whole.len() > 1 && whole.starts_with('0')) {
        return None;
    }
    cell.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn boolean(cell: &str) -> Option<bool> {
    match cell.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// The narrowest kind every non-NULL cell of the column fits.
fn column_kind<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnKind {
    let mut values = cells.filter(|c| !is_null(c)).peekable();
    if values.peek().is_none() {
        return ColumnKind::Text;
    }
    if values.clone().all(|c| integer(c).is_some()) {
        ColumnKind::Integer
    } else if values.clone().all(|c| integer(c).is_some() || float(c).is_some()) {
        ColumnKind::Float
    } else if values.all(|c| boolean(c).is_some()) {
        ColumnKind::Boolean
    } else {
        ColumnKind::Text
    }
}

fn render(cell: &str, kind: ColumnKind) -> Value {
    if is_null(cell) {
        return Value::Null;
    }
    let typed = match kind {
        ColumnKind::Integer => integer(cell).map(Value::from),
        ColumnKind::Float => cell
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        ColumnKind::Boolean => boolean(cell).map(Value::Bool),
        ColumnKind::Text => None,
    };
    typed.unwrap_or_else(|| Value::String(cell.to_string()))
}

/// Parse `tsv2` output: a header line followed by tab-separated rows.
///
/// A column becomes numeric or boolean only when every non-NULL cell in it
/// parses as such; otherwise the whole column stays text.
pub fn parse_tsv(output: &str) -> Vec<Record> {
    let mut lines = output.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let columns: Vec<&str> = header.split('\t').map(str::trim).collect();

    let rows: Vec<Vec<&str>> = lines
        .map(|line| {
            let mut cells = line.split('\t');
            columns.iter().map(|_| cells.next().unwrap_or("")).collect()
        })
        .collect();
    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|i| column_kind(rows.iter().map(move |row| row[i])))
        .collect();

    rows.iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .zip(&kinds)
                .map(|((column, cell), kind)| (column.to_string(), render(cell, *kind)))
                .collect()
        })
        .collect()
}
