/// Configuration Loading
///
/// All settings come from environment variables and are read exactly once at
/// start-up into typed structs. Handlers receive these structs through their
/// constructors and never read the environment themselves.
///
/// Each loader takes a lookup function so tests can supply values without
/// touching the process environment; `from_env` wires in `std::env::var`.
/// Empty values are treated the same as unset ones.

use std::time::Duration;
use url::Url;

use crate::core::error::ConfigError;

/// Environment lookup used by every loader.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Which transports the server runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Line-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP with Actix Web
    Http,
    /// STDIO in the background and HTTP in the foreground
    Both,
}

impl std::str::FromStr for TransportMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            "both" => Ok(TransportMode::Both),
            other => Err(ConfigError::Invalid {
                name: "MCP_TRANSPORT_MODE",
                reason: format!("'{}' must be 'stdio', 'http', or 'both'", other),
            }),
        }
    }
}

/// Server metadata and transport settings.
///
/// Environment Variables:
/// - SERVER_NAME: name reported in `initialize` (default: bundle name)
/// - SERVER_VERSION: version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "stdio")
/// - HOST: bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: port for HTTP mode (default: 3000)
/// - WORKER_THREADS: HTTP workers (default: CPU count, capped at 16)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn from_env(default_name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(default_name, env_lookup)
    }

    pub fn from_lookup<F>(default_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = match non_empty(&lookup, "MCP_TRANSPORT_MODE") {
            Some(mode) => mode.parse()?,
            None => TransportMode::Stdio,
        };

        let port = match non_empty(&lookup, "PORT") {
            Some(port) => port.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 3000,
        };

        let workers = non_empty(&lookup, "WORKER_THREADS")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|w| *w > 0)
            .unwrap_or_else(|| num_cpus::get().clamp(1, 16));

        Ok(Self {
            name: non_empty(&lookup, "SERVER_NAME").unwrap_or_else(|| default_name.to_string()),
            version: non_empty(&lookup, "SERVER_VERSION")
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            transport,
            host: non_empty(&lookup, "HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            workers,
        })
    }
}

/// Connection settings for the Cloudera ML workbench API.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkbenchConfig {
    /// Normalized base URL, without trailing slash
    pub host: Url,
    pub api_key: String,
    /// Project used when a tool call omits `project_id`
    pub default_project_id: Option<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for WorkbenchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkbenchConfig")
            .field("host", &self.host.as_str())
            .field("api_key", &"***")
            .field("default_project_id", &self.default_project_id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WorkbenchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = non_empty(&lookup, "CLOUDERA_ML_HOST");
        let api_key = non_empty(&lookup, "CLOUDERA_ML_API_KEY");

        let (host, api_key) = match (host, api_key) {
            (Some(host), Some(api_key)) => (host, api_key),
            (host, api_key) => {
                let mut missing = Vec::new();
                if host.is_none() {
                    missing.push("CLOUDERA_ML_HOST");
                }
                if api_key.is_none() {
                    missing.push("CLOUDERA_ML_API_KEY");
                }
                return Err(ConfigError::Missing(missing));
            }
        };

        let timeout = match non_empty(&lookup, "CLOUDERA_ML_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.parse::<u64>().map_err(|e| {
                ConfigError::Invalid {
                    name: "CLOUDERA_ML_TIMEOUT_SECS",
                    reason: e.to_string(),
                }
            })?),
            None => Duration::from_secs(30),
        };

        Ok(Self {
            host: normalize_host(&host)?,
            api_key,
            default_project_id: non_empty(&lookup, "CLOUDERA_ML_PROJECT_ID"),
            timeout,
        })
    }
}

/// Clean up a user-supplied workbench host into a base URL.
///
/// Trims whitespace, collapses a doubled `https://https://`, adds `https://`
/// when no scheme is given, and drops trailing slashes.
pub fn normalize_host(raw: &str) -> Result<Url, ConfigError> {
    let mut host = raw.trim().to_string();
    while host.starts_with("https://https://") {
        host = host.replacen("https://", "", 1);
    }
    if !host.starts_with("http://") && !host.starts_with("https://") {
        host = format!("https://{}", host);
    }
    let host = host.trim_end_matches('/');

    let url = Url::parse(host).map_err(|e| ConfigError::Invalid {
        name: "CLOUDERA_ML_HOST",
        reason: format!("{} ({})", e, host),
    })?;
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            name: "CLOUDERA_ML_HOST",
            reason: format!("no host in '{}'", host),
        });
    }
    Ok(url)
}

/// Credentials and client settings for the Hive connection.
#[derive(Clone, PartialEq, Eq)]
pub struct HiveConfig {
    /// Named beeline connection, or a full `jdbc:hive2://` URL
    pub connection_name: String,
    pub username: String,
    pub password: String,
    /// Path to the beeline executable
    pub beeline_path: String,
}

// Keep the password out of logs
impl std::fmt::Debug for HiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiveConfig")
            .field("connection_name", &self.connection_name)
            .field("username", &self.username)
            .field("password", &"***")
            .field("beeline_path", &self.beeline_path)
            .finish()
    }
}

impl HiveConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection_name = non_empty(&lookup, "CONNECTION_NAME");
        let username = non_empty(&lookup, "USERNAME");
        let password = non_empty(&lookup, "PASSWORD");

        match (connection_name, username, password) {
            (Some(connection_name), Some(username), Some(password)) => Ok(Self {
                connection_name,
                username,
                password,
                beeline_path: non_empty(&lookup, "HIVE_BEELINE_PATH")
                    .unwrap_or_else(|| "beeline".to_string()),
            }),
            (connection_name, username, password) => {
                let missing = [
                    ("CONNECTION_NAME", connection_name.is_none()),
                    ("USERNAME", username.is_none()),
                    ("PASSWORD", password.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ConfigError::Missing(missing))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn server_defaults() {
        let config = ServerConfig::from_lookup("Sample-MCP", lookup(&[])).unwrap();
        assert_eq!(config.name, "Sample-MCP");
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.port, 3000);
        assert!(config.workers >= 1 && config.workers <= 16);
    }

    #[test]
    fn invalid_transport_is_rejected() {
        let err = ServerConfig::from_lookup("x", lookup(&[("MCP_TRANSPORT_MODE", "pipe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MCP_TRANSPORT_MODE", .. }));
    }

    #[test]
    fn workbench_reports_every_missing_variable() {
        let err = WorkbenchConfig::from_lookup(lookup(&[("CLOUDERA_ML_HOST", "  ")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["CLOUDERA_ML_HOST", "CLOUDERA_ML_API_KEY"])
        );
    }

    #[test]
    fn workbench_host_is_normalized() {
        let config = WorkbenchConfig::from_lookup(lookup(&[
            ("CLOUDERA_ML_HOST", "https://https://ml.example.com/"),
            ("CLOUDERA_ML_API_KEY", "secret"),
            ("CLOUDERA_ML_PROJECT_ID", "p-1"),
        ]))
        .unwrap();
        assert_eq!(config.host.as_str(), "https://ml.example.com/");
        assert_eq!(config.default_project_id.as_deref(), Some("p-1"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn bare_host_gets_https_scheme() {
        let url = normalize_host("ml.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("ml.example.com"));
        assert_eq!(normalize_host("http://127.0.0.1:8080").unwrap().port(), Some(8080));
    }

    #[test]
    fn hive_requires_all_credentials() {
        let err = HiveConfig::from_lookup(lookup(&[("USERNAME", "svc")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(vec!["CONNECTION_NAME", "PASSWORD"]));
        assert_eq!(err.to_string(), "Missing configuration: CONNECTION_NAME, PASSWORD");
    }

    #[test]
    fn hive_debug_hides_password() {
        let config = HiveConfig::from_lookup(lookup(&[
            ("CONNECTION_NAME", "default-hive"),
            ("USERNAME", "svc"),
            ("PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(config.beeline_path, "beeline");
        assert!(!format!("{:?}", config).contains("hunter2"));
    }
}
