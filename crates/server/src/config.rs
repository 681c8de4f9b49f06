use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Prefix of the environment variables read by [`ServerConfig::load`],
/// e.g. `DOCGATE_PORT` or `DOCGATE_STORE_URI`.
pub const ENV_PREFIX: &str = "DOCGATE";

/// Unprefixed variable names accepted as fallbacks for older deployments.
const LEGACY_STORE_URI: &str = "ConnectionUri";
const LEGACY_PORT: &str = "Port";
const LEGACY_DEBUG: &str = "Debug";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Document store connection string (`memory://` or `redb://<path>`)
    #[serde(default = "default_store_uri")]
    pub store_uri: String,

    /// Debug mode: verbose human-readable logs instead of JSON
    #[serde(default = "default_true")]
    pub debug: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable permissive CORS headers
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Problems found while loading, logged once tracing is installed.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            store_uri: default_store_uri(),
            debug: default_true(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            warnings: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.{toml,yaml,json}`
    /// file and `DOCGATE_*` environment variables, in increasing precedence.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: ServerConfig = builder.build()?.try_deserialize()?;
        let warnings = config.apply_legacy_env(|name| std::env::var(name).ok());
        config.warnings.extend(warnings);
        Ok(config)
    }

    /// Honour the unprefixed `ConnectionUri`, `Port` and `Debug` variables
    /// when the corresponding `DOCGATE_*` variable is not set. Returns a
    /// message for every value that was present but unusable.
    pub fn apply_legacy_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();
        let prefixed = |field: &str| lookup(&format!("{ENV_PREFIX}_{}", field.to_uppercase()));

        if prefixed("store_uri").is_none() {
            if let Some(uri) = lookup(LEGACY_STORE_URI).filter(|v| !v.trim().is_empty()) {
                self.store_uri = uri;
            }
        }

        if prefixed("port").is_none() {
            if let Some(raw) = lookup(LEGACY_PORT) {
                match raw.trim().parse() {
                    Ok(port) => self.port = port,
                    Err(_) => warnings.push(format!("ignoring unparsable {LEGACY_PORT}={raw:?}")),
                }
            }
        }

        if prefixed("debug").is_none() {
            if let Some(raw) = lookup(LEGACY_DEBUG) {
                match parse_flag(&raw) {
                    Some(flag) => self.debug = flag,
                    None => warnings.push(format!("ignoring unparsable {LEGACY_DEBUG}={raw:?}")),
                }
            }
        }
        warnings
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }

    /// Log filter directive; debug mode raises an `info`/unset level to `debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug && matches!(self.log_level.as_str(), "" | "info") {
            "debug"
        } else {
            &self.log_level
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_store_uri() -> String {
    "memory://".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
