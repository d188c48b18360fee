//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the filtering proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The search cluster requests are relayed to.
    pub backend: BackendConfig,

    /// Outbound transport limits.
    pub timeouts: TimeoutConfig,

    /// Allowlist rule tables.
    pub policy: PolicyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "[::]:9200").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "[::]:9200".to_string(),
        }
    }
}

/// How allowed requests are relayed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForwardStrategy {
    /// Hand the rewritten request to the pooled hyper client and pass its
    /// response through untouched.
    #[default]
    Delegate,
    /// Build the outbound request explicitly with reqwest and copy the
    /// response over.
    Manual,
}

impl ForwardStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardStrategy::Delegate => "delegate",
            ForwardStrategy::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ForwardStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ForwardStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delegate" => Ok(ForwardStrategy::Delegate),
            "manual" => Ok(ForwardStrategy::Manual),
            other => Err(format!("unknown forwarding strategy `{other}` (expected delegate or manual)")),
        }
    }
}

/// Backend cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the search cluster (scheme, host, optional path prefix).
    pub url: String,

    /// Forwarding strategy.
    pub strategy: ForwardStrategy,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://elastic:9200/".to_string(),
            strategy: ForwardStrategy::default(),
        }
    }
}

/// Timeout and pooling limits for the outbound client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// TCP connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// TLS handshake allowance in seconds (https backends, manual strategy).
    pub tls_handshake_secs: u64,

    /// Maximum wait for the backend's response headers in seconds.
    pub response_header_secs: u64,

    /// Idle pooled connection lifetime in seconds.
    pub idle_secs: u64,

    /// Maximum idle pooled connections kept to the backend.
    pub max_idle_connections: usize,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            tls_handshake_secs: 3,
            response_header_secs: 15,
            idle_secs: 15 * 60,
            max_idle_connections: 100,
        }
    }
}

/// Allowlist rule tables.
///
/// Anything not matched by these tables is refused with 405.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Methods allowed for any path.
    pub allowed_methods: Vec<String>,

    /// GET path prefixes. Place the most frequently polled paths first.
    pub get_path_prefixes: Vec<String>,

    /// Exact POST paths.
    pub post_paths: Vec<String>,

    /// Exact PUT paths.
    pub put_paths: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_methods: vec!["HEAD".to_string()],
            get_path_prefixes: [
                "/_cluster/",
                "/.kibana/",
                "/_nodes",
                "/_mget",
                "/_msearch",
                "/cloudstats/",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            post_paths: [
                "/_mget",
                "/_msearch",
                "/.kibana/_search",
                "/.kibana/_msearch",
                "/.kibana/_mget",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            // Kibana may send the colon raw or percent-encoded; paths are
            // matched on the wire form, so both are listed.
            put_paths: [
                "/_template/kibana_index_template:.kibana",
                "/_template/kibana_index_template%3A.kibana",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}` (expected text or json)")),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9091".to_string(),
        }
    }
}
