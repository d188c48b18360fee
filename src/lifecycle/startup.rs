//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the fully-merged configuration
//! - Build the backend target, allowlist and forwarder
//! - Install the metrics exporter when enabled
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and reported before binding
//! - Listeners start last (traffic only when ready)

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, ProxyConfig};
use crate::forward::{ForwardError, TargetError};
use crate::http::HttpServer;
use crate::observability::metrics;

/// Error that prevents the proxy from starting or keeps it from serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid backend: {0}")]
    Target(#[from] TargetError),

    #[error("cannot build forwarder: {0}")]
    Forwarder(#[from] ForwardError),

    #[error("invalid {field} `{value}`: {source}")]
    Address {
        field: &'static str,
        value: String,
        #[source]
        source: AddrParseError,
    },

    #[error("cannot install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("cannot listen on {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|source| StartupError::Address {
        field,
        value: value.to_string(),
        source,
    })
}

/// Start the proxy with `config` and serve until `shutdown` fires.
pub async fn start(
    config: ProxyConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    validate_config(&config).map_err(ConfigError::Validation)?;

    let bind_address = parse_addr("listener.bind_address", &config.listener.bind_address)?;
    let server = HttpServer::new(config)?;
    let config = server.config();

    if config.observability.metrics_enabled {
        let metrics_address =
            parse_addr("observability.metrics_address", &config.observability.metrics_address)?;
        metrics::init_metrics(metrics_address)?;
    }

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: bind_address,
            source,
        })?;

    tracing::info!(
        address = %bind_address,
        backend = %config.backend.url,
        strategy = %config.backend.strategy,
        "Proxying to Elasticsearch"
    );

    server.run(listener, shutdown).await.map_err(StartupError::Serve)
}
