//! elastic-proxy
//!
//! An allowlisting reverse proxy that sits in front of Elasticsearch.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ policy::evaluator ──blocked──▶ 405 / 501
//!                                            │
//!                                         allowed
//!                                            ▼
//!                                   forward (delegate | manual) ──▶ Elasticsearch
//!                                            │
//!     Client Response ◀── http::response ◀───┘  (streamed, outcome record on completion)
//! ```

use std::path::PathBuf;

use clap::Parser;

use elastic_proxy::config::loader::read_config;
use elastic_proxy::config::{ForwardStrategy, LogFormat, ProxyConfig};
use elastic_proxy::lifecycle::{signals, start, Shutdown};
use elastic_proxy::observability::logging::{default_directive, init_logging};

/// Release reported by `--version`.
const VERSION: &str = "0.1";

/// Allowlisting reverse proxy for Elasticsearch.
#[derive(Debug, Parser)]
#[command(name = "elastic-proxy", version = VERSION, about)]
struct Cli {
    /// Log proxied requests at info level.
    #[arg(long)]
    verbose: bool,

    /// Log at debug level.
    #[arg(long)]
    debug: bool,

    /// URL of the Elasticsearch instance to proxy to.
    #[arg(long, value_name = "URL")]
    elastic: Option<String>,

    /// Address to listen on.
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// TOML configuration file.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Forwarding strategy: delegate or manual.
    #[arg(long, value_name = "STRATEGY")]
    strategy: Option<ForwardStrategy>,

    /// Log output format: text or json.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Layer command-line values over the loaded configuration.
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(url) = &self.elastic {
            config.backend.url = url.clone();
        }
        if let Some(addr) = &self.listen {
            config.listener.bind_address = addr.clone();
        }
        if let Some(strategy) = self.strategy {
            config.backend.strategy = strategy;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);

    init_logging(
        default_directive(cli.verbose, cli.debug),
        config.observability.log_format,
    )?;

    tracing::info!(version = VERSION, "elastic-proxy starting");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    if let Err(e) = start(config, server_shutdown).await {
        tracing::error!(error = %e, "elastic-proxy failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn version_flag_prints_release() {
        assert_eq!(Cli::command().get_version(), Some("0.1"));

        let err = Cli::try_parse_from(["elastic-proxy", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert_eq!(err.to_string().trim(), "elastic-proxy 0.1");
    }

    #[test]
    fn flags_override_config_file_values() {
        let cli = Cli::parse_from([
            "elastic-proxy",
            "--elastic",
            "http://10.0.0.5:9200/",
            "--listen",
            "127.0.0.1:8080",
            "--strategy",
            "manual",
            "--log-format",
            "json",
        ]);
        let mut config = ProxyConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.backend.url, "http://10.0.0.5:9200/");
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.backend.strategy, ForwardStrategy::Manual);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn absent_flags_keep_config_values() {
        let cli = Cli::parse_from(["elastic-proxy", "--verbose"]);
        let mut config = ProxyConfig::default();
        cli.apply(&mut config);

        assert!(cli.verbose);
        assert_eq!(config.backend.url, ProxyConfig::default().backend.url);
        assert_eq!(config.backend.strategy, ForwardStrategy::Delegate);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["elastic-proxy", "--strategy", "magic"]).is_err());
    }
}
