//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick the default verbosity from CLI flags
//! - Select plain text or JSON output
//!
//! `RUST_LOG`, when set, always wins over the flag-derived default.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::LogFormat;

/// Default filter directive: warnings only, `--verbose` adds this crate's
/// info events, `--debug` opens everything up to debug.
pub fn default_directive(verbose: bool, debug: bool) -> &'static str {
    if debug {
        "info,elastic_proxy=debug,tower_http=debug"
    } else if verbose {
        "warn,elastic_proxy=info"
    } else {
        "warn"
    }
}

/// Install the global subscriber.
pub fn init_logging(directive: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
}
