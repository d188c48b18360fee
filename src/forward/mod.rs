//! Forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Allowed request
//!     → target.rs (outbound URL from backend base + inbound path/query)
//!     → headers.rs (strip hop-by-hop, overwrite Host)
//!     → Forwarder strategy
//!         delegate.rs: pooled hyper client, response passed through
//!         manual.rs:   reqwest request built by hand, response copied
//!     → streamed Response or ForwardError
//! ```
//!
//! # Design Decisions
//! - One trait, two interchangeable strategies; callers never branch on which
//! - No retries: a failed forward is reported once
//! - Response bodies stay lazy streams end to end
//! - Transport limits come from `TimeoutConfig`, not from forwarding logic

pub mod delegate;
pub mod headers;
pub mod manual;
pub mod target;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use thiserror::Error;

use crate::config::{ForwardStrategy, TimeoutConfig};

pub use delegate::DelegateForwarder;
pub use manual::ManualForwarder;
pub use target::{BackendTarget, TargetError};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to relay a request to the backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("cannot build outbound request: {0}")]
    InvalidRequest(String),

    #[error("backend connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("no response headers from backend within {0:?}")]
    ResponseTimeout(Duration),

    #[error("backend transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("cannot build HTTP client: {0}")]
    Client(#[source] BoxError),
}

impl ForwardError {
    /// Stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::InvalidRequest(_) => "invalid_request",
            ForwardError::Connect(_) => "connect",
            ForwardError::ResponseTimeout(_) => "response_timeout",
            ForwardError::Transport(_) => "transport",
            ForwardError::Client(_) => "client",
        }
    }

    /// Message including every underlying cause not already in the text.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

/// Relays an allowed request to the backend.
#[async_trait]
pub trait Forwarder: Send + Sync + std::fmt::Debug {
    /// Which strategy this forwarder implements.
    fn strategy(&self) -> ForwardStrategy;

    /// Send `request` to the backend and return its streaming response.
    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError>;
}

/// Build the forwarder for the configured strategy.
pub fn build_forwarder(
    strategy: ForwardStrategy,
    target: Arc<BackendTarget>,
    timeouts: &TimeoutConfig,
) -> Result<Arc<dyn Forwarder>, ForwardError> {
    let forwarder: Arc<dyn Forwarder> = match strategy {
        ForwardStrategy::Delegate => Arc::new(DelegateForwarder::new(target, timeouts)),
        ForwardStrategy::Manual => Arc::new(ManualForwarder::new(target, timeouts)?),
    };
    Ok(forwarder)
}
