//! Delegating forwarder.
//!
//! Rewrites the request in place and hands it to the pooled hyper client;
//! the backend response body is passed through as-is.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};

use crate::config::{ForwardStrategy, TimeoutConfig};
use crate::forward::headers::{prepare_outbound, strip_hop_by_hop};
use crate::forward::target::BackendTarget;
use crate::forward::{ForwardError, Forwarder};

#[derive(Debug, Clone)]
pub struct DelegateForwarder {
    client: Client<HttpConnector, Body>,
    target: Arc<BackendTarget>,
    response_header_timeout: Duration,
}

impl DelegateForwarder {
    pub fn new(target: Arc<BackendTarget>, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .pool_max_idle_per_host(timeouts.max_idle_connections)
            .build(connector);

        Self {
            client,
            target,
            response_header_timeout: Duration::from_secs(timeouts.response_header_secs),
        }
    }
}

#[async_trait]
impl Forwarder for DelegateForwarder {
    fn strategy(&self) -> ForwardStrategy {
        ForwardStrategy::Delegate
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let outbound = self.target.outbound_url(&parts.uri);
        parts.uri = outbound
            .parse::<Uri>()
            .map_err(|e| ForwardError::InvalidRequest(format!("{outbound}: {e}")))?;
        // The pooled connections speak HTTP/1.1 whatever the client used.
        parts.version = Version::HTTP_11;
        prepare_outbound(&mut parts.headers, self.target.host_header());

        let pending = self.client.request(Request::from_parts(parts, body));
        let response: Response<Incoming> = tokio::time::timeout(self.response_header_timeout, pending)
            .await
            .map_err(|_| ForwardError::ResponseTimeout(self.response_header_timeout))?
            .map_err(|e| {
                if e.is_connect() {
                    ForwardError::Connect(Box::new(e))
                } else {
                    ForwardError::Transport(Box::new(e))
                }
            })?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
