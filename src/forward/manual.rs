//! Manual relay forwarder.
//!
//! # Responsibilities
//! - Construct the outbound request explicitly with reqwest
//! - Enforce the response-header deadline and map failures to `ForwardError`
//! - Copy status and headers, stream the body without buffering
//!
//! # Design Decisions
//! - Redirects are relayed to the caller, never followed
//! - Requests whose path segments the URL parser would rewrite (dot segments)
//!   are refused, so the backend sees the path the policy judged.
//!   Differences in percent-encoding alone are accepted.
//! - Bodiless requests are sent without a body rather than an empty chunked one

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use axum::body::{Body, HttpBody};
use axum::http::{Request, Response};
use url::Url;

use crate::config::{ForwardStrategy, TimeoutConfig};
use crate::forward::headers::{prepare_outbound, strip_hop_by_hop};
use crate::forward::target::BackendTarget;
use crate::forward::{ForwardError, Forwarder};

#[derive(Debug, Clone)]
pub struct ManualForwarder {
    client: reqwest::Client,
    target: Arc<BackendTarget>,
    response_header_timeout: Duration,
}

impl ManualForwarder {
    pub fn new(target: Arc<BackendTarget>, timeouts: &TimeoutConfig) -> Result<Self, ForwardError> {
        // reqwest's connect timeout covers the TLS handshake too.
        let connect = Duration::from_secs(timeouts.connect_secs + timeouts.tls_handshake_secs);

        let client = reqwest::Client::builder()
            .connect_timeout(connect)
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .pool_max_idle_per_host(timeouts.max_idle_connections)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| ForwardError::Client(Box::new(e)))?;

        Ok(Self {
            client,
            target,
            response_header_timeout: Duration::from_secs(timeouts.response_header_secs),
        })
    }

    fn outbound_url(&self, inbound: &axum::http::Uri) -> Result<Url, ForwardError> {
        let outbound = self.target.outbound_url(inbound);
        let url = Url::parse(&outbound)
            .map_err(|e| ForwardError::InvalidRequest(format!("{outbound}: {e}")))?;

        let path = self.target.outbound_path(inbound);
        let query = self.target.outbound_query(inbound);
        if !same_when_decoded(&path, url.path())
            || !same_when_decoded(&query, url.query().unwrap_or(""))
        {
            return Err(ForwardError::InvalidRequest(format!(
                "{outbound}: URL parser would rewrite the request path to {}",
                url.path()
            )));
        }
        Ok(url)
    }
}

/// True when `raw` and `parsed` name the same bytes once percent-decoded.
fn same_when_decoded(raw: &str, parsed: &str) -> bool {
    percent_decode_str(raw).eq(percent_decode_str(parsed))
}

fn map_reqwest_error(e: reqwest::Error) -> ForwardError {
    if e.is_connect() {
        ForwardError::Connect(Box::new(e))
    } else {
        ForwardError::Transport(Box::new(e))
    }
}

#[async_trait]
impl Forwarder for ManualForwarder {
    fn strategy(&self) -> ForwardStrategy {
        ForwardStrategy::Manual
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();
        let url = self.outbound_url(&parts.uri)?;
        prepare_outbound(&mut parts.headers, self.target.host_header());

        let mut outbound = self.client.request(parts.method, url).headers(parts.headers);
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = tokio::time::timeout(self.response_header_timeout, outbound.send())
            .await
            .map_err(|_| ForwardError::ResponseTimeout(self.response_header_timeout))?
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let mut relayed = Response::new(Body::from_stream(response.bytes_stream()));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = headers;
        Ok(relayed)
    }
}
