//! Request inspection helpers.
//!
//! # Responsibilities
//! - Extract the peer address recorded by the connection layer
//! - Read the caller-supplied `X-Forwarded-For` value for logging
//!
//! # Design Decisions
//! - Read-only: nothing here modifies the request that is forwarded
//! - Missing or empty headers are reported as absent, never as ""

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderName, Request};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Peer address, when the server was started with connect info.
pub fn remote_addr<B>(request: &Request<B>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// First `X-Forwarded-For` value, if present and non-empty.
pub fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_FOR)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|v| !v.is_empty())
}
