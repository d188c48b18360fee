//! Header handling for relayed messages.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Overwrite `Host` with the backend authority
//!
//! # Design Decisions
//! - End-to-end headers pass through untouched, `X-Forwarded-For` included
//! - Headers named by `Connection` are hop-by-hop as well

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Connection-scoped headers that are never relayed.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Prepare inbound headers for the backend.
pub fn prepare_outbound(headers: &mut HeaderMap, host: &HeaderValue) {
    strip_hop_by_hop(headers);
    headers.insert(header::HOST, host.clone());
}
