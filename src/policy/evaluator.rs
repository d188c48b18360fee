//! Per-request allow/block decision.
//!
//! # Responsibilities
//! - Classify a request from its method, raw path and headers
//! - Map blocked classifications onto their HTTP status
//!
//! # Design Decisions
//! - Pure and total: every input yields a classification, nothing is logged
//! - Websocket upgrades are refused before any allow rule is consulted
//! - First match wins; unmatched requests are denied

use std::sync::Arc;

use axum::http::{header, HeaderMap, Method, StatusCode};

use crate::policy::rules::AllowRules;

/// Outcome of evaluating one request against the allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Forward to the backend.
    Allowed,
    /// No rule matched; answer 405.
    BlockedMethodNotAllowed,
    /// Websocket upgrade requested; answer 501.
    BlockedUpgradeNotImplemented,
}

impl Classification {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Classification::Allowed)
    }

    /// Status written to the caller for a blocked request.
    pub fn blocked_status(&self) -> Option<StatusCode> {
        match self {
            Classification::Allowed => None,
            Classification::BlockedMethodNotAllowed => Some(StatusCode::METHOD_NOT_ALLOWED),
            Classification::BlockedUpgradeNotImplemented => Some(StatusCode::NOT_IMPLEMENTED),
        }
    }

    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Allowed => "allowed",
            Classification::BlockedMethodNotAllowed => "method_not_allowed",
            Classification::BlockedUpgradeNotImplemented => "upgrade_not_implemented",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evaluates requests against a shared, immutable rule set.
#[derive(Debug, Clone)]
pub struct PolicyEvaluator {
    rules: Arc<AllowRules>,
}

impl PolicyEvaluator {
    pub fn new(rules: Arc<AllowRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &AllowRules {
        &self.rules
    }

    /// Classify a request.
    ///
    /// `path` is the raw request path as received, without the query string.
    pub fn classify(&self, method: &Method, path: &str, headers: &HeaderMap) -> Classification {
        if is_websocket_upgrade(headers) {
            return Classification::BlockedUpgradeNotImplemented;
        }

        let allowed = (*method == Method::GET && self.rules.get_prefix_matches(path))
            || (*method == Method::POST && self.rules.post_path_allowed(path))
            || (*method == Method::PUT && self.rules.put_path_allowed(path))
            || self.rules.method_allowed(method);

        if allowed {
            Classification::Allowed
        } else {
            Classification::BlockedMethodNotAllowed
        }
    }
}

/// Exact, case-sensitive match on the first `Upgrade` header.
fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .map(|v| v.as_bytes() == b"websocket")
        .unwrap_or(false)
}
