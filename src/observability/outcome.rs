//! Per-request outcome records.
//!
//! # Responsibilities
//! - Capture the request identity and start time before classification
//! - Accumulate classification, status, failure cause and body state
//! - Emit exactly one record per request, on every exit path
//!
//! # Design Decisions
//! - The record lives in a drop guard; emission happens in `Drop`, so early
//!   returns, cancellation and panics are all covered
//! - Forwarded responses carry the guard inside their body stream, so the
//!   duration spans the whole relay and mid-stream failures are recorded
//! - A record that never received a status is flushed with a synthetic 500

use std::time::{Duration, Instant};

use axum::http::{Method, Request, StatusCode};
use uuid::Uuid;

use crate::http::request::{forwarded_for, remote_addr};
use crate::observability::metrics;
use crate::policy::Classification;

/// Progress of the response body towards the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// Not yet fully delivered.
    Pending,
    /// Delivered completely (or there was nothing to deliver).
    Complete,
    /// The backend stream failed after headers were sent.
    Failed,
}

/// How a request ended, which decides the log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Relayed from the backend in full. Logged at INFO.
    Proxied,
    /// Refused by policy. Logged at WARN.
    Blocked,
    /// The caller went away before the body was delivered. Logged at WARN.
    ClientGone,
    /// Forwarding, streaming or the handler itself failed. Logged at ERROR.
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Proxied => "proxied",
            Outcome::Blocked => "blocked",
            Outcome::ClientGone => "client_gone",
            Outcome::Failed => "failed",
        }
    }
}

/// Structured summary of one request.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub request_id: Uuid,
    pub remote_addr: Option<String>,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub forwarded_for: Option<String>,
    pub classification: Option<Classification>,
    pub status: Option<StatusCode>,
    pub error: Option<String>,
    pub body: BodyState,
    started: Instant,
}

impl OutcomeRecord {
    /// Start a record for `request`. The clock starts now.
    pub fn begin<B>(request: &Request<B>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            remote_addr: remote_addr(request).map(|a| a.to_string()),
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            forwarded_for: forwarded_for(request.headers()),
            classification: None,
            status: None,
            error: None,
            body: BodyState::Pending,
            started: Instant::now(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        if self.error.is_some() || self.body == BodyState::Failed {
            return Outcome::Failed;
        }
        match (self.classification, self.status) {
            (Some(c), Some(_)) if !c.is_allowed() => Outcome::Blocked,
            (Some(_), Some(_)) if self.body == BodyState::Pending => Outcome::ClientGone,
            (Some(_), Some(_)) => Outcome::Proxied,
            _ => Outcome::Failed,
        }
    }

    /// Status reported for the request; 500 when none was ever produced.
    pub fn final_status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn emit(&self) {
        let record = self;
        let outcome = self.outcome();
        let status = self.final_status().as_u16();
        let duration = self.elapsed();
        let classification = self.classification.map(|c| c.as_str()).unwrap_or("unclassified");

        metrics::record_request(&self.method, classification, status, duration);

        macro_rules! outcome_event {
            ($level:ident, $message:literal) => {
                tracing::$level!(
                    request_id = %record.request_id,
                    remote_addr = record.remote_addr.as_deref(),
                    method = %record.method,
                    path = %record.path,
                    query = record.query.as_deref(),
                    x_forwarded_for = record.forwarded_for.as_deref(),
                    classification,
                    outcome = outcome.as_str(),
                    status,
                    duration = ?duration,
                    error = record.error.as_deref(),
                    $message
                )
            };
        }

        match outcome {
            Outcome::Proxied => outcome_event!(info, "Request proxied"),
            Outcome::Blocked => outcome_event!(warn, "Request blocked"),
            Outcome::ClientGone => outcome_event!(warn, "Client disconnected before response completed"),
            Outcome::Failed => outcome_event!(error, "Request failed"),
        }
    }
}

/// Drop guard that emits its [`OutcomeRecord`] exactly once.
#[derive(Debug)]
pub struct OutcomeGuard {
    record: OutcomeRecord,
}

impl OutcomeGuard {
    pub fn begin<B>(request: &Request<B>) -> Self {
        Self {
            record: OutcomeRecord::begin(request),
        }
    }

    pub fn record(&self) -> &OutcomeRecord {
        &self.record
    }

    /// Note the policy decision. Blocked requests are complete at this point.
    pub fn classified(&mut self, classification: Classification) {
        self.record.classification = Some(classification);
        if let Some(status) = classification.blocked_status() {
            self.record.status = Some(status);
            self.record.body = BodyState::Complete;
        }
    }

    /// The backend answered with `status`; the body is still to come.
    pub fn forwarded(&mut self, status: StatusCode) {
        self.record.status = Some(status);
    }

    /// Forwarding failed before any response reached the caller.
    pub fn failed(&mut self, status: StatusCode, cause: &dyn std::fmt::Display) {
        self.record.status = Some(status);
        self.record.error = Some(cause.to_string());
        self.record.body = BodyState::Complete;
    }

    pub fn body_complete(&mut self) {
        if self.record.body == BodyState::Pending {
            self.record.body = BodyState::Complete;
        }
    }

    pub fn body_failed(&mut self, cause: &dyn std::fmt::Display) {
        self.record.body = BodyState::Failed;
        self.record.error = Some(cause.to_string());
    }
}

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        if std::thread::panicking() && self.record.error.is_none() {
            self.record.error = Some("request handler panicked".to_string());
        }
        self.record.emit();
    }
}
