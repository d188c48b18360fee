//! Response construction and body tracking.
//!
//! # Responsibilities
//! - Build the terminal responses for blocked requests
//! - Map forwarding failures and panics to bare 5xx responses
//! - Wrap relayed bodies so the outcome record sees the end of the stream
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Error responses never carry an informative body
//! - A failure after headers were sent surfaces as an aborted connection

use std::any::Any;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream::{BoxStream, Stream, StreamExt};

use crate::observability::OutcomeGuard;
use crate::policy::Classification;

/// Body sent with `501 Not Implemented` for websocket upgrades.
pub const WEBSOCKETS_NOT_SUPPORTED: &str = "Websockets not supported\n";

/// Terminal response for a blocked classification.
pub fn blocked_response(classification: Classification) -> Response {
    match classification {
        Classification::BlockedUpgradeNotImplemented => (
            StatusCode::NOT_IMPLEMENTED,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            WEBSOCKETS_NOT_SUPPORTED,
        )
            .into_response(),
        Classification::BlockedMethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Classification::Allowed => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// Response for a request that could not be relayed.
pub fn forward_error_response() -> Response {
    StatusCode::BAD_GATEWAY.into_response()
}

/// Response for a handler that panicked.
pub fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

/// Attach `outcome` to a relayed response so it is emitted once the body has
/// been delivered, has failed, or was abandoned by the caller.
pub fn track_body(response: Response, method: &Method, mut outcome: OutcomeGuard) -> Response {
    if is_bodiless(method, response.status()) {
        outcome.body_complete();
        return response;
    }

    let (parts, body) = response.into_parts();
    let stream = TrackedStream {
        inner: body.into_data_stream().boxed(),
        outcome: Some(outcome),
    };
    Response::from_parts(parts, Body::from_stream(stream))
}

fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

/// Response body stream that carries the request's outcome guard.
struct TrackedStream {
    inner: BoxStream<'static, Result<Bytes, axum::Error>>,
    outcome: Option<OutcomeGuard>,
}

impl Stream for TrackedStream {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let polled = this.inner.poll_next_unpin(cx);
        match &polled {
            Poll::Ready(Some(Err(e))) => {
                if let Some(outcome) = this.outcome.as_mut() {
                    outcome.body_failed(e);
                }
            }
            Poll::Ready(None) => {
                if let Some(mut outcome) = this.outcome.take() {
                    outcome.body_complete();
                }
            }
            _ => {}
        }
        polled
    }
}
