//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, panic containment, dispatch)
//!     → request.rs (peer address, X-Forwarded-For for the outcome record)
//!     → [policy decides: answer locally or forward]
//!     → response.rs (blocked/error responses, body tracking)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use response::WEBSOCKETS_NOT_SUPPORTED;
pub use server::{AppState, HttpServer};
