//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → outcome.rs (drop guard, one structured record per request)
//!         → tracing event (INFO proxied, WARN blocked, ERROR failed)
//!         → metrics.rs (counter + latency histogram)
//!
//! Consumers:
//!     → logging.rs subscriber (text or JSON on stdout)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, never preformatted strings
//! - Request ID generated per record for correlation; not sent upstream
//! - Metrics are cheap and disabled unless an exporter is installed

pub mod logging;
pub mod metrics;
pub mod outcome;

pub use outcome::{BodyState, Outcome, OutcomeGuard, OutcomeRecord};
