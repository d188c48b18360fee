//! Filtering reverse proxy for Elasticsearch.
//!
//! Requests are classified against an allowlist; allowed requests are relayed
//! to a single backend, everything else is answered locally.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod policy;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use policy::{Classification, PolicyEvaluator};
