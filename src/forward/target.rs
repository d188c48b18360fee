//! Backend target abstraction.
//!
//! # Responsibilities
//! - Parse and check the backend base URL once at startup
//! - Build the outbound URL for an inbound request URI
//! - Provide the `Host` value sent to the backend
//!
//! # Design Decisions
//! - Backend scheme and authority always win over the inbound request
//! - Paths are joined with exactly one slash at the seam, never normalized
//! - Backend query and inbound query are concatenated with `&`

use axum::http::{HeaderValue, Uri};
use thiserror::Error;
use url::Url;

/// Error type for backend URL parsing.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid URL `{url}`: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme `{0}` (expected http or https)")]
    Scheme(String),

    #[error("URL `{0}` has no usable host")]
    Host(String),

    #[error("URL `{0}` must not carry a fragment")]
    Fragment(String),
}

/// The single backend cluster allowed requests are relayed to.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    url: Url,
    authority: String,
    host_header: HeaderValue,
}

impl BackendTarget {
    /// Parse an absolute `http`/`https` base URL.
    pub fn parse(raw: &str) -> Result<Self, TargetError> {
        let url = Url::parse(raw).map_err(|source| TargetError::Parse {
            url: raw.to_string(),
            source,
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(TargetError::Scheme(other.to_string())),
        }

        if url.fragment().is_some() {
            return Err(TargetError::Fragment(raw.to_string()));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TargetError::Host(raw.to_string()))?;

        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let host_header =
            HeaderValue::from_str(&authority).map_err(|_| TargetError::Host(raw.to_string()))?;

        Ok(Self {
            url,
            authority,
            host_header,
        })
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// `host[:port]` of the backend, as written in the base URL.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Value the outbound `Host` header is overwritten with.
    pub fn host_header(&self) -> &HeaderValue {
        &self.host_header
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Path the backend receives for `inbound`.
    pub fn outbound_path(&self, inbound: &Uri) -> String {
        join_path(self.url.path(), inbound.path())
    }

    /// Query the backend receives for `inbound`; empty when there is none.
    pub fn outbound_query(&self, inbound: &Uri) -> String {
        join_query(self.url.query().unwrap_or(""), inbound.query().unwrap_or(""))
    }

    /// Absolute URL for relaying `inbound` to this backend.
    pub fn outbound_url(&self, inbound: &Uri) -> String {
        let path = self.outbound_path(inbound);
        let query = self.outbound_query(inbound);

        let mut out = format!("{}://{}{}", self.url.scheme(), self.authority, path);
        if !query.is_empty() {
            out.push('?');
            out.push_str(&query);
        }
        out
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn join_query(base: &str, query: &str) -> String {
    if base.is_empty() || query.is_empty() {
        format!("{base}{query}")
    } else {
        format!("{base}&{query}")
    }
}
