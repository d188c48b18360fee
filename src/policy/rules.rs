//! Allowlist rule tables.
//!
//! # Responsibilities
//! - Hold the method, exact-path and prefix tables
//! - Answer membership questions in O(1) (sets) or O(k) (prefix scan)
//!
//! # Design Decisions
//! - Built once from `PolicyConfig`, never mutated afterwards
//! - Path matching is case-sensitive and byte-exact on the wire path
//! - Prefix list keeps configuration order so hot prefixes are tried first

use std::collections::HashSet;

use axum::http::Method;

use crate::config::PolicyConfig;

/// Immutable allowlist consulted by the policy evaluator.
#[derive(Debug, Clone, Default)]
pub struct AllowRules {
    methods: HashSet<Method>,
    get_prefixes: Vec<String>,
    post_paths: HashSet<String>,
    put_paths: HashSet<String>,
}

impl AllowRules {
    /// An allowlist that permits nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile rule tables from configuration.
    ///
    /// Method names that are not valid HTTP tokens are skipped; validation
    /// reports them before the rules are ever built.
    pub fn from_config(config: &PolicyConfig) -> Self {
        let rules = config
            .allowed_methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.as_bytes()).ok())
            .fold(Self::empty(), Self::allow_method);
        let rules = config
            .get_path_prefixes
            .iter()
            .fold(rules, |rules, prefix| rules.allow_get_prefix(prefix.as_str()));
        let rules = config
            .post_paths
            .iter()
            .fold(rules, |rules, path| rules.allow_post(path.as_str()));
        config
            .put_paths
            .iter()
            .fold(rules, |rules, path| rules.allow_put(path.as_str()))
    }

    /// Allow `method` for every path.
    pub fn allow_method(mut self, method: Method) -> Self {
        self.methods.insert(method);
        self
    }

    /// Allow GET requests whose path starts with `prefix`.
    pub fn allow_get_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.get_prefixes.push(prefix.into());
        self
    }

    /// Allow POST requests to exactly `path`.
    pub fn allow_post(mut self, path: impl Into<String>) -> Self {
        self.post_paths.insert(path.into());
        self
    }

    /// Allow PUT requests to exactly `path`.
    pub fn allow_put(mut self, path: impl Into<String>) -> Self {
        self.put_paths.insert(path.into());
        self
    }

    pub fn method_allowed(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn get_prefix_matches(&self, path: &str) -> bool {
        self.get_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn post_path_allowed(&self, path: &str) -> bool {
        self.post_paths.contains(path)
    }

    pub fn put_path_allowed(&self, path: &str) -> bool {
        self.put_paths.contains(path)
    }

    /// Number of entries across all tables, for startup logging.
    pub fn len(&self) -> usize {
        self.methods.len() + self.get_prefixes.len() + self.post_paths.len() + self.put_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
