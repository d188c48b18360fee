//! Request policy subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, raw path, headers)
//!     → evaluator.rs (websocket check, then allow rules)
//!     → rules.rs (method set, GET prefixes, POST/PUT exact paths)
//!     → Return: Allowed or a Blocked classification
//!
//! Rule Compilation (at startup):
//!     PolicyConfig
//!     → AllowRules (hash sets + ordered prefix list)
//!     → Freeze behind Arc, shared by every request
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex, no normalization: literal prefix/exact comparison
//! - Deterministic: same input always yields the same classification
//! - Default deny

pub mod evaluator;
pub mod rules;

pub use evaluator::{Classification, PolicyEvaluator};
pub use rules::AllowRules;
