//! Error types for driver-core.
//!
//! Every failure the matching layer can surface maps to one `DriverError`
//! variant. Variants are distinguishable so callers can decide which outcomes
//! to turn into fallbacks (typically `NoMatch`) and which to surface as-is.
//!
//! Nothing in this crate retries: matching is deterministic, so a retry would
//! reproduce the same error.

use thiserror::Error;

/// Result alias used across the driver crates.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors produced while resolving names, matching plugins or driving
/// handlers.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A target descriptor lacks a required filter, or a profile/config is
    /// malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Nothing matched: no surviving plugin definition, or an identifier that
    /// names no candidate.
    #[error("not found: {0}")]
    NoMatch(String),

    /// A raw value is structurally invalid for the handler processing it.
    #[error("ambiguous input: {0}")]
    AmbiguousInput(String),

    /// A handler factory failed or the id is unknown to the registry.
    #[error("instantiation failed: {0}")]
    Instantiation(String),

    /// An operation is illegal in the current wrapper state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A host collaborator (storage, schema) reported a failure.
    #[error("host error: {0}")]
    Host(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl DriverError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn no_match(msg: impl Into<String>) -> Self {
        Self::NoMatch(msg.into())
    }

    pub fn ambiguous_input(msg: impl Into<String>) -> Self {
        Self::AmbiguousInput(msg.into())
    }

    pub fn instantiation(msg: impl Into<String>) -> Self {
        Self::Instantiation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Returns true for "not found" outcomes a caller may choose to recover
    /// from.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = DriverError::configuration("missing filter 'fieldTypes'");
        assert_eq!(
            e.to_string(),
            "configuration error: missing filter 'fieldTypes'"
        );
    }

    #[test]
    fn no_match_is_distinguishable() {
        assert!(DriverError::no_match("x").is_no_match());
        assert!(!DriverError::ambiguous_input("x").is_no_match());
    }
}
