//! driver-core
//!
//! Core primitives for the entity driver:
//! - Plugin definitions and target descriptors
//! - Matcher profiles with their specificity criteria
//! - Deterministic weight/specificity ranking
//! - The plugin matcher (filter, rank, memoize)
//! - Human-friendly name resolution
//!
//! The core crate performs no I/O and knows nothing about the host CMS. Hosts
//! supply definitions through `matcher::DefinitionSource` and candidate names
//! through `names::NameCandidates`.

pub mod config;
pub mod criteria;
pub mod definition;
pub mod errors;
pub mod matcher;
pub mod names;
pub mod ranking;
pub mod target;
pub mod version;

pub use crate::errors::{DriverError, DriverResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::config::{validate_config, DriverConfig};
    pub use crate::criteria::{MatcherProfile, SpecificityCriteria};
    pub use crate::definition::Definition;
    pub use crate::matcher::{DefinitionSource, PluginMatcher};
    pub use crate::names::{NameCandidates, NameMatcher, SetMatch};
    pub use crate::target::{MatchTarget, TargetDescriptor};
    pub use crate::version::HostVersion;
    pub use crate::{DriverError, DriverResult};
}
