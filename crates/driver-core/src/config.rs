//! Configuration for the entity driver.
//!
//! This module defines an explicit, serializable configuration object used by
//! the plugin crate to build matchers and registries.
//!
//! Conventions:
//! - All structs derive Serialize/Deserialize for easy config handling.
//! - Defaults match the host's own storage conventions.
//! - The core crate does not read environment variables or files. All
//!   configuration must be provided explicitly by the caller.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{DriverError, DriverResult};
use crate::version::HostVersion;

/// Driver configuration root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Host major version being driven.
    #[serde(default = "DriverConfig::default_version")]
    pub version: u32,

    /// Directory holding project-specific plugin definition manifests.
    #[serde(default)]
    pub project_plugin_root: Option<PathBuf>,

    /// Machine-name prefix stripped when identifying fields.
    #[serde(default = "DriverConfig::default_field_prefix")]
    pub field_prefix: String,

    /// Providers whose definitions are always retained.
    #[serde(default = "DriverConfig::default_always_active_providers")]
    pub always_active_providers: Vec<String>,

    /// Additional providers that are active on the host.
    #[serde(default)]
    pub active_providers: Vec<String>,

    /// Legacy input key accepted in place of the bundle field.
    #[serde(default = "DriverConfig::default_bundle_alias")]
    pub bundle_alias: String,

    /// Language key wrapping field values on the legacy host version.
    #[serde(default = "DriverConfig::default_language")]
    pub language: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            version: Self::default_version(),
            project_plugin_root: None,
            field_prefix: Self::default_field_prefix(),
            always_active_providers: Self::default_always_active_providers(),
            active_providers: Vec::new(),
            bundle_alias: Self::default_bundle_alias(),
            language: Self::default_language(),
        }
    }
}

impl DriverConfig {
    /// Default configuration for a given host version.
    pub fn for_version(version: HostVersion) -> Self {
        Self {
            version: version.major(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(s: &str) -> DriverResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        validate_config(&cfg)?;
        Ok(cfg)
    }

    /// The validated host version.
    pub fn host_version(&self) -> DriverResult<HostVersion> {
        HostVersion::new(self.version)
    }

    /// Whether definitions declared by `provider` should be kept.
    pub fn is_provider_active(&self, provider: &str) -> bool {
        self.always_active_providers.iter().any(|p| p == provider)
            || self.active_providers.iter().any(|p| p == provider)
    }

    fn default_version() -> u32 {
        8
    }
    fn default_field_prefix() -> String {
        "field_".to_string()
    }
    fn default_always_active_providers() -> Vec<String> {
        vec![
            "driver".to_string(),
            "core".to_string(),
            "component".to_string(),
        ]
    }
    fn default_bundle_alias() -> String {
        "step_bundle".to_string()
    }
    fn default_language() -> String {
        "und".to_string()
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &DriverConfig) -> DriverResult<()> {
    cfg.host_version()?;

    if cfg.field_prefix.is_empty() {
        return Err(DriverError::configuration(
            "field_prefix must not be empty",
        ));
    }

    if cfg.bundle_alias.trim().is_empty() {
        return Err(DriverError::configuration(
            "bundle_alias must not be empty",
        ));
    }

    if cfg.language.trim().is_empty() {
        return Err(DriverError::configuration("language must not be empty"));
    }

    Ok(())
}
