//! Plugin definition types.
//!
//! A `Definition` is the static metadata of one registered handler plugin:
//! - identity (`id`) and priority (`weight`)
//! - the host version it applies to (`version`, `None` = every version)
//! - whether applying it ends a processing chain (`is_final`)
//! - an open set of filter attributes deciding which targets it applies to
//!
//! Definitions are data-only and immutable once built. They never execute
//! code; instantiation is the registry's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{DriverError, DriverResult};

/// Metadata record of one registered plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Unique id within a plugin type.
    pub id: String,

    /// Explicit priority; always outranks specificity.
    #[serde(default)]
    pub weight: i32,

    /// Host major version this definition applies to.
    #[serde(default)]
    pub version: Option<u32>,

    /// Whether a chain stops after this plugin is applied.
    #[serde(default, rename = "final")]
    pub is_final: bool,

    /// Declaring unit, used by registries to drop definitions of inactive
    /// providers.
    #[serde(default)]
    pub provider: Option<String>,

    /// Filter name -> accepted values. Absent or empty means wildcard.
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<String>>,
}

impl Definition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight: 0,
            version: None,
            is_final: false,
            provider: None,
            filters: BTreeMap::new(),
        }
    }

    pub fn weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn final_(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Declare accepted values for a filter. Values accumulate across calls.
    pub fn filter<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Values declared for a filter, or `None` when the filter is a wildcard.
    pub fn filter_values(&self, name: &str) -> Option<&[String]> {
        self.filters
            .get(name)
            .filter(|v| !v.is_empty())
            .map(Vec::as_slice)
    }

    /// Whether the definition declares a non-empty value for `name`.
    pub fn declares(&self, name: &str) -> bool {
        self.filter_values(name).is_some()
    }

    /// Whether this definition accepts `value` for filter `name`.
    ///
    /// Wildcards accept everything; otherwise comparison is case-insensitive.
    pub fn accepts(&self, name: &str, value: &str) -> bool {
        match self.filter_values(name) {
            None => true,
            Some(values) => {
                let needle = value.to_lowercase();
                values.iter().any(|v| v.to_lowercase() == needle)
            }
        }
    }

    /// Validate basic quality constraints.
    pub fn validate(&self) -> DriverResult<()> {
        if self.id.trim().is_empty() {
            return Err(DriverError::configuration("plugin id is empty"));
        }
        if self.filters.keys().any(|k| k.trim().is_empty()) {
            return Err(DriverError::configuration(format!(
                "plugin '{}' declares an unnamed filter",
                self.id
            )));
        }
        Ok(())
    }
}
