//! Serialized plugin definition records.
//!
//! Project plugins are declared in JSON manifests. A record looks like:
//!
//! ```json
//! {
//!   "id": "project_body",
//!   "type": "DriverField",
//!   "handler": "generic",
//!   "version": 8,
//!   "weight": 10,
//!   "final": true,
//!   "fieldNames": ["body"],
//!   "entityTypes": "node"
//! }
//! ```
//!
//! Every key that is not a record attribute is a filter. Filter values may be
//! a single string or a list. Filter names must belong to the plugin type's
//! profile; a typo would otherwise silently turn into a wildcard.
//!
//! Records are data-only. Binding them to handler code is the job of
//! `crate::project`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use driver_core::criteria::{MatcherProfile, ENTITY_PLUGIN_TYPE, FIELD_PLUGIN_TYPE};
use driver_core::definition::Definition;

/// Problems with a single record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("plugin '{id}' has unknown plugin type '{plugin_type}'")]
    UnknownPluginType { id: String, plugin_type: String },

    #[error("plugin '{id}' declares filter '{filter}' which {plugin_type} plugins do not support")]
    UnknownFilter {
        id: String,
        plugin_type: String,
        filter: String,
    },

    #[error("plugin '{id}' does not name a handler")]
    MissingHandler { id: String },

    #[error("plugin '{id}' is invalid: {reason}")]
    Invalid { id: String, reason: String },
}

/// A filter value: one string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

impl FilterValue {
    pub fn into_values(self) -> Vec<String> {
        match self {
            FilterValue::One(v) => vec![v],
            FilterValue::Many(vs) => vs,
        }
    }
}

/// One plugin definition as declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    pub id: String,

    #[serde(rename = "type", default = "DefinitionRecord::default_plugin_type")]
    pub plugin_type: String,

    /// Name of the built-in handler implementing the plugin.
    #[serde(default)]
    pub handler: Option<String>,

    #[serde(default)]
    pub weight: i32,

    #[serde(default)]
    pub version: Option<u32>,

    #[serde(default, rename = "final")]
    pub is_final: bool,

    #[serde(default)]
    pub provider: Option<String>,

    #[serde(flatten)]
    pub filters: BTreeMap<String, FilterValue>,
}

impl DefinitionRecord {
    fn default_plugin_type() -> String {
        FIELD_PLUGIN_TYPE.to_string()
    }

    /// Profile of the record's plugin type.
    pub fn profile(&self) -> Result<MatcherProfile, RecordError> {
        match self.plugin_type.as_str() {
            FIELD_PLUGIN_TYPE => Ok(MatcherProfile::field()),
            ENTITY_PLUGIN_TYPE => Ok(MatcherProfile::entity()),
            other => Err(RecordError::UnknownPluginType {
                id: self.id.clone(),
                plugin_type: other.to_string(),
            }),
        }
    }

    pub fn handler_name(&self) -> Result<&str, RecordError> {
        self.handler
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| RecordError::MissingHandler { id: self.id.clone() })
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        let profile = self.profile()?;
        self.handler_name()?;
        if let Some(filter) = self
            .filters
            .keys()
            .find(|f| !profile.filters.iter().any(|known| known == *f))
        {
            return Err(RecordError::UnknownFilter {
                id: self.id.clone(),
                plugin_type: self.plugin_type.clone(),
                filter: filter.clone(),
            });
        }
        Ok(())
    }

    /// Validate and convert into a `Definition`.
    pub fn into_definition(self) -> Result<Definition, RecordError> {
        self.validate()?;

        let mut definition = Definition::new(self.id.clone()).weight(self.weight).final_(self.is_final);
        if let Some(version) = self.version {
            definition = definition.version(version);
        }
        if let Some(provider) = self.provider {
            definition = definition.provider(provider);
        }
        for (name, value) in self.filters {
            definition = definition.filter(name, value.into_values());
        }

        definition.validate().map_err(|e| RecordError::Invalid {
            id: self.id,
            reason: e.to_string(),
        })?;
        Ok(definition)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(DefinitionRecord),
    Many(Vec<DefinitionRecord>),
}

/// Parse a manifest holding one record or a list of records.
pub fn parse_records(json: &str) -> Result<Vec<DefinitionRecord>, serde_json::Error> {
    Ok(match serde_json::from_str::<OneOrMany>(json)? {
        OneOrMany::One(record) => vec![record],
        OneOrMany::Many(records) => records,
    })
}
