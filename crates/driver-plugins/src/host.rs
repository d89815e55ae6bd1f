//! Host collaborator seams.
//!
//! The driver never talks to the host CMS directly. Everything it needs from
//! the host goes through two traits:
//! - `SchemaIntrospection`: entity types, bundles and fields, with labels
//! - `EntityStorage`: save / load / delete and key lookups
//!
//! Hosts implement these over their own APIs. `crate::memory::InMemoryHost`
//! is a reference implementation for tests.
//!
//! Non-responsibilities:
//! - persistence correctness and transactions (host concern)
//! - host bootstrap

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use driver_core::errors::DriverResult;
use driver_core::names::NameCandidates;

/// Names of the storage keys an entity type uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityKeys {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub bundle: Option<String>,
}

/// A bundle of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    pub machine_name: String,
    pub label: String,
}

/// Schema description of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeInfo {
    pub machine_name: String,
    pub label: String,
    #[serde(default)]
    pub keys: EntityKeys,
    #[serde(default)]
    pub bundles: Vec<BundleInfo>,
    /// Config entities expose config-schema properties instead of fields.
    #[serde(default)]
    pub is_config: bool,
}

impl EntityTypeInfo {
    pub fn new(machine_name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            label: label.into(),
            keys: EntityKeys::default(),
            bundles: Vec::new(),
            is_config: false,
        }
    }

    pub fn id_key(mut self, key: impl Into<String>) -> Self {
        self.keys.id = Some(key.into());
        self
    }

    pub fn label_key(mut self, key: impl Into<String>) -> Self {
        self.keys.label = Some(key.into());
        self
    }

    pub fn bundle_key(mut self, key: impl Into<String>) -> Self {
        self.keys.bundle = Some(key.into());
        self
    }

    pub fn bundle(mut self, machine_name: impl Into<String>, label: impl Into<String>) -> Self {
        self.bundles.push(BundleInfo {
            machine_name: machine_name.into(),
            label: label.into(),
        });
        self
    }

    pub fn config(mut self) -> Self {
        self.is_config = true;
        self
    }

    /// Bundles as a label -> machine name candidate set.
    pub fn bundle_candidates(&self) -> NameCandidates {
        self.bundles
            .iter()
            .map(|b| (b.label.clone(), b.machine_name.clone()))
            .collect()
    }
}

/// Type-specific settings a handler may need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSettings {
    /// Entity type referenced by reference fields.
    #[serde(default)]
    pub target_type: Option<String>,
    /// Bundles reference targets must belong to. Empty = unrestricted.
    #[serde(default)]
    pub target_bundles: Vec<String>,
    /// Vocabulary of legacy term reference fields.
    #[serde(default)]
    pub vocabulary: Option<String>,
    /// Storage columns of the field.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub translatable: bool,
}

/// Schema description of one field or config property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub machine_name: String,
    /// Human-readable label; empty falls back to the machine name.
    #[serde(default)]
    pub label: String,
    pub field_type: String,
    #[serde(default)]
    pub settings: FieldSettings,
}

impl FieldInfo {
    pub fn new(machine_name: impl Into<String>, label: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            machine_name: machine_name.into(),
            label: label.into(),
            field_type: field_type.into(),
            settings: FieldSettings::default(),
        }
    }

    pub fn target(mut self, target_type: impl Into<String>, bundles: &[&str]) -> Self {
        self.settings.target_type = Some(target_type.into());
        self.settings.target_bundles = bundles.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn vocabulary(mut self, vocabulary: impl Into<String>) -> Self {
        self.settings.vocabulary = Some(vocabulary.into());
        self
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.settings.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Label used for name matching.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.machine_name
        } else {
            &self.label
        }
    }
}

/// A host entity as the driver sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_type: String,
    #[serde(default)]
    pub bundle: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl EntityRecord {
    pub fn new(entity_type: impl Into<String>, bundle: Option<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle,
            id: None,
            fields: BTreeMap::new(),
        }
    }
}

/// A single-key lookup against host storage.
#[derive(Debug, Clone, Copy)]
pub struct KeyQuery<'a> {
    pub entity_type: &'a str,
    pub key: &'a str,
    pub value: &'a str,
    /// Restrict matches to these bundles, when non-empty.
    pub bundles: &'a [String],
}

/// Host schema introspection.
pub trait SchemaIntrospection {
    /// All entity types, in host order.
    fn entity_types(&self) -> Vec<EntityTypeInfo>;

    fn entity_type(&self, entity_type: &str) -> Option<EntityTypeInfo> {
        self.entity_types()
            .into_iter()
            .find(|t| t.machine_name == entity_type)
    }

    /// Fields (or config properties) of a bundle, in host order.
    fn fields(&self, entity_type: &str, bundle: &str) -> Vec<FieldInfo>;
}

/// Host entity storage.
pub trait EntityStorage {
    /// Persist a record and return its id.
    fn save(&self, record: &EntityRecord) -> DriverResult<String>;

    fn load(&self, entity_type: &str, id: &str) -> DriverResult<Option<EntityRecord>>;

    fn delete(&self, entity_type: &str, id: &str) -> DriverResult<()>;

    /// Id of the first entity whose `key` equals `value`.
    fn query_by_key(&self, query: &KeyQuery<'_>) -> DriverResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_label_falls_back_to_machine_name() {
        assert_eq!(FieldInfo::new("nid", "", "integer").display_label(), "nid");
        assert_eq!(FieldInfo::new("title", "Title", "string").display_label(), "Title");
    }

    #[test]
    fn bundle_candidates_keep_order() {
        let info = EntityTypeInfo::new("node", "Content")
            .bundle_key("type")
            .bundle("article", "Article")
            .bundle("page", "Basic page");
        let candidates = info.bundle_candidates();
        let labels: Vec<&str> = candidates.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Article", "Basic page"]);
    }
}
