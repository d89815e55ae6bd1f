//! Target descriptors.
//!
//! A target descriptor is the filterable view of a real object (an entity, a
//! field) that plugin definitions are matched against. Each matcher profile
//! declares which filter names a descriptor must carry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::DriverResult;

/// Filter name -> the target's single value for that filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetDescriptor(BTreeMap<String, String>);

impl TargetDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, filter: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(filter, value);
        self
    }

    pub fn insert(&mut self, filter: impl Into<String>, value: impl Into<String>) {
        self.0.insert(filter.into(), value.into());
    }

    pub fn get(&self, filter: &str) -> Option<&str> {
        self.0.get(filter).map(String::as_str)
    }

    pub fn contains(&self, filter: &str) -> bool {
        self.0.contains_key(filter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Canonical serialization, independent of insertion order.
    ///
    /// Used as the memoization key by matchers.
    pub fn canonical_key(&self) -> DriverResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

impl<K, V> FromIterator<(K, V)> for TargetDescriptor
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Anything that can be turned into a target descriptor.
pub trait MatchTarget {
    fn target_descriptor(&self) -> TargetDescriptor;
}

impl MatchTarget for TargetDescriptor {
    fn target_descriptor(&self) -> TargetDescriptor {
        self.clone()
    }
}
