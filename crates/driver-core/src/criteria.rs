//! Matcher profiles and specificity criteria.
//!
//! A profile fixes, per plugin type:
//! - the filters a target descriptor must carry and definitions are checked
//!   against
//! - an ordered specificity table; earlier criteria sets are a more precise
//!   match between a definition and its target
//!
//! Profiles are set at construction and never change.

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::errors::{DriverError, DriverResult};

pub const FIELD_NAMES: &str = "fieldNames";
pub const FIELD_TYPES: &str = "fieldTypes";
pub const ENTITY_TYPES: &str = "entityTypes";
pub const ENTITY_BUNDLES: &str = "entityBundles";

/// Plugin type name of field handlers.
pub const FIELD_PLUGIN_TYPE: &str = "DriverField";

/// Plugin type name of entity handlers.
pub const ENTITY_PLUGIN_TYPE: &str = "DriverEntity";

/// Ordered sets of filter names, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificityCriteria(Vec<Vec<String>>);

impl SpecificityCriteria {
    pub fn new<I, C, S>(sets: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            sets.into_iter()
                .map(|set| set.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn sets(&self) -> &[Vec<String>] {
        &self.0
    }

    /// Number of criteria sets; also the group index of catch-all definitions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The filters and specificity table of one plugin type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherProfile {
    pub plugin_type: String,
    pub filters: Vec<String>,
    pub criteria: SpecificityCriteria,
}

impl MatcherProfile {
    pub fn new<I, S>(plugin_type: impl Into<String>, filters: I, criteria: SpecificityCriteria) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plugin_type: plugin_type.into(),
            filters: filters.into_iter().map(Into::into).collect(),
            criteria,
        }
    }

    /// Profile for field handler plugins.
    pub fn field() -> Self {
        Self::new(
            FIELD_PLUGIN_TYPE,
            [FIELD_NAMES, FIELD_TYPES, ENTITY_BUNDLES, ENTITY_TYPES],
            SpecificityCriteria::new(vec![
                vec![FIELD_NAMES, ENTITY_BUNDLES, ENTITY_TYPES],
                vec![FIELD_NAMES, ENTITY_BUNDLES],
                vec![FIELD_NAMES, ENTITY_TYPES],
                vec![FIELD_NAMES, FIELD_TYPES],
                vec![FIELD_NAMES],
                vec![FIELD_TYPES, ENTITY_BUNDLES],
                vec![FIELD_TYPES, ENTITY_TYPES],
                vec![FIELD_TYPES],
                vec![ENTITY_BUNDLES, ENTITY_TYPES],
                vec![ENTITY_BUNDLES],
                vec![ENTITY_TYPES],
            ]),
        )
    }

    /// Profile for entity handler plugins.
    pub fn entity() -> Self {
        Self::new(
            ENTITY_PLUGIN_TYPE,
            [ENTITY_BUNDLES, ENTITY_TYPES],
            SpecificityCriteria::new(vec![
                vec![ENTITY_BUNDLES, ENTITY_TYPES],
                vec![ENTITY_BUNDLES],
                vec![ENTITY_TYPES],
            ]),
        )
    }

    /// Reject malformed filter or criteria tables.
    pub fn validate(&self) -> DriverResult<()> {
        if self.filters.is_empty() {
            return Err(DriverError::configuration(format!(
                "profile '{}' declares no filters",
                self.plugin_type
            )));
        }

        let declared: BTreeSet<&str> = self.filters.iter().map(String::as_str).collect();
        if declared.len() != self.filters.len() {
            let dupes = self.filters.iter().duplicates().join(", ");
            return Err(DriverError::configuration(format!(
                "profile '{}' declares duplicate filters: {dupes}",
                self.plugin_type
            )));
        }

        for (index, set) in self.criteria.sets().iter().enumerate() {
            if set.is_empty() {
                return Err(DriverError::configuration(format!(
                    "profile '{}' has an empty criteria set at position {index}",
                    self.plugin_type
                )));
            }
            let unknown: Vec<&String> = set
                .iter()
                .filter(|name| !declared.contains(name.as_str()))
                .collect();
            if !unknown.is_empty() {
                return Err(DriverError::configuration(format!(
                    "profile '{}' criteria set {index} names undeclared filters: {}",
                    self.plugin_type,
                    unknown.iter().join(", ")
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_valid() {
        MatcherProfile::field().validate().unwrap();
        MatcherProfile::entity().validate().unwrap();
        assert_eq!(MatcherProfile::field().criteria.len(), 11);
        assert_eq!(MatcherProfile::entity().criteria.len(), 3);
    }

    #[test]
    fn undeclared_criterion_rejected() {
        let p = MatcherProfile::new(
            "Custom",
            [ENTITY_TYPES],
            SpecificityCriteria::new(vec![vec![ENTITY_BUNDLES]]),
        );
        let e = p.validate().unwrap_err();
        assert!(e.to_string().contains("undeclared filters: entityBundles"));
    }

    #[test]
    fn duplicate_filter_rejected() {
        let p = MatcherProfile::new(
            "Custom",
            [ENTITY_TYPES, ENTITY_TYPES],
            SpecificityCriteria::new(Vec::<Vec<&str>>::new()),
        );
        assert!(p.validate().is_err());
    }

    #[test]
    fn empty_criteria_set_rejected() {
        let p = MatcherProfile::new(
            "Custom",
            [ENTITY_TYPES],
            SpecificityCriteria::new(vec![Vec::<&str>::new()]),
        );
        assert!(p.validate().is_err());
    }
}
