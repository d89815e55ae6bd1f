//! Plugin matching for the entity driver.
//!
//! The matcher answers "which plugin definitions apply to this target, most
//! appropriate first":
//! - targets are reduced to a `TargetDescriptor` through `MatchTarget`
//! - definitions come from a `DefinitionSource` (the registry)
//! - definitions pinned to another host version are dropped
//! - definitions whose declared filter values do not include the target's
//!   value are dropped (case-insensitive; undeclared filters are wildcards)
//! - survivors are ranked by `crate::ranking`
//!
//! Results are memoized per matcher instance, keyed by the descriptor's
//! canonical serialization. The cache is never invalidated; definitions are
//! assumed immutable for the matcher's lifetime. Build a new matcher to pick
//! up new definitions.
//!
//! An empty result is not an error here; callers decide whether it is.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::criteria::MatcherProfile;
use crate::definition::Definition;
use crate::errors::{DriverError, DriverResult};
use crate::ranking::{ensure_ranked, rank_definitions};
use crate::target::{MatchTarget, TargetDescriptor};

/// Supplies the raw definitions a matcher filters and ranks.
pub trait DefinitionSource {
    fn definitions(&self) -> DriverResult<Vec<Definition>>;
}

impl DefinitionSource for Vec<Definition> {
    fn definitions(&self) -> DriverResult<Vec<Definition>> {
        Ok(self.clone())
    }
}

impl<S: DefinitionSource + ?Sized> DefinitionSource for Rc<S> {
    fn definitions(&self) -> DriverResult<Vec<Definition>> {
        (**self).definitions()
    }
}

/// Filters and ranks definitions of one plugin type for one host version.
pub struct PluginMatcher {
    profile: MatcherProfile,
    version: u32,
    source: Rc<dyn DefinitionSource>,
    matched: RefCell<HashMap<String, Rc<[Definition]>>>,
}

impl fmt::Debug for PluginMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginMatcher")
            .field("plugin_type", &self.profile.plugin_type)
            .field("version", &self.version)
            .field("cached_targets", &self.matched.borrow().len())
            .finish_non_exhaustive()
    }
}

impl PluginMatcher {
    /// Create a matcher. Fails if the profile's tables are malformed.
    pub fn new(
        profile: MatcherProfile,
        version: u32,
        source: Rc<dyn DefinitionSource>,
    ) -> DriverResult<Self> {
        profile.validate()?;
        Ok(Self {
            profile,
            version,
            source,
            matched: RefCell::new(HashMap::new()),
        })
    }

    pub fn profile(&self) -> &MatcherProfile {
        &self.profile
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Definitions applying to `target`, most appropriate first.
    pub fn matched_definitions(&self, target: &dyn MatchTarget) -> DriverResult<Rc<[Definition]>> {
        let descriptor = target.target_descriptor();
        self.require_filters(&descriptor)?;

        let key = descriptor.canonical_key()?;
        if let Some(hit) = self.matched.borrow().get(&key) {
            debug!(
                plugin_type = %self.profile.plugin_type,
                target = %key,
                "matched definitions served from cache"
            );
            return Ok(Rc::clone(hit));
        }

        let definitions = self.source.definitions()?;
        let total = definitions.len();
        let filtered = self.filter_by_target(&descriptor, definitions);
        let ranked: Rc<[Definition]> = rank_definitions(filtered, &self.profile.criteria).into();
        debug_assert!(ensure_ranked(&ranked, &self.profile.criteria).is_ok());

        debug!(
            plugin_type = %self.profile.plugin_type,
            target = %key,
            total,
            matched = ranked.len(),
            "matched definitions"
        );

        self.matched.borrow_mut().insert(key, Rc::clone(&ranked));
        Ok(ranked)
    }

    /// Whether a definition applies to a descriptor under this matcher.
    pub fn is_match(&self, descriptor: &TargetDescriptor, definition: &Definition) -> bool {
        if definition.version.is_some_and(|v| v != self.version) {
            return false;
        }
        self.profile.filters.iter().all(|filter| {
            descriptor
                .get(filter)
                .map_or(false, |value| definition.accepts(filter, value))
        })
    }

    fn require_filters(&self, descriptor: &TargetDescriptor) -> DriverResult<()> {
        match self.profile.filters.iter().find(|f| !descriptor.contains(f)) {
            Some(missing) => Err(DriverError::configuration(format!(
                "Plugin target is missing required filter property '{missing}'."
            ))),
            None => Ok(()),
        }
    }

    fn filter_by_target(&self, descriptor: &TargetDescriptor, definitions: Vec<Definition>) -> Vec<Definition> {
        definitions
            .into_iter()
            .filter(|d| self.is_match(descriptor, d))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use assert_matches::assert_matches;

    use crate::criteria::{ENTITY_BUNDLES, ENTITY_TYPES, FIELD_NAMES, FIELD_TYPES};

    struct CountingSource {
        definitions: Vec<Definition>,
        calls: Cell<usize>,
    }

    impl DefinitionSource for CountingSource {
        fn definitions(&self) -> DriverResult<Vec<Definition>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.definitions.clone())
        }
    }

    fn field_target(name: &str, typ: &str) -> TargetDescriptor {
        TargetDescriptor::new()
            .with(FIELD_NAMES, name)
            .with(FIELD_TYPES, typ)
            .with(ENTITY_TYPES, "node")
            .with(ENTITY_BUNDLES, "article")
    }

    fn ids(defs: &[Definition]) -> Vec<&str> {
        defs.iter().map(|d| d.id.as_str()).collect()
    }

    fn field_matcher(defs: Vec<Definition>, version: u32) -> PluginMatcher {
        PluginMatcher::new(MatcherProfile::field(), version, Rc::new(defs)).unwrap()
    }

    #[test]
    fn missing_filter_is_configuration_error() {
        let m = field_matcher(vec![Definition::new("generic")], 8);
        let target = TargetDescriptor::new().with(FIELD_NAMES, "body");
        let err = m.matched_definitions(&target).unwrap_err();
        assert_matches!(err, DriverError::Configuration(msg) if msg.contains("'fieldTypes'"));
    }

    #[test]
    fn empty_source_yields_empty_list() {
        let m = field_matcher(Vec::new(), 8);
        let out = m.matched_definitions(&field_target("body", "text")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn wildcard_and_case_insensitive_filters() {
        let m = field_matcher(
            vec![
                Definition::new("datetime").filter(FIELD_TYPES, ["Datetime"]),
                Definition::new("generic"),
                Definition::new("link").filter(FIELD_TYPES, ["link"]),
            ],
            8,
        );
        let out = m.matched_definitions(&field_target("field_date", "datetime")).unwrap();
        assert_eq!(ids(&out), vec!["datetime", "generic"]);
    }

    #[test]
    fn other_versions_are_excluded() {
        let m = field_matcher(
            vec![
                Definition::new("generic7").version(7),
                Definition::new("generic8").version(8),
                Definition::new("any"),
            ],
            8,
        );
        let out = m.matched_definitions(&field_target("body", "text")).unwrap();
        assert_eq!(ids(&out), vec!["any", "generic8"]);
    }

    #[test]
    fn weight_dominates_specificity() {
        let m = field_matcher(
            vec![
                Definition::new("specific")
                    .filter(FIELD_NAMES, ["body"])
                    .filter(ENTITY_BUNDLES, ["article"])
                    .filter(ENTITY_TYPES, ["node"]),
                Definition::new("heavy").weight(10),
            ],
            8,
        );
        let out = m.matched_definitions(&field_target("body", "text")).unwrap();
        assert_eq!(ids(&out), vec!["heavy", "specific"]);
    }

    #[test]
    fn name_and_bundle_outrank_name_only() {
        let m = field_matcher(
            vec![
                Definition::new("a_name").filter(FIELD_NAMES, ["body"]),
                Definition::new("b_name_bundle")
                    .filter(FIELD_NAMES, ["body"])
                    .filter(ENTITY_BUNDLES, ["article"]),
            ],
            8,
        );
        let out = m.matched_definitions(&field_target("body", "text")).unwrap();
        assert_eq!(ids(&out), vec!["b_name_bundle", "a_name"]);
    }

    #[test]
    fn results_are_cached_per_descriptor() {
        let source = Rc::new(CountingSource {
            definitions: vec![Definition::new("generic")],
            calls: Cell::new(0),
        });
        let m = PluginMatcher::new(MatcherProfile::field(), 8, source.clone()).unwrap();

        let first = m.matched_definitions(&field_target("body", "text")).unwrap();
        let second = m.matched_definitions(&field_target("body", "text")).unwrap();
        assert_eq!(source.calls.get(), 1);
        assert!(Rc::ptr_eq(&first, &second));

        m.matched_definitions(&field_target("title", "string")).unwrap();
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn malformed_profile_rejected_at_construction() {
        let profile = MatcherProfile::new(
            "Broken",
            Vec::<String>::new(),
            crate::criteria::SpecificityCriteria::new(Vec::<Vec<&str>>::new()),
        );
        let result = PluginMatcher::new(profile, 8, Rc::new(Vec::<Definition>::new()));
        assert_matches!(result, Err(DriverError::Configuration(_)));
    }

    #[test]
    fn debug_shows_plugin_type_and_cache_size() {
        let m = field_matcher(vec![Definition::new("generic")], 8);
        assert!(format!("{m:?}").contains("cached_targets: 0"));

        m.matched_definitions(&field_target("body", "text")).unwrap();
        let shown = format!("{m:?}");
        assert!(shown.contains("\"DriverField\""), "{shown}");
        assert!(shown.contains("cached_targets: 1"), "{shown}");
    }
}
