//! ranking_properties.rs
//!
//! Property tests for the plugin matcher:
//! - same definitions + same target => same ordered result
//! - registration order never affects the result
//! - every result satisfies the filters, and nothing matching is lost
//! - output is always ranked (weight, specificity, id)
//! - weight dominates specificity

use std::rc::Rc;

use proptest::prelude::*;

use driver_core::criteria::{MatcherProfile, ENTITY_BUNDLES, ENTITY_TYPES, FIELD_NAMES, FIELD_TYPES};
use driver_core::definition::Definition;
use driver_core::matcher::PluginMatcher;
use driver_core::ranking::ensure_ranked;
use driver_core::target::TargetDescriptor;

fn target() -> TargetDescriptor {
    TargetDescriptor::new()
        .with(FIELD_NAMES, "body")
        .with(FIELD_TYPES, "text_long")
        .with(ENTITY_TYPES, "node")
        .with(ENTITY_BUNDLES, "article")
}

fn filter_strategy(name: &'static str, values: &'static [&'static str]) -> impl Strategy<Value = Option<(String, Vec<String>)>> {
    proptest::option::of(proptest::sample::subsequence(values.to_vec(), 0..=values.len())).prop_map(
        move |maybe| maybe.map(|vs| (name.to_string(), vs.into_iter().map(str::to_string).collect())),
    )
}

fn definition_strategy() -> impl Strategy<Value = (i32, Option<u32>, Vec<Option<(String, Vec<String>)>>)> {
    (
        -3i32..=3,
        proptest::option::of(7u32..=8),
        (
            filter_strategy(FIELD_NAMES, &["body", "title"]),
            filter_strategy(FIELD_TYPES, &["Text_Long", "string"]),
            filter_strategy(ENTITY_TYPES, &["node", "user"]),
            filter_strategy(ENTITY_BUNDLES, &["article", "page"]),
        )
            .prop_map(|(a, b, c, d)| vec![a, b, c, d]),
    )
}

fn definitions_strategy() -> impl Strategy<Value = Vec<Definition>> {
    proptest::collection::vec(definition_strategy(), 0..24).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (weight, version, filters))| {
                let mut d = Definition::new(format!("p{i:02}")).weight(weight);
                if let Some(v) = version {
                    d = d.version(v);
                }
                for (name, values) in filters.into_iter().flatten() {
                    d = d.filter(name, values);
                }
                d
            })
            .collect()
    })
}

fn matcher(defs: Vec<Definition>) -> PluginMatcher {
    PluginMatcher::new(MatcherProfile::field(), 8, Rc::new(defs)).unwrap()
}

fn ids(defs: &[Definition]) -> Vec<String> {
    defs.iter().map(|d| d.id.clone()).collect()
}

proptest! {
    #[test]
    fn repeated_matching_is_deterministic(defs in definitions_strategy()) {
        let m1 = matcher(defs.clone());
        let m2 = matcher(defs);
        let a = m1.matched_definitions(&target()).unwrap();
        let b = m1.matched_definitions(&target()).unwrap();
        let c = m2.matched_definitions(&target()).unwrap();
        prop_assert_eq!(ids(&a), ids(&b));
        prop_assert_eq!(ids(&a), ids(&c));
    }

    #[test]
    fn registration_order_is_irrelevant(defs in definitions_strategy()) {
        let mut reversed = defs.clone();
        reversed.reverse();
        let a = matcher(defs).matched_definitions(&target()).unwrap();
        let b = matcher(reversed).matched_definitions(&target()).unwrap();
        prop_assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn results_are_exactly_the_matching_definitions(defs in definitions_strategy()) {
        let m = matcher(defs.clone());
        let t = target();
        let out = m.matched_definitions(&t).unwrap();

        let expected = defs.iter().filter(|d| m.is_match(&t, d)).count();
        prop_assert_eq!(out.len(), expected);
        for d in out.iter() {
            prop_assert!(d.version.map_or(true, |v| v == 8));
            for (filter, value) in t.iter() {
                prop_assert!(d.accepts(filter, value));
            }
        }
    }

    #[test]
    fn output_is_ranked(defs in definitions_strategy()) {
        let m = matcher(defs);
        let out = m.matched_definitions(&target()).unwrap();
        prop_assert!(ensure_ranked(&out, &m.profile().criteria).is_ok());
    }

    #[test]
    fn weight_dominates_specificity(defs in definitions_strategy()) {
        let mut defs = defs;
        defs.push(Definition::new("zz_heavy").weight(100));
        let out = matcher(defs).matched_definitions(&target()).unwrap();
        prop_assert_eq!(out[0].id.as_str(), "zz_heavy");
    }
}
