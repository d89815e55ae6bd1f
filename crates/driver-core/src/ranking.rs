//! Specificity and weight ranking of plugin definitions.
//!
//! Ordering rules, in priority order:
//! - higher `weight` first, regardless of specificity
//! - within a weight, lower specificity-group index first (more specific)
//! - within a weight and group, ascending byte-wise `id`
//!
//! The rules are applied through explicit buckets rather than a single
//! comparator so the grouping is visible and auditable.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::criteria::SpecificityCriteria;
use crate::definition::Definition;
use crate::errors::{DriverError, DriverResult};

/// Index of the first criteria set whose every filter the definition
/// declares. Definitions matching no set are catch-alls and get
/// `criteria.len()`.
pub fn specificity_group(definition: &Definition, criteria: &SpecificityCriteria) -> usize {
    criteria
        .sets()
        .iter()
        .position(|set| set.iter().all(|filter| definition.declares(filter)))
        .unwrap_or(criteria.len())
}

/// Sort definitions by weight, then specificity, then id.
pub fn rank_definitions(definitions: Vec<Definition>, criteria: &SpecificityCriteria) -> Vec<Definition> {
    // weight (high to low) -> specificity group (low to high) -> definitions
    let mut buckets: BTreeMap<Reverse<i32>, BTreeMap<usize, Vec<Definition>>> = BTreeMap::new();
    for definition in definitions {
        let group = specificity_group(&definition, criteria);
        buckets
            .entry(Reverse(definition.weight))
            .or_default()
            .entry(group)
            .or_default()
            .push(definition);
    }

    let mut ranked = Vec::new();
    for groups in buckets.into_values() {
        for mut group in groups.into_values() {
            group.sort_by(|a, b| a.id.cmp(&b.id));
            ranked.extend(group);
        }
    }
    ranked
}

/// Sort key equivalent to the bucket order of `rank_definitions`.
pub fn rank_key<'a>(
    definition: &'a Definition,
    criteria: &SpecificityCriteria,
) -> (Reverse<i32>, usize, &'a str) {
    (
        Reverse(definition.weight),
        specificity_group(definition, criteria),
        definition.id.as_str(),
    )
}

/// Ensure a list is already ranked.
///
/// Returns an error naming the first pair found out of order.
pub fn ensure_ranked(definitions: &[Definition], criteria: &SpecificityCriteria) -> DriverResult<()> {
    for w in definitions.windows(2) {
        if rank_key(&w[0], criteria) > rank_key(&w[1], criteria) {
            return Err(DriverError::configuration(format!(
                "definitions are not ranked: '{}' precedes '{}'",
                w[0].id, w[1].id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{MatcherProfile, ENTITY_BUNDLES, FIELD_NAMES, FIELD_TYPES};

    fn ids(defs: &[Definition]) -> Vec<&str> {
        defs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn specificity_group_uses_first_fully_declared_set() {
        let criteria = MatcherProfile::field().criteria;
        let d = Definition::new("a")
            .filter(FIELD_NAMES, ["body"])
            .filter(ENTITY_BUNDLES, ["article"]);
        assert_eq!(specificity_group(&d, &criteria), 1);

        let d = Definition::new("b").filter(FIELD_TYPES, ["text"]);
        assert_eq!(specificity_group(&d, &criteria), 7);
    }

    #[test]
    fn catch_all_gets_table_length() {
        let criteria = MatcherProfile::field().criteria;
        assert_eq!(specificity_group(&Definition::new("generic"), &criteria), 11);
    }

    #[test]
    fn weight_then_specificity_then_id() {
        let criteria = MatcherProfile::field().criteria;
        let defs = vec![
            Definition::new("z_generic"),
            Definition::new("b_type").filter(FIELD_TYPES, ["text"]),
            Definition::new("a_type").filter(FIELD_TYPES, ["text"]),
            Definition::new("heavy").weight(10),
            Definition::new("named").filter(FIELD_NAMES, ["body"]),
            Definition::new("light").weight(-5).filter(FIELD_NAMES, ["body"]),
        ];
        let ranked = rank_definitions(defs, &criteria);
        assert_eq!(
            ids(&ranked),
            vec!["heavy", "named", "a_type", "b_type", "z_generic", "light"]
        );
        ensure_ranked(&ranked, &criteria).unwrap();
    }

    #[test]
    fn ensure_ranked_detects_unsorted() {
        let criteria = MatcherProfile::entity().criteria;
        let defs = vec![Definition::new("a"), Definition::new("b").weight(1)];
        let err = ensure_ranked(&defs, &criteria).unwrap_err();
        assert!(err.to_string().contains("not ranked"));
    }

    #[test]
    fn empty_input_ranks_to_empty() {
        let criteria = MatcherProfile::entity().criteria;
        assert!(rank_definitions(Vec::new(), &criteria).is_empty());
    }
}
