//! Human-friendly name resolution.
//!
//! Test authors refer to fields, bundles and entity types by whatever they
//! see in the UI ("Created on", "Article") or by machine name ("created",
//! "field_tags", "tags"). `NameMatcher` resolves such identifiers to exactly
//! one machine name from a candidate set.
//!
//! Matching tiers, tried strictly in order; each tier scans every candidate
//! before the next tier runs, and the first hit wins:
//! 1. case-insensitive label
//! 2. case-insensitive machine name
//! 3. case-insensitive machine name with the configured prefix stripped
//! 4. normalized (see `normalize`) label, machine name or stripped machine
//!    name
//!
//! No match is `None`, never an error: callers decide how to report it.

pub mod normalize;

use std::collections::BTreeMap;

use self::normalize::normalize_name;

/// One (label, machine name) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCandidate {
    pub label: String,
    pub machine_name: String,
}

/// Ordered candidate set. Labels need not be unique; the first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameCandidates(Vec<NameCandidate>);

impl NameCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, machine_name: impl Into<String>) {
        self.0.push(NameCandidate {
            label: label.into(),
            machine_name: machine_name.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &NameCandidate> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<L, M> FromIterator<(L, M)> for NameCandidates
where
    L: Into<String>,
    M: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, M)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (label, machine_name) in iter {
            out.insert(label, machine_name);
        }
        out
    }
}

/// Result of `NameMatcher::identify_set`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetMatch<V> {
    /// Machine name -> the input value consumed for it.
    pub matched: BTreeMap<String, V>,
    /// Inputs not consumed, in their original order.
    pub unmatched: Vec<(String, V)>,
}

impl<V> SetMatch<V> {
    pub fn is_empty(&self) -> bool {
        self.matched.is_empty()
    }
}

/// Resolves free-text identifiers against a candidate set.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    candidates: NameCandidates,
    prefix: Option<String>,
}

impl NameMatcher {
    pub fn new(candidates: NameCandidates) -> Self {
        Self {
            candidates,
            prefix: None,
        }
    }

    /// Strip `prefix` from machine names in tiers 3 and 4.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn candidates(&self) -> &NameCandidates {
        &self.candidates
    }

    /// Resolve one identifier to a machine name.
    pub fn identify(&self, identifier: &str) -> Option<String> {
        let wanted = identifier.trim().to_lowercase();

        let hit = self
            .find(|c| c.label.to_lowercase() == wanted)
            .or_else(|| self.find(|c| c.machine_name.to_lowercase() == wanted))
            .or_else(|| {
                self.find(|c| {
                    self.strip_prefix(&c.machine_name)
                        .is_some_and(|stripped| stripped.to_lowercase() == wanted)
                })
            })
            .or_else(|| {
                let normalized = normalize_name(identifier);
                if normalized.is_empty() {
                    return None;
                }
                self.find(|c| {
                    normalize_name(&c.label) == normalized
                        || normalize_name(&c.machine_name) == normalized
                        || self
                            .strip_prefix(&c.machine_name)
                            .is_some_and(|stripped| normalize_name(stripped) == normalized)
                })
            });

        hit.map(|c| c.machine_name.clone())
    }

    /// Pick out the inputs that identify a candidate.
    ///
    /// Inputs are scanned in order. Each machine name consumes at most one
    /// input, the first identified; later inputs resolving to the same machine
    /// name stay unmatched, as do inputs resolving to nothing.
    pub fn identify_set<V, I>(&self, targets: I) -> SetMatch<V>
    where
        I: IntoIterator<Item = (String, V)>,
    {
        let mut matched = BTreeMap::new();
        let mut unmatched = Vec::new();

        for (key, value) in targets {
            match self.identify(&key) {
                Some(machine_name) if !matched.contains_key(&machine_name) => {
                    matched.insert(machine_name, value);
                }
                _ => unmatched.push((key, value)),
            }
        }

        SetMatch { matched, unmatched }
    }

    fn find(&self, pred: impl Fn(&NameCandidate) -> bool) -> Option<&NameCandidate> {
        self.candidates.iter().find(|&c| pred(c))
    }

    fn strip_prefix<'a>(&self, machine_name: &'a str) -> Option<&'a str> {
        let prefix = self.prefix.as_deref()?;
        machine_name.strip_prefix(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_fields() -> NameMatcher {
        let candidates: NameCandidates = [
            ("Title", "title"),
            ("My Title", "field_my_title"),
            ("Created on", "created"),
            ("Tags", "field_tags"),
        ]
        .into_iter()
        .collect();
        NameMatcher::new(candidates).with_prefix("field_")
    }

    #[test]
    fn label_match_beats_prefix_match() {
        assert_eq!(node_fields().identify("title").as_deref(), Some("title"));
    }

    #[test]
    fn prefix_stripped_machine_name() {
        assert_eq!(
            node_fields().identify("my_title").as_deref(),
            Some("field_my_title")
        );
        assert_eq!(node_fields().identify("TAGS").as_deref(), Some("field_tags"));
    }

    #[test]
    fn machine_name_match_is_case_insensitive() {
        assert_eq!(
            node_fields().identify("FIELD_MY_TITLE").as_deref(),
            Some("field_my_title")
        );
        assert_eq!(node_fields().identify("Created").as_deref(), Some("created"));
    }

    #[test]
    fn fuzzy_match_on_normalized_forms() {
        let m = node_fields();
        assert_eq!(m.identify("created-on").as_deref(), Some("created"));
        assert_eq!(m.identify("My  title").as_deref(), Some("field_my_title"));
        assert_eq!(m.identify("my-title").as_deref(), Some("field_my_title"));
    }

    #[test]
    fn no_match_is_none() {
        assert_eq!(node_fields().identify("nonexistent"), None);
        assert_eq!(node_fields().identify("   "), None);
        assert_eq!(NameMatcher::new(NameCandidates::new()).identify("title"), None);
    }

    #[test]
    fn first_label_wins_on_collision() {
        let candidates: NameCandidates =
            [("Body", "body"), ("Body", "field_body")].into_iter().collect();
        let m = NameMatcher::new(candidates);
        assert_eq!(m.identify("body").as_deref(), Some("body"));
    }

    #[test]
    fn without_prefix_stripped_names_do_not_match() {
        let candidates: NameCandidates = [("Tags", "field_tags")].into_iter().collect();
        let m = NameMatcher::new(candidates);
        assert_eq!(m.identify("field_tags").as_deref(), Some("field_tags"));
        assert_eq!(m.identify("tag"), None);
    }

    #[test]
    fn identify_set_consumes_first_input_only() {
        let candidates: NameCandidates =
            [("Content type", "type"), ("type", "type")].into_iter().collect();
        let m = NameMatcher::new(candidates);

        let inputs = vec![
            ("title".to_string(), "Hello"),
            ("Content type".to_string(), "Article"),
            ("type".to_string(), "Page"),
        ];
        let result = m.identify_set(inputs);

        assert_eq!(result.matched.get("type"), Some(&"Article"));
        assert_eq!(
            result.unmatched,
            vec![("title".to_string(), "Hello"), ("type".to_string(), "Page")]
        );
    }

    #[test]
    fn identify_set_without_hits() {
        let m = NameMatcher::new([("type", "type")].into_iter().collect());
        let result = m.identify_set(vec![("body".to_string(), 1)]);
        assert!(result.is_empty());
        assert_eq!(result.unmatched.len(), 1);
    }
}
