//! Filter-domain extraction: enumerate each category's candidate values
//! from the current triple set.
//!
//! Pure function over its input. Values are trimmed, empties discarded,
//! exact duplicates collapsed with first-seen order preserved so the
//! selection widgets render deterministically. Absent predicates simply
//! yield an empty value set — the filter becomes a no-op, not a failure.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::triple::{Predicate, Triple};

use super::{CategorySpec, FilterCategory, ValueSource};

/// The enumerated value domain of every filter category.
///
/// Built once per snapshot (startup/reload), read-only thereafter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDomain {
    values: BTreeMap<FilterCategory, Vec<String>>,
}

impl FilterDomain {
    /// Extract the domain from a triple set.
    pub fn extract(triples: &[Triple]) -> Self {
        let mut values = BTreeMap::new();
        for spec in CategorySpec::table() {
            values.insert(spec.category, extract_category(triples, spec));
        }
        FilterDomain { values }
    }

    /// Ordered candidate values for a category (first-seen order).
    pub fn values(&self, category: FilterCategory) -> &[String] {
        self.values
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    /// Whether a value is in a category's extracted domain (exact match).
    pub fn contains(&self, category: FilterCategory, value: &str) -> bool {
        self.values(category).iter().any(|v| v == value)
    }

    /// Iterate `(category, values)` in presentation order.
    pub fn iter(&self) -> impl Iterator<Item = (FilterCategory, &[String])> {
        FilterCategory::ALL
            .into_iter()
            .map(move |c| (c, self.values(c)))
    }
}

fn extract_category(triples: &[Triple], spec: &CategorySpec) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    let mut push = |raw: &str| {
        let value = raw.trim();
        if !value.is_empty() && seen.insert(value.to_string()) {
            out.push(value.to_string());
        }
    };

    for triple in triples {
        if spec.matches_predicate(&triple.predicate) {
            match spec.value_source {
                ValueSource::Object => push(&triple.object),
                ValueSource::Subject => push(&triple.subject),
                ValueSource::SubjectOrObject => {
                    push(&triple.subject);
                    push(&triple.object);
                }
                ValueSource::PredicateName => push(triple.predicate.as_str()),
            }
        }
        // Substring-derived values (e.g. LGBTQ associations → sexuality).
        if let Some((marker_pred, marker)) = spec.substring {
            if triple.predicate == Predicate::new(marker_pred)
                && triple
                    .object
                    .to_lowercase()
                    .contains(&marker.to_lowercase())
            {
                push(&triple.object);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Triple> {
        vec![
            Triple::new("Alice", "LIVES_IN", "Honolulu"),
            Triple::new("Bob", "LIVES_IN", "North Shore"),
            Triple::new("Carol", "LIVES_IN", "Honolulu"), // duplicate value
            Triple::new("Alice", "ORIGINALLY_FROM", "California"),
            Triple::new("Alice", "ALSO_INVOLVED_IN", "Surfing"),
            Triple::new("Surfing", "ASSOCIATED_WITH", "LGBTQ+ Friendly"),
            Triple::new("Surfing", "ASSOCIATED_WITH", "Beach Cleanups"),
            Triple::new("Surfing", "HAS_MAIN_COMMUNITY", "SurfBreak"),
        ]
    }

    #[test]
    fn residence_values_first_seen_order() {
        let domain = FilterDomain::extract(&corpus());
        assert_eq!(
            domain.values(FilterCategory::Residence),
            &["Honolulu".to_string(), "North Shore".to_string()]
        );
    }

    #[test]
    fn communities_include_both_endpoints() {
        let domain = FilterDomain::extract(&corpus());
        let communities = domain.values(FilterCategory::Communities);
        assert!(communities.contains(&"Alice".to_string()));
        assert!(communities.contains(&"Surfing".to_string()));
        assert!(communities.contains(&"Beach Cleanups".to_string()));
    }

    #[test]
    fn sexuality_from_substring_marker() {
        let domain = FilterDomain::extract(&corpus());
        assert_eq!(
            domain.values(FilterCategory::Sexuality),
            &["LGBTQ+ Friendly".to_string()]
        );
    }

    #[test]
    fn connection_type_values_are_predicate_names() {
        let domain = FilterDomain::extract(&corpus());
        let kinds = domain.values(FilterCategory::ConnectionType);
        assert!(kinds.contains(&"ALSO_INVOLVED_IN".to_string()));
        assert!(kinds.contains(&"ASSOCIATED_WITH".to_string()));
        assert!(kinds.contains(&"HAS_MAIN_COMMUNITY".to_string()));
    }

    #[test]
    fn absent_predicate_yields_empty_set() {
        let domain = FilterDomain::extract(&corpus());
        assert!(domain.values(FilterCategory::Occupation).is_empty());
        assert!(domain.values(FilterCategory::AgeRange).is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let triples = corpus();
        let a = FilterDomain::extract(&triples);
        let b = FilterDomain::extract(&triples);
        assert_eq!(a, b);
        for (category, values) in a.iter() {
            assert_eq!(values, b.values(category));
        }
    }

    #[test]
    fn empty_and_whitespace_values_discarded() {
        let triples = vec![
            Triple::new("Alice", "LIVES_IN", "  "),
            Triple::new("Bob", "LIVES_IN", "Honolulu "),
        ];
        let domain = FilterDomain::extract(&triples);
        assert_eq!(domain.values(FilterCategory::Residence), &["Honolulu".to_string()]);
    }

    #[test]
    fn main_communities_from_hub_subjects() {
        let domain = FilterDomain::extract(&corpus());
        assert_eq!(
            domain.values(FilterCategory::MainCommunities),
            &["Surfing".to_string()]
        );
    }
}
