//! Multi-dimensional demographic filtering over the triple corpus.
//!
//! - [`FilterCategory`]: the closed set of filter dimensions
//! - [`CategorySpec`]: static predicate→category configuration
//! - [`FilterSelection`]: the transient, request-scoped selection
//! - [`extract`]: filter-domain extraction (per-category value sets)
//! - [`evaluate`]: subgraph admission (OR within, AND across categories)

pub mod evaluate;
pub mod extract;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::triple::Predicate;

/// The fixed set of filter dimensions over the community graph.
///
/// Each category sources its candidate values from one or more predicates;
/// the mapping is static configuration (see [`CategorySpec::table`]), not
/// inferred at runtime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterCategory {
    Communities,
    MainCommunities,
    Residence,
    OriginLocation,
    Religion,
    Education,
    Gender,
    Sexuality,
    ConnectionType,
    InvolvementLevel,
    AlohaSpirit,
    HawaiianCulture,
    UsBorn,
    Country,
    StayOnIsland,
    RelationshipStatus,
    AgeRange,
    Occupation,
}

impl FilterCategory {
    /// All categories, in UI presentation order.
    pub const ALL: [FilterCategory; 18] = [
        FilterCategory::Communities,
        FilterCategory::MainCommunities,
        FilterCategory::Residence,
        FilterCategory::OriginLocation,
        FilterCategory::Religion,
        FilterCategory::Education,
        FilterCategory::Gender,
        FilterCategory::Sexuality,
        FilterCategory::ConnectionType,
        FilterCategory::InvolvementLevel,
        FilterCategory::AlohaSpirit,
        FilterCategory::HawaiianCulture,
        FilterCategory::UsBorn,
        FilterCategory::Country,
        FilterCategory::StayOnIsland,
        FilterCategory::RelationshipStatus,
        FilterCategory::AgeRange,
        FilterCategory::Occupation,
    ];

    /// Stable external name (the filter-surface key).
    pub fn name(self) -> &'static str {
        match self {
            FilterCategory::Communities => "communities",
            FilterCategory::MainCommunities => "main_communities",
            FilterCategory::Residence => "residence",
            FilterCategory::OriginLocation => "origin_location",
            FilterCategory::Religion => "religion",
            FilterCategory::Education => "education",
            FilterCategory::Gender => "gender",
            FilterCategory::Sexuality => "sexuality",
            FilterCategory::ConnectionType => "connection_type",
            FilterCategory::InvolvementLevel => "involvement_level",
            FilterCategory::AlohaSpirit => "aloha_spirit",
            FilterCategory::HawaiianCulture => "hawaiian_culture",
            FilterCategory::UsBorn => "us_born",
            FilterCategory::Country => "country",
            FilterCategory::StayOnIsland => "stay_on_island",
            FilterCategory::RelationshipStatus => "relationship_status",
            FilterCategory::AgeRange => "age_range",
            FilterCategory::Occupation => "occupation",
        }
    }

    /// Parse an external name. Unknown names yield `None` — per the
    /// leniency policy they are ignored, never an error.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        FilterCategory::ALL.into_iter().find(|c| c.name() == name)
    }

    /// The static configuration for this category.
    pub fn spec(self) -> &'static CategorySpec {
        &CategorySpec::table()[self as usize]
    }
}

impl std::fmt::Display for FilterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Where a category reads its candidate value on a matching triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// The object value (attribute categories).
    Object,
    /// The subject value (hub categories).
    Subject,
    /// Both endpoints (community categories, where either side qualifies).
    SubjectOrObject,
    /// The predicate name itself (connection-type).
    PredicateName,
}

/// Static per-category configuration: source predicates, value source, and
/// an optional case-insensitive substring marker.
#[derive(Debug, Clone)]
pub struct CategorySpec {
    pub category: FilterCategory,
    /// Predicates whose triples source this category.
    pub predicates: &'static [&'static str],
    /// Which triple field carries the candidate value.
    pub value_source: ValueSource,
    /// Optional `(predicate, marker)` substring rule: object values of
    /// `predicate` containing `marker` (case-insensitive) also populate
    /// this category.
    pub substring: Option<(&'static str, &'static str)>,
    /// Edge-level category: constrains the admitted edges by predicate,
    /// keeping only their endpoints as nodes (connection-type only).
    pub edge_level: bool,
}

impl CategorySpec {
    /// The full static table, indexed by `FilterCategory as usize`
    /// (i.e. [`FilterCategory::ALL`] order).
    pub fn table() -> &'static [CategorySpec; 18] {
        static TABLE: std::sync::OnceLock<[CategorySpec; 18]> = std::sync::OnceLock::new();
        TABLE.get_or_init(|| {
            [
                CategorySpec {
                    category: FilterCategory::Communities,
                    predicates: &["ALSO_INVOLVED_IN", "ASSOCIATED_WITH"],
                    value_source: ValueSource::SubjectOrObject,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::MainCommunities,
                    predicates: &["HAS_MAIN_COMMUNITY"],
                    value_source: ValueSource::Subject,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Residence,
                    predicates: &["LIVES_IN"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::OriginLocation,
                    predicates: &["ORIGINALLY_FROM"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Religion,
                    predicates: &["HAS_RELIGIOUS_VIEW"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Education,
                    predicates: &["HAS_EDUCATION_LEVEL"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Gender,
                    predicates: &["HAS_THE_GENDER"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Sexuality,
                    predicates: &["HAS_SEXUALITY"],
                    value_source: ValueSource::Object,
                    substring: Some(("ASSOCIATED_WITH", "LGBTQ")),
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::ConnectionType,
                    predicates: &["HAS_MAIN_COMMUNITY", "ASSOCIATED_WITH", "ALSO_INVOLVED_IN"],
                    value_source: ValueSource::PredicateName,
                    substring: None,
                    edge_level: true,
                },
                CategorySpec {
                    category: FilterCategory::InvolvementLevel,
                    predicates: &["LEVEL_OF_INVOLVEMENT"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::AlohaSpirit,
                    predicates: &["FEELS_ALOHA_SPIRIT"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::HawaiianCulture,
                    predicates: &["HAWAIIAN_CULTURE_KNOWLEDGE"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::UsBorn,
                    predicates: &["US_BORN_STATUS"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Country,
                    predicates: &["FROM_COUNTRY"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::StayOnIsland,
                    predicates: &["PLANS_TO_STAY"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::RelationshipStatus,
                    predicates: &["RELATIONSHIP_STATUS"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::AgeRange,
                    predicates: &["IN_AGE_RANGE_OF"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
                CategorySpec {
                    category: FilterCategory::Occupation,
                    predicates: &["HAS_OCCUPATION"],
                    value_source: ValueSource::Object,
                    substring: None,
                    edge_level: false,
                },
            ]
        })
    }

    /// Whether a predicate belongs to this category's source set.
    pub fn matches_predicate(&self, predicate: &Predicate) -> bool {
        self.predicates
            .iter()
            .any(|p| predicate == &Predicate::new(p))
    }
}

/// Active filter selections: category → selected values.
///
/// Transient and request-scoped; an absent or empty set means the category
/// is inactive and contributes no constraint. Values referring to nothing in
/// the extracted domain silently match nothing — stale UI state must never
/// crash the evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    selections: BTreeMap<FilterCategory, BTreeSet<String>>,
}

impl FilterSelection {
    /// An empty (fully inactive) selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a selected value to a category. Blank values are dropped.
    pub fn select(mut self, category: FilterCategory, value: impl Into<String>) -> Self {
        let value = value.into();
        let value = value.trim();
        if !value.is_empty() {
            self.selections
                .entry(category)
                .or_default()
                .insert(value.to_string());
        }
        self
    }

    /// Build from untyped `(name, values)` pairs, the shape the filter
    /// query surface receives. Unknown category names are ignored.
    pub fn from_named<'a, I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut selection = Self::new();
        for (name, values) in pairs {
            let Some(category) = FilterCategory::from_name(name) else {
                tracing::debug!(category = name, "ignoring unknown filter category");
                continue;
            };
            for value in values {
                selection = selection.select(category, value);
            }
        }
        selection
    }

    /// The selected values for a category, if any are active.
    pub fn values(&self, category: FilterCategory) -> Option<&BTreeSet<String>> {
        self.selections.get(&category).filter(|s| !s.is_empty())
    }

    /// Categories with at least one selected value.
    pub fn active_categories(&self) -> impl Iterator<Item = FilterCategory> + '_ {
        self.selections
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(c, _)| *c)
    }

    /// Whether no category is active (the identity selection).
    pub fn is_empty(&self) -> bool {
        self.selections.values().all(|v| v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_spec() {
        for category in FilterCategory::ALL {
            let spec = category.spec();
            assert_eq!(spec.category, category);
            assert!(
                !spec.predicates.is_empty(),
                "{category} must name at least one source predicate"
            );
        }
    }

    #[test]
    fn category_name_roundtrip() {
        for category in FilterCategory::ALL {
            assert_eq!(FilterCategory::from_name(category.name()), Some(category));
        }
        assert_eq!(FilterCategory::from_name("Residence"), Some(FilterCategory::Residence));
        assert_eq!(FilterCategory::from_name("no_such_filter"), None);
    }

    #[test]
    fn only_connection_type_is_edge_level() {
        for category in FilterCategory::ALL {
            assert_eq!(
                category.spec().edge_level,
                category == FilterCategory::ConnectionType
            );
        }
    }

    #[test]
    fn sexuality_has_substring_rule() {
        let spec = FilterCategory::Sexuality.spec();
        assert_eq!(spec.substring, Some(("ASSOCIATED_WITH", "LGBTQ")));
    }

    #[test]
    fn selection_from_named_ignores_unknown() {
        let selection = FilterSelection::from_named([
            ("residence", vec!["Honolulu"]),
            ("bogus_category", vec!["whatever"]),
        ]);
        assert!(selection.values(FilterCategory::Residence).is_some());
        assert_eq!(selection.active_categories().count(), 1);
    }

    #[test]
    fn empty_selection_is_identity() {
        let selection = FilterSelection::new();
        assert!(selection.is_empty());
        assert!(selection.values(FilterCategory::Gender).is_none());
    }

    #[test]
    fn blank_values_are_dropped() {
        let selection = FilterSelection::new().select(FilterCategory::Gender, "  ");
        assert!(selection.is_empty());
    }
}
