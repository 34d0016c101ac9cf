//! Filter evaluation: compute the exact subgraph admitted by a selection.
//!
//! Semantics: OR within a category (matching any selected value qualifies),
//! AND across active categories (set intersection), identity when nothing
//! is active. Value membership is compared through normalized entity keys,
//! so selections survive case and whitespace drift from the UI. Selections
//! referring to values that no longer exist match nothing and the result is
//! an explicitly empty graph — never an error.

use std::collections::{BTreeSet, HashSet};

use crate::entity::EntityId;
use crate::triple::{Predicate, Triple, TripleId};

use super::{FilterCategory, FilterSelection, ValueSource};

/// The subgraph surviving a filter selection.
///
/// Nodes are normalized entity keys (sorted for deterministic output);
/// edges are triple references into the snapshot the evaluation ran
/// against. Duplicate triples produce duplicate edge references — edge
/// statistics intentionally count every occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredGraph {
    pub nodes: BTreeSet<EntityId>,
    pub edges: Vec<TripleId>,
}

impl FilteredGraph {
    /// Number of admitted nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of admitted edges (duplicates counted).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the admitted subgraph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Apply a filter selection to a triple set.
///
/// Node admission runs in two steps. First a core set: the intersection,
/// across active categories, of the entities participating in a qualifying
/// triple for that category. Then the qualifying triples anchored on a core
/// entity re-admit their opposite endpoint, so a person surviving every
/// constraint keeps the value nodes (residence, community) that matched.
pub fn apply(triples: &[Triple], selection: &FilterSelection) -> FilteredGraph {
    // Edge-level constraint (connection-type): admitted edges must carry one
    // of the selected predicates, and only their endpoints stay admitted.
    let allowed_predicates: Option<HashSet<Predicate>> = selection
        .values(FilterCategory::ConnectionType)
        .map(|values| values.iter().map(|v| Predicate::new(v)).collect());

    let mut core: Option<HashSet<EntityId>> = None;
    let mut qualifying: Vec<usize> = Vec::new();
    for category in selection.active_categories() {
        let spec = category.spec();
        if spec.edge_level {
            continue;
        }
        let Some(values) = selection.values(category) else {
            continue;
        };
        let selected: HashSet<EntityId> = values.iter().map(|v| EntityId::new(v)).collect();

        let mut participants: HashSet<EntityId> = HashSet::new();
        for (i, triple) in triples.iter().enumerate() {
            if category_triple_matches(triple, spec, &selected) {
                participants.insert(EntityId::new(&triple.subject));
                participants.insert(EntityId::new(&triple.object));
                qualifying.push(i);
            }
        }

        core = Some(match core {
            None => participants,
            Some(prev) => prev.intersection(&participants).cloned().collect(),
        });
    }

    // Identity when no node-level category is active.
    let nodes: BTreeSet<EntityId> = match core {
        Some(core) => {
            let mut nodes: BTreeSet<EntityId> = core.iter().cloned().collect();
            for &i in &qualifying {
                let subject = EntityId::new(&triples[i].subject);
                let object = EntityId::new(&triples[i].object);
                if core.contains(&subject) {
                    nodes.insert(object.clone());
                }
                if core.contains(&object) {
                    nodes.insert(subject);
                }
            }
            nodes
        }
        None => triples
            .iter()
            .flat_map(|t| [EntityId::new(&t.subject), EntityId::new(&t.object)])
            .collect(),
    };

    // Admitted edges: both endpoints admitted, predicate allowed.
    let edges: Vec<TripleId> = triples
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            allowed_predicates
                .as_ref()
                .is_none_or(|allowed| allowed.contains(&t.predicate))
        })
        .filter(|(_, t)| {
            nodes.contains(&EntityId::new(&t.subject)) && nodes.contains(&EntityId::new(&t.object))
        })
        .map(|(i, _)| TripleId(i as u64))
        .collect();

    // With a connection-type active, entities touching none of the admitted
    // edges are isolated by the constraint and drop out of the node set.
    let nodes = if allowed_predicates.is_some() {
        edges
            .iter()
            .flat_map(|&TripleId(i)| {
                let t = &triples[i as usize];
                [EntityId::new(&t.subject), EntityId::new(&t.object)]
            })
            .collect()
    } else {
        nodes
    };

    FilteredGraph { nodes, edges }
}

/// Whether one triple matches a category's selected values.
fn category_triple_matches(
    triple: &Triple,
    spec: &super::CategorySpec,
    selected: &HashSet<EntityId>,
) -> bool {
    let predicate_matches = spec.matches_predicate(&triple.predicate);
    let object_selected = || selected.contains(&EntityId::new(&triple.object));
    let subject_selected = || selected.contains(&EntityId::new(&triple.subject));

    if predicate_matches {
        let hit = match spec.value_source {
            ValueSource::Object => object_selected(),
            ValueSource::Subject => subject_selected(),
            ValueSource::SubjectOrObject => subject_selected() || object_selected(),
            ValueSource::PredicateName => false, // edge-level, handled elsewhere
        };
        if hit {
            return true;
        }
    }

    // Substring-derived membership (sexuality via LGBTQ associations).
    if let Some((marker_pred, marker)) = spec.substring {
        if triple.predicate == Predicate::new(marker_pred)
            && triple
                .object
                .to_lowercase()
                .contains(&marker.to_lowercase())
            && object_selected()
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSelection;

    fn corpus() -> Vec<Triple> {
        vec![
            Triple::new("Alice", "LIVES_IN", "Honolulu"),
            Triple::new("Alice", "ALSO_INVOLVED_IN", "Surfing"),
            Triple::new("Bob", "LIVES_IN", "California"),
            Triple::new("Bob", "ALSO_INVOLVED_IN", "Surfing"),
        ]
    }

    fn id(name: &str) -> EntityId {
        EntityId::new(name)
    }

    #[test]
    fn empty_selection_is_identity() {
        let triples = corpus();
        let result = apply(&triples, &FilterSelection::new());
        assert_eq!(result.node_count(), 5); // Alice, Bob, Honolulu, California, Surfing
        assert_eq!(result.edge_count(), 4);
    }

    #[test]
    fn apply_is_idempotent() {
        let triples = corpus();
        let selection = FilterSelection::new()
            .select(FilterCategory::Residence, "Honolulu")
            .select(FilterCategory::Communities, "Surfing");
        let a = apply(&triples, &selection);
        let b = apply(&triples, &selection);
        assert_eq!(a, b);
    }

    #[test]
    fn intersection_across_categories() {
        // {residence: Honolulu} AND {communities: Surfing} admits Alice but
        // not Bob (Bob fails residence).
        let triples = corpus();
        let selection = FilterSelection::new()
            .select(FilterCategory::Residence, "Honolulu")
            .select(FilterCategory::Communities, "Surfing");
        let result = apply(&triples, &selection);

        let expected: BTreeSet<EntityId> =
            [id("Alice"), id("Honolulu"), id("Surfing")].into_iter().collect();
        assert_eq!(result.nodes, expected);

        // Edges among admitted nodes only: Alice->Honolulu, Alice->Surfing.
        assert_eq!(result.edges, vec![TripleId(0), TripleId(1)]);
    }

    #[test]
    fn or_within_a_category() {
        let triples = corpus();
        let selection = FilterSelection::new()
            .select(FilterCategory::Residence, "Honolulu")
            .select(FilterCategory::Residence, "California");
        let result = apply(&triples, &selection);
        assert!(result.nodes.contains(&id("Alice")));
        assert!(result.nodes.contains(&id("Bob")));
    }

    #[test]
    fn nonexistent_value_yields_empty_graph() {
        // A value missing from the domain yields an empty graph, not an error.
        let triples = corpus();
        let selection = FilterSelection::new().select(FilterCategory::Residence, "Atlantis");
        let result = apply(&triples, &selection);
        assert!(result.is_empty());
        assert_eq!(result.edge_count(), 0);
    }

    #[test]
    fn unknown_category_names_are_noops() {
        let triples = corpus();
        let selection = FilterSelection::from_named([("not_a_category", vec!["x"])]);
        let result = apply(&triples, &selection);
        assert_eq!(result.node_count(), 5);
    }

    #[test]
    fn admitted_nodes_satisfy_every_active_category() {
        let triples = corpus();
        let selection = FilterSelection::new().select(FilterCategory::Communities, "Surfing");
        let result = apply(&triples, &selection);
        // Every admitted node participates in a community triple matching
        // "Surfing" as subject or object.
        for node in &result.nodes {
            let touches = triples.iter().any(|t| {
                FilterCategory::Communities.spec().matches_predicate(&t.predicate)
                    && (EntityId::new(&t.subject) == *node || EntityId::new(&t.object) == *node)
                    && (EntityId::new(&t.subject) == id("Surfing")
                        || EntityId::new(&t.object) == id("Surfing"))
            });
            assert!(touches, "{node} admitted without a qualifying triple");
        }
    }

    #[test]
    fn connection_type_keeps_only_matched_endpoints() {
        let triples = corpus();
        let selection =
            FilterSelection::new().select(FilterCategory::ConnectionType, "ALSO_INVOLVED_IN");
        let result = apply(&triples, &selection);
        assert_eq!(result.edges, vec![TripleId(1), TripleId(3)]);
        // Honolulu and California touch only LIVES_IN edges and drop out.
        let expected: BTreeSet<EntityId> =
            [id("Alice"), id("Bob"), id("Surfing")].into_iter().collect();
        assert_eq!(result.nodes, expected);
    }

    #[test]
    fn connection_type_intersects_with_node_categories() {
        let triples = corpus();
        let selection = FilterSelection::new()
            .select(FilterCategory::Residence, "Honolulu")
            .select(FilterCategory::ConnectionType, "ALSO_INVOLVED_IN");
        let result = apply(&triples, &selection);
        // Residence admits {Alice, Honolulu, Surfing}; of those, only the
        // ALSO_INVOLVED_IN edge Alice-Surfing survives.
        assert_eq!(result.edges, vec![TripleId(1)]);
        let expected: BTreeSet<EntityId> = [id("Alice"), id("Surfing")].into_iter().collect();
        assert_eq!(result.nodes, expected);
    }

    #[test]
    fn selection_matching_is_case_insensitive() {
        let triples = corpus();
        let selection = FilterSelection::new().select(FilterCategory::Residence, "honolulu");
        let result = apply(&triples, &selection);
        assert!(result.nodes.contains(&id("Alice")));
    }

    #[test]
    fn duplicate_triples_duplicate_edges() {
        let mut triples = corpus();
        triples.push(Triple::new("Alice", "LIVES_IN", "Honolulu"));
        let result = apply(&triples, &FilterSelection::new());
        assert_eq!(result.edge_count(), 5);
    }

    #[test]
    fn sexuality_substring_membership() {
        let triples = vec![
            Triple::new("Surfing", "ASSOCIATED_WITH", "LGBTQ+ Friendly"),
            Triple::new("Diving", "ASSOCIATED_WITH", "Beach Cleanups"),
        ];
        let selection =
            FilterSelection::new().select(FilterCategory::Sexuality, "LGBTQ+ Friendly");
        let result = apply(&triples, &selection);
        assert!(result.nodes.contains(&id("Surfing")));
        assert!(!result.nodes.contains(&id("Diving")));
    }
}
