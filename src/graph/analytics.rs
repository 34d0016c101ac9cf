//! Analytics over the projected subgraph: degree centrality and entity
//! kind tallies. Results are sorted by relevance (score desc) with the
//! entity key as a deterministic tie-break.

use std::collections::BTreeMap;

use crate::entity::{EntityKind, EntityRegistry};

use super::CommunityGraph;

/// Degree of a single node in the undirected projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeCentrality {
    pub entity: crate::entity::EntityId,
    pub degree: usize,
}

/// Compute degree centrality for every admitted node, sorted by degree
/// desc then entity key asc.
pub fn degree_centrality(graph: &CommunityGraph) -> Vec<DegreeCentrality> {
    let g = graph.graph();
    let mut results: Vec<DegreeCentrality> = g
        .node_indices()
        .map(|idx| DegreeCentrality {
            entity: g[idx].clone(),
            degree: g.edges(idx).count(),
        })
        .collect();
    results.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.entity.cmp(&b.entity)));
    results
}

/// Tally admitted nodes by entity kind. Unregistered entities count as
/// leaf communities, matching the derivation rule for unseen subjects.
pub fn kind_counts(graph: &CommunityGraph, registry: &EntityRegistry) -> BTreeMap<EntityKind, usize> {
    let g = graph.graph();
    let mut counts = BTreeMap::new();
    for idx in g.node_indices() {
        let kind = registry
            .kind_of(g[idx].as_str())
            .unwrap_or(EntityKind::Community);
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}
