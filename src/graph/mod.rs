//! Graph projection and statistics over a filtered subgraph.
//!
//! The filter evaluator produces node/edge id sets; this module projects
//! them onto a `petgraph` undirected graph for statistics and analytics.
//! The projection is ephemeral — rebuilt per request, never cached.

pub mod analytics;

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;

use crate::entity::EntityId;
use crate::filter::evaluate::FilteredGraph;
use crate::triple::{Triple, TripleId};

/// Undirected projection of an admitted subgraph.
///
/// Parallel edges are kept: duplicate triples are legal and statistics
/// count every occurrence.
pub struct CommunityGraph {
    graph: UnGraph<EntityId, TripleId>,
    indices: HashMap<EntityId, NodeIndex>,
}

impl CommunityGraph {
    /// Project a filter result onto an undirected graph.
    pub fn project(triples: &[Triple], filtered: &FilteredGraph) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut indices = HashMap::with_capacity(filtered.node_count());

        for node in &filtered.nodes {
            let idx = graph.add_node(node.clone());
            indices.insert(node.clone(), idx);
        }

        for &edge in &filtered.edges {
            let Some(triple) = triples.get(edge.0 as usize) else {
                continue;
            };
            let subject = EntityId::new(&triple.subject);
            let object = EntityId::new(&triple.object);
            if let (Some(&a), Some(&b)) = (indices.get(&subject), indices.get(&object)) {
                graph.add_edge(a, b, edge);
            }
        }

        Self { graph, indices }
    }

    /// The underlying petgraph structure.
    pub fn graph(&self) -> &UnGraph<EntityId, TripleId> {
        &self.graph
    }

    /// Node index for an entity, if admitted.
    pub fn index_of(&self, entity: &EntityId) -> Option<NodeIndex> {
        self.indices.get(entity).copied()
    }

    /// Summary statistics of the projected subgraph.
    pub fn stats(&self) -> GraphStats {
        GraphStats::measure(self.graph.node_count(), self.graph.edge_count())
    }
}

/// The four summary statistics of an admitted subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub avg_degree: f64,
}

impl GraphStats {
    /// Compute statistics from raw counts (undirected interpretation).
    ///
    /// All measures are 0 for an empty graph. Parallel edges can push the
    /// raw edge/pair ratio past 1, so density is clamped to [0, 1].
    pub fn measure(nodes: usize, edges: usize) -> Self {
        let (density, avg_degree) = if nodes == 0 {
            (0.0, 0.0)
        } else {
            let pairs = (nodes * nodes.saturating_sub(1)) / 2;
            let density = edges as f64 / pairs.max(1) as f64;
            let avg_degree = 2.0 * edges as f64 / nodes as f64;
            (density.min(1.0), avg_degree)
        };
        Self {
            nodes,
            edges,
            density,
            avg_degree,
        }
    }
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} nodes, {} edges, density {:.3}, avg degree {:.2}",
            self.nodes, self.edges, self.density, self.avg_degree
        )
    }
}
