//! Engine facade: top-level API for the pilina system.
//!
//! The `Engine` owns the store, the embedding provider, and the
//! generation client, and holds the process-wide snapshot of loaded
//! triples, entities, and the extracted filter domain. Every filter and
//! retrieval call reads from one immutable snapshot; `reload` swaps in a
//! freshly built snapshot atomically, so readers never observe a
//! partially rebuilt cache.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embed::{EmbeddingProvider, HashEmbedder, HttpEmbedder, HttpEmbedderConfig};
use crate::entity::{EntityKind, EntityRegistry};
use crate::error::{EngineError, GenerateError, PilinaResult};
use crate::filter::evaluate::{self, FilteredGraph};
use crate::filter::extract::FilterDomain;
use crate::filter::FilterSelection;
use crate::graph::{analytics, CommunityGraph, GraphStats};
use crate::ingest;
use crate::retrieve::{ContextItem, RetrievalConfig, RetrievalOutcome, Retriever, render_sentence};
use crate::store::{DurableStore, MemStore, TripleStore};
use crate::synth::{self, Synthesizer, SynthesizerConfig};
use crate::triple::Triple;

/// Configuration for the pilina engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Data directory for persistence. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Use the deterministic offline embedder instead of the HTTP provider.
    pub offline: bool,
    /// Embedding provider settings.
    pub embedding: HttpEmbedderConfig,
    /// Generation provider settings.
    pub generation: SynthesizerConfig,
    /// Retrieval tunables (k, similarity floor, context budget).
    pub retrieval: RetrievalConfig,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> PilinaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::InvalidConfig {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: EngineConfig =
            toml::from_str(&content).map_err(|e| EngineError::InvalidConfig {
                message: format!("cannot parse {}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PilinaResult<()> {
        if self.retrieval.k == 0 {
            return Err(EngineError::InvalidConfig {
                message: "retrieval.k must be > 0".into(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.retrieval.min_similarity) {
            return Err(EngineError::InvalidConfig {
                message: "retrieval.min_similarity must be in [0, 1]".into(),
            }
            .into());
        }
        if self.retrieval.context_budget == 0 {
            return Err(EngineError::InvalidConfig {
                message: "retrieval.context_budget must be > 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// One immutable generation of loaded data. Rebuilt wholesale on reload.
struct Snapshot {
    triples: Arc<Vec<Triple>>,
    entities: EntityRegistry,
    filter_domain: FilterDomain,
}

impl Snapshot {
    fn build(triples: Vec<Triple>) -> Self {
        let entities = EntityRegistry::from_triples(&triples);
        let filter_domain = FilterDomain::extract(&triples);
        Self {
            triples: Arc::new(triples),
            entities,
            filter_domain,
        }
    }
}

/// Response of one filter application: the admitted subgraph plus its
/// statistics and analytics.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResponse {
    /// Display names of admitted nodes, sorted.
    pub nodes: Vec<String>,
    /// Admitted edges as (subject, predicate, object) display triples.
    pub edges: Vec<(String, String, String)>,
    pub stats: GraphStats,
    /// Admitted node counts per entity kind (main communities, communities).
    pub main_communities: usize,
    pub communities: usize,
    /// Most-connected admitted entities, display name with degree.
    pub top_degree: Vec<(String, usize)>,
}

/// Answer to a semantic query, with supporting evidence.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Retrieved triples backing the answer, similarity-sorted.
    pub supporting: Vec<ContextItem>,
    /// True when generation failed and `text` only lists the retrieved
    /// facts.
    pub degraded: bool,
}

/// The pilina semantic retrieval and filter engine.
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn TripleStore>,
    provider: Arc<dyn EmbeddingProvider>,
    synthesizer: Synthesizer,
    snapshot: RwLock<Arc<Snapshot>>,
    reindexing: AtomicBool,
}

impl Engine {
    /// Create a new engine with the given configuration, loading any
    /// persisted corpus from the data directory.
    pub fn new(config: EngineConfig) -> PilinaResult<Self> {
        config.validate()?;

        let store: Arc<dyn TripleStore> = match &config.data_dir {
            Some(dir) => {
                if dir.exists() && !dir.is_dir() {
                    return Err(EngineError::DataDir {
                        path: dir.display().to_string(),
                    }
                    .into());
                }
                Arc::new(DurableStore::open(dir)?)
            }
            None => Arc::new(MemStore::new(1024)),
        };

        let provider: Arc<dyn EmbeddingProvider> = if config.offline {
            Arc::new(HashEmbedder::new())
        } else {
            Arc::new(HttpEmbedder::new(config.embedding.clone()))
        };

        let synthesizer = Synthesizer::new(config.generation.clone());
        let snapshot = Snapshot::build(store.triples()?);
        info!(
            triples = snapshot.triples.len(),
            entities = snapshot.entities.len(),
            offline = config.offline,
            "initializing pilina engine"
        );

        Ok(Self {
            config,
            store,
            provider,
            synthesizer,
            snapshot: RwLock::new(Arc::new(snapshot)),
            reindexing: AtomicBool::new(false),
        })
    }

    fn snapshot(&self) -> Arc<Snapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds a valid snapshot; swap is atomic.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Rebuild the snapshot from the store and swap it in atomically.
    pub fn reload(&self) -> PilinaResult<()> {
        let fresh = Arc::new(Snapshot::build(self.store.triples()?));
        match self.snapshot.write() {
            Ok(mut guard) => *guard = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        Ok(())
    }

    /// Ingest triples from a file into the store. Returns the number of
    /// triples added.
    pub fn ingest_file(&self, path: &Path) -> PilinaResult<usize> {
        let triples = ingest::load_file(path)?;
        let count = triples.len();
        self.store.insert_triples(triples)?;
        self.reload()?;
        Ok(count)
    }

    /// The filter-domain surface: category name → ordered value list,
    /// regenerated on every reload.
    pub fn filter_domain(&self) -> BTreeMap<String, Vec<String>> {
        let snapshot = self.snapshot();
        snapshot
            .filter_domain
            .iter()
            .map(|(category, values)| (category.name().to_string(), values.to_vec()))
            .collect()
    }

    /// Apply a filter selection and describe the admitted subgraph.
    pub fn apply_filters(&self, selection: &FilterSelection) -> FilterResponse {
        let snapshot = self.snapshot();
        let filtered = evaluate::apply(&snapshot.triples, selection);
        self.describe(&snapshot, &filtered)
    }

    /// Apply filters from untyped `(name, values)` pairs (the filter query
    /// surface). Unknown names and stale values are ignored.
    pub fn apply_named<'a, I, V>(&self, pairs: I) -> FilterResponse
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: IntoIterator<Item = &'a str>,
    {
        self.apply_filters(&FilterSelection::from_named(pairs))
    }

    fn describe(&self, snapshot: &Snapshot, filtered: &FilteredGraph) -> FilterResponse {
        let graph = CommunityGraph::project(&snapshot.triples, filtered);
        let stats = graph.stats();

        let nodes: Vec<String> = filtered
            .nodes
            .iter()
            .map(|id| snapshot.entities.display_of(id))
            .collect();
        let edges: Vec<(String, String, String)> = filtered
            .edges
            .iter()
            .filter_map(|id| snapshot.triples.get(id.0 as usize))
            .map(|t| {
                (
                    t.subject.clone(),
                    t.predicate.as_str().to_string(),
                    t.object.clone(),
                )
            })
            .collect();

        let kinds = analytics::kind_counts(&graph, &snapshot.entities);
        let top_degree = analytics::degree_centrality(&graph)
            .into_iter()
            .take(5)
            .map(|c| (snapshot.entities.display_of(&c.entity), c.degree))
            .collect();

        FilterResponse {
            nodes,
            edges,
            stats,
            main_communities: kinds.get(&EntityKind::MainCommunity).copied().unwrap_or(0),
            communities: kinds.get(&EntityKind::Community).copied().unwrap_or(0),
            top_degree,
        }
    }

    /// Retrieve the semantic context for a query, without generation.
    pub fn retrieve(&self, query: &str, k: Option<usize>) -> PilinaResult<RetrievalOutcome> {
        let retriever = Retriever::new(
            self.provider.as_ref(),
            self.store.as_ref(),
            self.config.retrieval.clone(),
        );
        Ok(retriever.retrieve(query, k)?)
    }

    /// Answer a free-text question over the corpus.
    ///
    /// Retrieval failure propagates; generation failure degrades to
    /// showing the retrieved facts instead of failing the call.
    pub fn ask(&self, query: &str, k: Option<usize>) -> PilinaResult<Answer> {
        let retriever = Retriever::new(
            self.provider.as_ref(),
            self.store.as_ref(),
            self.config.retrieval.clone(),
        );
        let outcome = retriever.retrieve(query, k)?;

        let items = match &outcome {
            RetrievalOutcome::Context(items) => items.clone(),
            RetrievalOutcome::NoRelevantContext => {
                return Ok(Answer {
                    text: "No relevant information found in the knowledge graph.".into(),
                    supporting: Vec::new(),
                    degraded: false,
                });
            }
        };

        let context = retriever.context_text(&items);
        match self.synthesizer.synthesize(query, &context) {
            Ok(text) => Ok(Answer {
                text,
                supporting: items,
                degraded: false,
            }),
            Err(err @ (GenerateError::Unavailable { .. } | GenerateError::RateLimited { .. })) => {
                tracing::warn!(error = %err, "generation unavailable, degrading to retrieved facts");
                Ok(Answer {
                    text: synth::degraded_answer(&items),
                    supporting: items,
                    degraded: true,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Recompute embeddings for every triple and write them back in one
    /// atomic batch. Single-flight: a second call while one is running
    /// fails with [`EngineError::ReindexInFlight`]. Read traffic keeps
    /// serving the previous generation until the final reload.
    pub fn reindex(&self) -> PilinaResult<usize> {
        if self.reindexing.swap(true, Ordering::SeqCst) {
            return Err(EngineError::ReindexInFlight.into());
        }
        let result = self.reindex_inner();
        self.reindexing.store(false, Ordering::SeqCst);
        result
    }

    fn reindex_inner(&self) -> PilinaResult<usize> {
        let triples = self.store.triples()?;
        if triples.is_empty() {
            return Ok(0);
        }

        let sentences: Vec<String> = triples.iter().map(render_sentence).collect();
        let vectors = self.provider.embed_batch(&sentences)?;

        let batch: Vec<(crate::triple::TripleId, Vec<f32>)> = vectors
            .into_iter()
            .enumerate()
            .map(|(i, v)| (crate::triple::TripleId(i as u64), v))
            .collect();
        let count = batch.len();
        self.store.store_embeddings(&batch)?;
        self.reload()?;
        info!(count, "reindex complete");
        Ok(count)
    }

    /// Full corpus snapshot (for export).
    pub fn triples(&self) -> Arc<Vec<Triple>> {
        Arc::clone(&self.snapshot().triples)
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Summary of the engine state.
    pub fn info(&self) -> EngineInfo {
        let snapshot = self.snapshot();
        let embedded = snapshot
            .triples
            .iter()
            .filter(|t| t.embedding.is_some())
            .count();
        let (main_communities, communities) = snapshot.entities.kind_counts();
        EngineInfo {
            triple_count: snapshot.triples.len(),
            embedded_count: embedded,
            entity_count: snapshot.entities.len(),
            main_communities,
            communities,
            persistent: self.config.data_dir.is_some(),
            offline: self.config.offline,
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("triples", &self.store.len())
            .finish()
    }
}

/// Summary information about the engine state.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    pub triple_count: usize,
    pub embedded_count: usize,
    pub entity_count: usize,
    pub main_communities: usize,
    pub communities: usize,
    pub persistent: bool,
    pub offline: bool,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pilina engine info")?;
        writeln!(f, "  triples:          {}", self.triple_count)?;
        writeln!(f, "  embedded:         {}", self.embedded_count)?;
        writeln!(f, "  entities:         {}", self.entity_count)?;
        writeln!(f, "  main communities: {}", self.main_communities)?;
        writeln!(f, "  communities:      {}", self.communities)?;
        writeln!(f, "  persistent:       {}", self.persistent)?;
        writeln!(f, "  offline:          {}", self.offline)?;
        Ok(())
    }
}
