//! # pilina
//!
//! A semantic retrieval and multi-dimensional filter engine over a
//! community knowledge graph of subject–predicate–object triples.
//!
//! ## Architecture
//!
//! - **Filtering** (`filter`): static category→predicate configuration,
//!   filter-domain extraction, and exact subgraph admission (OR within a
//!   category, AND across categories)
//! - **Graph** (`graph`): petgraph projection of the admitted subgraph
//!   with statistics and centrality analytics
//! - **Retrieval** (`retrieve`): cosine kNN over precomputed embeddings,
//!   deduplicated and truncated into a bounded context
//! - **Synthesis** (`synth`): generation-provider boundary with degraded
//!   mode when the provider is down
//! - **Storage** (`store`): in-memory HNSW index plus an optional
//!   redb-persisted corpus
//!
//! ## Library usage
//!
//! ```no_run
//! use pilina::engine::{Engine, EngineConfig};
//! use pilina::filter::{FilterCategory, FilterSelection};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! engine.ingest_file(std::path::Path::new("triples.txt")).unwrap();
//! let selection = FilterSelection::new().select(FilterCategory::Residence, "Honolulu");
//! let response = engine.apply_filters(&selection);
//! println!("{}", response.stats);
//! ```

pub mod embed;
pub mod engine;
pub mod entity;
pub mod error;
pub mod filter;
pub mod graph;
pub mod ingest;
pub mod retrieve;
pub mod store;
pub mod synth;
pub mod triple;

pub use engine::{Engine, EngineConfig};
pub use error::{PilinaError, PilinaResult};
pub use triple::{Predicate, Triple, TripleId};
