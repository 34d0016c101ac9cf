//! Triple storage: bulk enumeration, vector similarity search, and
//! atomic embedding writes.
//!
//! Two implementations share the [`TripleStore`] contract:
//! - [`MemStore`](mem::MemStore): in-memory corpus with an HNSW index
//! - [`DurableStore`](durable::DurableStore): redb-backed persistence
//!   layered over the in-memory index
//!
//! Embeddings live in the store, not in the retriever: they are computed
//! once at ingest/reindex time and only the query vector is embedded per
//! call.

pub mod durable;
pub mod mem;

use crate::error::StoreError;
use crate::triple::{Triple, TripleId};

pub use durable::DurableStore;
pub use mem::MemStore;

/// Result alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A similarity-search hit: a triple reference with its cosine score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub triple_id: TripleId,
    /// Cosine similarity in [0, 1] (1 = identical direction).
    pub similarity: f32,
}

/// Storage boundary for the triple corpus.
///
/// Implementations must support concurrent reads; `nearest` and `triples`
/// may be called from many request threads while a reindex writes
/// embeddings through `store_embeddings`.
pub trait TripleStore: Send + Sync {
    /// Append triples to the corpus. Duplicates are legal and kept.
    fn insert_triples(&self, triples: Vec<Triple>) -> StoreResult<()>;

    /// Bulk enumeration of the full corpus, scalar and vector properties
    /// included, in insertion order.
    fn triples(&self) -> StoreResult<Vec<Triple>>;

    /// k-nearest-neighbor search over the indexed embeddings, ranked by
    /// descending cosine similarity. At most `k` hits; fewer when the
    /// index holds fewer vectors.
    fn nearest(&self, query: &[f32], k: usize) -> StoreResult<Vec<SearchHit>>;

    /// Write a batch of freshly computed embeddings. The batch is applied
    /// atomically: readers observe either none or all of it.
    fn store_embeddings(&self, batch: &[(TripleId, Vec<f32>)]) -> StoreResult<()>;

    /// Number of stored triples.
    fn len(&self) -> usize;

    /// Whether the store holds no triples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
