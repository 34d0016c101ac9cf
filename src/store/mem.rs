//! In-memory triple store with HNSW cosine similarity search.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use anndists::dist::DistCosine;
use dashmap::DashMap;
use hnsw_rs::hnsw::Hnsw;

use crate::error::StoreError;
use crate::triple::{EMBEDDING_DIM, Triple, TripleId};

use super::{SearchHit, StoreResult, TripleStore};

/// In-memory corpus plus an HNSW approximate nearest-neighbor index.
///
/// The corpus vector is append-only; embeddings are attached in place by
/// `store_embeddings` under the same write lock that guards enumeration,
/// so readers never observe a half-applied batch.
pub struct MemStore {
    triples: RwLock<Vec<Triple>>,
    /// HNSW index over embedded triples. Cosine distance; similarity is
    /// recovered as `1 - distance`.
    hnsw: RwLock<Hnsw<'static, f32, DistCosine>>,
    /// HNSW internal id → triple reference.
    id_to_triple: DashMap<usize, TripleId>,
    next_hnsw_id: AtomicUsize,
}

// Safety: Hnsw synchronizes its internals; the RwLock provides the outer
// synchronization for rebuilds.
unsafe impl Send for MemStore {}
unsafe impl Sync for MemStore {}

impl MemStore {
    /// Create an empty store with a capacity hint for the index.
    pub fn new(max_elements: usize) -> Self {
        Self {
            triples: RwLock::new(Vec::new()),
            hnsw: RwLock::new(Self::build_hnsw(max_elements)),
            id_to_triple: DashMap::new(),
            next_hnsw_id: AtomicUsize::new(0),
        }
    }

    /// Create a store pre-loaded with a corpus. Triples that already carry
    /// an embedding are indexed immediately.
    pub fn with_triples(triples: Vec<Triple>) -> StoreResult<Self> {
        let store = Self::new(triples.len().max(64));
        store.insert_triples(triples)?;
        Ok(store)
    }

    fn build_hnsw(max_elements: usize) -> Hnsw<'static, f32, DistCosine> {
        // max_nb_connection 16 and ef_construction 200 are standard for
        // a few-hundred-dimensional space at this corpus size.
        let max_elements = max_elements.max(64);
        let max_layer = (max_elements as f64).log2().ceil() as usize;
        let max_layer = max_layer.clamp(4, 16);
        Hnsw::new(max_layer, max_elements, 16, 200, DistCosine {})
    }

    fn index_embedding(&self, triple_id: TripleId, embedding: &[f32]) -> StoreResult<()> {
        if embedding.len() != EMBEDDING_DIM {
            return Err(StoreError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: embedding.len(),
            });
        }
        let data: Vec<f32> = embedding.to_vec();
        let hnsw_id = self.next_hnsw_id.fetch_add(1, Ordering::Relaxed);
        let hnsw = self.hnsw.read().map_err(|_| StoreError::Index {
            message: "HNSW lock poisoned".into(),
        })?;
        hnsw.insert((&data, hnsw_id));
        self.id_to_triple.insert(hnsw_id, triple_id);
        Ok(())
    }

    /// Throw away the index and re-insert every embedded triple. HNSW has
    /// no remove, so superseding a vector means rebuilding.
    fn rebuild_index(&self, triples: &[Triple]) -> StoreResult<()> {
        {
            let mut hnsw = self.hnsw.write().map_err(|_| StoreError::Index {
                message: "HNSW lock poisoned".into(),
            })?;
            *hnsw = Self::build_hnsw(triples.len());
        }
        self.id_to_triple.clear();
        self.next_hnsw_id.store(0, Ordering::Relaxed);
        for (idx, triple) in triples.iter().enumerate() {
            if let Some(embedding) = &triple.embedding {
                self.index_embedding(TripleId(idx as u64), embedding)?;
            }
        }
        Ok(())
    }
}

impl TripleStore for MemStore {
    fn insert_triples(&self, triples: Vec<Triple>) -> StoreResult<()> {
        let mut guard = self.triples.write().map_err(|_| StoreError::Index {
            message: "corpus lock poisoned".into(),
        })?;
        for triple in triples {
            let triple_id = TripleId(guard.len() as u64);
            if let Some(embedding) = triple.embedding.clone() {
                self.index_embedding(triple_id, &embedding)?;
            }
            guard.push(triple);
        }
        Ok(())
    }

    fn triples(&self) -> StoreResult<Vec<Triple>> {
        let guard = self.triples.read().map_err(|_| StoreError::Index {
            message: "corpus lock poisoned".into(),
        })?;
        Ok(guard.clone())
    }

    fn nearest(&self, query: &[f32], k: usize) -> StoreResult<Vec<SearchHit>> {
        if query.len() != EMBEDDING_DIM {
            return Err(StoreError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: query.len(),
            });
        }
        if k == 0 || self.id_to_triple.is_empty() {
            return Ok(Vec::new());
        }

        let query: Vec<f32> = query.to_vec();
        let ef_search = (k * 2).max(32); // ef_search should be >= k
        let hnsw = self.hnsw.read().map_err(|_| StoreError::Index {
            message: "HNSW lock poisoned".into(),
        })?;
        let neighbours = hnsw.search(&query, k, ef_search);

        let mut hits: Vec<SearchHit> = neighbours
            .into_iter()
            .filter_map(|n| {
                let triple_id = *self.id_to_triple.get(&n.d_id)?.value();
                // Cosine distance -> similarity, clamped against float drift.
                let similarity = (1.0 - n.distance).clamp(0.0, 1.0);
                Some(SearchHit {
                    triple_id,
                    similarity,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn store_embeddings(&self, batch: &[(TripleId, Vec<f32>)]) -> StoreResult<()> {
        let mut guard = self.triples.write().map_err(|_| StoreError::Index {
            message: "corpus lock poisoned".into(),
        })?;

        // Validate the whole batch before touching anything: the write is
        // all-or-nothing.
        for (triple_id, embedding) in batch {
            if embedding.len() != EMBEDDING_DIM {
                return Err(StoreError::DimensionMismatch {
                    expected: EMBEDDING_DIM,
                    actual: embedding.len(),
                });
            }
            if triple_id.0 as usize >= guard.len() {
                return Err(StoreError::NotFound {
                    triple_id: triple_id.0,
                });
            }
        }

        for (triple_id, embedding) in batch {
            guard[triple_id.0 as usize].embedding = Some(embedding.clone());
        }
        // A triple in the batch may already be indexed under an older
        // vector; the only way to retire it is a full rebuild.
        self.rebuild_index(&guard)
    }

    fn len(&self) -> usize {
        self.triples.read().map(|g| g.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemStore")
            .field("triples", &self.len())
            .field("indexed", &self.id_to_triple.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[i] = 1.0;
        v
    }

    fn blend(a: usize, b: usize, weight: f32) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[a] = weight;
        v[b] = 1.0 - weight;
        v
    }

    #[test]
    fn insert_and_enumerate_keeps_order() {
        let store = MemStore::new(16);
        store
            .insert_triples(vec![
                Triple::new("Alice", "LIVES_IN", "Honolulu"),
                Triple::new("Bob", "LIVES_IN", "California"),
            ])
            .unwrap();
        let triples = store.triples().unwrap();
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].subject, "Alice");
        assert_eq!(triples[1].subject, "Bob");
    }

    #[test]
    fn nearest_ranks_by_similarity() {
        let store = MemStore::new(16);
        store
            .insert_triples(vec![
                Triple::new("Alice", "LIVES_IN", "Honolulu").with_embedding(axis(0)),
                Triple::new("Bob", "LIVES_IN", "California").with_embedding(axis(1)),
                Triple::new("Carol", "LIVES_IN", "Maui").with_embedding(blend(0, 1, 0.9)),
            ])
            .unwrap();

        let hits = store.nearest(&axis(0), 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].triple_id, TripleId(0));
        assert_eq!(hits[1].triple_id, TripleId(2));
        assert!(hits[0].similarity >= hits[1].similarity);
        assert!(hits[1].similarity >= hits[2].similarity);
    }

    #[test]
    fn nearest_respects_k() {
        let store = MemStore::new(16);
        let triples: Vec<Triple> = (0..5)
            .map(|i| Triple::new(format!("E{i}"), "ASSOCIATED_WITH", "X").with_embedding(axis(i)))
            .collect();
        store.insert_triples(triples).unwrap();
        let hits = store.nearest(&axis(0), 3).unwrap();
        assert!(hits.len() <= 3);
    }

    #[test]
    fn nearest_rejects_wrong_dimension() {
        let store = MemStore::new(16);
        let err = store.nearest(&[1.0, 0.0], 3).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let store = MemStore::new(16);
        store
            .insert_triples(vec![Triple::new("Alice", "LIVES_IN", "Honolulu")])
            .unwrap();
        // Triple present but never embedded: nothing to search.
        assert!(store.nearest(&axis(0), 5).unwrap().is_empty());
    }

    #[test]
    fn store_embeddings_attaches_and_indexes() {
        let store = MemStore::new(16);
        store
            .insert_triples(vec![Triple::new("Alice", "LIVES_IN", "Honolulu")])
            .unwrap();
        store
            .store_embeddings(&[(TripleId(0), axis(0))])
            .unwrap();

        let triples = store.triples().unwrap();
        assert!(triples[0].embedding.is_some());
        let hits = store.nearest(&axis(0), 1).unwrap();
        assert_eq!(hits[0].triple_id, TripleId(0));
        assert!(hits[0].similarity > 0.99);
    }

    #[test]
    fn restoring_an_embedding_supersedes_the_old_vector() {
        let store = MemStore::new(16);
        store
            .insert_triples(vec![Triple::new("Alice", "LIVES_IN", "Honolulu")])
            .unwrap();
        store.store_embeddings(&[(TripleId(0), axis(0))]).unwrap();
        store.store_embeddings(&[(TripleId(0), axis(1))]).unwrap();

        // The first-generation vector must be gone from the index.
        let hits = store.nearest(&axis(0), 1).unwrap();
        assert!(hits.is_empty() || hits[0].similarity < 0.5);
        let hits = store.nearest(&axis(1), 1).unwrap();
        assert_eq!(hits[0].triple_id, TripleId(0));
        assert!(hits[0].similarity > 0.99);
    }

    #[test]
    fn store_embeddings_rejects_unknown_triple() {
        let store = MemStore::new(16);
        let err = store
            .store_embeddings(&[(TripleId(42), axis(0))])
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { triple_id: 42 }));
    }

    #[test]
    fn duplicate_triples_are_kept() {
        let store = MemStore::new(16);
        let t = Triple::new("Alice", "LIVES_IN", "Honolulu");
        store.insert_triples(vec![t.clone(), t]).unwrap();
        assert_eq!(store.len(), 2);
    }
}
