//! ACID-durable triple store backed by redb.
//!
//! Triples are bincode-encoded under their insertion index; the HNSW
//! similarity index is held in memory (via [`MemStore`]) and rebuilt from
//! the persisted embeddings on open. All writes go through redb
//! transactions, so an embedding batch is committed atomically or not at
//! all.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::triple::{EMBEDDING_DIM, Triple, TripleId};

use super::{MemStore, SearchHit, StoreResult, TripleStore};

/// Triples by insertion index (bincode-encoded records).
const TRIPLES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("triples");

/// redb-backed store with an in-memory similarity index.
pub struct DurableStore {
    db: Arc<Database>,
    cache: MemStore,
}

impl DurableStore {
    /// Open or create a durable store in the given directory, rebuilding
    /// the similarity index from persisted embeddings.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("pilina.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;

        let persisted = load_all(&db)?;
        let cache = MemStore::new(persisted.len().max(64));
        cache.insert_triples(persisted)?;
        Ok(Self {
            db: Arc::new(db),
            cache,
        })
    }

    fn persist(&self, base_index: u64, triples: &[Triple]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(TRIPLES_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            for (offset, triple) in triples.iter().enumerate() {
                let encoded = bincode::serialize(triple).map_err(|e| StoreError::Serialization {
                    message: format!("failed to encode triple: {e}"),
                })?;
                table
                    .insert(base_index + offset as u64, encoded.as_slice())
                    .map_err(|e| StoreError::Redb {
                        message: format!("insert failed: {e}"),
                    })?;
            }
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }
}

/// Read every persisted triple in key order.
fn load_all(db: &Database) -> StoreResult<Vec<Triple>> {
    let txn = db.begin_read().map_err(|e| StoreError::Redb {
        message: format!("begin_read failed: {e}"),
    })?;
    let table = match txn.open_table(TRIPLES_TABLE) {
        Ok(table) => table,
        // Fresh database: the table does not exist until first write.
        Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::Redb {
                message: format!("open_table failed: {e}"),
            });
        }
    };

    let mut triples = Vec::new();
    for entry in table.iter().map_err(|e| StoreError::Redb {
        message: format!("iter failed: {e}"),
    })? {
        let (_, value) = entry.map_err(|e| StoreError::Redb {
            message: format!("cursor failed: {e}"),
        })?;
        let triple: Triple =
            bincode::deserialize(value.value()).map_err(|e| StoreError::Serialization {
                message: format!("stored triple is unreadable: {e}"),
            })?;
        triples.push(triple);
    }
    Ok(triples)
}

impl TripleStore for DurableStore {
    fn insert_triples(&self, triples: Vec<Triple>) -> StoreResult<()> {
        let base_index = self.cache.len() as u64;
        self.persist(base_index, &triples)?;
        self.cache.insert_triples(triples)
    }

    fn triples(&self) -> StoreResult<Vec<Triple>> {
        self.cache.triples()
    }

    fn nearest(&self, query: &[f32], k: usize) -> StoreResult<Vec<SearchHit>> {
        self.cache.nearest(query, k)
    }

    fn store_embeddings(&self, batch: &[(TripleId, Vec<f32>)]) -> StoreResult<()> {
        // Validate and stage the batch against a corpus copy, commit to
        // disk, and only then touch the live cache. A failed transaction
        // must not leave readers serving state the database never saw.
        let mut staged = self.cache.triples()?;
        for (triple_id, embedding) in batch {
            if embedding.len() != EMBEDDING_DIM {
                return Err(StoreError::DimensionMismatch {
                    expected: EMBEDDING_DIM,
                    actual: embedding.len(),
                });
            }
            let slot = staged
                .get_mut(triple_id.0 as usize)
                .ok_or(StoreError::NotFound {
                    triple_id: triple_id.0,
                })?;
            slot.embedding = Some(embedding.clone());
        }

        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(TRIPLES_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            for (triple_id, _) in batch {
                let triple = &staged[triple_id.0 as usize];
                let encoded = bincode::serialize(triple).map_err(|e| StoreError::Serialization {
                    message: format!("failed to encode triple: {e}"),
                })?;
                table
                    .insert(triple_id.0, encoded.as_slice())
                    .map_err(|e| StoreError::Redb {
                        message: format!("insert failed: {e}"),
                    })?;
            }
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;

        self.cache.store_embeddings(batch)
    }

    fn len(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("triples", &self.len())
            .finish()
    }
}
