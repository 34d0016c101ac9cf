//! Core triple types for the pilina engine.
//!
//! A [`Triple`] is the atomic unit of the knowledge graph: a
//! (subject, predicate, object) relationship record with an optional
//! precomputed embedding and free-form metadata. Triples are immutable once
//! ingested, and duplicates are legal — the corpus comes from survey CSVs
//! where the same relationship can appear more than once, and edge
//! statistics intentionally count every occurrence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Embedding dimension the corpus is indexed with (all-MiniLM-class models).
pub const EMBEDDING_DIM: usize = 384;

/// Stable per-load reference to a triple.
///
/// Assigned sequentially at load time; used as the edge identity in filter
/// results and as the key for embedding write-back during reindex.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct TripleId(pub u64);

impl TripleId {
    /// Get the underlying `u64` value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TripleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t:{}", self.0)
    }
}

/// A predicate (relation) name in canonical form.
///
/// The corpus convention is SCREAMING_SNAKE (`LIVES_IN`, `ALSO_INVOLVED_IN`);
/// construction is case-insensitive and maps spaces and hyphens to
/// underscores so that `lives in` and `LIVES_IN` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Predicate(String);

impl Predicate {
    /// Create a predicate from any spelling, canonicalizing it.
    pub fn new(raw: &str) -> Self {
        let canonical: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                _ => c.to_ascii_uppercase(),
            })
            .collect();
        Predicate(canonical)
    }

    /// The canonical predicate name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercased, space-separated rendering for sentence templates
    /// (`ALSO_INVOLVED_IN` → "also involved in").
    pub fn as_phrase(&self) -> String {
        self.0.to_ascii_lowercase().replace('_', " ")
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Predicate {
    fn from(raw: &str) -> Self {
        Predicate::new(raw)
    }
}

/// A subject–predicate–object relationship record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    /// Display-cased subject entity name.
    pub subject: String,
    /// Canonical predicate.
    pub predicate: Predicate,
    /// Display-cased object value (entity name or attribute value).
    pub object: String,
    /// Precomputed embedding of the rendered sentence, absent until a
    /// reindex has run (or for predicates excluded from semantic indexing).
    pub embedding: Option<Vec<f32>>,
    /// Free-form scalar metadata carried from ingestion.
    pub metadata: BTreeMap<String, String>,
}

impl Triple {
    /// Create a new triple with no embedding and empty metadata.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<Predicate>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            embedding: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The (subject, predicate, object) identity used for retrieval
    /// deduplication. Duplicate triples share the same identity but remain
    /// distinct records in the store.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.subject, self.predicate.as_str(), &self.object)
    }
}

/// Convert a predicate `From<&str>` without an extra import at call sites.
impl From<String> for Predicate {
    fn from(raw: String) -> Self {
        Predicate::new(&raw)
    }
}
