//! Embedding providers: text → fixed-length dense vectors.
//!
//! The retriever and the reindex batch both go through the
//! [`EmbeddingProvider`] trait; the stored corpus and any query vector
//! must come from the same provider, since nearest-neighbor scores are
//! only meaningful inside one vector space.

pub mod http;
pub mod offline;

use crate::error::EmbedError;
use crate::triple::EMBEDDING_DIM;

pub use http::{HttpEmbedder, HttpEmbedderConfig};
pub use offline::HashEmbedder;

/// Result alias for embedding operations.
pub type EmbedResult<T> = std::result::Result<T, EmbedError>;

/// A source of fixed-dimension embedding vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a vector of [`dimension`](Self::dimension) floats.
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>>;

    /// Embed a batch of texts, preserving order. The default delegates to
    /// [`embed`](Self::embed) per item; providers with a bulk endpoint
    /// should override.
    fn embed_batch(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Vector dimension this provider produces.
    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Validate a provider response vector against the index dimension.
pub(crate) fn check_dimension(vector: &[f32]) -> EmbedResult<()> {
    if vector.len() != EMBEDDING_DIM {
        return Err(EmbedError::DimensionMismatch {
            expected: EMBEDDING_DIM,
            actual: vector.len(),
        });
    }
    Ok(())
}
