//! Deterministic offline embedder.
//!
//! Hashes each whitespace token onto the unit hypersphere and sums the
//! token vectors into a normalized bag-of-tokens embedding. Not a
//! semantic model: texts sharing tokens land close together, disjoint
//! texts land (near-)orthogonal. Enough for offline operation and for
//! exercising the retrieval path in tests without a provider.

use std::hash::{DefaultHasher, Hash, Hasher};

use crate::triple::EMBEDDING_DIM;

use super::{EmbedResult, EmbeddingProvider};

/// Hash-based bag-of-tokens embedder.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn new() -> Self {
        Self
    }

    fn token_vector(token: &str) -> Vec<f32> {
        // Each token gets a reproducible pseudo-random direction seeded by
        // its hash.
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        let mut v = Vec::with_capacity(EMBEDDING_DIM);
        for _ in 0..EMBEDDING_DIM {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let unit = (state >> 11) as f32 / (1u64 << 53) as f32;
            v.push(unit * 2.0 - 1.0);
        }
        v
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let mut sum = vec![0.0f32; EMBEDDING_DIM];
        let mut tokens = 0usize;
        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            tokens += 1;
            for (acc, x) in sum.iter_mut().zip(Self::token_vector(&token)) {
                *acc += x;
            }
        }

        if tokens == 0 {
            return Ok(sum); // all-zero vector for empty text
        }

        let norm = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut sum {
                *x /= norm;
            }
        }
        Ok(sum)
    }

    fn embed_batch(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
        use rayon::prelude::*;
        texts.par_iter().map(|t| self.embed(t)).collect()
    }
}
