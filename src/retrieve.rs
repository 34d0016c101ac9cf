//! Context retrieval: embed the query, search the vector index, and
//! shape the hits into a bounded textual context.
//!
//! This is the component that keeps generation cost bounded: instead of
//! handing the whole corpus to the synthesizer, only the top-k similar
//! triples survive, deduplicated and truncated to a character budget.
//! Stored embeddings are never recomputed here; only the query vector is
//! embedded per call.

use tracing::debug;

use crate::embed::EmbeddingProvider;
use crate::error::RetrieveError;
use crate::store::TripleStore;
use crate::triple::{Triple, TripleId};

/// Result alias for retrieval operations.
pub type RetrieveResult<T> = std::result::Result<T, RetrieveError>;

/// Tunables for one retrieval pass.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest neighbors to request.
    pub k: usize,
    /// Minimum cosine similarity for a hit to count as relevant.
    pub min_similarity: f32,
    /// Character budget for the rendered context handed to generation.
    pub context_budget: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 8,
            min_similarity: 0.1,
            context_budget: 4_000,
        }
    }
}

/// One retrieved triple with its score and rendered sentence. Ephemeral,
/// produced per query and never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextItem {
    pub triple_id: TripleId,
    /// Cosine similarity in [0, 1].
    pub similarity: f32,
    /// Deterministic natural-language rendering of the triple.
    pub text: String,
}

/// Outcome of a retrieval pass.
///
/// "No relevant context" is a valid result, deliberately distinct from a
/// provider failure: the former means the corpus holds nothing close
/// enough, the latter means we could not look.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    Context(Vec<ContextItem>),
    NoRelevantContext,
}

impl RetrievalOutcome {
    /// The retrieved items, empty when no relevant context was found.
    pub fn items(&self) -> &[ContextItem] {
        match self {
            RetrievalOutcome::Context(items) => items,
            RetrievalOutcome::NoRelevantContext => &[],
        }
    }
}

/// The retrieval pipeline over a provider and a store.
pub struct Retriever<'a> {
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn TripleStore,
    config: RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(
        provider: &'a dyn EmbeddingProvider,
        store: &'a dyn TripleStore,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Retrieve the context for a query: top-k hits, similarity-sorted,
    /// deduplicated by triple identity, floored by minimum similarity.
    pub fn retrieve(&self, query: &str, k: Option<usize>) -> RetrieveResult<RetrievalOutcome> {
        let k = k.unwrap_or(self.config.k);
        if k == 0 {
            return Ok(RetrievalOutcome::NoRelevantContext);
        }

        let query_vector = self
            .provider
            .embed(query)
            .map_err(|source| RetrieveError::Unavailable { source })?;

        // Over-fetch to leave room for dedupe collapsing identical triples.
        let hits = self
            .store
            .nearest(&query_vector, k * 2)
            .map_err(|source| RetrieveError::Search { source })?;
        let corpus = self
            .store
            .triples()
            .map_err(|source| RetrieveError::Search { source })?;

        let mut seen: Vec<(String, String, String)> = Vec::new();
        let mut items: Vec<ContextItem> = Vec::new();
        for hit in hits {
            if hit.similarity < self.config.min_similarity {
                continue;
            }
            let Some(triple) = corpus.get(hit.triple_id.0 as usize) else {
                continue;
            };
            // Input is similarity-sorted, so first occurrence wins dedupe.
            let identity = (
                triple.subject.clone(),
                triple.predicate.as_str().to_string(),
                triple.object.clone(),
            );
            if seen.contains(&identity) {
                continue;
            }
            seen.push(identity);
            items.push(ContextItem {
                triple_id: hit.triple_id,
                similarity: hit.similarity,
                text: render_sentence(triple),
            });
            if items.len() == k {
                break;
            }
        }

        debug!(query_chars = query.len(), hits = items.len(), "retrieval pass");
        if items.is_empty() {
            Ok(RetrievalOutcome::NoRelevantContext)
        } else {
            Ok(RetrievalOutcome::Context(items))
        }
    }

    /// Join retrieved items into the bounded context text, one sentence
    /// per line, cut off at the character budget.
    pub fn context_text(&self, items: &[ContextItem]) -> String {
        bounded_context(items, self.config.context_budget)
    }
}

/// Render a triple as a deterministic natural-language sentence. A fixed
/// per-predicate template where one exists, otherwise the predicate read
/// as a lower-case phrase.
pub fn render_sentence(triple: &Triple) -> String {
    let s = &triple.subject;
    let o = &triple.object;
    match triple.predicate.as_str() {
        "LIVES_IN" => format!("{s} lives in {o}."),
        "ORIGINALLY_FROM" => format!("{s} is originally from {o}."),
        "HAS_MAIN_COMMUNITY" => format!("{s} has the main community {o}."),
        "ASSOCIATED_WITH" => format!("{s} is associated with {o}."),
        "ALSO_INVOLVED_IN" => format!("{s} is also involved in {o}."),
        "HAS_THE_GENDER" => format!("{s} has the gender {o}."),
        "HAS_SEXUALITY" => format!("{s} has the sexuality {o}."),
        "HAS_RELIGIOUS_VIEW" => format!("{s} has the religious view {o}."),
        "HAS_EDUCATION_LEVEL" => format!("{s} has the education level {o}."),
        "HAS_OCCUPATION" => format!("{s} works as {o}."),
        "IN_AGE_RANGE_OF" => format!("{s} is in the age range of {o}."),
        "FROM_COUNTRY" => format!("{s} is from the country {o}."),
        _ => format!("{s} {} {o}.", triple.predicate.as_phrase()),
    }
}

/// Accumulate sentences until the character budget would be exceeded; if
/// the first sentence alone is too long it is cut at a char boundary.
/// The budget counts chars throughout, never bytes.
fn bounded_context(items: &[ContextItem], budget: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for item in items {
        let chars = item.text.chars().count();
        let extra = chars + if out.is_empty() { 0 } else { 1 };
        if used + extra > budget {
            if out.is_empty() {
                out.extend(item.text.chars().take(budget));
            }
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&item.text);
        used += extra;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{EmbedResult, HashEmbedder};
    use crate::store::MemStore;
    use crate::triple::EMBEDDING_DIM;

    /// Provider returning one fixed vector for every input, so tests can
    /// steer the query embedding exactly.
    struct FixedEmbedder(Vec<f32>);

    impl EmbeddingProvider for FixedEmbedder {
        fn embed(&self, _text: &str) -> EmbedResult<Vec<f32>> {
            Ok(self.0.clone())
        }
    }

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

    fn climbing_corpus() -> MemStore {
        let store = MemStore::new(16);
        store
            .insert_triples(vec![
                Triple::new("Alice", "ALSO_INVOLVED_IN", "Rock Climbing")
                    .with_embedding(axis(0)),
                Triple::new("Bob", "ALSO_INVOLVED_IN", "Rock Climbing")
                    .with_embedding(blend(0, 1, 0.95)),
                Triple::new("Carol", "ALSO_INVOLVED_IN", "Knitting").with_embedding(axis(1)),
                Triple::new("Dan", "LIVES_IN", "Honolulu").with_embedding(axis(2)),
                Triple::new("Eve", "ALSO_INVOLVED_IN", "Bouldering")
                    .with_embedding(blend(0, 2, 0.8)),
            ])
            .unwrap();
        store
    }

    #[test]
    fn bounded_descending_and_unique() {
        let store = climbing_corpus();
        let provider = FixedEmbedder(axis(0));
        let retriever = Retriever::new(
            &provider,
            &store,
            RetrievalConfig {
                min_similarity: 0.0,
                ..Default::default()
            },
        );

        let outcome = retriever.retrieve("rock climbing friends", Some(3)).unwrap();
        let items = outcome.items();
        assert!(items.len() <= 3);
        assert!(!items.is_empty());
        for pair in items.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        let mut ids: Vec<_> = items.iter().map(|i| i.triple_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), items.len());
        // Closest indexed vector ranks first.
        assert_eq!(items[0].triple_id, TripleId(0));
    }

    #[test]
    fn closer_triple_ranks_before_farther() {
        let store = climbing_corpus();
        // Query sits between axes 0 and 1, slightly closer to 0.
        let provider = FixedEmbedder(blend(0, 1, 0.7));
        let retriever = Retriever::new(
            &provider,
            &store,
            RetrievalConfig {
                min_similarity: 0.0,
                ..Default::default()
            },
        );
        let outcome = retriever.retrieve("anything", Some(5)).unwrap();
        let items = outcome.items();
        let pos = |id: TripleId| items.iter().position(|i| i.triple_id == id);
        assert!(pos(TripleId(1)) < pos(TripleId(2)));
    }

    #[test]
    fn duplicate_triples_are_returned_once() {
        let store = MemStore::new(16);
        let t = Triple::new("Alice", "ALSO_INVOLVED_IN", "Rock Climbing");
        store
            .insert_triples(vec![
                t.clone().with_embedding(axis(0)),
                t.with_embedding(axis(0)),
            ])
            .unwrap();

        let provider = FixedEmbedder(axis(0));
        let retriever = Retriever::new(
            &provider,
            &store,
            RetrievalConfig {
                min_similarity: 0.0,
                ..Default::default()
            },
        );
        let outcome = retriever.retrieve("climbing", Some(5)).unwrap();
        assert_eq!(outcome.items().len(), 1);
    }

    #[test]
    fn similarity_floor_yields_no_relevant_context() {
        let store = climbing_corpus();
        let provider = FixedEmbedder(axis(0));
        let retriever = Retriever::new(
            &provider,
            &store,
            RetrievalConfig {
                min_similarity: 2.0, // unreachable floor
                ..Default::default()
            },
        );
        let outcome = retriever.retrieve("anything", None).unwrap();
        assert_eq!(outcome, RetrievalOutcome::NoRelevantContext);
    }

    #[test]
    fn offline_embedder_finds_token_overlap() {
        let provider = HashEmbedder::new();
        let store = MemStore::new(16);
        let triples = vec![
            Triple::new("Alice", "ALSO_INVOLVED_IN", "Rock Climbing"),
            Triple::new("Dan", "LIVES_IN", "Honolulu"),
        ];
        let embedded: Vec<Triple> = triples
            .into_iter()
            .map(|t| {
                let v = provider.embed(&render_sentence(&t)).unwrap();
                t.with_embedding(v)
            })
            .collect();
        store.insert_triples(embedded).unwrap();

        let retriever = Retriever::new(
            &provider,
            &store,
            RetrievalConfig {
                min_similarity: 0.1,
                ..Default::default()
            },
        );
        let outcome = retriever.retrieve("who is involved in rock climbing", Some(2)).unwrap();
        let items = outcome.items();
        assert!(!items.is_empty());
        assert_eq!(items[0].triple_id, TripleId(0));
    }

    #[test]
    fn sentences_use_predicate_templates() {
        let t = Triple::new("Alice", "LIVES_IN", "Honolulu");
        assert_eq!(render_sentence(&t), "Alice lives in Honolulu.");
        let t = Triple::new("Alice", "FEELS_ALOHA_SPIRIT", "Strongly");
        assert_eq!(render_sentence(&t), "Alice feels aloha spirit Strongly.");
    }

    #[test]
    fn context_is_truncated_to_budget() {
        let items: Vec<ContextItem> = (0..10)
            .map(|i| ContextItem {
                triple_id: TripleId(i),
                similarity: 0.9,
                text: "x".repeat(50),
            })
            .collect();
        let text = bounded_context(&items, 120);
        assert!(text.len() <= 120);
        assert_eq!(text.lines().count(), 2);

        // A single oversized sentence is cut, not dropped.
        let cut = bounded_context(&items[..1], 10);
        assert_eq!(cut.len(), 10);
    }

    #[test]
    fn context_budget_counts_chars_not_bytes() {
        // Multibyte text: each ā is two bytes but one char.
        let items = vec![ContextItem {
            triple_id: TripleId(0),
            similarity: 0.9,
            text: "ā".repeat(50),
        }];
        let cut = bounded_context(&items, 10);
        assert_eq!(cut.chars().count(), 10);

        // Two short multibyte sentences both fit a char-counted budget.
        let items = vec![
            ContextItem {
                triple_id: TripleId(0),
                similarity: 0.9,
                text: "ā".repeat(4),
            },
            ContextItem {
                triple_id: TripleId(1),
                similarity: 0.8,
                text: "ō".repeat(4),
            },
        ];
        let text = bounded_context(&items, 9);
        assert_eq!(text.lines().count(), 2);
    }
}
