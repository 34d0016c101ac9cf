//! Rich diagnostic error types for the pilina engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Filtering deliberately has
//! no error type of its own: filter evaluation always returns a well-formed
//! (possibly empty) result, and stale selections are normalized to no-ops.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the pilina engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum PilinaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Retrieve(#[from] RetrieveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Store errors (the "data unavailable" taxonomy)
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(pilina::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(pilina::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption; try re-ingesting into a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(pilina::store::serde),
        help(
            "Failed to serialize or deserialize a stored triple. \
             This usually means the stored data format changed between versions; \
             re-ingest your data."
        )
    )]
    Serialization { message: String },

    #[error("triple {triple_id} not found in store")]
    #[diagnostic(
        code(pilina::store::not_found),
        help("The referenced triple does not exist. The reference may be from a stale snapshot.")
    )]
    NotFound { triple_id: u64 },

    #[error("embedding dimension mismatch: index expects {expected}, got {actual}")]
    #[diagnostic(
        code(pilina::store::dim_mismatch),
        help(
            "All vectors in the similarity index must share one dimension. \
             Reindex after changing the embedding model."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("similarity index error: {message}")]
    #[diagnostic(
        code(pilina::store::index),
        help("The HNSW nearest-neighbor index encountered an internal error.")
    )]
    Index { message: String },
}

// ---------------------------------------------------------------------------
// Embedding provider errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EmbedError {
    #[error("embedding provider is not available at {url}")]
    #[diagnostic(
        code(pilina::embed::unavailable),
        help(
            "The embedding endpoint could not be reached after a retry. \
             Check that the provider is running and the base URL is correct."
        )
    )]
    Unavailable { url: String },

    #[error("embedding provider rejected the request (status {status})")]
    #[diagnostic(
        code(pilina::embed::status),
        help(
            "The endpoint responded with an HTTP error. A 404 usually means \
             the model name is wrong; a 5xx means the provider is unhealthy."
        )
    )]
    Status { status: u16 },

    #[error("failed to parse embedding response: {message}")]
    #[diagnostic(
        code(pilina::embed::parse),
        help("The provider returned an unexpected response shape.")
    )]
    Parse { message: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(pilina::embed::dim_mismatch),
        help(
            "The provider must use the same model the corpus was indexed with \
             (here: a 384-dimensional model). Reindex if you switched models."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Retrieval errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RetrieveError {
    #[error("retrieval unavailable: {source}")]
    #[diagnostic(
        code(pilina::retrieve::unavailable),
        help(
            "The query could not be embedded. Callers should fall back to \
             answering with no context rather than fabricating one."
        )
    )]
    Unavailable {
        #[source]
        source: EmbedError,
    },

    #[error("similarity search failed: {source}")]
    #[diagnostic(
        code(pilina::retrieve::search),
        help("The vector index rejected the query. Check that a reindex has completed.")
    )]
    Search {
        #[source]
        source: StoreError,
    },
}

// ---------------------------------------------------------------------------
// Generation (answer synthesis) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error("generation provider is not available at {url}")]
    #[diagnostic(
        code(pilina::generate::unavailable),
        help(
            "The text-generation endpoint is unreachable. The retrieved context \
             can still be shown to the user as a degraded-mode answer."
        )
    )]
    Unavailable { url: String },

    #[error("generation provider rate-limited the request (status {status})")]
    #[diagnostic(
        code(pilina::generate::rate_limited),
        help("Wait and retry, or lower the request rate.")
    )]
    RateLimited { status: u16 },

    #[error("failed to parse generation response: {message}")]
    #[diagnostic(
        code(pilina::generate::parse),
        help("The provider returned an unexpected response shape.")
    )]
    Parse { message: String },
}

// ---------------------------------------------------------------------------
// Ingestion errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    #[diagnostic(
        code(pilina::ingest::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported triple file format: {path}")]
    #[diagnostic(
        code(pilina::ingest::format),
        help("Supported formats: .txt (tuple list) and .json (array of triple records).")
    )]
    UnsupportedFormat { path: String },

    #[error("no triples found in {path}")]
    #[diagnostic(
        code(pilina::ingest::empty),
        help("The file parsed but contained no (subject, predicate, object) records.")
    )]
    Empty { path: String },

    #[error("JSON parse error in {path}: {message}")]
    #[diagnostic(
        code(pilina::ingest::json),
        help("Expected a JSON array of objects with subject/predicate/object string fields.")
    )]
    Json { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(pilina::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("data directory error: {path}")]
    #[diagnostic(
        code(pilina::engine::data_dir),
        help(
            "The data directory could not be accessed. \
             Ensure the path exists and has read/write permissions."
        )
    )]
    DataDir { path: String },

    #[error("a reindex is already running")]
    #[diagnostic(
        code(pilina::engine::reindex_in_flight),
        help(
            "Reindexing is single-flight: wait for the current run to finish. \
             Read traffic is unaffected and keeps serving the previous generation."
        )
    )]
    ReindexInFlight,
}

/// Convenience alias for functions returning pilina results.
pub type PilinaResult<T> = std::result::Result<T, PilinaError>;
