//! Semantic retrieval over report text.
//!
//! - `embeddings`: client for the external embedding provider
//! - `cache`: bounded memoization of report embeddings
//! - `search`: cosine-similarity ranking with tiered summaries

pub mod cache;
pub mod embeddings;
pub mod search;

pub use cache::EmbeddingCache;
pub use embeddings::{EmbeddingError, EmbeddingProvider, HttpEmbeddingProvider};
pub use search::{SearchEngine, SearchOutcome};

/// Default similarity threshold for including a report in results
pub const DEFAULT_THRESHOLD: f32 = 0.35;

/// Uncached corpus texts are embedded at most this many at a time, to
/// respect provider rate limits.
pub const EMBED_BATCH_SIZE: usize = 5;

/// Default embedding cache capacity (entries)
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;
