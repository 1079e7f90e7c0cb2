//! Vector index abstraction consumed by the retriever.

use crate::types::Chunk;
use tutor_core::AppResult;

/// Similarity search over an embedded corpus.
///
/// Implementations embed the query themselves and must be safe to share
/// across concurrent requests.
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `count` chunks ordered by descending similarity to `query_text`.
    async fn similarity_search(&self, query_text: &str, count: usize) -> AppResult<Vec<Chunk>>;
}
