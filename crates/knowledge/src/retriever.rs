//! Deduplicated top-k retrieval over a vector index.

use crate::dedup::dedupe_top_k;
use crate::types::RetrievalResult;
use crate::vector_index::VectorIndex;
use std::sync::Arc;
use tutor_core::{AppError, AppResult};

/// Default number of candidates requested per distinct chunk wanted.
pub const DEFAULT_OVERSAMPLE_FACTOR: usize = 2;

/// Queries the index for `oversample_factor * k` candidates and keeps the
/// first `k` distinct texts.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    oversample_factor: usize,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            oversample_factor: DEFAULT_OVERSAMPLE_FACTOR,
        }
    }

    /// Override the oversampling factor; values below 1 are treated as 1.
    pub fn with_oversample_factor(mut self, factor: usize) -> Self {
        self.oversample_factor = factor.max(1);
        self
    }

    /// Retrieve up to `k` chunks with distinct texts for `question`.
    ///
    /// Any index failure surfaces as [`AppError::RetrievalUnavailable`].
    pub async fn retrieve(&self, question: &str, k: usize) -> AppResult<RetrievalResult> {
        let count = k.saturating_mul(self.oversample_factor);
        tracing::debug!(k, count, "Querying vector index");

        let candidates = self
            .index
            .similarity_search(question, count)
            .await
            .map_err(|e| AppError::RetrievalUnavailable(e.to_string()))?;

        let candidates_len = candidates.len();
        let result = dedupe_top_k(candidates, k);

        tracing::debug!(
            candidates = candidates_len,
            kept = result.len(),
            "Deduplicated retrieval candidates"
        );

        Ok(result)
    }
}
