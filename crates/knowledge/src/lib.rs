//! Knowledge base and answer pipeline.
//!
//! Chunks live in a local SQLite vector index. The [`AnswerSynthesizer`]
//! combines deduplicated retrieval from that index with best-effort web
//! search and a single language model call.

pub mod config;
pub mod dedup;
pub mod embeddings;
pub mod format;
pub mod index;
pub mod retriever;
pub mod search;
pub mod synthesizer;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use dedup::dedupe_top_k;
pub use format::{format_chunks, format_history};
pub use index::SqliteVectorIndex;
pub use retriever::Retriever;
pub use search::{ExternalSearcher, SearchProvider};
pub use synthesizer::{AnswerSynthesizer, ExternalContext, Stage, Synthesis};
pub use types::{
    Answer, AskRequest, AskResponse, BaseStats, Chunk, LoadStats, Message, RetrievalResult, Role,
};
pub use vector_index::VectorIndex;

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use tutor_core::{AppError, AppResult};

/// Ingest a JSONL file of `{"text": ..., "metadata": {...}}` lines.
///
/// Blank lines and lines with empty text are skipped; a malformed line
/// aborts the load before anything is written.
pub async fn load(
    index: &SqliteVectorIndex,
    path: &Path,
    batch_size: usize,
    reset: bool,
) -> AppResult<LoadStats> {
    let start = Instant::now();
    tracing::info!("Loading chunks from {:?}", path);

    let (chunks, skipped_lines) = read_jsonl(path)?;

    if reset && index.exists() {
        tracing::info!("Resetting knowledge base before load");
        index.reset().await?;
    }

    let chunks_count = index.insert_chunks(chunks, batch_size).await?;
    let duration = start.elapsed();

    tracing::info!(
        "Load completed: {} chunks, {} skipped lines in {:.2}s",
        chunks_count,
        skipped_lines,
        duration.as_secs_f64()
    );

    Ok(LoadStats {
        chunks_count,
        skipped_lines,
        duration_secs: duration.as_secs_f64(),
    })
}

/// Parse chunks from a JSONL file.
pub fn read_jsonl(path: &Path) -> AppResult<(Vec<Chunk>, u64)> {
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open {:?}: {}", path, e)))?;

    let mut chunks = Vec::new();
    let mut skipped = 0u64;

    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            AppError::Knowledge(format!("Failed to read line {}: {}", line_num + 1, e))
        })?;

        if line.trim().is_empty() {
            skipped += 1;
            continue;
        }

        let chunk: Chunk = serde_json::from_str(&line).map_err(|e| {
            AppError::Knowledge(format!(
                "Failed to parse line {} of {:?}: {}",
                line_num + 1,
                path,
                e
            ))
        })?;

        if chunk.text.trim().is_empty() {
            tracing::warn!("Skipping line {} with empty text", line_num + 1);
            skipped += 1;
            continue;
        }

        chunks.push(chunk);
    }

    Ok((chunks, skipped))
}

/// Get statistics for a knowledge base.
pub async fn stats(index: &SqliteVectorIndex, base_name: &str) -> AppResult<BaseStats> {
    tracing::info!("Getting stats for knowledge base '{}'", base_name);
    index.stats(base_name).await
}

/// Remove every chunk from a knowledge base.
pub async fn clean(index: &SqliteVectorIndex, base_name: &str) -> AppResult<()> {
    tracing::info!("Cleaning knowledge base '{}'", base_name);
    index.reset().await?;
    tracing::info!("Knowledge base '{}' cleaned", base_name);
    Ok(())
}
