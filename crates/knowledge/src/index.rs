//! SQLite-backed vector index for knowledge chunks.
//!
//! Embeddings are stored as little-endian `f32` blobs next to the chunk
//! text. Searches scan every row and rank by cosine similarity; each
//! search opens its own read-only connection on a blocking thread.

use crate::embeddings::EmbeddingProvider;
use crate::types::{BaseStats, Chunk, IndexedChunk};
use crate::vector_index::VectorIndex;
use rusqlite::{params, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tutor_core::{AppError, AppResult};

/// A vector index stored in one SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteVectorIndex {
    db_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteVectorIndex {
    /// Create a handle; the database file is only touched by later calls.
    pub fn new(db_path: impl Into<PathBuf>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            db_path: db_path.into(),
            embedder,
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn exists(&self) -> bool {
        self.db_path.exists()
    }

    /// Embed `chunks` in batches of `batch_size` and store them.
    ///
    /// Returns the number of rows written.
    pub async fn insert_chunks(&self, chunks: Vec<Chunk>, batch_size: usize) -> AppResult<u64> {
        let batch_size = batch_size.max(1);
        let mut rows = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(AppError::Knowledge(format!(
                    "Embedding provider returned {} vectors for {} texts",
                    embeddings.len(),
                    batch.len()
                )));
            }

            rows.extend(batch.iter().zip(embeddings).map(|(chunk, embedding)| IndexedChunk {
                id: uuid::Uuid::new_v4().to_string(),
                text: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
                embedding,
            }));

            tracing::debug!("Embedded {} of {} chunks", rows.len(), chunks.len());
        }

        let db_path = self.db_path.clone();
        run_blocking(move || {
            let mut conn = init_index(&db_path)?;
            insert_rows(&mut conn, &rows)
        })
        .await
    }

    /// Count stored chunks and report the index size.
    pub async fn stats(&self, base_name: &str) -> AppResult<BaseStats> {
        if !self.exists() {
            return Err(missing_index(&self.db_path));
        }

        let db_path = self.db_path.clone();
        let (chunks_count, embedding_dimensions) = run_blocking(move || {
            let conn = open_read_only(&db_path)?;
            get_stats(&conn)
        })
        .await?;

        let db_size_bytes = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(BaseStats {
            base_name: base_name.to_string(),
            chunks_count,
            embedding_dimensions,
            db_size_bytes,
        })
    }

    /// Delete every stored chunk.
    pub async fn reset(&self) -> AppResult<()> {
        if !self.exists() {
            return Err(missing_index(&self.db_path));
        }

        let db_path = self.db_path.clone();
        run_blocking(move || {
            let conn = init_index(&db_path)?;
            reset_index(&conn)
        })
        .await
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn similarity_search(&self, query_text: &str, count: usize) -> AppResult<Vec<Chunk>> {
        if !self.exists() {
            return Err(missing_index(&self.db_path));
        }

        let query_embedding = self.embedder.embed(query_text).await?;
        let db_path = self.db_path.clone();

        let results = run_blocking(move || {
            let conn = open_read_only(&db_path)?;
            query_chunks(&conn, &query_embedding, count)
        })
        .await?;

        if let (Some((_, top)), Some((_, lowest))) = (results.first(), results.last()) {
            tracing::debug!(
                "Retrieved {} chunks (top score: {:.3}, lowest: {:.3})",
                results.len(),
                top,
                lowest
            );
        }

        Ok(results.into_iter().map(|(row, _)| row.into_chunk()).collect())
    }
}

fn missing_index(db_path: &Path) -> AppError {
    AppError::Knowledge(format!(
        "No index at {:?}. Run 'tutor knowledge load' first.",
        db_path
    ))
}

async fn run_blocking<T, F>(task: F) -> AppResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| AppError::Knowledge(format!("Index task failed: {}", e)))?
}

/// Open (creating if needed) the index database and its schema.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Knowledge(format!("Failed to create index directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

fn open_read_only(db_path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))
}

/// Insert rows in a single transaction.
pub fn insert_rows(conn: &mut Connection, rows: &[IndexedChunk]) -> AppResult<u64> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT OR REPLACE INTO chunks (id, text, embedding, metadata)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare insert: {}", e)))?;

        for row in rows {
            let metadata_json = serde_json::to_string(&row.metadata)?;
            stmt.execute(params![
                row.id,
                row.text,
                embedding_to_bytes(&row.embedding),
                metadata_json,
            ])
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Knowledge(format!("Failed to commit chunks: {}", e)))?;

    Ok(rows.len() as u64)
}

/// Query the index for top-k most similar chunks.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<(IndexedChunk, f32)>> {
    let mut stmt = conn
        .prepare("SELECT id, text, embedding, metadata FROM chunks")
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(2)?;
            let embedding = bytes_to_embedding(&embedding_bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Blob, Box::new(e))
            })?;

            let metadata_json: String = row.get(3)?;
            let metadata = serde_json::from_str(&metadata_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;

            Ok(IndexedChunk {
                id: row.get(0)?,
                text: row.get(1)?,
                metadata,
                embedding,
            })
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let chunk = row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;
        let score = cosine_similarity(query_embedding, &chunk.embedding);
        results.push((chunk, score));
    }

    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    Ok(results)
}

/// Chunk count and the dimensions of the stored embeddings.
pub fn get_stats(conn: &Connection) -> AppResult<(u64, Option<usize>)> {
    let chunks_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    let dimensions = conn
        .query_row("SELECT length(embedding) FROM chunks LIMIT 1", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|bytes| Some(bytes as usize / 4))
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(AppError::Knowledge(format!(
                "Failed to read embedding size: {}",
                other
            ))),
        })?;

    Ok((chunks_count as u64, dimensions))
}

/// Reset the index (delete all data).
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute("DELETE FROM chunks", [])
        .map_err(|e| AppError::Knowledge(format!("Failed to delete chunks: {}", e)))?;

    tracing::info!("Reset knowledge base index");
    Ok(())
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use tempfile::TempDir;

    fn index(dir: &TempDir) -> SqliteVectorIndex {
        SqliteVectorIndex::new(
            dir.path().join("kb/index.sqlite"),
            Arc::new(MockProvider::new(256)),
        )
    }

    fn row(id: &str, text: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            id: id.to_string(),
            text: text.to_string(),
            metadata: serde_json::json!({"source": "test.md"}),
            embedding,
        }
    }

    #[test]
    fn test_query_ranks_by_similarity() {
        let dir = TempDir::new().unwrap();
        let mut conn = init_index(&dir.path().join("index.sqlite")).unwrap();

        insert_rows(
            &mut conn,
            &[
                row("far", "unrelated", vec![0.0, 1.0, 0.0]),
                row("near", "related", vec![0.9, 0.1, 0.0]),
                row("exact", "identical", vec![1.0, 0.0, 0.0]),
            ],
        )
        .unwrap();

        let results = query_chunks(&conn, &[1.0, 0.0, 0.0], 2).unwrap();
        let ids: Vec<&str> = results.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!((results[0].1 - 1.0).abs() < 0.001);
        assert_eq!(results[0].0.metadata["source"], "test.md");
    }

    #[test]
    fn test_stats_and_reset() {
        let dir = TempDir::new().unwrap();
        let mut conn = init_index(&dir.path().join("index.sqlite")).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, None));

        insert_rows(&mut conn, &[row("a", "a", vec![1.0, 0.0, 0.0, 0.0])]).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (1, Some(4)));

        reset_index(&conn).unwrap();
        assert_eq!(get_stats(&conn).unwrap(), (0, None));
    }

    #[test]
    fn test_embedding_bytes_preserve_values() {
        let embedding = vec![0.25, -1.5, 3.0e-7];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&embedding)).unwrap(), embedding);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_load_then_search() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir);

        let written = index
            .insert_chunks(
                vec![
                    Chunk::new("A polity is an organized political community."),
                    Chunk::new("Pasta should be cooked in salted water."),
                    Chunk::new("Federal polity divides sovereignty between levels."),
                ],
                2,
            )
            .await
            .unwrap();
        assert_eq!(written, 3);

        let results = index.similarity_search("what is a polity", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|c| c.text.contains("olity")));
    }

    #[tokio::test]
    async fn test_search_without_index_fails() {
        let dir = TempDir::new().unwrap();
        let err = index(&dir).similarity_search("anything", 3).await.unwrap_err();
        assert!(err.to_string().contains("knowledge load"));
    }

    #[tokio::test]
    async fn test_async_stats_and_reset() {
        let dir = TempDir::new().unwrap();
        let index = index(&dir);
        assert!(index.stats("kb").await.is_err());

        index
            .insert_chunks(vec![Chunk::new("one"), Chunk::new("two")], 64)
            .await
            .unwrap();

        let stats = index.stats("kb").await.unwrap();
        assert_eq!(stats.chunks_count, 2);
        assert_eq!(stats.embedding_dimensions, Some(256));
        assert!(stats.db_size_bytes > 0);

        index.reset().await.unwrap();
        assert_eq!(index.stats("kb").await.unwrap().chunks_count, 0);
    }
}
