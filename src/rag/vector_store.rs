//! SQLite-backed vector store.
//!
//! Chunks and their embeddings live in a single `chunks` table; similarity
//! search is a brute-force cosine scan, which is adequate for the corpus
//! sizes this pipeline serves. Blocking SQLite work runs on the tokio
//! blocking pool.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use tokio::task;
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::types::{ChunkRecord, RetrievedChunk};

pub struct VectorStore {
    db_path: PathBuf,
}

impl VectorStore {
    /// Open (and create if needed) the store at `path`.
    ///
    /// The schema is applied exactly once here, with its final
    /// configuration; no later call reconfigures the store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { db_path: path };
        store.initialize()?;
        Ok(store)
    }

    /// Persist one chunk with its embedding. Never overwrites.
    ///
    /// Rejects vectors whose length disagrees with what the collection
    /// already stores; a dimensionality change requires a clear and full
    /// re-ingestion.
    pub async fn append(&self, record: ChunkRecord, vector: Vec<f32>) -> Result<Uuid> {
        if vector.is_empty() {
            return Err(RagError::VectorStore(
                "refusing to store an empty embedding".to_string(),
            ));
        }

        let db_path = self.db_path.clone();
        let id = record.id;

        task::spawn_blocking(move || -> Result<()> {
            let conn = Connection::open(db_path)?;

            if let Some(expected) = stored_dimension(&conn)? {
                if expected != vector.len() {
                    return Err(RagError::VectorStore(format!(
                        "embedding dimension mismatch: collection stores {expected}, got {}",
                        vector.len()
                    )));
                }
            }

            conn.execute(
                r#"
                INSERT INTO chunks (
                    id,
                    source_filename,
                    sequence_index,
                    content,
                    content_hash,
                    embedding,
                    dimensions,
                    created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    record.id.to_string(),
                    record.source_filename,
                    record.sequence_index,
                    record.text,
                    blake3::hash(record.text.as_bytes()).to_hex().to_string(),
                    serialize_embedding(&vector),
                    vector.len(),
                    record.created_at,
                ],
            )?;

            Ok(())
        })
        .await
        .map_err(|err| RagError::Internal(err.to_string()))??;

        Ok(id)
    }

    /// Return up to `k` chunks ranked by cosine similarity, descending.
    ///
    /// An empty store, or no chunk clearing `score_threshold`, yields an
    /// empty list rather than an error.
    pub async fn similarity_search(
        &self,
        query_vector: Vec<f32>,
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<RetrievedChunk>> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<Vec<RetrievedChunk>> {
            let conn = Connection::open(db_path)?;

            if let Some(expected) = stored_dimension(&conn)? {
                if expected != query_vector.len() {
                    return Err(RagError::VectorStore(format!(
                        "query dimension mismatch: collection stores {expected}, got {}",
                        query_vector.len()
                    )));
                }
            }

            let mut stmt = conn.prepare(
                "SELECT id, source_filename, sequence_index, content, embedding, created_at \
                 FROM chunks",
            )?;
            let mut rows = stmt.query([])?;

            let mut results: Vec<RetrievedChunk> = Vec::new();
            while let Some(row) = rows.next()? {
                let id: String = row.get(0)?;
                let source_filename: String = row.get(1)?;
                let sequence_index: u32 = row.get(2)?;
                let content: String = row.get(3)?;
                let embedding_bytes: Vec<u8> = row.get(4)?;
                let created_at: i64 = row.get(5)?;

                let embedding = deserialize_embedding(&embedding_bytes);
                let score = cosine_similarity(&query_vector, &embedding);

                if let Some(threshold) = score_threshold {
                    if score < threshold {
                        continue;
                    }
                }

                let id = Uuid::parse_str(&id)
                    .map_err(|err| RagError::VectorStore(format!("corrupt chunk id: {err}")))?;

                results.push(RetrievedChunk {
                    chunk: ChunkRecord {
                        id,
                        source_filename,
                        sequence_index,
                        text: content,
                        created_at,
                    },
                    score,
                });
            }

            results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            results.truncate(k);

            Ok(results)
        })
        .await
        .map_err(|err| RagError::Internal(err.to_string()))?
    }

    /// Remove every chunk in the collection and report how many.
    ///
    /// The delete is a single SQLite statement in its own transaction, so
    /// concurrent readers observe either the full collection or none of it.
    pub async fn clear_all(&self) -> Result<usize> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<usize> {
            let conn = Connection::open(db_path)?;
            let removed = conn.execute("DELETE FROM chunks", [])?;
            Ok(removed)
        })
        .await
        .map_err(|err| RagError::Internal(err.to_string()))?
    }

    /// Number of stored chunks.
    pub async fn count(&self) -> Result<usize> {
        let db_path = self.db_path.clone();

        task::spawn_blocking(move || -> Result<usize> {
            let conn = Connection::open(db_path)?;
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
        .map_err(|err| RagError::Internal(err.to_string()))?
    }

    fn initialize(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = wal;
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source_filename TEXT NOT NULL,
                sequence_index INTEGER NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chunks_source
                ON chunks(source_filename, sequence_index);
            "#,
        )?;

        Ok(())
    }
}

/// Dimensionality of stored vectors, if any row exists.
fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
    let dimension = conn
        .query_row("SELECT dimensions FROM chunks LIMIT 1", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|d| Some(d as usize));

    match dimension {
        Ok(d) => Ok(d),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Store embeddings as little-endian f32 blobs.
fn serialize_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot = a.iter().zip(b).map(|(lhs, rhs)| lhs * rhs).sum::<f32>();
    let norm_a = a.iter().map(|value| value * value).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|value| value * value).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, VectorStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = VectorStore::open(dir.path().join("test.db")).expect("open store");
        (dir, store)
    }

    fn record(filename: &str, index: u32, text: &str) -> ChunkRecord {
        ChunkRecord::new(filename, index, text.to_string())
    }

    #[test]
    fn cosine_similarity_basics() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn embedding_roundtrip() {
        let values = vec![1.0f32, -2.5, 3.25];
        assert_eq!(deserialize_embedding(&serialize_embedding(&values)), values);
    }

    #[tokio::test]
    async fn search_returns_descending_scores() {
        let (_dir, store) = temp_store();

        store
            .append(record("a.txt", 0, "east"), vec![1.0, 0.0])
            .await
            .expect("append");
        store
            .append(record("a.txt", 1, "north"), vec![0.0, 1.0])
            .await
            .expect("append");
        store
            .append(record("a.txt", 2, "northeast"), vec![1.0, 1.0])
            .await
            .expect("append");

        let results = store
            .similarity_search(vec![1.0, 0.0], 10, None)
            .await
            .expect("search");

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.text, "east");
        assert_eq!(results[1].chunk.text, "northeast");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn search_applies_threshold_and_limit() {
        let (_dir, store) = temp_store();

        store
            .append(record("a.txt", 0, "east"), vec![1.0, 0.0])
            .await
            .expect("append");
        store
            .append(record("a.txt", 1, "north"), vec![0.0, 1.0])
            .await
            .expect("append");

        let results = store
            .similarity_search(vec![1.0, 0.0], 10, Some(0.5))
            .await
            .expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "east");

        let results = store
            .similarity_search(vec![1.0, 0.0], 1, None)
            .await
            .expect("search");
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn empty_store_returns_empty_list() {
        let (_dir, store) = temp_store();
        let results = store
            .similarity_search(vec![1.0, 0.0], 5, None)
            .await
            .expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let (_dir, store) = temp_store();

        store
            .append(record("a.txt", 0, "east"), vec![1.0, 0.0])
            .await
            .expect("append");

        let err = store
            .append(record("a.txt", 1, "bad"), vec![1.0, 0.0, 0.0])
            .await
            .expect_err("dimension mismatch on append");
        assert!(matches!(err, RagError::VectorStore(_)));

        let err = store
            .similarity_search(vec![1.0, 0.0, 0.0], 5, None)
            .await
            .expect_err("dimension mismatch on search");
        assert!(matches!(err, RagError::VectorStore(_)));
    }

    #[tokio::test]
    async fn clear_all_reports_removed_count() {
        let (_dir, store) = temp_store();

        store
            .append(record("a.txt", 0, "one"), vec![1.0, 0.0])
            .await
            .expect("append");
        store
            .append(record("a.txt", 1, "two"), vec![0.0, 1.0])
            .await
            .expect("append");

        assert_eq!(store.count().await.expect("count"), 2);
        assert_eq!(store.clear_all().await.expect("clear"), 2);
        assert_eq!(store.count().await.expect("count"), 0);
        assert_eq!(store.clear_all().await.expect("clear"), 0);
    }
}
