//! SQLite-backed video store.

use super::{NewVideo, StoredVideo, VideoStore};
use crate::embedding::EmbeddedChunk;
use crate::error::{HarkError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    channel TEXT,
    duration_seconds INTEGER NOT NULL,
    transcript_source TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    chunk_text TEXT NOT NULL,
    start_seconds REAL NOT NULL,
    end_seconds REAL NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_embeddings_record_id ON embeddings(record_id);
"#;

/// SQLite-based video store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized video store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    #[cfg(test)]
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HarkError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn row_to_video(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredVideo> {
        let id: String = row.get(0)?;
        let created_at: String = row.get(6)?;

        Ok(StoredVideo {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            video_id: row.get(1)?,
            title: row.get(2)?,
            channel: row.get(3)?,
            duration_seconds: row.get(4)?,
            transcript_source: row.get(5)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_default(),
            chunk_count: row.get(7)?,
        })
    }
}

const VIDEO_COLUMNS: &str = r#"
    v.id, v.video_id, v.title, v.channel, v.duration_seconds, v.transcript_source, v.created_at,
    (SELECT COUNT(*) FROM embeddings e WHERE e.record_id = v.id) AS chunk_count
"#;

#[async_trait]
impl VideoStore for SqliteStore {
    #[instrument(skip(self, video), fields(video_id = %video.video_id))]
    async fn create_video(&self, video: &NewVideo) -> Result<Uuid> {
        let conn = self.lock()?;
        let id = Uuid::new_v4();

        conn.execute(
            r#"
            INSERT INTO videos (id, video_id, title, channel, duration_seconds, transcript_source, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id.to_string(),
                video.video_id,
                video.title,
                video.channel,
                video.duration_seconds,
                video.transcript_source,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Created video record {}", id);
        Ok(id)
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    async fn insert_embeddings(&self, record_id: Uuid, chunks: &[EmbeddedChunk]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for embedded in chunks {
            let embedding_bytes = Self::embedding_to_bytes(&embedded.vector);

            tx.execute(
                r#"
                INSERT INTO embeddings
                (id, record_id, chunk_index, chunk_text, start_seconds, end_seconds, embedding, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    Uuid::new_v4().to_string(),
                    record_id.to_string(),
                    embedded.chunk.index,
                    embedded.chunk.text,
                    embedded.chunk.start_seconds,
                    embedded.chunk.end_seconds,
                    embedding_bytes,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        info!("Inserted {} embeddings for record {}", chunks.len(), record_id);
        Ok(chunks.len())
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, record_id: Uuid) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "DELETE FROM embeddings WHERE record_id = ?1",
            params![record_id.to_string()],
        )?;
        conn.execute("DELETE FROM videos WHERE id = ?1", params![record_id.to_string()])?;

        debug!("Deleted video record {}", record_id);
        Ok(())
    }

    async fn find_by_video_id(&self, video_id: &str) -> Result<Option<StoredVideo>> {
        let conn = self.lock()?;

        let sql = format!("SELECT {} FROM videos v WHERE v.video_id = ?1", VIDEO_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let mut rows = stmt.query_map(params![video_id], Self::row_to_video)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    async fn list_videos(&self) -> Result<Vec<StoredVideo>> {
        let conn = self.lock()?;

        let sql = format!("SELECT {} FROM videos v ORDER BY v.created_at DESC", VIDEO_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt.query_map([], Self::row_to_video)?;
        let mut videos = Vec::new();
        for row in rows {
            videos.push(row?);
        }
        Ok(videos)
    }
}
