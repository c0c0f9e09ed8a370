//! Durable storage for video records and their chunk embeddings.
//!
//! The pipeline consumes this as a boundary: create a record, insert
//! embeddings, delete the record on rollback. Every operation is
//! fallible and wrapped as the run's fatal error by the caller.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::embedding::EmbeddedChunk;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for a video record about to be created.
#[derive(Debug, Clone)]
pub struct NewVideo {
    /// Platform video identifier.
    pub video_id: String,
    /// Video title (may be a placeholder).
    pub title: String,
    /// Channel name, when known.
    pub channel: Option<String>,
    /// Duration in seconds (0 when unknown).
    pub duration_seconds: u32,
    /// Name of the transcript source that produced the content.
    pub transcript_source: String,
}

/// A stored video record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVideo {
    /// Record id.
    pub id: Uuid,
    /// Platform video identifier.
    pub video_id: String,
    /// Video title.
    pub title: String,
    /// Channel name, when known.
    pub channel: Option<String>,
    /// Duration in seconds (0 when unknown).
    pub duration_seconds: u32,
    /// Transcript source name.
    pub transcript_source: String,
    /// Number of stored embeddings.
    pub chunk_count: u32,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Trait for video/embedding persistence backends.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Create a video record and return its id.
    async fn create_video(&self, video: &NewVideo) -> Result<Uuid>;

    /// Insert embeddings for a video record. Returns the inserted count.
    async fn insert_embeddings(&self, record_id: Uuid, chunks: &[EmbeddedChunk]) -> Result<usize>;

    /// Delete a video record and all of its embeddings.
    async fn delete_video(&self, record_id: Uuid) -> Result<()>;

    /// Look up a record by its platform video identifier.
    async fn find_by_video_id(&self, video_id: &str) -> Result<Option<StoredVideo>>;

    /// List all stored videos, newest first.
    async fn list_videos(&self) -> Result<Vec<StoredVideo>>;
}
