//! Pipeline orchestrator for Hark.
//!
//! Coordinates one ingestion run: identifier extraction, best-effort
//! metadata, transcript acquisition, normalization, chunking, embedding,
//! and persistence. A run that fails after its video record was created
//! deletes that record before returning, so readers never observe
//! partial state.

use crate::chunking::{chunk_text, ChunkingConfig};
use crate::config::Settings;
use crate::embedding::{Embedder, EmbeddingPipeline, OpenAIEmbedder, RateLimiter};
use crate::error::{HarkError, Result};
use crate::store::{NewVideo, SqliteStore, VideoStore};
use crate::transcript::normalize::normalize;
use crate::transcript::{AcquiredTranscript, SourceChain};
use crate::video::{DetailsProvider, OembedDetailsProvider, VideoId};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Stages an ingestion run moves through, used for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Created,
    DetailsFetched,
    TranscriptAcquired,
    Chunked,
    EmbeddingsGenerated,
    Persisted,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStage::Created => "created",
            RunStage::DetailsFetched => "details-fetched",
            RunStage::TranscriptAcquired => "transcript-acquired",
            RunStage::Chunked => "chunked",
            RunStage::EmbeddingsGenerated => "embeddings-generated",
            RunStage::Persisted => "persisted",
        };
        f.write_str(s)
    }
}

/// Result of an ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Platform video identifier.
    pub video_id: String,
    /// Video title (possibly a placeholder).
    pub title: String,
    /// Name of the transcript source that produced the content.
    pub source: String,
    /// Chunks produced by the chunker.
    pub chunks_total: usize,
    /// Chunks whose embeddings were persisted.
    pub chunks_persisted: usize,
    /// Whether processing was skipped (already ingested).
    pub skipped: bool,
}

impl IngestReport {
    /// Whether some chunks were dropped during embedding.
    pub fn is_partial(&self) -> bool {
        !self.skipped && self.chunks_persisted < self.chunks_total
    }
}

/// The main orchestrator for the Hark pipeline.
pub struct Orchestrator {
    settings: Settings,
    chain: SourceChain,
    details: Arc<dyn DetailsProvider>,
    embedder: Arc<dyn Embedder>,
    limiter: Arc<RateLimiter>,
    store: Arc<dyn VideoStore>,
}

impl Orchestrator {
    /// Create a new orchestrator with default components.
    pub fn new(settings: Settings) -> Result<Self> {
        let chain = SourceChain::standard(&settings);

        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions as usize,
        ));

        let limiter = Arc::new(RateLimiter::per_minute(settings.embedding.requests_per_minute));

        let store: Arc<dyn VideoStore> = Arc::new(SqliteStore::new(&settings.sqlite_path())?);

        std::fs::create_dir_all(settings.temp_dir())?;

        Ok(Self {
            settings,
            chain,
            details: Arc::new(OembedDetailsProvider::new()),
            embedder,
            limiter,
            store,
        })
    }

    /// Create an orchestrator with custom components (used by tests).
    pub fn with_components(
        settings: Settings,
        chain: SourceChain,
        details: Arc<dyn DetailsProvider>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VideoStore>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::per_minute(settings.embedding.requests_per_minute));
        Self {
            settings,
            chain,
            details,
            embedder,
            limiter,
            store,
        }
    }

    /// Ingest one video: acquire transcript, chunk, embed, persist.
    #[instrument(skip(self), fields(input = %input))]
    pub async fn ingest(&self, input: &str, force: bool) -> Result<IngestReport> {
        // Malformed input is fatal before any side effect.
        let video_id = VideoId::parse(input)?;
        info!(stage = %RunStage::Created, "Starting ingestion for {}", video_id);

        if let Some(existing) = self.store.find_by_video_id(video_id.as_str()).await? {
            if !force {
                info!("Video {} is already ingested, skipping", video_id);
                return Ok(IngestReport {
                    video_id: video_id.to_string(),
                    title: existing.title,
                    source: existing.transcript_source,
                    chunks_total: existing.chunk_count as usize,
                    chunks_persisted: existing.chunk_count as usize,
                    skipped: true,
                });
            }
            info!("Re-ingesting {}, removing previous record", video_id);
            self.store.delete_video(existing.id).await?;
        }

        // Metadata is best-effort; a placeholder title is fine.
        let details = self.details.video_details(&video_id).await;
        info!(stage = %RunStage::DetailsFetched, "Title: {}", details.title);

        // Sources run sequentially; only the first success matters.
        let acquired = self.chain.acquire(&video_id).await?;
        info!(
            stage = %RunStage::TranscriptAcquired,
            source = acquired.source,
            chars = acquired.text.len(),
            "Transcript acquired"
        );

        let record_id = self
            .store
            .create_video(&NewVideo {
                video_id: video_id.to_string(),
                title: details.title.clone(),
                channel: details.channel.clone(),
                duration_seconds: details.duration_seconds,
                transcript_source: acquired.source.to_string(),
            })
            .await?;

        // From here on any fatal error must roll the record back.
        match self.finish(record_id, &video_id, &acquired).await {
            Ok((chunks_total, chunks_persisted)) => Ok(IngestReport {
                video_id: video_id.to_string(),
                title: details.title,
                source: acquired.source.to_string(),
                chunks_total,
                chunks_persisted,
                skipped: false,
            }),
            Err(e) => {
                warn!("Run aborted ({}), rolling back record {}", e, record_id);
                if let Err(del) = self.store.delete_video(record_id).await {
                    warn!("Rollback of record {} failed: {}", record_id, del);
                }
                Err(e)
            }
        }
    }

    /// Normalize, chunk, embed and persist. Errors here trigger rollback
    /// in the caller.
    async fn finish(
        &self,
        record_id: Uuid,
        video_id: &VideoId,
        acquired: &AcquiredTranscript,
    ) -> Result<(usize, usize)> {
        let normalized = normalize(&acquired.text);

        let config = ChunkingConfig {
            target_chars: self.settings.chunking.target_chars,
        };
        let chunks = chunk_text(&normalized, &config);

        if chunks.is_empty() {
            warn!("Transcript for {} normalized to nothing", video_id);
            return Err(HarkError::EmptyTranscript);
        }
        info!(stage = %RunStage::Chunked, count = chunks.len(), "Transcript chunked");

        let chunks_total = chunks.len();

        let pipeline = EmbeddingPipeline::new(
            self.embedder.clone(),
            self.limiter.clone(),
            self.settings.embedding.max_concurrent,
            self.settings.embedding.max_attempts,
        );

        let outcome = pipeline.run(chunks).await?;
        info!(
            stage = %RunStage::EmbeddingsGenerated,
            embedded = outcome.embedded.len(),
            dropped = outcome.dropped,
            "Embeddings generated"
        );

        let persisted = self.store.insert_embeddings(record_id, &outcome.embedded).await?;

        if outcome.is_partial() {
            warn!(
                "Persisted {}/{} chunks for {}; coverage is degraded",
                persisted, chunks_total, video_id
            );
        }
        info!(stage = %RunStage::Persisted, persisted, "Run complete");

        Ok((chunks_total, persisted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarkError;
    use crate::transcript::{FetchOutcome, TranscriptSource};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct FixedDetails;

    #[async_trait]
    impl DetailsProvider for FixedDetails {
        async fn video_details(&self, _video_id: &VideoId) -> crate::video::VideoDetails {
            crate::video::VideoDetails {
                title: "Test Video".to_string(),
                channel: Some("Test Channel".to_string()),
                duration_seconds: 90,
            }
        }
    }

    struct FixedSource {
        name: &'static str,
        text: Option<&'static str>,
    }

    #[async_trait]
    impl TranscriptSource for FixedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _video_id: &VideoId) -> Result<FetchOutcome> {
            match self.text {
                Some(t) => Ok(FetchOutcome::Text(t.to_string())),
                None => Ok(FetchOutcome::Empty),
            }
        }
    }

    struct StaticEmbedder {
        fail_on: HashSet<String>,
    }

    impl StaticEmbedder {
        fn ok() -> Arc<Self> {
            Arc::new(Self { fail_on: HashSet::new() })
        }

        fn failing_on(texts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                fail_on: texts.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl Embedder for StaticEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if self.fail_on.contains(text) {
                Err(HarkError::OpenAI("synthetic failure".into()))
            } else {
                Ok(vec![1.0, 0.0, 0.0])
            }
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.embedding.requests_per_minute = 10_000;
        settings
    }

    fn orchestrator_with(
        sources: Vec<Arc<dyn TranscriptSource>>,
        embedder: Arc<dyn Embedder>,
        store: Arc<SqliteStore>,
        target_chars: usize,
    ) -> Orchestrator {
        let mut s = settings();
        s.chunking.target_chars = target_chars;
        Orchestrator::with_components(
            s,
            SourceChain::new(sources),
            Arc::new(FixedDetails),
            embedder,
            store,
        )
    }

    fn memory_store() -> Arc<SqliteStore> {
        Arc::new(SqliteStore::in_memory().unwrap())
    }

    #[tokio::test]
    async fn test_repetition_collapsed_single_chunk_run() {
        let store = memory_store();
        let orchestrator = orchestrator_with(
            vec![Arc::new(FixedSource {
                name: "stub",
                text: Some("Hello world. Hello world. This is a test."),
            })],
            StaticEmbedder::ok(),
            store.clone(),
            1000,
        );

        let report = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap();

        assert!(!report.skipped);
        assert_eq!(report.chunks_total, 1);
        assert_eq!(report.chunks_persisted, 1);
        assert!(!report.is_partial());
        assert_eq!(report.source, "stub");

        let stored = store.find_by_video_id("dQw4w9WgXcQ").await.unwrap().unwrap();
        assert_eq!(stored.chunk_count, 1);
    }

    #[tokio::test]
    async fn test_all_sources_fail_leaves_no_record() {
        let store = memory_store();
        let sources: Vec<Arc<dyn TranscriptSource>> = vec![
            Arc::new(FixedSource { name: "a", text: None }),
            Arc::new(FixedSource { name: "b", text: None }),
        ];

        let orchestrator = orchestrator_with(sources, StaticEmbedder::ok(), store.clone(), 1000);

        let err = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap_err();
        assert!(matches!(err, HarkError::NoTranscriptAvailable(_)));
        assert!(store.find_by_video_id("dQw4w9WgXcQ").await.unwrap().is_none());

        // Retrying is idempotent: still no record.
        let err = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap_err();
        assert!(matches!(err, HarkError::NoTranscriptAvailable(_)));
        assert!(store.find_by_video_id("dQw4w9WgXcQ").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_embedding_coverage_persists_survivors() {
        // Ten one-sentence chunks; two fail permanently.
        let text: &'static str = "c0 zero. c1 one. c2 two. c3 three. c4 four. c5 five. c6 six. c7 seven. c8 eight. c9 nine.";

        let store = memory_store();
        let orchestrator = orchestrator_with(
            vec![Arc::new(FixedSource { name: "stub", text: Some(text) })],
            StaticEmbedder::failing_on(&["c2 two", "c5 five"]),
            store.clone(),
            5,
        );

        let report = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap();

        assert_eq!(report.chunks_total, 10);
        assert_eq!(report.chunks_persisted, 8);
        assert!(report.is_partial());

        let stored = store.find_by_video_id("dQw4w9WgXcQ").await.unwrap().unwrap();
        assert_eq!(stored.chunk_count, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_embeddings_rolls_back_record() {
        let store = memory_store();
        let orchestrator = orchestrator_with(
            vec![Arc::new(FixedSource {
                name: "stub",
                text: Some("Only sentence."),
            })],
            StaticEmbedder::failing_on(&["Only sentence"]),
            store.clone(),
            1000,
        );

        let err = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap_err();
        assert!(matches!(err, HarkError::EmbeddingGenerationFailed(_)));
        assert!(store.find_by_video_id("dQw4w9WgXcQ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_transcript_rolls_back_record() {
        let store = memory_store();
        let orchestrator = orchestrator_with(
            vec![Arc::new(FixedSource { name: "stub", text: Some("... !!! ???") })],
            StaticEmbedder::ok(),
            store.clone(),
            1000,
        );

        let err = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap_err();
        assert!(matches!(err, HarkError::EmptyTranscript));
        assert!(store.find_by_video_id("dQw4w9WgXcQ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_input_is_fatal_before_side_effects() {
        let store = memory_store();
        let orchestrator = orchestrator_with(
            vec![Arc::new(FixedSource { name: "stub", text: Some("text.") })],
            StaticEmbedder::ok(),
            store.clone(),
            1000,
        );

        let err = orchestrator.ingest("not a url", false).await.unwrap_err();
        assert!(matches!(err, HarkError::InvalidInput(_)));
        assert!(store.list_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_ingest_skips_without_force() {
        let store = memory_store();
        let orchestrator = orchestrator_with(
            vec![Arc::new(FixedSource { name: "stub", text: Some("A sentence.") })],
            StaticEmbedder::ok(),
            store.clone(),
            1000,
        );

        let first = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap();
        assert!(!first.skipped);

        let second = orchestrator.ingest("dQw4w9WgXcQ", false).await.unwrap();
        assert!(second.skipped);

        let forced = orchestrator.ingest("dQw4w9WgXcQ", true).await.unwrap();
        assert!(!forced.skipped);
    }
}
