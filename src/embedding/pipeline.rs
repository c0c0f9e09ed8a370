//! Batch embedding with partial-failure tolerance.

use super::{Embedder, RateLimiter};
use crate::chunking::Chunk;
use crate::error::{HarkError, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Result of embedding a batch of chunks.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Successfully embedded chunks, in chunk-index order.
    pub embedded: Vec<EmbeddedChunk>,
    /// Chunks dropped after exhausting retries.
    pub dropped: usize,
}

impl BatchOutcome {
    /// Whether some chunks were dropped (degraded but accepted result).
    pub fn is_partial(&self) -> bool {
        self.dropped > 0
    }
}

/// Drives embedding generation for a chunk batch.
///
/// Chunk-level calls run concurrently up to `max_concurrent`; the rate
/// limiter is shared across all of them. A chunk that still fails after
/// `max_attempts` is dropped rather than failing the batch; a batch with
/// zero survivors is fatal.
pub struct EmbeddingPipeline {
    embedder: Arc<dyn Embedder>,
    limiter: Arc<RateLimiter>,
    max_concurrent: usize,
    max_attempts: u32,
}

impl EmbeddingPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        limiter: Arc<RateLimiter>,
        max_concurrent: usize,
        max_attempts: u32,
    ) -> Self {
        Self {
            embedder,
            limiter,
            max_concurrent: max_concurrent.max(1),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Embed every chunk, tolerating per-chunk failure.
    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn run(&self, chunks: Vec<Chunk>) -> Result<BatchOutcome> {
        let total = chunks.len();
        if total == 0 {
            return Err(HarkError::EmbeddingGenerationFailed(
                "No chunks to embed".into(),
            ));
        }

        info!("Generating embeddings for {} chunks", total);

        let pb = Arc::new(ProgressBar::new(total as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Embedding [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );

        let results: Vec<Option<EmbeddedChunk>> = stream::iter(chunks)
            .map(|chunk| {
                let pb = pb.clone();
                async move {
                    let result = self.embed_with_retry(chunk).await;
                    pb.inc(1);
                    result
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        pb.finish_and_clear();

        let mut embedded: Vec<EmbeddedChunk> = results.into_iter().flatten().collect();
        embedded.sort_by_key(|e| e.chunk.index);

        let dropped = total - embedded.len();

        if embedded.is_empty() {
            return Err(HarkError::EmbeddingGenerationFailed(format!(
                "All {} chunks failed after {} attempts each",
                total, self.max_attempts
            )));
        }

        if dropped > 0 {
            warn!("Embedded {}/{} chunks; {} dropped", embedded.len(), total, dropped);
        }

        Ok(BatchOutcome { embedded, dropped })
    }

    /// Embed one chunk with bounded retries and linear backoff.
    ///
    /// An empty vector counts as a failure. Returns None once the
    /// attempt budget is exhausted.
    async fn embed_with_retry(&self, chunk: Chunk) -> Option<EmbeddedChunk> {
        for attempt in 1..=self.max_attempts {
            self.limiter.acquire().await;

            let result = self.embedder.embed(&chunk.text).await;
            match result {
                Ok(vector) if !vector.is_empty() => {
                    debug!(index = chunk.index, attempt, "Chunk embedded");
                    return Some(EmbeddedChunk { chunk, vector });
                }
                Ok(_) => {
                    warn!(index = chunk.index, attempt, "Embedder returned an empty vector");
                }
                Err(e) => {
                    warn!(index = chunk.index, attempt, "Embedding attempt failed: {}", e);
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
        }

        warn!(index = chunk.index, "Dropping chunk after {} attempts", self.max_attempts);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embedder that fails permanently for a chosen set of chunk texts.
    struct SelectiveEmbedder {
        fail_on: HashSet<String>,
        calls: AtomicUsize,
    }

    impl SelectiveEmbedder {
        fn new(fail_on: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Embedder for SelectiveEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(text) {
                Err(HarkError::OpenAI("synthetic failure".into()))
            } else {
                Ok(vec![0.1, 0.2, 0.3])
            }
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    /// Embedder that answers with an empty vector.
    struct EmptyVectorEmbedder;

    #[async_trait]
    impl Embedder for EmptyVectorEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }

        fn dimensions(&self) -> usize {
            0
        }
    }

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(t.to_string(), i as i32))
            .collect()
    }

    fn pipeline(embedder: Arc<dyn Embedder>) -> EmbeddingPipeline {
        EmbeddingPipeline::new(embedder, Arc::new(RateLimiter::per_minute(1000)), 5, 3)
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_chunks_embed() {
        let outcome = pipeline(SelectiveEmbedder::new(&[]))
            .run(chunks(&["a", "b", "c"]))
            .await
            .unwrap();

        assert_eq!(outcome.embedded.len(), 3);
        assert_eq!(outcome.dropped, 0);
        assert!(!outcome.is_partial());
        // Results come back in chunk-index order regardless of completion order.
        let indexes: Vec<i32> = outcome.embedded.iter().map(|e| e.chunk.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_subset_is_dropped() {
        let texts: Vec<String> = (0..10).map(|i| format!("chunk-{}", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();

        let embedder = SelectiveEmbedder::new(&["chunk-2", "chunk-5"]);
        let outcome = pipeline(embedder).run(chunks(&refs)).await.unwrap();

        assert_eq!(outcome.embedded.len(), 8);
        assert_eq!(outcome.dropped, 2);
        assert!(outcome.is_partial());

        let surviving: Vec<i32> = outcome.embedded.iter().map(|e| e.chunk.index).collect();
        assert_eq!(surviving, vec![0, 1, 3, 4, 6, 7, 8, 9]);
        assert!(outcome.embedded.iter().all(|e| !e.vector.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chunks_are_retried() {
        let embedder = SelectiveEmbedder::new(&["bad"]);
        let outcome = pipeline(embedder.clone()).run(chunks(&["good", "bad"])).await.unwrap();

        assert_eq!(outcome.embedded.len(), 1);
        // 1 call for the good chunk + 3 attempts for the bad one.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_successes_is_fatal() {
        let embedder = SelectiveEmbedder::new(&["a", "b"]);
        let err = pipeline(embedder).run(chunks(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, HarkError::EmbeddingGenerationFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_vector_counts_as_failure() {
        let err = pipeline(Arc::new(EmptyVectorEmbedder))
            .run(chunks(&["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, HarkError::EmbeddingGenerationFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_is_fatal() {
        let err = pipeline(SelectiveEmbedder::new(&[]))
            .run(Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HarkError::EmbeddingGenerationFailed(_)));
    }
}
