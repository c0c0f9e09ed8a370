//! Embedding generation.
//!
//! One embedding per chunk, produced under a shared requests-per-minute
//! ceiling and a bounded concurrency ceiling, with per-chunk retry and
//! failure isolation.

mod openai;
mod pipeline;
mod rate_limit;

pub use openai::OpenAIEmbedder;
pub use pipeline::{BatchOutcome, EmbeddedChunk, EmbeddingPipeline};
pub use rate_limit::RateLimiter;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}
