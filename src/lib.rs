//! Hark - YouTube transcript ingestion
//!
//! Ingests a video's spoken content into a durable, chunked,
//! vector-embedded knowledge base.
//!
//! # Overview
//!
//! No single transcript source is reliable for every video, so Hark
//! tries an ordered cascade of them: a managed transcript API, public
//! caption feeds, a watch-page caption track, yt-dlp subtitle
//! extraction, and finally speech-to-text over downloaded audio. The
//! first source to produce non-empty text wins. The text is then
//! normalized (markup stripped, caption duplication collapsed), split
//! into bounded-size chunks, embedded under rate and concurrency
//! limits, and persisted together with the video record.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `video` - Identifier extraction and metadata lookup
//! - `transcript` - Transcript source cascade and normalization
//! - `audio` - Audio materialization for the speech-to-text fallback
//! - `chunking` - Sentence-based chunking
//! - `embedding` - Embedding generation with rate limiting and retries
//! - `store` - Durable video/embedding storage
//! - `orchestrator` - Pipeline coordination and rollback
//!
//! # Example
//!
//! ```rust,no_run
//! use hark::config::Settings;
//! use hark::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let report = orchestrator.ingest("dQw4w9WgXcQ", false).await?;
//!     println!("Persisted {} chunks", report.chunks_persisted);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod store;
pub mod transcript;
pub mod video;

pub use error::{HarkError, Result};
