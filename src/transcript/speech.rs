//! Last-resort speech-to-text source.
//!
//! Materializes the full audio and transcribes it with Whisper. The only
//! source with meaningful cost and latency, so it runs last, and it is
//! gated on the environment actually being able to run the downloader.

use super::{FetchOutcome, TranscriptSource};
use crate::audio::{materialize_audio, split_audio};
use crate::config::Settings;
use crate::error::{HarkError, Result};
use crate::openai::create_client;
use crate::video::VideoId;
use async_openai::types::CreateTranscriptionRequestArgs;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Whisper-over-downloaded-audio source.
pub struct SpeechToTextSource {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    chunk_duration_seconds: u32,
    max_concurrent_chunks: usize,
    temp_dir: PathBuf,
    enabled: bool,
}

impl SpeechToTextSource {
    pub fn new(
        model: &str,
        chunk_duration_seconds: u32,
        max_concurrent_chunks: usize,
        temp_dir: PathBuf,
        enabled: bool,
    ) -> Self {
        Self {
            client: create_client(),
            model: model.to_string(),
            chunk_duration_seconds,
            max_concurrent_chunks,
            temp_dir,
            enabled,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.transcription.model,
            settings.transcription.chunk_duration_seconds,
            settings.transcription.max_concurrent_chunks,
            settings.temp_dir(),
            settings.sources.allow_audio_fallback,
        )
    }

    /// Transcribe one audio file with Whisper.
    async fn transcribe_single(&self, audio_path: &Path) -> Result<String> {
        let file_bytes = tokio::fs::read(audio_path).await?;

        let request = CreateTranscriptionRequestArgs::default()
            .file(async_openai::types::AudioInput::from_vec_u8(
                audio_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("audio.mp3")
                    .to_string(),
                file_bytes,
            ))
            .model(&self.model)
            .build()
            .map_err(|e| HarkError::Transcription(format!("Failed to build request: {e}")))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| HarkError::OpenAI(format!("Whisper API error: {e}")))?;

        Ok(response.text)
    }

    /// Transcribe an audio file, splitting long files into segments.
    async fn transcribe(&self, audio_path: &Path) -> Result<String> {
        let temp_dir = tempfile::tempdir()?;
        let segments = split_audio(audio_path, temp_dir.path(), self.chunk_duration_seconds).await?;

        if segments.len() == 1 {
            return self.transcribe_single(audio_path).await;
        }

        info!("Transcribing {} audio segments with {}", segments.len(), self.model);

        let results: Vec<(usize, Result<String>)> = stream::iter(segments.into_iter().enumerate())
            .map(|(idx, (segment_path, _offset))| async move {
                let result = self.transcribe_single(&segment_path).await;
                (idx, result)
            })
            .buffer_unordered(self.max_concurrent_chunks)
            .collect()
            .await;

        let mut sorted = results;
        sorted.sort_by_key(|(idx, _)| *idx);

        let mut parts = Vec::with_capacity(sorted.len());
        for (idx, result) in sorted {
            match result {
                Ok(text) => parts.push(text),
                Err(e) => {
                    return Err(HarkError::Transcription(format!(
                        "Audio segment {} failed: {}",
                        idx, e
                    )));
                }
            }
        }

        Ok(parts.join(" "))
    }
}

#[async_trait]
impl TranscriptSource for SpeechToTextSource {
    fn name(&self) -> &'static str {
        "speech-to-text"
    }

    fn unavailable_reason(&self) -> Option<String> {
        if !self.enabled {
            return Some("audio fallback is disabled in configuration".to_string());
        }
        if which::which("yt-dlp").is_err() {
            return Some("yt-dlp is not on PATH in this environment".to_string());
        }
        None
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome> {
        let audio_path =
            materialize_audio(&video_id.watch_url(), video_id.as_str(), &self.temp_dir).await?;

        // Transcription result is resolved after cleanup so the audio
        // file is deleted on both success and failure.
        let result = self.transcribe(&audio_path).await;

        if let Err(e) = tokio::fs::remove_file(&audio_path).await {
            warn!("Failed to remove audio file {:?}: {}", audio_path, e);
        }

        let text = result?;
        if text.trim().is_empty() {
            Ok(FetchOutcome::Empty)
        } else {
            Ok(FetchOutcome::Text(text))
        }
    }
}
