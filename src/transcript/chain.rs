//! The ordered transcript source cascade.

use super::{FetchOutcome, TranscriptSource};
use crate::config::Settings;
use crate::error::{HarkError, Result};
use crate::video::VideoId;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A transcript obtained by the chain, with provenance.
#[derive(Debug, Clone)]
pub struct AcquiredTranscript {
    /// Raw transcript text, source-specific markup intact.
    pub text: String,
    /// Name of the source that produced it.
    pub source: &'static str,
}

/// Outcome of one attempted source, kept for diagnostics only.
#[derive(Debug)]
enum AttemptOutcome {
    Empty,
    Skipped(String),
    Failed(String),
}

/// Ordered list of transcript sources, tried sequentially.
///
/// Sources run one at a time, never in parallel: each is a costly
/// network or subprocess call and only the first success matters.
pub struct SourceChain {
    sources: Vec<Arc<dyn TranscriptSource>>,
}

impl SourceChain {
    /// Build a chain from an explicit source list (used by tests).
    pub fn new(sources: Vec<Arc<dyn TranscriptSource>>) -> Self {
        Self { sources }
    }

    /// Build the standard cascade in priority order.
    pub fn standard(settings: &Settings) -> Self {
        Self::new(vec![
            Arc::new(super::HostedApiSource::from_settings(&settings.sources)),
            Arc::new(super::CaptionFeedSource::new(settings.sources.languages.clone())),
            Arc::new(super::TimedtextJsonSource::new(settings.sources.languages.clone())),
            Arc::new(super::CaptionTrackSource::new(settings.sources.languages.clone())),
            Arc::new(super::SubtitleSource::new(settings.sources.languages.clone())),
            Arc::new(super::SpeechToTextSource::from_settings(settings)),
        ])
    }

    /// Try each source in order and return the first non-empty transcript.
    ///
    /// Per-source failures and empty results fall through to the next
    /// source. Exhausting the list is fatal; so is the terminal source
    /// being unavailable in this environment, which is reported as a
    /// distinct capability error before any attempt is made.
    #[instrument(skip(self), fields(video_id = %video_id))]
    pub async fn acquire(&self, video_id: &VideoId) -> Result<AcquiredTranscript> {
        let mut attempts: Vec<(&'static str, AttemptOutcome)> = Vec::new();
        let last_index = self.sources.len().saturating_sub(1);

        for (index, source) in self.sources.iter().enumerate() {
            let name = source.name();

            if let Some(reason) = source.unavailable_reason() {
                if index == last_index {
                    warn!(source = name, "Terminal source unavailable: {}", reason);
                    return Err(HarkError::CapabilityUnavailable(format!(
                        "{} cannot run here ({}) and no earlier source produced a transcript",
                        name, reason
                    )));
                }
                debug!(source = name, "Skipping: {}", reason);
                attempts.push((name, AttemptOutcome::Skipped(reason)));
                continue;
            }

            info!(source = name, "Trying transcript source");

            match source.fetch(video_id).await {
                Ok(FetchOutcome::Text(text)) if !text.trim().is_empty() => {
                    info!(source = name, chars = text.len(), "Transcript acquired");
                    debug!("Cascade attempts before success: {:?}", attempts);
                    return Ok(AcquiredTranscript { text, source: name });
                }
                Ok(_) => {
                    debug!(source = name, "No transcript content, falling through");
                    attempts.push((name, AttemptOutcome::Empty));
                }
                Err(e) => {
                    warn!(source = name, "Source failed, falling through: {}", e);
                    attempts.push((name, AttemptOutcome::Failed(e.to_string())));
                }
            }
        }

        warn!("All transcript sources exhausted: {:?}", attempts);
        Err(HarkError::NoTranscriptAvailable(video_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        name: &'static str,
        outcome: fn() -> Result<FetchOutcome>,
        unavailable: Option<String>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(name: &'static str, outcome: fn() -> Result<FetchOutcome>) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                unavailable: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn unavailable(name: &'static str, reason: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome: || Ok(FetchOutcome::Empty),
                unavailable: Some(reason.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranscriptSource for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        fn unavailable_reason(&self) -> Option<String> {
            self.unavailable.clone()
        }

        async fn fetch(&self, _video_id: &VideoId) -> Result<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn vid() -> VideoId {
        VideoId::parse("dQw4w9WgXcQ").unwrap()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = StubSource::new("first", || Err(HarkError::Transcription("boom".into())));
        let second = StubSource::new("second", || Ok(FetchOutcome::Text("from second".into())));
        let third = StubSource::new("third", || Ok(FetchOutcome::Text("from third".into())));

        let chain = SourceChain::new(vec![first.clone(), second.clone(), third.clone()]);
        let acquired = chain.acquire(&vid()).await.unwrap();

        assert_eq!(acquired.text, "from second");
        assert_eq!(acquired.source, "second");
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0, "later sources must not run");
    }

    #[tokio::test]
    async fn test_empty_text_falls_through() {
        let first = StubSource::new("first", || Ok(FetchOutcome::Text("   ".into())));
        let second = StubSource::new("second", || Ok(FetchOutcome::Empty));
        let third = StubSource::new("third", || Ok(FetchOutcome::Text("real".into())));

        let chain = SourceChain::new(vec![first, second, third]);
        let acquired = chain.acquire(&vid()).await.unwrap();
        assert_eq!(acquired.source, "third");
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_fatal() {
        let first = StubSource::new("first", || Ok(FetchOutcome::Empty));
        let second = StubSource::new("second", || Err(HarkError::Transcription("down".into())));

        let chain = SourceChain::new(vec![first, second]);
        let err = chain.acquire(&vid()).await.unwrap_err();
        assert!(matches!(err, HarkError::NoTranscriptAvailable(_)));
    }

    #[tokio::test]
    async fn test_unavailable_source_is_skipped_not_attempted() {
        let gated = StubSource::unavailable("gated", "no subprocess here");
        let fallback = StubSource::new("fallback", || Ok(FetchOutcome::Text("ok".into())));

        let chain = SourceChain::new(vec![gated.clone(), fallback]);
        let acquired = chain.acquire(&vid()).await.unwrap();

        assert_eq!(acquired.source, "fallback");
        assert_eq!(gated.calls.load(Ordering::SeqCst), 0, "gated source must not be attempted");
    }

    #[tokio::test]
    async fn test_unavailable_terminal_source_is_capability_error() {
        let gated = StubSource::unavailable("gated", "no subprocess here");

        let chain = SourceChain::new(vec![gated]);
        let err = chain.acquire(&vid()).await.unwrap_err();
        assert!(matches!(err, HarkError::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_failed_then_unavailable_terminal_is_capability_error() {
        // Even after earlier sources ran and came up empty, a terminal
        // source that cannot run here surfaces the actionable condition.
        let first = StubSource::new("first", || Ok(FetchOutcome::Empty));
        let gated = StubSource::unavailable("gated", "disabled");

        let chain = SourceChain::new(vec![first, gated]);
        let err = chain.acquire(&vid()).await.unwrap_err();
        assert!(matches!(err, HarkError::CapabilityUnavailable(_)));
    }
}
