//! Transcript acquisition.
//!
//! A transcript can come from several independently-failing places: a
//! managed transcript API, public caption feeds, a watch-page caption
//! track, yt-dlp subtitle extraction, or speech-to-text over downloaded
//! audio. Each is an interchangeable [`TranscriptSource`]; the
//! [`SourceChain`] tries them in priority order and stops at the first
//! non-empty result.

mod captions;
mod caption_feed;
mod caption_tracks;
mod chain;
mod hosted;
pub mod normalize;
mod speech;
mod subtitles;
mod timedtext_json;

pub use caption_feed::CaptionFeedSource;
pub use caption_tracks::CaptionTrackSource;
pub use chain::{AcquiredTranscript, SourceChain};
pub use hosted::HostedApiSource;
pub use speech::SpeechToTextSource;
pub use subtitles::SubtitleSource;
pub use timedtext_json::TimedtextJsonSource;

use crate::error::Result;
use crate::video::VideoId;
use async_trait::async_trait;

/// Outcome of a single source's fetch.
///
/// An empty result is a valid response with no content, not an error;
/// both cause fallthrough to the next source, but they are logged
/// differently.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The source produced transcript text (may still be whitespace-only).
    Text(String),
    /// The source responded but has no transcript for this video.
    Empty,
}

/// One interchangeable way of obtaining a transcript.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Reason this source cannot run in the current environment, if any.
    ///
    /// Checked by the chain before `fetch` so that a missing runtime
    /// capability is a skip, never a failed attempt.
    fn unavailable_reason(&self) -> Option<String> {
        None
    }

    /// Try to obtain a transcript for the video.
    ///
    /// Errors are local to this source; the chain converts them to
    /// fallthrough.
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome>;
}
