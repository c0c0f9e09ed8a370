//! Watch-page caption track reader.
//!
//! Scrapes the player response embedded in the watch page for its
//! caption track list, then issues its own request for the raw caption
//! feed and parses the subtitle-segment XML with entity decoding.

use super::captions::{parse_timedtext_xml, segments_to_text};
use super::{FetchOutcome, TranscriptSource};
use crate::error::{HarkError, Result};
use crate::video::VideoId;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// One entry of the page's caption track list.
#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: Option<String>,
}

/// Caption track scraper.
pub struct CaptionTrackSource {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl CaptionTrackSource {
    pub fn new(languages: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, languages }
    }

    /// Locate the `"captionTracks":[...]` array inside the watch page.
    ///
    /// Extracted with a bracket-depth scan rather than a regex so that
    /// brackets inside string values cannot truncate the array.
    fn extract_caption_tracks(html: &str) -> Option<&str> {
        const MARKER: &str = "\"captionTracks\":";
        let start = html.find(MARKER)? + MARKER.len();
        let rest = &html[start..];

        if !rest.starts_with('[') {
            return None;
        }

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (i, c) in rest.char_indices() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '"' {
                    in_string = false;
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&rest[..=i]);
                    }
                }
                _ => {}
            }
        }

        None
    }

    /// Pick a track matching the preferred languages, else the first.
    fn select_track<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        for lang in &self.languages {
            if let Some(track) = tracks
                .iter()
                .find(|t| t.language_code.as_deref() == Some(lang.as_str()))
            {
                return Some(track);
            }
        }
        tracks.first()
    }
}

#[async_trait]
impl TranscriptSource for CaptionTrackSource {
    fn name(&self) -> &'static str {
        "caption-tracks"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome> {
        let html = self
            .client
            .get(video_id.watch_url())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HarkError::Transcription(format!("Watch page request failed: {e}")))?
            .text()
            .await?;

        let Some(raw_tracks) = Self::extract_caption_tracks(&html) else {
            debug!("Watch page carries no caption track list");
            return Ok(FetchOutcome::Empty);
        };

        let tracks: Vec<CaptionTrack> = serde_json::from_str(raw_tracks)
            .map_err(|e| HarkError::Transcription(format!("Unparseable caption track list: {e}")))?;

        let Some(track) = self.select_track(&tracks) else {
            return Ok(FetchOutcome::Empty);
        };

        // The embedded URL escapes ampersands as &.
        let feed_url = track.base_url.replace("\\u0026", "&");
        debug!(lang = ?track.language_code, "Fetching caption track feed");

        let xml = self
            .client
            .get(&feed_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| HarkError::Transcription(format!("Caption feed request failed: {e}")))?
            .text()
            .await?;

        let segments = parse_timedtext_xml(&xml);
        if segments.is_empty() {
            return Ok(FetchOutcome::Empty);
        }

        Ok(FetchOutcome::Text(segments_to_text(&segments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_caption_tracks() {
        let html = r#"...,"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://example.com/tt?v=x&lang=en","languageCode":"en"},{"baseUrl":"https://example.com/tt?v=x&lang=de","languageCode":"de"}],"audioTracks":[...]"#;

        let raw = CaptionTrackSource::extract_caption_tracks(html).unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.ends_with(']'));

        let tracks: Vec<CaptionTrack> = serde_json::from_str(raw).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code.as_deref(), Some("en"));
    }

    #[test]
    fn test_extract_handles_brackets_in_strings() {
        let html = r#""captionTracks":[{"baseUrl":"https://x/tt","name":"weird ] bracket","languageCode":"en"}] trailing"#;
        let raw = CaptionTrackSource::extract_caption_tracks(html).unwrap();
        let tracks: Vec<CaptionTrack> = serde_json::from_str(raw).unwrap();
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn test_extract_missing_marker() {
        assert!(CaptionTrackSource::extract_caption_tracks("<html>no captions</html>").is_none());
    }

    #[test]
    fn test_select_track_prefers_configured_language() {
        let source = CaptionTrackSource::new(vec!["de".to_string()]);
        let tracks = vec![
            CaptionTrack { base_url: "en-url".into(), language_code: Some("en".into()) },
            CaptionTrack { base_url: "de-url".into(), language_code: Some("de".into()) },
        ];

        assert_eq!(source.select_track(&tracks).unwrap().base_url, "de-url");
    }

    #[test]
    fn test_select_track_falls_back_to_first() {
        let source = CaptionTrackSource::new(vec!["fr".to_string()]);
        let tracks = vec![CaptionTrack { base_url: "en-url".into(), language_code: Some("en".into()) }];

        assert_eq!(source.select_track(&tracks).unwrap().base_url, "en-url");
    }
}
