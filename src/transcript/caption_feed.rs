//! Caption feed source.
//!
//! Fetches the legacy timedtext XML feed directly, trying each
//! configured language in order.

use super::captions::{parse_timedtext_xml, segments_to_text};
use super::{FetchOutcome, TranscriptSource};
use crate::error::Result;
use crate::video::VideoId;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const FEED_URL: &str = "https://video.google.com/timedtext";

/// Direct caption feed reader.
pub struct CaptionFeedSource {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl CaptionFeedSource {
    pub fn new(languages: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, languages }
    }
}

#[async_trait]
impl TranscriptSource for CaptionFeedSource {
    fn name(&self) -> &'static str {
        "caption-feed"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome> {
        for lang in &self.languages {
            let url = Url::parse_with_params(
                FEED_URL,
                &[("lang", lang.as_str()), ("v", video_id.as_str())],
            )
            .map_err(|e| crate::error::HarkError::Transcription(format!("Bad feed URL: {e}")))?;

            let resp = self.client.get(url).send().await?;

            if !resp.status().is_success() {
                debug!(lang, status = %resp.status(), "Caption feed request rejected");
                continue;
            }

            let body = resp.text().await?;

            // The feed answers 200 with an empty body when no track exists.
            if body.trim().is_empty() {
                debug!(lang, "Caption feed has no track for this language");
                continue;
            }

            let segments = parse_timedtext_xml(&body);
            if segments.is_empty() {
                debug!(lang, "Caption feed track parsed to zero segments");
                continue;
            }

            return Ok(FetchOutcome::Text(segments_to_text(&segments)));
        }

        Ok(FetchOutcome::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_url_shape() {
        let url = Url::parse_with_params(FEED_URL, &[("lang", "en"), ("v", "dQw4w9WgXcQ")]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://video.google.com/timedtext?lang=en&v=dQw4w9WgXcQ"
        );
    }
}
