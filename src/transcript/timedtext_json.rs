//! Lightweight unauthenticated transcript fetcher.
//!
//! Requests the json3 flavor of the timedtext endpoint, which needs no
//! API key and returns caption events as JSON.

use super::{FetchOutcome, TranscriptSource};
use crate::error::Result;
use crate::video::VideoId;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";

/// json3 timedtext fetcher.
pub struct TimedtextJsonSource {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl TimedtextJsonSource {
    pub fn new(languages: Vec<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, languages }
    }

    /// Extract plain text from a json3 events payload.
    fn events_to_text(payload: &serde_json::Value) -> String {
        let Some(events) = payload["events"].as_array() else {
            return String::new();
        };

        let mut parts: Vec<String> = Vec::new();
        for event in events {
            let Some(segs) = event["segs"].as_array() else {
                continue;
            };
            let line: String = segs
                .iter()
                .filter_map(|seg| seg["utf8"].as_str())
                .collect::<Vec<_>>()
                .join("");
            let line = line.trim();
            if !line.is_empty() {
                parts.push(line.to_string());
            }
        }

        parts.join(" ")
    }
}

#[async_trait]
impl TranscriptSource for TimedtextJsonSource {
    fn name(&self) -> &'static str {
        "timedtext-json"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome> {
        for lang in &self.languages {
            let url = Url::parse_with_params(
                TIMEDTEXT_URL,
                &[
                    ("v", video_id.as_str()),
                    ("lang", lang.as_str()),
                    ("fmt", "json3"),
                ],
            )
            .map_err(|e| crate::error::HarkError::Transcription(format!("Bad timedtext URL: {e}")))?;

            let resp = self.client.get(url).send().await?;

            if !resp.status().is_success() {
                debug!(lang, status = %resp.status(), "timedtext request rejected");
                continue;
            }

            let body = resp.text().await?;
            if body.trim().is_empty() {
                debug!(lang, "timedtext returned empty body");
                continue;
            }

            let payload: serde_json::Value = match serde_json::from_str(&body) {
                Ok(v) => v,
                Err(e) => {
                    debug!(lang, "timedtext body was not JSON: {}", e);
                    continue;
                }
            };

            let text = Self::events_to_text(&payload);
            if !text.is_empty() {
                return Ok(FetchOutcome::Text(text));
            }
        }

        Ok(FetchOutcome::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_events_to_text() {
        let payload = json!({
            "events": [
                { "tStartMs": 0, "segs": [{ "utf8": "Hello " }, { "utf8": "world" }] },
                { "tStartMs": 1200, "segs": [{ "utf8": "\n" }] },
                { "tStartMs": 2400, "segs": [{ "utf8": "second line" }] },
                { "tStartMs": 3000 }
            ]
        });

        assert_eq!(
            TimedtextJsonSource::events_to_text(&payload),
            "Hello world second line"
        );
    }

    #[test]
    fn test_events_to_text_missing_events() {
        let payload = json!({ "somethingElse": true });
        assert_eq!(TimedtextJsonSource::events_to_text(&payload), "");
    }
}
