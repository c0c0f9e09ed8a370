//! Best-effort video metadata lookup.

use super::VideoId;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Title used when metadata lookup fails.
pub const PLACEHOLDER_TITLE: &str = "Untitled video";

/// Basic metadata for a video.
#[derive(Debug, Clone)]
pub struct VideoDetails {
    pub title: String,
    pub channel: Option<String>,
    pub duration_seconds: u32,
}

impl VideoDetails {
    pub fn placeholder() -> Self {
        Self {
            title: PLACEHOLDER_TITLE.to_string(),
            channel: None,
            duration_seconds: 0,
        }
    }
}

/// Trait for metadata lookup.
///
/// Implementations are best-effort by contract: they return placeholder
/// details instead of failing, since metadata is not load-bearing for
/// the ingestion pipeline.
#[async_trait]
pub trait DetailsProvider: Send + Sync {
    async fn video_details(&self, video_id: &VideoId) -> VideoDetails;
}

#[derive(Deserialize)]
struct OembedResponse {
    title: String,
    author_name: Option<String>,
}

/// Metadata via the public oEmbed endpoint.
///
/// oEmbed needs no API key but carries no duration, so duration stays 0.
pub struct OembedDetailsProvider {
    client: reqwest::Client,
}

impl OembedDetailsProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

impl Default for OembedDetailsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DetailsProvider for OembedDetailsProvider {
    async fn video_details(&self, video_id: &VideoId) -> VideoDetails {
        let url = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            video_id.watch_url()
        );

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<OembedResponse>().await {
                Ok(oembed) => {
                    debug!("Fetched metadata: {}", oembed.title);
                    VideoDetails {
                        title: oembed.title,
                        channel: oembed.author_name,
                        duration_seconds: 0,
                    }
                }
                Err(e) => {
                    warn!("Metadata response was not valid oEmbed JSON: {}", e);
                    VideoDetails::placeholder()
                }
            },
            Ok(resp) => {
                warn!("Metadata lookup returned status {}", resp.status());
                VideoDetails::placeholder()
            }
            Err(e) => {
                warn!("Metadata lookup failed: {}", e);
                VideoDetails::placeholder()
            }
        }
    }
}
