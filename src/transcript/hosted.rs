//! Managed transcript API source.
//!
//! The most reliable source. Short videos come back immediately; long
//! ones return a job handle that is polled at a fixed interval up to a
//! bounded number of attempts.

use super::{FetchOutcome, TranscriptSource};
use crate::config::SourceSettings;
use crate::error::{HarkError, Result};
use crate::video::VideoId;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Hosted transcript API client.
pub struct HostedApiSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

/// Raw response shape of a transcript request.
#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    transcript: Option<String>,
    job_id: Option<String>,
}

/// A transcript request resolves to exactly one of these.
///
/// The conversion is explicit: a response carrying both fields, or
/// neither, is a malformed response and fails the source rather than
/// being guessed at.
#[derive(Debug)]
enum HostedResponse {
    Immediate(String),
    Deferred(String),
}

impl TryFrom<TranscriptResponse> for HostedResponse {
    type Error = HarkError;

    fn try_from(resp: TranscriptResponse) -> Result<Self> {
        match (resp.transcript, resp.job_id) {
            (Some(text), None) => Ok(HostedResponse::Immediate(text)),
            (None, Some(job_id)) => Ok(HostedResponse::Deferred(job_id)),
            (Some(_), Some(_)) => Err(HarkError::Transcription(
                "Hosted API returned both a transcript and a job id".into(),
            )),
            (None, None) => Err(HarkError::Transcription(
                "Hosted API returned neither a transcript nor a job id".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    transcript: Option<String>,
}

impl HostedApiSource {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        poll_interval: Duration,
        poll_max_attempts: u32,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            api_key,
            poll_interval,
            poll_max_attempts,
        }
    }

    pub fn from_settings(settings: &SourceSettings) -> Self {
        Self::new(
            settings.hosted_api_url.clone(),
            settings.resolve_api_key(),
            Duration::from_secs(settings.poll_interval_seconds),
            settings.poll_max_attempts,
        )
    }

    /// Poll a deferred job until it completes or the attempt budget runs out.
    async fn poll_job(&self, api_key: &str, job_id: &str) -> Result<FetchOutcome> {
        let url = format!("{}/jobs/{}", self.base_url, job_id);

        for attempt in 1..=self.poll_max_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let resp = self
                .client
                .get(&url)
                .bearer_auth(api_key)
                .send()
                .await?
                .error_for_status()
                .map_err(|e| HarkError::Transcription(format!("Job status request failed: {e}")))?;

            let status: JobStatusResponse = resp.json().await?;
            debug!(job_id, attempt, status = %status.status, "Polled transcript job");

            match status.status.as_str() {
                "completed" => {
                    return match status.transcript {
                        Some(text) if !text.is_empty() => Ok(FetchOutcome::Text(text)),
                        _ => Ok(FetchOutcome::Empty),
                    };
                }
                "failed" => {
                    return Err(HarkError::Transcription(format!(
                        "Transcript job {} failed upstream",
                        job_id
                    )));
                }
                // "pending" / "processing" keep polling
                _ => continue,
            }
        }

        Err(HarkError::Transcription(format!(
            "Transcript job {} did not complete within {} polls",
            job_id, self.poll_max_attempts
        )))
    }
}

#[async_trait]
impl TranscriptSource for HostedApiSource {
    fn name(&self) -> &'static str {
        "hosted-api"
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(HarkError::Config(
                "No hosted transcript API key configured".into(),
            ));
        };

        let url = format!("{}/transcripts", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("video_id", video_id.as_str())])
            .bearer_auth(&api_key)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(FetchOutcome::Empty);
        }

        let resp = resp
            .error_for_status()
            .map_err(|e| HarkError::Transcription(format!("Transcript request failed: {e}")))?;

        let raw: TranscriptResponse = resp.json().await?;

        match HostedResponse::try_from(raw)? {
            HostedResponse::Immediate(text) => {
                if text.is_empty() {
                    Ok(FetchOutcome::Empty)
                } else {
                    Ok(FetchOutcome::Text(text))
                }
            }
            HostedResponse::Deferred(job_id) => {
                warn!(job_id = %job_id, "Transcript deferred to background job, polling");
                self.poll_job(&api_key, &job_id).await
            }
        }
    }
}
