//! Auto-generated subtitle extraction via yt-dlp.
//!
//! Asks yt-dlp for auto-generated subtitles only (no media download),
//! parses the resulting VTT file, and deletes it after reading.

use super::{FetchOutcome, TranscriptSource};
use crate::error::{HarkError, Result};
use crate::video::VideoId;
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// yt-dlp auto-subtitle source.
pub struct SubtitleSource {
    languages: Vec<String>,
}

fn inline_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // <00:00:01.500>, <c>, </c>, <c.colorE5E5E5> and friends
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("Invalid regex"))
}

impl SubtitleSource {
    pub fn new(languages: Vec<String>) -> Self {
        Self { languages }
    }

    /// Reduce a VTT document to cue text.
    ///
    /// Drops the WEBVTT header block, cue identifiers, timing lines and
    /// inline timestamp/styling tags. Consecutive duplicate lines are
    /// kept; the normalizer collapses those later.
    fn vtt_to_text(vtt: &str) -> String {
        let mut lines = Vec::new();

        for line in vtt.lines() {
            let l = line.trim();
            if l.is_empty() {
                continue;
            }
            if l.eq_ignore_ascii_case("webvtt")
                || l.starts_with("Kind:")
                || l.starts_with("Language:")
                || l.starts_with("NOTE")
                || l.starts_with("STYLE")
            {
                continue;
            }
            if l.contains("-->") {
                continue;
            }
            // numeric cue identifiers
            if l.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }

            let cleaned = inline_tag_regex().replace_all(l, "");
            let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
            if !cleaned.is_empty() {
                lines.push(cleaned);
            }
        }

        lines.join(" ")
    }

    /// Find the first .vtt file produced under `dir`.
    fn find_subtitle_file(dir: &std::path::Path) -> Option<PathBuf> {
        let entries = std::fs::read_dir(dir).ok()?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("vtt") {
                return Some(path);
            }
        }
        None
    }
}

#[async_trait]
impl TranscriptSource for SubtitleSource {
    fn name(&self) -> &'static str {
        "yt-dlp-subtitles"
    }

    fn unavailable_reason(&self) -> Option<String> {
        if which::which("yt-dlp").is_err() {
            Some("yt-dlp is not on PATH".to_string())
        } else {
            None
        }
    }

    #[instrument(skip(self), fields(video_id = %video_id))]
    async fn fetch(&self, video_id: &VideoId) -> Result<FetchOutcome> {
        let temp_dir = tempfile::tempdir()?;
        let template = temp_dir.path().join("%(id)s.%(ext)s");
        let langs = self.languages.join(",");

        let result = Command::new("yt-dlp")
            .arg("--skip-download")
            .arg("--write-auto-sub")
            .arg("--sub-lang").arg(&langs)
            .arg("--sub-format").arg("vtt")
            .arg("--output").arg(template.to_str().unwrap_or_default())
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--no-warnings")
            .arg(video_id.watch_url())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HarkError::ToolNotFound("yt-dlp".into()));
            }
            Err(e) => {
                return Err(HarkError::Transcription(format!("yt-dlp execution failed: {e}")));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarkError::Transcription(format!(
                "yt-dlp subtitle extraction failed: {stderr}"
            )));
        }

        // yt-dlp exits 0 even when the video has no auto subtitles.
        let Some(subtitle_path) = Self::find_subtitle_file(temp_dir.path()) else {
            debug!("No auto-generated subtitles available");
            return Ok(FetchOutcome::Empty);
        };

        let vtt = std::fs::read_to_string(&subtitle_path)?;

        if let Err(e) = std::fs::remove_file(&subtitle_path) {
            warn!("Failed to remove subtitle file: {}", e);
        }

        let text = Self::vtt_to_text(&vtt);
        if text.is_empty() {
            Ok(FetchOutcome::Empty)
        } else {
            Ok(FetchOutcome::Text(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vtt_to_text_strips_structure() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n00:00:00.000 --> 00:00:02.500\nHello <00:00:01.500><c>world</c>\n\n2\n00:00:02.500 --> 00:00:05.000\nsecond   cue\n";

        let text = SubtitleSource::vtt_to_text(vtt);
        assert_eq!(text, "Hello world second cue");
    }

    #[test]
    fn test_vtt_to_text_empty_document() {
        assert_eq!(SubtitleSource::vtt_to_text("WEBVTT\n\n"), "");
    }

    #[test]
    fn test_vtt_to_text_styling_tags() {
        let vtt = "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\n<c.colorE5E5E5>styled</c> plain\n";
        assert_eq!(SubtitleSource::vtt_to_text(vtt), "styled plain");
    }

    #[test]
    fn test_find_subtitle_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SubtitleSource::find_subtitle_file(dir.path()).is_none());

        std::fs::write(dir.path().join("abc.en.vtt"), "WEBVTT").unwrap();
        let found = SubtitleSource::find_subtitle_file(dir.path()).unwrap();
        assert_eq!(found.extension().and_then(|s| s.to_str()), Some("vtt"));
    }
}
