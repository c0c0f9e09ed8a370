//! Video identifier extraction.

use crate::error::{HarkError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// A validated YouTube video identifier.
///
/// Derived once from user input and immutable afterwards. The identifier
/// grammar is the platform's fixed 11-character alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Matches the canonical watch URL, short URL, embed/v URLs,
        // shorts, and bare 11-character ids.
        Regex::new(
            r"(?x)
            (?:
                (?:https?://)?
                (?:www\.|m\.)?
                (?:youtube\.com/watch\?(?:[^\s\#&]*&)*v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
                ([a-zA-Z0-9_-]{11})
            )
            |
            ^([a-zA-Z0-9_-]{11})$
        ",
        )
        .expect("Invalid regex")
    })
}

impl VideoId {
    /// Extract a video identifier from a URL or bare id.
    ///
    /// Pure and side-effect free. An unrecognized input is fatal for the
    /// whole run; no source cascade applies to it.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let caps = video_id_regex()
            .captures(trimmed)
            .ok_or_else(|| HarkError::InvalidInput(format!("Not a YouTube URL or video id: {}", input)))?;

        let id = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| HarkError::InvalidInput(format!("Not a YouTube URL or video id: {}", input)))?;

        Ok(Self(id))
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical watch URL for this video.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url_shapes() {
        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=shared&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "dQw4w9WgXcQ",
            "  dQw4w9WgXcQ  ",
        ] {
            let id = VideoId::parse(input).unwrap_or_else(|_| panic!("should parse: {}", input));
            assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "not-a-video-id", "https://example.com/watch?v=dQw4w9WgXcQ0", "short"] {
            assert!(VideoId::parse(input).is_err(), "should reject: {}", input);
        }
    }

    #[test]
    fn test_watch_url() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
