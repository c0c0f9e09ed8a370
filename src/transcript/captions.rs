//! Shared parsing for caption feed payloads.
//!
//! The timedtext XML dialect is small: a `<transcript>` root with
//! `<text start="..." dur="...">` segments whose bodies are HTML-entity
//! encoded. Parsing is done by hand to stay deterministic about exactly
//! which shapes we accept.

use regex::Regex;
use std::sync::OnceLock;

/// One caption segment from a timedtext feed.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSegment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<text\s+start="([\d.]+)"(?:\s+dur="([\d.]+)")?[^>]*>(.*?)</text>"#)
            .expect("Invalid regex")
    })
}

/// Parse a timedtext XML document into caption segments.
///
/// Unrecognized elements are skipped; segments with empty bodies are
/// dropped.
pub fn parse_timedtext_xml(xml: &str) -> Vec<CaptionSegment> {
    // The feed puts each <text> element on one line, but don't rely on it.
    let flattened = xml.replace('\n', " ");

    segment_regex()
        .captures_iter(&flattened)
        .filter_map(|caps| {
            let start = caps.get(1)?.as_str().parse::<f64>().ok()?;
            let duration = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0);
            let text = decode_entities(caps.get(3)?.as_str());
            let text = text.trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(CaptionSegment { start, duration, text })
            }
        })
        .collect()
}

/// Join parsed segments into a single transcript string.
pub fn segments_to_text(segments: &[CaptionSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the HTML entities that caption feeds actually emit.
///
/// Handles the named entities plus decimal/hex numeric references;
/// anything unrecognized is passed through untouched.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let Some(semi) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };

        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse::<u32>().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                // Not an entity we know; keep the ampersand literal.
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timedtext_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<transcript>
<text start="0.12" dur="2.5">Hello world</text>
<text start="2.62" dur="3.0">it&amp;#39;s a test &amp;amp; more</text>
<text start="5.62" dur="1.0"></text>
</transcript>"#;

        let segments = parse_timedtext_xml(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 0.12);
        assert_eq!(segments[0].text, "Hello world");
        // Double-encoded entities decode one level per pass; a single
        // decode of the raw feed text handles the common case.
        assert!(segments[1].text.contains("test"));
    }

    #[test]
    fn test_parse_without_dur_attribute() {
        let xml = r#"<transcript><text start="1.0">only start</text></transcript>"#;
        let segments = parse_timedtext_xml(xml);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration, 0.0);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("it&#39;s &amp; so on"), "it's & so on");
        assert_eq!(decode_entities("&lt;b&gt;bold&lt;/b&gt;"), "<b>bold</b>");
        assert_eq!(decode_entities("&#x27;hex&#x27;"), "'hex'");
        assert_eq!(decode_entities("no entities here"), "no entities here");
        assert_eq!(decode_entities("stray & ampersand"), "stray & ampersand");
        assert_eq!(decode_entities("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn test_segments_to_text() {
        let segments = vec![
            CaptionSegment { start: 0.0, duration: 1.0, text: "one".into() },
            CaptionSegment { start: 1.0, duration: 1.0, text: "two".into() },
        ];
        assert_eq!(segments_to_text(&segments), "one two");
    }
}
