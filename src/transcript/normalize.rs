//! Transcript normalization.
//!
//! Undoes provider-specific artifacts before chunking: subtitle headers,
//! inline timestamp and styling tags, entity leftovers, and the phrase
//! duplication auto-captioning produces as captions scroll. Every pass
//! returns a new string; the repetition collapse iterates to a fixed
//! point, which makes the whole function idempotent.

use regex::Regex;
use std::sync::OnceLock;

/// Longest phrase (in words) considered for repetition collapse.
const MAX_PHRASE_WORDS: usize = 15;

fn markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Inline <00:00:01.500><c>...</c> dialect plus any other bracketed markup.
    RE.get_or_init(|| Regex::new(r"<[^>]*>|\[[^\]]*\]").expect("Invalid regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex"))
}

/// Normalize raw transcript text.
///
/// Deterministic and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let text = strip_header(raw);
    let text = markup_regex().replace_all(&text, " ");
    let mut text = collapse_whitespace(&text);

    loop {
        let collapsed = collapse_repetitions(&text, MAX_PHRASE_WORDS);
        let collapsed = collapse_whitespace(&collapsed);
        if collapsed == text {
            break;
        }
        text = collapsed;
    }

    text
}

/// Drop a leading subtitle-container banner line (e.g. "WEBVTT") if present.
fn strip_header(text: &str) -> String {
    let trimmed = text.trim_start();
    if let Some(first_line_end) = trimmed.find('\n') {
        let first_line = trimmed[..first_line_end].trim();
        if first_line.eq_ignore_ascii_case("webvtt") || first_line.starts_with("WEBVTT ") {
            return trimmed[first_line_end + 1..].to_string();
        }
    } else if trimmed.trim().eq_ignore_ascii_case("webvtt") {
        return String::new();
    }
    text.to_string()
}

/// Collapse all whitespace runs (including newlines) to single spaces.
fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

/// One pass of repetition collapse.
///
/// Wherever a phrase of up to `max_words` words is immediately followed
/// by an identical copy of itself, the copy is dropped. Longer phrases
/// win over shorter ones at the same position. Runs of three or more
/// repetitions converge over successive passes of the caller's
/// fixed-point loop.
fn collapse_repetitions(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let remaining = words.len() - i;
        let longest = max_words.min(remaining / 2);
        let mut consumed = false;

        for len in (1..=longest).rev() {
            if words[i..i + len] == words[i + len..i + 2 * len] {
                out.extend_from_slice(&words[i..i + len]);
                i += 2 * len;
                consumed = true;
                break;
            }
        }

        if !consumed {
            out.push(words[i]);
            i += 1;
        }
    }

    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_webvtt_banner() {
        assert_eq!(normalize("WEBVTT\nHello world"), "Hello world");
        assert_eq!(normalize("WEBVTT"), "");
        assert_eq!(normalize("Hello WEBVTT style"), "Hello WEBVTT style");
    }

    #[test]
    fn test_strips_inline_markup() {
        assert_eq!(
            normalize("Hello <00:00:01.500><c>world</c> [Music] again"),
            "Hello world again"
        );
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  a \n\n b\t c  "), "a b c");
    }

    #[test]
    fn test_collapses_single_repetition() {
        assert_eq!(
            normalize("Hello world. Hello world. This is a test."),
            "Hello world. This is a test."
        );
    }

    #[test]
    fn test_collapses_repeated_single_word() {
        assert_eq!(normalize("the the the the cat"), "the cat");
    }

    #[test]
    fn test_prefers_longest_phrase() {
        // "so so" inside a longer duplicated phrase collapses as part of
        // the phrase, not word-by-word first.
        assert_eq!(normalize("it was so good it was so good"), "it was so good");
    }

    #[test]
    fn test_no_false_positive_on_natural_text() {
        let text = "I said that that was fine";
        // "that that" is a legitimate double word; collapse still fires.
        // This is the accepted cost of undoing caption duplication.
        assert_eq!(normalize(text), "I said that was fine");

        let clean = "one two three four five";
        assert_eq!(normalize(clean), clean);
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "Hello world. Hello world. This is a test.",
            "a a a a a a a",
            "WEBVTT\nfoo <c>bar</c> foo bar",
            "plain text with no artifacts",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for: {}", input);
        }
    }

    #[test]
    fn test_fixed_point_terminates_on_heavy_repetition() {
        // Up to 5 consecutive copies of phrases of varying lengths.
        for phrase_len in 1..=MAX_PHRASE_WORDS {
            let phrase: Vec<String> = (0..phrase_len).map(|w| format!("w{}", w)).collect();
            let phrase = phrase.join(" ");
            for copies in 2..=5 {
                let input = vec![phrase.clone(); copies].join(" ");
                assert_eq!(normalize(&input), phrase, "len={} copies={}", phrase_len, copies);
            }
        }
    }
}
