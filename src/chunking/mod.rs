//! Transcript chunking.
//!
//! Splits normalized transcript text into bounded-size chunks suitable
//! for embedding. Splitting is sentence-based: a chunk never breaks a
//! sentence unit in half, even when a single unit overshoots the size
//! bound.

use serde::{Deserialize, Serialize};

/// A bounded-size slice of normalized transcript text, the unit of
/// embedding.
///
/// Created once by the chunker and never mutated. `start_seconds` and
/// `end_seconds` are populated only by timestamp-aware paths and stay
/// zero otherwise; consumers must treat them as optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this chunk.
    pub text: String,
    /// Zero-based, contiguous sequence number in chunking order.
    pub index: i32,
    /// Start time in seconds (0 when unknown).
    pub start_seconds: f64,
    /// End time in seconds (0 when unknown).
    pub end_seconds: f64,
}

impl Chunk {
    pub fn new(text: String, index: i32) -> Self {
        Self {
            text,
            index,
            start_seconds: 0.0,
            end_seconds: 0.0,
        }
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in characters.
    pub target_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { target_chars: 1000 }
    }
}

impl ChunkingConfig {
    /// A chunk may grow to 20% over target before it is closed.
    fn max_chars(&self) -> usize {
        self.target_chars + self.target_chars / 5
    }
}

/// Split normalized text into sentence-like units.
///
/// Runs of `.`, `!`, `?` count as a single delimiter; empty units are
/// discarded.
fn sentence_units(text: &str) -> Vec<&str> {
    text.split(|c| c == '.' || c == '!' || c == '?')
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .collect()
}

/// Chunk normalized transcript text.
///
/// Sentence units are accumulated greedily, joined by `". "`; when the
/// next unit would push the current chunk past the size bound, the chunk
/// is closed and the unit starts a new one. A unit longer than the bound
/// by itself is still emitted whole.
pub fn chunk_text(normalized: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let units = sentence_units(normalized);
    let max_chars = config.max_chars();

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current = String::new();

    for unit in units {
        let candidate_len = if current.is_empty() {
            unit.len()
        } else {
            current.len() + 2 + unit.len()
        };

        if !current.is_empty() && candidate_len > max_chars {
            chunks.push(Chunk::new(current, chunks.len() as i32));
            current = unit.to_string();
        } else {
            if !current.is_empty() {
                current.push_str(". ");
            }
            current.push_str(unit);
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(current, chunks.len() as i32));
    }

    chunks
}
