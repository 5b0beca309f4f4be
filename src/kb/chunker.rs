//! Fixed-size sliding-window chunking.
//!
//! Documents are split into overlapping character windows before
//! embedding. Window boundaries ignore sentence and word structure;
//! overlap keeps context that would otherwise be cut at a boundary.

use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

impl ChunkConfig {
    /// The overlap must be strictly smaller than the window, otherwise
    /// the window never advances.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.chunk_size == 0 {
            return Err(ApiError::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ApiError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split `text` into overlapping windows of `config.chunk_size` characters.
///
/// Returns the windows in document order. Text no longer than one window
/// comes back as a single chunk equal to the full text.
pub fn chunk_text(text: &str, config: ChunkConfig) -> Result<Vec<String>, ApiError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total == 0 {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total {
        let end = (start + config.chunk_size).min(total);
        chunks.push(chars[start..end].iter().collect());
        if end >= total {
            break;
        }
        start += config.step();
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, chunk_overlap: usize) -> ChunkConfig {
        ChunkConfig {
            chunk_size,
            chunk_overlap,
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let text = "short document";
        let chunks = chunk_text(text, ChunkConfig::default()).unwrap();
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn text_exactly_one_window_is_a_single_chunk() {
        let text = "a".repeat(800);
        let chunks = chunk_text(&text, ChunkConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn thousand_chars_split_into_two_overlapping_windows() {
        let text = "A".repeat(1000);
        let chunks = chunk_text(&text, ChunkConfig::default()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 800);
        assert_eq!(chunks[1].chars().count(), 400);
        assert_eq!(chunks[0], text[0..800]);
        assert_eq!(chunks[1], text[600..1000]);
    }

    #[test]
    fn consecutive_chunks_share_exactly_the_overlap() {
        let text: String = ('a'..='z').cycle().take(2000).collect();
        let cfg = config(800, 200);
        let chunks = chunk_text(&text, cfg).unwrap();
        for pair in chunks.windows(2) {
            let head: Vec<char> = pair[0].chars().collect();
            let tail: Vec<char> = pair[1].chars().collect();
            let shared = &head[head.len() - cfg.chunk_overlap..];
            assert_eq!(shared, &tail[..cfg.chunk_overlap]);
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunks = chunk_text("", ChunkConfig::default()).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn overlap_equal_to_size_fails_fast() {
        let err = chunk_text("some text", config(100, 100)).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn overlap_larger_than_size_fails_fast() {
        let err = chunk_text("some text", config(100, 150)).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn zero_chunk_size_fails_fast() {
        let err = chunk_text("some text", config(0, 0)).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn multibyte_text_counts_characters_not_bytes() {
        let text = "é".repeat(900);
        let chunks = chunk_text(&text, ChunkConfig::default()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 800);
        assert_eq!(chunks[1].chars().count(), 300);
    }
}
