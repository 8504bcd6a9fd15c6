//! Text chunking module
//!
//! Splits plain text into overlapping windows of whitespace-delimited tokens.
//! Windows advance by `chunk_size - chunk_overlap` tokens, and the last
//! window is the first one that reaches the end of the text, so dropping the
//! leading `chunk_overlap` tokens of every window after the first
//! reconstructs the original token sequence exactly.

use crate::errors::IngestionError;
use cocounsel_common::config::RetrievalConfig;
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in tokens
    pub chunk_size: usize,
    /// Tokens shared by consecutive windows
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

impl ChunkingConfig {
    /// Validated configuration; the overlap must leave a positive step
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, IngestionError> {
        if chunk_size == 0 {
            return Err(IngestionError::InvalidChunking("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(IngestionError::InvalidChunking(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn from_retrieval(config: &RetrievalConfig) -> Result<Self, IngestionError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Tokens advanced per window
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

/// Split text into overlapping token windows.
///
/// Tokens are re-joined with single spaces. Whitespace-only input yields no
/// chunks.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let size = config.chunk_size.max(1);
    let step = config.step();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < tokens.len() {
        let end = (start + size).min(tokens.len());
        chunks.push(tokens[start..end].join(" "));
        if end == tokens.len() {
            break;
        }
        start += step;
    }

    debug!(
        tokens = tokens.len(),
        chunk_count = chunks.len(),
        chunk_size = size,
        "Text chunked"
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn reassemble(chunks: &[String], overlap: usize) -> Vec<String> {
        let mut tokens = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let skip = if i == 0 { 0 } else { overlap };
            tokens.extend(chunk.split(' ').skip(skip).map(str::to_string));
        }
        tokens
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let text = "The deadline for filing is March 1. The hearing is scheduled for March 15.";
        let chunks = chunk_text(text, &ChunkingConfig::default());
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
        assert!(chunk_text(" \n\t  ", &ChunkingConfig::default()).is_empty());
    }

    #[test]
    fn test_window_boundaries() {
        let text: Vec<String> = (0..12).map(|i| format!("t{i}")).collect();
        let config = ChunkingConfig::new(5, 2).unwrap();
        let chunks = chunk_text(&text.join(" "), &config);

        assert_eq!(
            chunks,
            vec![
                "t0 t1 t2 t3 t4",
                "t3 t4 t5 t6 t7",
                "t6 t7 t8 t9 t10",
                "t9 t10 t11",
            ]
        );
    }

    #[test]
    fn test_size_counts_tokens_not_characters() {
        let long = "suppression".repeat(20);
        let text = format!("{long}\n\n{long}\t {long}");
        let chunks = chunk_text(&text, &ChunkingConfig::new(3, 1).unwrap());
        assert_eq!(chunks, vec![format!("{long} {long} {long}")]);
    }

    #[test]
    fn test_exact_fit_has_no_redundant_tail() {
        let text: Vec<String> = (0..8).map(|i| format!("w{i}")).collect();
        let config = ChunkingConfig::new(5, 2).unwrap();
        let chunks = chunk_text(&text.join(" "), &config);
        assert_eq!(chunks, vec!["w0 w1 w2 w3 w4", "w3 w4 w5 w6 w7"]);
    }

    #[test]
    fn test_reassembly_reproduces_every_token_once() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let size = rng.gen_range(1..40);
            let overlap = rng.gen_range(0..size);
            let config = ChunkingConfig::new(size, overlap).unwrap();

            let count = rng.gen_range(0..300);
            let tokens: Vec<String> = (0..count).map(|i| format!("tok{i}")).collect();
            let separators = [" ", "  ", "\n", "\t", " \n "];
            let text = tokens
                .iter()
                .map(|t| format!("{}{}", t, separators[rng.gen_range(0..separators.len())]))
                .collect::<String>();

            let chunks = chunk_text(&text, &config);
            assert_eq!(reassemble(&chunks, overlap), tokens, "size={size} overlap={overlap}");
            assert!(chunks.iter().all(|c| !c.is_empty()));
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(10, 9).is_ok());
        assert_eq!(ChunkingConfig::default().step(), 450);
    }
}
