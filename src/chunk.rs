//! Sliding-window text chunker.
//!
//! Splits document text into token-bounded windows where consecutive
//! windows overlap by a configurable amount, so context at chunk
//! boundaries is never lost. Two paths produce the windows:
//!
//! - **tokenizer**: when a HuggingFace `tokenizer.json` is configured,
//!   windows are taken over real token ids and decoded back to text;
//! - **approximation**: otherwise windows are taken over characters at a
//!   fixed 4-chars-per-token ratio.
//!
//! Both paths cover the entire input with no gaps and guarantee
//! termination even when `overlap >= target` (the step is clamped to one
//! unit).

use anyhow::{Context, Result};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::config::ChunkingConfig;

/// Chars-per-token ratio for the approximation path.
const CHARS_PER_TOKEN: usize = 4;

pub struct Chunker {
    target_tokens: usize,
    overlap_tokens: usize,
    tokenizer: Option<Tokenizer>,
}

impl Chunker {
    /// Build a chunker from config, loading the tokenizer file when one
    /// is configured.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        let tokenizer = match &config.tokenizer_path {
            Some(path) => Some(load_tokenizer(path)?),
            None => None,
        };
        Ok(Self {
            target_tokens: config.target_tokens,
            overlap_tokens: config.overlap_tokens,
            tokenizer,
        })
    }

    /// Build a chunker that always uses the character approximation.
    pub fn approximate(target_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            target_tokens,
            overlap_tokens,
            tokenizer: None,
        }
    }

    /// Split `text` into overlapping windows of at most `target_tokens`
    /// tokens. Empty input yields an empty Vec.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        match &self.tokenizer {
            Some(tokenizer) => self.chunk_tokens(tokenizer, text),
            None => Ok(self.chunk_chars(text)),
        }
    }

    fn chunk_tokens(&self, tokenizer: &Tokenizer, text: &str) -> Result<Vec<String>> {
        let encoding = tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("tokenizer encode failed: {}", e))?;
        let ids = encoding.get_ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let step = window_step(self.target_tokens, self.overlap_tokens);
        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < ids.len() {
            let end = (start + self.target_tokens).min(ids.len());
            let piece = tokenizer
                .decode(&ids[start..end], true)
                .map_err(|e| anyhow::anyhow!("tokenizer decode failed: {}", e))?;
            chunks.push(piece);
            start += step;
        }
        Ok(chunks)
    }

    /// Character windows; operates on `char` boundaries so multi-byte
    /// text is never split mid code point.
    fn chunk_chars(&self, text: &str) -> Vec<String> {
        let size = self.target_tokens * CHARS_PER_TOKEN;
        let overlap = self.overlap_tokens * CHARS_PER_TOKEN;
        let step = window_step(size, overlap);

        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0usize;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            start += step;
        }
        chunks
    }
}

/// Window advance per iteration. Clamped to at least 1 so the loop
/// terminates when `overlap >= size`.
fn window_step(size: usize, overlap: usize) -> usize {
    size.saturating_sub(overlap).max(1)
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Failed to load tokenizer: {}", path.display()))
}
