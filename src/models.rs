//! Core data types that flow through the ingestion and answer pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A raw document collected during ingestion, before chunking.
///
/// Exactly one of `url` / `file_path` is set, marking the origin as a
/// fetched web page or a parsed local file. Never persisted directly; only
/// its chunks are.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: Option<String>,
    pub text: String,
    pub url: Option<String>,
    pub file_path: Option<PathBuf>,
}

/// Per-row metadata record, serialized as one JSONL line per index row.
///
/// Row `i` of the vector artifact corresponds to record `i` of the metadata
/// artifact; [`crate::index::VectorIndex`] owns both and keeps them paired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMeta {
    /// Index of the parent document within the ingestion run.
    pub doc_index: usize,
    /// Position of this chunk within its parent document.
    pub chunk_index: usize,
    pub title: Option<String>,
    pub url: Option<String>,
    pub file_path: Option<PathBuf>,
    pub text: String,
}

impl ChunkMeta {
    /// Stable identity used for source deduplication: the URL for web
    /// documents, the path for local files.
    pub fn source_identity(&self) -> String {
        self.url
            .clone()
            .or_else(|| self.file_path.as_ref().map(|p| p.display().to_string()))
            .unwrap_or_default()
    }
}

/// A retrieved chunk paired with its similarity score, in search order.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub score: f32,
    pub meta: ChunkMeta,
}

/// A deduplicated, display-ready source citation.
///
/// Built once per query in first-seen (highest-score) order; position in
/// the list plus one is the citation number used in the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub title: String,
    pub url: Option<String>,
    pub file_path: Option<PathBuf>,
    /// First (highest-scoring) chunk text for this source, display-capped.
    pub snippet: String,
}

impl SourceEntry {
    /// Location string for display: the URL or the file path.
    pub fn location(&self) -> String {
        self.url
            .clone()
            .or_else(|| self.file_path.as_ref().map(|p| p.display().to_string()))
            .unwrap_or_default()
    }
}

/// The final response for one question. Ephemeral, never persisted.
#[derive(Debug, Clone)]
pub struct RagResponse {
    pub answer: String,
    /// Ordered as cited: `sources[0]` is `[1]` in the answer.
    pub sources: Vec<SourceEntry>,
    /// Existing local files backing the top-ranked sources, in rank order.
    pub attachments: Vec<PathBuf>,
}
