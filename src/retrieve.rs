//! Query-time retrieval: embed, search, and assemble cited sources.
//!
//! [`Retriever`] wraps a loaded [`VectorIndex`] and turns a question into
//! ranked [`ScoredChunk`]s. [`dedup_sources`] collapses those chunks into
//! the numbered citation list in a single pass, so the prompt's evidence
//! block and the response's source list can never disagree on numbering.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::RagError;
use crate::index::VectorIndex;
use crate::models::{ScoredChunk, SourceEntry};

#[derive(Debug)]
pub struct Retriever {
    index: VectorIndex,
}

impl Retriever {
    /// Open the persisted index, discovering the vector dimension from
    /// the index header rather than from an embedding call.
    ///
    /// Missing artifacts are the expected "not yet ingested" state and
    /// surface as [`RagError::IndexNotFound`] so the front end can point
    /// the user at `ingest`; any other load failure is a real error.
    pub fn open(config: &Config) -> Result<Self> {
        let index_path = &config.storage.index_path;
        let meta_path = &config.storage.meta_path;

        if !index_path.exists() || !meta_path.exists() {
            return Err(RagError::IndexNotFound {
                index: index_path.clone(),
                meta: meta_path.clone(),
            }
            .into());
        }

        let index = VectorIndex::load(index_path, meta_path)?;
        Ok(Self { index })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Embed the query as a single-item batch, search the index, and zip
    /// hits with their stored metadata. Output keeps search order:
    /// highest similarity first.
    pub async fn retrieve(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = embed_query(embedder, query).await?;
        let hits = self.index.search(&query_vec, top_k)?;

        Ok(hits
            .into_iter()
            .map(|(row, score)| ScoredChunk {
                score,
                meta: self.index.meta(row).clone(),
            })
            .collect())
    }
}

/// Collapse retrieved chunks into one citation entry per source.
///
/// Input must be in score order; the first chunk seen for a source is its
/// highest-scoring one and supplies the snippet. Citation numbers are the
/// resulting positions, 1-based, in first-seen order.
pub fn dedup_sources(chunks: &[ScoredChunk], max_snippet_chars: usize) -> Vec<SourceEntry> {
    let mut seen: Vec<String> = Vec::new();
    let mut sources = Vec::new();

    for chunk in chunks {
        let identity = chunk.meta.source_identity();
        if seen.contains(&identity) {
            continue;
        }
        seen.push(identity);

        let title = chunk
            .meta
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| chunk.meta.url.clone())
            .or_else(|| {
                chunk
                    .meta
                    .file_path
                    .as_ref()
                    .map(|p| p.display().to_string())
            })
            .unwrap_or_else(|| "(untitled)".to_string());

        sources.push(SourceEntry {
            title,
            url: chunk.meta.url.clone(),
            file_path: chunk.meta.file_path.clone(),
            snippet: truncate_snippet(&chunk.meta.text, max_snippet_chars),
        });
    }

    sources
}

/// Render the numbered evidence block used inside the prompt:
/// `[n] title — location` followed by the snippet.
pub fn render_sources_block(sources: &[SourceEntry]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!("[{}] {} — {}\n{}", i + 1, entry.title, entry.location(), entry.snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Cap display text at `max_chars` characters, appending an ellipsis when
/// something was cut. Counts characters, not bytes.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(max_chars).collect();
    if trimmed.chars().count() > max_chars {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMeta;
    use std::path::PathBuf;

    fn chunk(score: f32, url: Option<&str>, path: Option<&str>, text: &str) -> ScoredChunk {
        ScoredChunk {
            score,
            meta: ChunkMeta {
                doc_index: 0,
                chunk_index: 0,
                title: url.map(|u| format!("Title of {}", u)),
                url: url.map(str::to_string),
                file_path: path.map(PathBuf::from),
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        // Sources A, A, B, A, C in score order must yield A, B, C
        let chunks = vec![
            chunk(0.9, Some("https://a"), None, "a best"),
            chunk(0.8, Some("https://a"), None, "a second"),
            chunk(0.7, Some("https://b"), None, "b best"),
            chunk(0.6, Some("https://a"), None, "a third"),
            chunk(0.5, Some("https://c"), None, "c best"),
        ];

        let sources = dedup_sources(&chunks, 800);
        let urls: Vec<_> = sources.iter().map(|s| s.url.clone().unwrap()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        // Each source carries its first (highest-scoring) snippet
        assert_eq!(sources[0].snippet, "a best");
        assert_eq!(sources[1].snippet, "b best");
    }

    #[test]
    fn test_dedup_distinguishes_urls_from_paths() {
        let chunks = vec![
            chunk(0.9, Some("https://a"), None, "web"),
            chunk(0.8, None, Some("/docs/a.pdf"), "file"),
        ];
        assert_eq!(dedup_sources(&chunks, 800).len(), 2);
    }

    #[test]
    fn test_snippet_truncation_appends_ellipsis() {
        let long = "x".repeat(900);
        let chunks = vec![chunk(0.9, Some("https://a"), None, &long)];
        let sources = dedup_sources(&chunks, 800);
        assert_eq!(sources[0].snippet.chars().count(), 801);
        assert!(sources[0].snippet.ends_with('…'));

        let short = "short enough";
        let chunks = vec![chunk(0.9, Some("https://a"), None, short)];
        let sources = dedup_sources(&chunks, 800);
        assert_eq!(sources[0].snippet, short);
    }

    #[test]
    fn test_render_sources_block_numbers_in_order() {
        let chunks = vec![
            chunk(0.9, Some("https://a"), None, "alpha text"),
            chunk(0.7, Some("https://b"), None, "beta text"),
        ];
        let block = render_sources_block(&dedup_sources(&chunks, 800));
        assert!(block.starts_with("[1] "));
        assert!(block.contains("\n\n[2] "));
        assert!(block.contains("https://a"));
        assert!(block.contains("alpha text"));
    }

    #[test]
    fn test_open_missing_index_is_index_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        let toml_str = format!(
            r#"
[storage]
data_dir = "{root}"
index_path = "{root}/index.vec"
meta_path = "{root}/chunks.jsonl"

[embedding]
model = "text-embedding-3-small"

[generation]
model = "gpt-4o-mini"
"#,
            root = tmp.path().display()
        );
        let config: Config = toml::from_str(&toml_str).unwrap();

        let err = Retriever::open(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::IndexNotFound { .. })
        ));
    }
}
