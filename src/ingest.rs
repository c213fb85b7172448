//! Ingestion pipeline orchestration.
//!
//! Rebuild-from-scratch flow: collect documents (allowed web pages +
//! supported local files) → chunk → batch embed → build a fresh
//! [`VectorIndex`] → save both artifacts. Per-document fetch/parse
//! failures are warned and skipped; one bad document never aborts the
//! run. There is no incremental update path.

use anyhow::Result;
use std::path::Path;
use walkdir::WalkDir;

use crate::chunk::Chunker;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::extract;
use crate::fetch;
use crate::index::VectorIndex;
use crate::models::{ChunkMeta, Document};

/// Counters reported after a run.
#[derive(Debug, Default)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: usize,
}

pub async fn run_ingest(config: &Config, embedder: &dyn EmbeddingProvider) -> Result<IngestStats> {
    let mut documents = Vec::new();
    let mut skipped = 0usize;

    // Web pages listed in the links file
    if config.sources.urls_file.exists() {
        let listing = std::fs::read_to_string(&config.sources.urls_file)?;
        let urls: Vec<&str> = listing
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if !urls.is_empty() {
            let client = fetch::build_client(config.sources.fetch_timeout_secs)?;
            let (web_docs, web_skipped) =
                read_urls(&client, &urls, &config.sources.allowed_domains).await;
            documents.extend(web_docs);
            skipped += web_skipped;
        }
    }

    // Local corpus directory
    if config.sources.local_dir.is_dir() {
        let (local_docs, local_skipped) = read_local(&config.sources.local_dir);
        documents.extend(local_docs);
        skipped += local_skipped;
    }

    // Chunk every document; chunk texts and metadata stay index-aligned
    let chunker = Chunker::from_config(&config.chunking)?;
    let mut texts: Vec<String> = Vec::new();
    let mut metas: Vec<ChunkMeta> = Vec::new();

    for (doc_index, doc) in documents.iter().enumerate() {
        for (chunk_index, text) in chunker.chunk(&doc.text)?.into_iter().enumerate() {
            metas.push(ChunkMeta {
                doc_index,
                chunk_index,
                title: doc.title.clone(),
                url: doc.url.clone(),
                file_path: doc.file_path.clone(),
                text: text.clone(),
            });
            texts.push(text);
        }
    }

    if texts.is_empty() {
        println!("No chunks to index.");
        return Ok(IngestStats {
            documents: documents.len(),
            chunks: 0,
            skipped,
        });
    }

    let embeddings = embedder.embed(&texts).await?;
    let dim = embeddings[0].len();

    let mut index = VectorIndex::new(dim);
    index.add(&embeddings, metas)?;
    index.save(&config.storage.index_path, &config.storage.meta_path)?;

    let stats = IngestStats {
        documents: documents.len(),
        chunks: texts.len(),
        skipped,
    };

    println!("ingest");
    println!("  documents: {}", stats.documents);
    println!("  chunks indexed: {}", stats.chunks);
    println!("  skipped: {}", stats.skipped);
    println!("  embedding dim: {}", dim);
    println!("  index: {}", config.storage.index_path.display());
    println!("  metadata: {}", config.storage.meta_path.display());
    println!("ok");

    Ok(stats)
}

/// Fetch each allowed URL; disallowed domains and fetch failures are
/// warned and skipped.
pub async fn read_urls(
    client: &reqwest::Client,
    urls: &[&str],
    allowed_domains: &[String],
) -> (Vec<Document>, usize) {
    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for url in urls {
        if !fetch::in_allowed(url, allowed_domains) {
            eprintln!("Skipping URL outside allowed domains: {}", url);
            skipped += 1;
            continue;
        }
        match fetch::fetch_url(client, url).await {
            Ok((title, text)) => documents.push(Document {
                title: title.or_else(|| Some(url.to_string())),
                text,
                url: Some(url.to_string()),
                file_path: None,
            }),
            Err(e) => {
                eprintln!("Failed to fetch {}: {:#}", url, e);
                skipped += 1;
            }
        }
    }

    (documents, skipped)
}

/// Walk the local corpus directory; unsupported and unreadable files are
/// warned and skipped.
pub fn read_local(dir: &Path) -> (Vec<Document>, usize) {
    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !extract::is_supported(path) {
            eprintln!("Skipping unsupported file: {}", path.display());
            skipped += 1;
            continue;
        }
        match extract::read_file(path) {
            Ok((title, text)) => documents.push(Document {
                title: Some(title),
                text,
                url: None,
                file_path: Some(path.to_path_buf()),
            }),
            Err(e) => {
                eprintln!("Failed to read {}: {:#}", path.display(), e);
                skipped += 1;
            }
        }
    }

    // Deterministic ordering regardless of walk order
    documents.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    (documents, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_local_collects_supported_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.md"), "# Alpha\n\nalpha body").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "beta body").unwrap();
        std::fs::write(tmp.path().join("c.png"), [0u8; 8]).unwrap();

        let (docs, skipped) = read_local(tmp.path());
        assert_eq!(docs.len(), 2);
        assert_eq!(skipped, 1);
        // Sorted by path: a.md before b.txt
        assert_eq!(docs[0].title.as_deref(), Some("a.md"));
        assert!(docs[1].text.contains("beta body"));
        assert!(docs[0].url.is_none());
        assert!(docs[0].file_path.is_some());
    }

    #[test]
    fn test_read_local_bad_file_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("ok.txt"), "fine").unwrap();
        std::fs::write(tmp.path().join("broken.docx"), "not a zip").unwrap();

        let (docs, skipped) = read_local(tmp.path());
        assert_eq!(docs.len(), 1);
        assert_eq!(skipped, 1);
    }
}
