//! Grounded answer composition.
//!
//! [`Composer`] runs the four query-time steps in sequence: retrieve,
//! build the numbered evidence block, generate, and pick attachments.
//! Providers are injected so the whole flow runs against test doubles
//! without network access. Failures from retrieval or generation
//! propagate untouched; there is no fallback answer.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::generation::{ChatMessage, GenerationProvider};
use crate::models::{RagResponse, ScoredChunk};
use crate::retrieve::{dedup_sources, render_sources_block, Retriever};

/// Grounding policy: answer only from the supplied sources, cite by
/// bracketed number, admit when the sources do not cover the question.
pub const SYSTEM_PROMPT: &str = "\
You are a careful assistant that answers questions using only the numbered \
sources provided in the user message. Cite the sources you rely on with \
their bracketed numbers, like [1] or [2], directly in the answer. If the \
sources do not contain the answer, say so plainly instead of guessing. \
Keep the answer concise and factual.";

/// Fixed user-prompt template: the verbatim question plus the evidence
/// block produced by [`render_sources_block`].
pub fn render_user_prompt(question: &str, sources_block: &str) -> String {
    format!(
        "Question:\n{question}\n\nSources:\n{sources_block}\n\n\
         Answer the question using only the sources above, citing them as [n]."
    )
}

/// Walk retrieved chunks in score order and collect up to `limit`
/// distinct local files that exist right now. Missing files are skipped
/// silently; attachments are best-effort, never an error.
pub fn select_attachments(chunks: &[ScoredChunk], limit: usize) -> Vec<PathBuf> {
    let mut attachments: Vec<PathBuf> = Vec::new();
    for chunk in chunks {
        if attachments.len() >= limit {
            break;
        }
        let Some(path) = &chunk.meta.file_path else {
            continue;
        };
        if attachments.contains(path) || !path.exists() {
            continue;
        }
        attachments.push(path.clone());
    }
    attachments
}

pub struct Composer<'a> {
    config: &'a Config,
    retriever: &'a Retriever,
    embedder: &'a dyn EmbeddingProvider,
    generator: &'a dyn GenerationProvider,
}

impl<'a> Composer<'a> {
    pub fn new(
        config: &'a Config,
        retriever: &'a Retriever,
        embedder: &'a dyn EmbeddingProvider,
        generator: &'a dyn GenerationProvider,
    ) -> Self {
        Self {
            config,
            retriever,
            embedder,
            generator,
        }
    }

    /// Answer one question: retrieve evidence, prompt the generation
    /// model, and assemble the response with citations and attachments.
    ///
    /// The generated text is returned verbatim; citation numbers inside
    /// it are not validated against the source list.
    pub async fn answer(&self, question: &str) -> Result<RagResponse> {
        let retrieved = self
            .retriever
            .retrieve(self.embedder, question, self.config.retrieval.top_k)
            .await?;

        // One pass builds both the prompt block and the response sources,
        // so citation numbering always agrees between the two.
        let sources = dedup_sources(&retrieved, self.config.retrieval.max_snippet_chars);
        let sources_block = render_sources_block(&sources);

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(render_user_prompt(question, &sources_block)),
        ];

        let answer = self
            .generator
            .complete(
                &messages,
                self.config.generation.max_output_tokens,
                self.config.generation.temperature,
            )
            .await?;

        let attachments = select_attachments(&retrieved, self.config.retrieval.attach_top_n);

        Ok(RagResponse {
            answer,
            sources,
            attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMeta;

    fn file_chunk(score: f32, path: Option<PathBuf>) -> ScoredChunk {
        ScoredChunk {
            score,
            meta: ChunkMeta {
                doc_index: 0,
                chunk_index: 0,
                title: None,
                url: path.is_none().then(|| "https://example.com".to_string()),
                file_path: path,
                text: "text".to_string(),
            },
        }
    }

    #[test]
    fn test_user_prompt_contains_question_and_sources() {
        let prompt = render_user_prompt("What is the capital of France?", "[1] Doc — loc\nsnippet");
        assert!(prompt.contains("What is the capital of France?"));
        assert!(prompt.contains("[1] Doc — loc"));
    }

    #[test]
    fn test_attachments_cap_and_rank_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..3)
            .map(|i| {
                let p = tmp.path().join(format!("doc{}.txt", i));
                std::fs::write(&p, "content").unwrap();
                p
            })
            .collect();

        let chunks = vec![
            file_chunk(0.9, Some(paths[0].clone())),
            file_chunk(0.8, Some(paths[1].clone())),
            file_chunk(0.7, Some(paths[2].clone())),
        ];

        // ATTACH_TOP_N = 2 → exactly the top two, in rank order
        let selected = select_attachments(&chunks, 2);
        assert_eq!(selected, vec![paths[0].clone(), paths[1].clone()]);
    }

    #[test]
    fn test_attachments_skip_missing_and_duplicates() {
        let tmp = tempfile::TempDir::new().unwrap();
        let existing = tmp.path().join("real.txt");
        std::fs::write(&existing, "content").unwrap();
        let missing = tmp.path().join("gone.txt");

        let chunks = vec![
            file_chunk(0.9, Some(missing)),
            file_chunk(0.8, Some(existing.clone())),
            file_chunk(0.7, Some(existing.clone())),
            file_chunk(0.6, None), // web source, no file
        ];

        let selected = select_attachments(&chunks, 5);
        assert_eq!(selected, vec![existing]);
    }
}
