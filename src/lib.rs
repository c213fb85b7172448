//! # askdocs
//!
//! Grounded question answering over a local document corpus.
//!
//! askdocs ingests web pages and local files into a flat vector index,
//! then answers natural-language questions with a generation model that
//! is constrained to the retrieved evidence and cites it by number.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────────┐
//! │ URLs + files │──▶│ Chunk + Embed │──▶│  VectorIndex     │
//! │  (ingest)    │   │               │   │ .vec + .jsonl   │
//! └──────────────┘   └───────────────┘   └───────┬─────────┘
//!                                                │
//!                          question ──▶ Retriever ──▶ Composer ──▶ answer
//!                                        (top-k,       (prompt,     + sources
//!                                         dedup)        generate)   + files
//! ```
//!
//! ## Quick start
//!
//! ```bash
//! askdocs ingest                          # build the index
//! askdocs sources                         # check artifact status
//! askdocs search "vector databases"       # retrieval only
//! askdocs ask "What is the capital of France?"
//! askdocs eval --file eval/qa_pairs.yaml  # keyword-inclusion scoring
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`embedding`] | Embedding provider boundary |
//! | [`generation`] | Generation provider boundary |
//! | [`index`] | Flat exact-NN vector index with persistence |
//! | [`retrieve`] | Query retrieval and source deduplication |
//! | [`answer`] | Prompt assembly and answer composition |
//! | [`fetch`] | Web page fetching and HTML stripping |
//! | [`extract`] | Local file readers (txt/md/html/pdf/docx) |
//! | [`ingest`] | Ingestion pipeline |
//! | [`sources`] | Artifact and source status listing |
//! | [`eval`] | Evaluation harness |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod extract;
pub mod fetch;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod models;
pub mod retrieve;
pub mod sources;
