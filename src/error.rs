//! Error taxonomy for the retrieval pipeline.
//!
//! Each variant maps to a distinct failure policy:
//! - [`RagError::IndexNotFound`] — user-recoverable; the CLI tells the user
//!   to run `askdocs ingest`.
//! - [`RagError::DimensionMismatch`] — precondition violation; fatal,
//!   propagates immediately, never coerced.
//! - [`RagError::Embedding`] / [`RagError::Generation`] — boundary provider
//!   failures; propagate to the caller without retries in the core.
//! - [`RagError::UnsupportedSource`] — per-document ingestion failure;
//!   warned and skipped, never aborts the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    /// The persisted index or metadata file is missing at query time.
    /// Expected "not yet ingested" condition, not a generic failure.
    #[error(
        "index not found ({index} / {meta} missing); run `askdocs ingest` to build it",
        index = .index.display(),
        meta = .meta.display()
    )]
    IndexNotFound { index: PathBuf, meta: PathBuf },

    /// A vector was added or queried with the wrong width.
    #[error("vector dimension mismatch: index holds {expected}-dim vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The embedding provider failed (network, auth, quota, bad response).
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The generation provider failed.
    #[error("generation request failed: {0}")]
    Generation(String),

    /// A document type the ingestion readers cannot parse.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
}
