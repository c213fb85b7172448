//! Flat exact nearest-neighbor vector index with durable persistence.
//!
//! Vectors are L2-normalized on insert, so inner-product search is cosine
//! similarity. The index owns the vector rows and the per-row
//! [`ChunkMeta`] records in a single struct: both grow only through
//! [`VectorIndex::add`], which keeps the row `i` ↔ metadata record `i`
//! pairing impossible to break from outside.
//!
//! # On-disk format
//!
//! Two artifacts in strict row-order correspondence:
//! - vector file: `"VIDX"` magic, `u32` version, `u32` dim, `u64` rows,
//!   then rows × dim little-endian `f32`;
//! - metadata file: one JSON record per line, line `i` describing row `i`.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::RagError;
use crate::models::ChunkMeta;

const MAGIC: &[u8; 4] = b"VIDX";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    /// Flat row-major storage, `rows × dim`, unit-normalized.
    vectors: Vec<f32>,
    metas: Vec<ChunkMeta>,
}

impl VectorIndex {
    /// Create an empty index for `dim`-wide vectors.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "vector dimension must be > 0");
        Self {
            dim,
            vectors: Vec::new(),
            metas: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    pub fn meta(&self, row: usize) -> &ChunkMeta {
        &self.metas[row]
    }

    /// Append embedding/metadata pairs in one operation.
    ///
    /// Each vector is normalized to unit length before insertion. A vector
    /// of the wrong width is a [`RagError::DimensionMismatch`]; mismatched
    /// slice lengths are a programmer error and panic.
    pub fn add(&mut self, embeddings: &[Vec<f32>], metas: Vec<ChunkMeta>) -> Result<(), RagError> {
        assert_eq!(
            embeddings.len(),
            metas.len(),
            "embeddings and metadata must be added in lockstep"
        );

        for embedding in embeddings {
            if embedding.len() != self.dim {
                return Err(RagError::DimensionMismatch {
                    expected: self.dim,
                    got: embedding.len(),
                });
            }
        }

        for embedding in embeddings {
            let mut row = embedding.clone();
            normalize(&mut row);
            self.vectors.extend_from_slice(&row);
        }
        self.metas.extend(metas);
        Ok(())
    }

    /// Exact top-`k` search by cosine similarity.
    ///
    /// Returns `(row, score)` pairs sorted by score descending, ties by
    /// ascending row. Fewer than `k` hits when the index is small; an
    /// empty index yields an empty Vec, never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, RagError> {
        if query.len() != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                got: query.len(),
            });
        }

        let mut q = query.to_vec();
        normalize(&mut q);

        let mut hits: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(row, stored)| {
                let score: f32 = stored.iter().zip(q.iter()).map(|(a, b)| a * b).sum();
                (row, score)
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Write both artifacts, vectors then metadata, in matching row order.
    pub fn save(&self, index_path: &Path, meta_path: &Path) -> Result<()> {
        for path in [index_path, meta_path] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::File::create(index_path)
            .with_context(|| format!("Failed to create {}", index_path.display()))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(self.dim as u32).to_le_bytes())?;
        writer.write_all(&(self.metas.len() as u64).to_le_bytes())?;
        for value in &self.vectors {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;

        let file = std::fs::File::create(meta_path)
            .with_context(|| format!("Failed to create {}", meta_path.display()))?;
        let mut writer = BufWriter::new(file);
        for meta in &self.metas {
            serde_json::to_writer(&mut writer, meta)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Read `(dim, rows)` from a persisted index header without loading
    /// the rows themselves.
    pub fn read_header(index_path: &Path) -> Result<(usize, usize)> {
        let mut header = [0u8; HEADER_LEN];
        let mut file = std::fs::File::open(index_path)
            .with_context(|| format!("Failed to read {}", index_path.display()))?;
        std::io::Read::read_exact(&mut file, &mut header)
            .with_context(|| format!("{} is not a vector index file", index_path.display()))?;
        parse_header(&header, index_path)
    }

    /// Load both artifacts and restore the pairing invariant.
    ///
    /// The vector dimension is discovered from the file header; a row
    /// count that disagrees between the two artifacts is corruption and
    /// fails loudly rather than serving misaligned results.
    pub fn load(index_path: &Path, meta_path: &Path) -> Result<Self> {
        let bytes = std::fs::read(index_path)
            .with_context(|| format!("Failed to read {}", index_path.display()))?;

        if bytes.len() < HEADER_LEN {
            bail!("{} is not a vector index file", index_path.display());
        }
        let (dim, rows) = parse_header(&bytes[..HEADER_LEN], index_path)?;
        let expected_len = HEADER_LEN + rows * dim * 4;
        if bytes.len() != expected_len {
            bail!(
                "index file truncated: expected {} bytes, found {}",
                expected_len,
                bytes.len()
            );
        }

        let vectors: Vec<f32> = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let file = std::fs::File::open(meta_path)
            .with_context(|| format!("Failed to read {}", meta_path.display()))?;
        let mut metas = Vec::with_capacity(rows);
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let meta: ChunkMeta = serde_json::from_str(&line)
                .with_context(|| format!("Malformed metadata record in {}", meta_path.display()))?;
            metas.push(meta);
        }

        if metas.len() != rows {
            bail!(
                "index/metadata row mismatch: {} vectors but {} metadata records",
                rows,
                metas.len()
            );
        }

        Ok(Self { dim, vectors, metas })
    }
}

fn parse_header(header: &[u8], index_path: &Path) -> Result<(usize, usize)> {
    if &header[0..4] != MAGIC {
        bail!("{} is not a vector index file", index_path.display());
    }
    let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if version != VERSION {
        bail!(
            "unsupported index version {} in {}",
            version,
            index_path.display()
        );
    }
    let dim = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let rows = u64::from_le_bytes([
        header[12], header[13], header[14], header[15], header[16], header[17], header[18],
        header[19],
    ]) as usize;

    if dim == 0 {
        bail!("index header declares zero dimension");
    }
    Ok((dim, rows))
}

/// Scale to unit length in place. Zero vectors are left untouched (they
/// score 0 against everything).
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
