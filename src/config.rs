use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_meta_path")]
    pub meta_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            index_path: default_index_path(),
            meta_path: default_meta_path(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index.vec")
}
fn default_meta_path() -> PathBuf {
    PathBuf::from("./data/chunks.jsonl")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_tokens")]
    pub target_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
    /// Optional path to a HuggingFace `tokenizer.json`. When absent the
    /// chunker falls back to a 4-chars-per-token approximation.
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_tokens: default_target_tokens(),
            overlap_tokens: default_overlap_tokens(),
            tokenizer_path: None,
        }
    }
}

fn default_target_tokens() -> usize {
    400
}
fn default_overlap_tokens() -> usize {
    40
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_attach_top_n")]
    pub attach_top_n: usize,
    #[serde(default = "default_max_snippet_chars")]
    pub max_snippet_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            attach_top_n: default_attach_top_n(),
            max_snippet_chars: default_max_snippet_chars(),
        }
    }
}

fn default_top_k() -> usize {
    8
}
fn default_attach_top_n() -> usize {
    3
}
fn default_max_snippet_chars() -> usize {
    800
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_gen_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_output_tokens() -> u32 {
    800
}
fn default_gen_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Domain suffixes accepted by the URL ingester; anything else is
    /// skipped with a warning.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default = "default_urls_file")]
    pub urls_file: PathBuf,
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            urls_file: default_urls_file(),
            local_dir: default_local_dir(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_urls_file() -> PathBuf {
    PathBuf::from("links.txt")
}
fn default_local_dir() -> PathBuf {
    PathBuf::from("data/sources")
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.target_tokens == 0 {
        anyhow::bail!("chunking.target_tokens must be > 0");
    }
    if config.chunking.overlap_tokens >= config.chunking.target_tokens {
        anyhow::bail!("chunking.overlap_tokens must be < chunking.target_tokens");
    }

    if config.retrieval.top_k == 0 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.max_snippet_chars == 0 {
        anyhow::bail!("retrieval.max_snippet_chars must be > 0");
    }

    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }
    if config.generation.model.is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    const MINIMAL: &str = r#"
[embedding]
model = "text-embedding-3-small"

[generation]
model = "gpt-4o-mini"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.chunking.target_tokens, 400);
        assert_eq!(config.chunking.overlap_tokens, 40);
        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.attach_top_n, 3);
        assert_eq!(config.retrieval.max_snippet_chars, 800);
        assert_eq!(config.storage.meta_path, PathBuf::from("./data/chunks.jsonl"));
        assert!(config.sources.allowed_domains.is_empty());
    }

    #[test]
    fn test_overlap_must_be_below_target() {
        let toml_str = format!("{}\n[chunking]\ntarget_tokens = 10\noverlap_tokens = 10\n", MINIMAL);
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let toml_str = format!("{}\n[retrieval]\ntop_k = 0\n", MINIMAL);
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let toml_str = MINIMAL.replace("gpt-4o-mini\"", "gpt-4o-mini\"\ntemperature = 3.5");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn test_missing_embedding_model_rejected() {
        assert!(parse("[generation]\nmodel = \"gpt-4o-mini\"\n").is_err());
    }
}
