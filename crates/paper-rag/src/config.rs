//! Configuration for the retrieval pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Locations of intermediate artifacts
    pub paths: PathsConfig,
    /// Raw dump locations
    pub sources: SourcesConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Ollama configuration (used when `embeddings.provider = "ollama"`)
    pub ollama: OllamaConfig,
    /// Retrieval defaults
    pub retrieval: RetrievalConfig,
    /// Raw dump sampling
    pub sampling: SamplingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| Error::config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a stage loop forever or produce nothing
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be greater than 0"));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than 0"));
        }
        if self.embeddings.provider == EmbeddingBackend::Hashing && self.embeddings.dimensions == 0 {
            return Err(Error::config(
                "embeddings.dimensions must be greater than 0 for the hashing provider",
            ));
        }
        Ok(())
    }
}

/// Artifact paths for each stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Normalized document stream
    pub docs: PathBuf,
    /// Passage stream
    pub chunks: PathBuf,
    /// Index bundle directory
    pub index_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            docs: PathBuf::from("data/pwc/processed/docs.jsonl"),
            chunks: PathBuf::from("data/pwc/chunks/chunks.jsonl"),
            index_dir: PathBuf::from("indexes/pwc/flat"),
        }
    }
}

/// Raw dump files. Each may be gzip-compressed JSON Lines or a JSON array.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Papers with abstracts (required for ingestion)
    pub abstracts: Option<PathBuf>,
    /// Links between papers and code repositories
    pub links: Option<PathBuf>,
    /// Methods dump (only sampled)
    pub methods: Option<PathBuf>,
    /// Datasets dump (only sampled)
    pub datasets: Option<PathBuf>,
    /// Evaluation tables dump (only sampled)
    pub evaluations: Option<PathBuf>,
}

impl SourcesConfig {
    /// All configured dumps with their logical names
    pub fn all(&self) -> Vec<(&'static str, &Path)> {
        [
            ("abstracts", &self.abstracts),
            ("links", &self.links),
            ("methods", &self.methods),
            ("datasets", &self.datasets),
            ("evaluations", &self.evaluations),
        ]
        .into_iter()
        .filter_map(|(name, path)| path.as_deref().map(|p| (name, p)))
        .collect()
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1200,
            chunk_overlap: 200,
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Deterministic feature hashing, no model required
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend provider
    pub provider: EmbeddingBackend,
    /// Model name passed to the backend
    pub model: String,
    /// Embedding dimensions (only used by the hashing provider; Ollama reports its own)
    pub dimensions: usize,
    /// Texts per request to the backend
    pub batch_size: usize,
    /// L2-normalize vectors so inner product equals cosine similarity
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Ollama,
            model: "bge-m3".to_string(),
            dimensions: 1024,
            batch_size: 64,
            normalize: true,
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Retrieval defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of hits returned per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 6 }
    }
}

/// Raw dump sampling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Objects copied per dump
    pub limit: usize,
    /// Output directory for samples and stats
    pub out_dir: PathBuf,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            limit: 200,
            out_dir: PathBuf::from("data/pwc/raw/samples"),
        }
    }
}
