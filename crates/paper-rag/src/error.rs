//! Error types for the retrieval pipeline

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A raw or intermediate record failed to parse as a JSON object.
    /// Ingestion stages count these and move on; they never abort a run.
    #[error("Malformed record at {source_name}:{line}: {message}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        message: String,
    },

    /// Index bundle missing, unreadable or internally inconsistent
    #[error("Failed to load index bundle at '{}': {message}", path.display())]
    IndexLoad { path: PathBuf, message: String },

    /// Caller expectation about query normalization disagrees with the bundle
    #[error("Normalization mismatch: bundle built with normalize={index}, caller expected normalize={expected}")]
    NormalizationMismatch { index: bool, expected: bool },

    /// Query vector does not match the bundle dimension
    #[error("Dimension mismatch: index has dim={index}, query embedding has dim={query}")]
    DimensionMismatch { index: usize, query: usize },

    /// Bundle was built with a different embedding model
    #[error("Embedding model mismatch: index built with '{index}', retriever uses '{query}'")]
    ModelMismatch { index: String, query: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index backend error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a malformed record error
    pub fn malformed(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an index load error
    pub fn index_load(path: &Path, message: impl Into<String>) -> Self {
        Self::IndexLoad {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True for failures that mean "no usable index", as opposed to zero hits
    pub fn is_index_load(&self) -> bool {
        matches!(self, Self::IndexLoad { .. })
    }
}
