//! Embedding providers
//!
//! Providers sit behind the [`EmbeddingProvider`] trait so the pipeline can
//! switch between a local Ollama server and the offline hashing backend.

pub mod embedding;
pub mod hashing;
pub mod ollama;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

/// Build the provider selected by `embeddings.provider`
pub fn build_provider(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embeddings.provider {
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(&config.ollama, &config.embeddings)?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.embeddings.dimensions)),
    };
    tracing::info!(
        "Embedding provider: {} ({} dims)",
        provider.model_id(),
        provider.dimensions()
    );
    Ok(provider)
}
