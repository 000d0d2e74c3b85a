//! Query-time search over a loaded index bundle

use std::path::Path;

use crate::embeddings::Embedder;
use crate::error::{Error, Result};
use crate::index::{IndexBundle, IndexStats, VectorIndex};
use crate::types::SearchHit;

/// Default number of hits per query
pub const DEFAULT_TOP_K: usize = 6;

/// Read-only searcher over one index bundle.
///
/// Queries are embedded with the same normalization the bundle was built
/// with, as recorded in its stats.
pub struct Retriever {
    bundle: IndexBundle,
    embedder: Embedder,
}

impl Retriever {
    /// Load the bundle at `index_dir`
    pub fn open(index_dir: &Path, embedder: Embedder) -> Result<Self> {
        let bundle = IndexBundle::load(index_dir)?;
        let stats = bundle.stats();

        if let Some(model) = &stats.model {
            let query_model = embedder.provider().model_id();
            if *model != query_model {
                return Err(Error::ModelMismatch {
                    index: model.clone(),
                    query: query_model,
                });
            }
        }

        tracing::info!(
            "Index loaded: vectors={}, dim={}, normalize={}",
            stats.count,
            stats.dim,
            stats.normalize
        );
        Ok(Self { bundle, embedder })
    }

    /// Fail unless the bundle's normalization flag equals `expected`
    pub fn with_expected_normalize(self, expected: bool) -> Result<Self> {
        let index = self.bundle.stats().normalize;
        if index != expected {
            return Err(Error::NormalizationMismatch { index, expected });
        }
        Ok(self)
    }

    pub fn stats(&self) -> &IndexStats {
        self.bundle.stats()
    }

    pub fn len(&self) -> usize {
        self.bundle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundle.is_empty()
    }

    /// Return the `min(top_k, len)` passages closest to `query`, best first
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if self.bundle.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let stats = self.bundle.stats();
        let vector = self.embedder.encode_query(query, stats.normalize).await?;
        if vector.len() != stats.dim {
            return Err(Error::DimensionMismatch {
                index: stats.dim,
                query: vector.len(),
            });
        }

        let ranked = self.bundle.index().search(vector.view(), top_k)?;
        ranked
            .into_iter()
            .map(|(position, score)| {
                let meta = self.bundle.meta(position).ok_or_else(|| {
                    Error::internal(format!("index position {} has no metadata", position))
                })?;
                Ok(SearchHit {
                    score,
                    meta: meta.clone(),
                })
            })
            .collect()
    }
}
