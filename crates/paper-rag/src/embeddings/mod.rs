//! Batched text encoding on top of an [`EmbeddingProvider`]

use ndarray::{Array1, Array2, ArrayViewMut1, Axis};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::report::{NullReporter, Reporter};

/// Encodes texts in fixed-size batches and optionally L2-normalizes them
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Encode `texts` into a `len × dim` matrix, rows in input order.
    ///
    /// Fails if the provider returns the wrong number of vectors or vectors
    /// of differing length.
    pub async fn encode(&self, texts: &[String], normalize: bool, reporter: &dyn Reporter) -> Result<Array2<f32>> {
        if texts.is_empty() {
            return Ok(Array2::zeros((0, self.provider.dimensions())));
        }

        let mut dim: Option<usize> = None;
        let mut flat: Vec<f32> = Vec::new();
        let mut done = 0;

        for batch in texts.chunks(self.batch_size) {
            let vectors = self.provider.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "{} returned {} vectors for {} texts",
                    self.provider.name(),
                    vectors.len(),
                    batch.len()
                )));
            }
            for vector in vectors {
                let expected = *dim.get_or_insert(vector.len());
                if vector.len() != expected || expected == 0 {
                    return Err(Error::embedding(format!(
                        "inconsistent embedding dimension: got {}, expected {}",
                        vector.len(),
                        expected
                    )));
                }
                if flat.is_empty() {
                    flat.reserve(texts.len() * expected);
                }
                flat.extend(vector);
            }
            done += batch.len();
            reporter.progress(done, texts.len());
        }

        let dim = dim.unwrap_or(0);
        if dim != self.provider.dimensions() {
            tracing::warn!(
                "{} produced {}-dim vectors but is configured for {}",
                self.provider.name(),
                dim,
                self.provider.dimensions()
            );
        }

        let mut matrix = Array2::from_shape_vec((texts.len(), dim), flat)
            .map_err(|e| Error::internal(format!("embedding matrix shape: {}", e)))?;
        if normalize {
            for row in matrix.axis_iter_mut(Axis(0)) {
                l2_normalize(row);
            }
        }
        Ok(matrix)
    }

    /// Encode a single query string
    pub async fn encode_query(&self, text: &str, normalize: bool) -> Result<Array1<f32>> {
        let matrix = self.encode(&[text.to_string()], normalize, &NullReporter).await?;
        Ok(matrix.row(0).to_owned())
    }
}

/// Scale a vector to unit length in place. Zero vectors are left unchanged.
pub fn l2_normalize(mut v: ArrayViewMut1<f32>) {
    let norm = v.dot(&v).sqrt();
    if norm > f32::EPSILON {
        v.mapv_inplace(|x| x / norm);
    }
}
