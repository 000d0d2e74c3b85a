//! Exact inner-product index over a dense matrix

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use std::cmp::Ordering;

use crate::error::{Error, Result};

/// Vector index backend: add vectors, return top-k positions by inner product
pub trait VectorIndex: Send + Sync {
    /// Vector dimension
    fn dim(&self) -> usize;

    /// Number of stored vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append row vectors; positions continue from the current length
    fn add(&mut self, vectors: ArrayView2<'_, f32>) -> Result<()>;

    /// Top `top_k` `(position, score)` pairs, highest score first.
    /// Equal scores are ordered by ascending position.
    fn search(&self, query: ArrayView1<'_, f32>, top_k: usize) -> Result<Vec<(usize, f32)>>;
}

/// Brute-force inner-product index
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    vectors: Array2<f32>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            vectors: Array2::zeros((0, dim)),
        }
    }

    /// Wrap an existing `count × dim` matrix
    pub fn from_matrix(vectors: Array2<f32>) -> Self {
        Self { vectors }
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }
}

fn by_score_then_position(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

impl VectorIndex for FlatIpIndex {
    fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    fn len(&self) -> usize {
        self.vectors.nrows()
    }

    fn add(&mut self, vectors: ArrayView2<'_, f32>) -> Result<()> {
        if vectors.ncols() != self.dim() {
            return Err(Error::DimensionMismatch {
                index: self.dim(),
                query: vectors.ncols(),
            });
        }
        self.vectors
            .append(Axis(0), vectors)
            .map_err(|e| Error::vector_index(format!("append failed: {}", e)))
    }

    fn search(&self, query: ArrayView1<'_, f32>, top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                index: self.dim(),
                query: query.len(),
            });
        }
        let k = top_k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let scores = self.vectors.dot(&query);
        let mut scored: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_score_then_position);
            scored.truncate(k);
        }
        scored.sort_unstable_by(by_score_then_position);
        Ok(scored)
    }
}
