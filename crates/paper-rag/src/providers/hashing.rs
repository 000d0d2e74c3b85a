//! Feature-hashing embedding provider
//!
//! Maps terms into fixed-dimension buckets with FNV-1a and weights them by
//! term frequency. No model download, fully deterministic; useful offline
//! and in tests.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

use super::embedding::EmbeddingProvider;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Hash a term into a bucket index using FNV-1a.
    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % self.dimensions as u64) as usize
    }

    fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_lowercase())
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vec;
        }

        let mut tf: HashMap<String, f32> = HashMap::new();
        let mut total = 0.0f32;
        for tok in Self::tokenize(text) {
            *tf.entry(tok).or_default() += 1.0;
            total += 1.0;
        }

        for (term, count) in &tf {
            // longer terms carry more signal than short ones
            let idf = 1.0 + (term.chars().count() as f32).ln();
            vec[self.bucket(term)] += count / total * idf;
        }
        vec
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }

    fn model_id(&self) -> String {
        format!("hashing:{}", self.dimensions)
    }
}
