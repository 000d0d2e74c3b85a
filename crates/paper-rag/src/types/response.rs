//! Retrieval result types

use serde::{Deserialize, Serialize};

use super::document::PassageMeta;

/// One ranked hit returned by the retriever
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Raw inner product (cosine similarity when the bundle is normalized)
    pub score: f32,
    /// Passage metadata joined from the docstore
    pub meta: PassageMeta,
}

impl SearchHit {
    /// Two-line console rendering used by the CLI
    pub fn format_display(&self, rank: usize) -> String {
        format!(
            "[{}] score={:.3} | {}\n    url={}",
            rank,
            self.score,
            self.meta.title(),
            self.meta.url()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaperMeta;

    #[test]
    fn test_format_display() {
        let hit = SearchHit {
            score: 0.81234,
            meta: PassageMeta {
                chunk_id: "d_0".to_string(),
                doc_id: "d".to_string(),
                paper: PaperMeta {
                    title: "Attention Is All You Need".to_string(),
                    url: "https://arxiv.org/abs/1706.03762".to_string(),
                    ..Default::default()
                },
            },
        };
        assert_eq!(
            hit.format_display(1),
            "[1] score=0.812 | Attention Is All You Need\n    url=https://arxiv.org/abs/1706.03762"
        );
    }
}
