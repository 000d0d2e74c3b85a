//! paper-rag: retrieval pipeline over research-paper metadata
//!
//! Raw paper dumps are normalized into a document stream, split into
//! overlapping passages, embedded and stored as a flat inner-product index
//! bundle that the [`Retriever`] searches by natural-language query.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod report;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use embeddings::Embedder;
pub use error::{Error, Result};
pub use index::{BuildOutcome, IndexBuilder, IndexBundle, IndexStats};
pub use pipeline::{Pipeline, PipelineSummary};
pub use report::{Reporter, TracingReporter};
pub use retrieval::Retriever;
pub use types::{Document, PaperMeta, Passage, PassageMeta, RawPaper, SearchHit};
