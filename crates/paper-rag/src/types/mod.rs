//! Core types for the retrieval pipeline

pub mod document;
pub mod response;

pub use document::{Document, PaperMeta, Passage, PassageMeta, RawPaper};
pub use response::SearchHit;
