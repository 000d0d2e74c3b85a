//! Ingestion stages: raw dumps to documents to passages

mod chunker;
mod fields;
mod jsonl;
mod loader;
mod normalizer;
mod sampler;

pub use chunker::{ChunkStats, TextChunker};
pub use fields::{resolve_paper, FieldRule, PaperField, PAPER_FIELDS};
pub use jsonl::{JsonlReader, JsonlWriter};
pub use loader::{for_each_object, link_code_repos, load_papers, open_raw, LoadReport, LoadStats, RawFormat};
pub use normalizer::{doc_id_for, normalize_paper, write_documents, NormalizeOptions, NormalizeStats};
pub use sampler::{sample_file, SampleReport};

pub(crate) use jsonl::parent_dir;
