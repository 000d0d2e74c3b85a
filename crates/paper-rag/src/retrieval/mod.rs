//! Retrieval over a built index bundle

mod search;

pub use search::{Retriever, DEFAULT_TOP_K};
