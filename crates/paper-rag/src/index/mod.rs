//! Vector index backend, bundle persistence and the index builder

mod builder;
mod bundle;
mod flat;

pub use builder::{BuildOutcome, IndexBuilder};
pub use bundle::{IndexBundle, IndexStats, DOCSTORE_FILE, IDS_FILE, STATS_FILE, VECTORS_FILE};
pub use flat::{FlatIpIndex, VectorIndex};
