//! Passage stream to index bundle

use std::path::Path;

use super::bundle::{first_duplicate, IndexBundle, IndexStats};
use super::flat::{FlatIpIndex, VectorIndex};
use crate::embeddings::Embedder;
use crate::error::{Error, Result};
use crate::ingestion::JsonlReader;
use crate::report::{timed, Reporter};
use crate::types::{Passage, PassageMeta};

/// Result of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A bundle was written
    Built(IndexStats),
    /// No passages to index; nothing was written
    EmptyCorpus,
}

/// Embeds passages and persists them as an [`IndexBundle`]
pub struct IndexBuilder {
    embedder: Embedder,
    normalize: bool,
}

impl IndexBuilder {
    pub fn new(embedder: Embedder, normalize: bool) -> Self {
        Self { embedder, normalize }
    }

    /// Build from the passage stream at `passages`
    pub async fn build(&self, passages: &Path, index_dir: &Path, reporter: &dyn Reporter) -> Result<BuildOutcome> {
        reporter.stage("Step 4/4  Build vector index");

        let mut loaded = Vec::new();
        let mut malformed = 0usize;
        {
            let _t = timed(reporter, format!("load chunks from {}", passages.display()));
            for record in JsonlReader::<Passage>::open(passages)? {
                match record {
                    Ok(passage) => loaded.push(passage),
                    Err(e @ Error::MalformedRecord { .. }) => {
                        tracing::debug!("{}", e);
                        malformed += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        if malformed > 0 {
            reporter.warn(&format!("skipped {} malformed passage lines", malformed));
        }

        self.build_from_passages(&loaded, index_dir, reporter).await
    }

    /// Build from passages already in memory
    pub async fn build_from_passages(
        &self,
        passages: &[Passage],
        index_dir: &Path,
        reporter: &dyn Reporter,
    ) -> Result<BuildOutcome> {
        if passages.is_empty() {
            reporter.warn("no chunks found. skip index build.");
            return Ok(BuildOutcome::EmptyCorpus);
        }
        reporter.success(&format!("chunks loaded: {}", passages.len()));

        // checked before encoding so a bad passage stream fails fast
        if let Some(dup) = first_duplicate(passages.iter().map(|p| p.chunk_id.as_str())) {
            return Err(Error::vector_index(format!(
                "duplicate chunk id '{}' in passage stream; normalize with dedupe enabled",
                dup
            )));
        }

        let texts: Vec<String> = passages.iter().map(|p| p.chunk_text.clone()).collect();
        let metas: Vec<PassageMeta> = passages.iter().map(Passage::to_meta).collect();

        let vectors = {
            let _t = timed(
                reporter,
                format!(
                    "encode embeddings with {} (normalize={})",
                    self.embedder.provider().model_id(),
                    self.normalize
                ),
            );
            self.embedder.encode(&texts, self.normalize, reporter).await?
        };

        let bundle = {
            let _t = timed(reporter, format!("build flat IP index (dim={})", vectors.ncols()));
            let mut index = FlatIpIndex::new(vectors.ncols());
            index.add(vectors.view())?;
            IndexBundle::new(
                index,
                metas,
                self.normalize,
                Some(self.embedder.provider().model_id()),
            )?
        };

        {
            let _t = timed(reporter, format!("save index to {}", index_dir.display()));
            bundle.save(index_dir)?;
        }

        let stats = bundle.stats().clone();
        reporter.success(&format!(
            "index ready: vectors={}, dim={}, dir={}",
            stats.count,
            stats.dim,
            index_dir.display()
        ));
        Ok(BuildOutcome::Built(stats))
    }
}
