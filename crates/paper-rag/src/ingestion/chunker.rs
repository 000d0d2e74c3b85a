//! Fixed-size overlapping character windows over document text

use std::path::Path;

use super::jsonl::{JsonlReader, JsonlWriter};
use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::report::{timed, Reporter};
use crate::types::{Document, Passage};

/// Text chunker with configurable size and overlap.
///
/// Offsets and lengths are measured in chars, so windows never split a
/// code point.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Window size in characters
    chunk_size: usize,
    /// Overlap between consecutive windows
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. `chunk_size` must be positive.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk size must be greater than 0"));
        }
        if overlap >= chunk_size {
            tracing::warn!(
                "chunk overlap {} >= chunk size {}; windows will not overlap",
                overlap,
                chunk_size
            );
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Window `[start, end)` offsets for a text of `n` chars.
    ///
    /// Starts are strictly increasing, so this always terminates; with
    /// `overlap >= chunk_size` the windows tile without overlap.
    pub fn windows(&self, n: usize) -> Vec<(usize, usize)> {
        let mut windows = Vec::with_capacity(n / self.chunk_size.max(1) + 1);
        if n == 0 {
            return windows;
        }

        let mut i = 0;
        loop {
            let j = (i + self.chunk_size).min(n);
            windows.push((i, j));
            if j == n {
                break;
            }
            let next = j.saturating_sub(self.overlap);
            i = if next > i { next } else { j };
        }
        windows
    }

    /// Split one document into passages, skipping windows that trim to empty
    pub fn chunk_document(&self, doc: &Document) -> Vec<Passage> {
        // byte position of every char boundary, including the end
        let bounds: Vec<usize> = doc
            .text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(doc.text.len()))
            .collect();
        let n = bounds.len() - 1;

        self.windows(n)
            .into_iter()
            .filter_map(|(i, j)| {
                let window = doc.text[bounds[i]..bounds[j]].trim();
                if window.is_empty() {
                    return None;
                }
                Some(Passage {
                    chunk_id: Passage::make_id(&doc.doc_id, i),
                    doc_id: doc.doc_id.clone(),
                    chunk_text: window.to_string(),
                    meta: doc.meta.clone(),
                })
            })
            .collect()
    }

    /// Chunk the document stream at `docs` into the passage stream at `out`,
    /// replacing any previous passage stream.
    pub fn write_passages(&self, docs: &Path, out: &Path, reporter: &dyn Reporter) -> Result<ChunkStats> {
        reporter.stage("Step 3/4  Chunking -> passages");
        let _t = timed(
            reporter,
            format!("chunk size={} overlap={}", self.chunk_size, self.overlap),
        );

        let mut stats = ChunkStats::default();
        let mut writer = JsonlWriter::create(out)?;
        for record in JsonlReader::<Document>::open(docs)? {
            let doc = match record {
                Ok(doc) => doc,
                Err(e @ Error::MalformedRecord { .. }) => {
                    tracing::debug!("{}", e);
                    stats.malformed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };
            stats.documents += 1;
            for passage in self.chunk_document(&doc) {
                writer.write(&passage)?;
            }
        }
        stats.passages = writer.finish()?;

        if stats.malformed > 0 {
            reporter.warn(&format!("skipped {} malformed document lines", stats.malformed));
        }
        reporter.success(&format!(
            "chunks written: {} from {} documents",
            stats.passages, stats.documents
        ));
        Ok(stats)
    }
}

/// Counters for one chunking run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub documents: usize,
    pub passages: usize,
    pub malformed: usize,
}
