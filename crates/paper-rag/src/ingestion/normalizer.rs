//! Record normalization into the document stream

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

use super::jsonl::JsonlWriter;
use crate::error::Result;
use crate::report::{timed, Reporter};
use crate::types::{Document, RawPaper};

/// Hex characters kept from the digest
pub const DOC_ID_LEN: usize = 16;

/// Stable document id from the paper identifier (source id, else title) and url
pub fn doc_id_for(identifier: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    hasher.update(url.as_bytes());
    let mut id = hex::encode(hasher.finalize());
    id.truncate(DOC_ID_LEN);
    id
}

/// Turn a raw paper into a document. Returns `None` when both title and
/// abstract are empty.
pub fn normalize_paper(paper: &RawPaper) -> Option<Document> {
    let title = paper.title.trim();
    let abstract_text = paper.abstract_text.trim();
    if title.is_empty() && abstract_text.is_empty() {
        return None;
    }

    let text = format!("{}\n\n{}", title, abstract_text).trim().to_string();
    let identifier = match paper.source_id.as_str() {
        "" => title,
        id => id,
    };

    Some(Document {
        doc_id: doc_id_for(identifier, &paper.url),
        text,
        meta: paper.to_meta(),
    })
}

/// Normalization options
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Skip repeated doc ids after their first occurrence
    pub dedupe: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { dedupe: true }
    }
}

/// Counters for one normalization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub seen: usize,
    pub kept: usize,
    pub dropped_empty: usize,
    pub duplicates: usize,
}

/// Normalize `papers` and write the document stream to `out`, replacing any
/// previous stream.
pub fn write_documents<'p, I>(
    papers: I,
    out: &Path,
    options: &NormalizeOptions,
    reporter: &dyn Reporter,
) -> Result<NormalizeStats>
where
    I: IntoIterator<Item = &'p RawPaper>,
{
    reporter.stage("Step 2/4  Normalize -> processed documents");
    let _t = timed(reporter, format!("write processed to {}", out.display()));

    let mut stats = NormalizeStats::default();
    let mut seen_ids = HashSet::new();
    let mut writer = JsonlWriter::create(out)?;

    for paper in papers {
        stats.seen += 1;
        let Some(doc) = normalize_paper(paper) else {
            stats.dropped_empty += 1;
            continue;
        };
        if options.dedupe && !seen_ids.insert(doc.doc_id.clone()) {
            tracing::debug!("duplicate doc_id {} ({})", doc.doc_id, doc.meta.title);
            stats.duplicates += 1;
            continue;
        }
        writer.write(&doc)?;
    }
    stats.kept = writer.finish()?;

    if stats.duplicates > 0 {
        reporter.warn(&format!("skipped {} duplicate documents", stats.duplicates));
    }
    reporter.success(&format!("processed docs written: {}", stats.kept));
    Ok(stats)
}
