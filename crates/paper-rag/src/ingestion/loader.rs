//! Raw dump loading
//!
//! Dumps arrive either as JSON Lines or as one large JSON array, optionally
//! gzip-compressed. The format is sniffed from the first non-whitespace byte
//! and both layouts are streamed record by record.

use flate2::read::GzDecoder;
use serde::de::{Error as _, SeqAccess, Visitor};
use serde::Deserializer as _;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;

use super::fields::{resolve_paper, resolve_str, LINK_PAPER_KEYS, LINK_REPO_KEYS};
use crate::config::SourcesConfig;
use crate::error::{Error, Result};
use crate::report::{timed, Reporter};
use crate::types::RawPaper;

/// Bytes inspected when sniffing the layout
const SNIFF_BYTES: usize = 8192;

/// On-disk layout of a raw dump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawFormat {
    /// One JSON value per line
    JsonLines,
    /// A single top-level JSON array
    JsonArray,
}

impl RawFormat {
    /// Detect the layout from the first non-whitespace character
    pub fn sniff<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = open_raw(path.as_ref())?;
        let mut buf = Vec::with_capacity(SNIFF_BYTES);
        reader.by_ref().take(SNIFF_BYTES as u64).read_to_end(&mut buf)?;
        let first = buf.iter().copied().find(|b| !b.is_ascii_whitespace());
        Ok(match first {
            Some(b'[') => Self::JsonArray,
            _ => Self::JsonLines,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonLines => "jsonl",
            Self::JsonArray => "array",
        }
    }
}

/// Counters for one pass over a dump
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Non-blank lines or array elements seen
    pub scanned: usize,
    /// Entries that were valid JSON
    pub parsed: usize,
    /// Entries that failed to parse
    pub malformed: usize,
    /// Valid JSON that was not an object
    pub non_object: usize,
    /// Objects handed to the caller
    pub yielded: usize,
}

/// Open a dump for reading, decompressing `.gz` files transparently
pub fn open_raw(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzip = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"));
    Ok(if is_gzip {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// Stream every JSON object in a dump into `on_object` until it breaks.
///
/// Malformed entries are counted and skipped. A syntax error inside a JSON
/// array ends that file early, keeping everything read before it.
pub fn for_each_object<F>(path: &Path, stats: &mut LoadStats, mut on_object: F) -> Result<RawFormat>
where
    F: FnMut(Map<String, Value>) -> ControlFlow<()>,
{
    let format = RawFormat::sniff(path)?;
    let reader = open_raw(path)?;
    match format {
        RawFormat::JsonLines => read_lines(path, reader, stats, &mut on_object)?,
        RawFormat::JsonArray => read_array(path, reader, stats, &mut on_object),
    }
    Ok(format)
}

fn read_lines<F>(path: &Path, mut reader: Box<dyn BufRead>, stats: &mut LoadStats, on_object: &mut F) -> Result<()>
where
    F: FnMut(Map<String, Value>) -> ControlFlow<()>,
{
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        stats.scanned += 1;
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(obj)) => {
                stats.parsed += 1;
                stats.yielded += 1;
                if on_object(obj).is_break() {
                    break;
                }
            }
            Ok(_) => {
                stats.parsed += 1;
                stats.non_object += 1;
            }
            Err(e) => {
                stats.malformed += 1;
                let err = Error::malformed(path.display().to_string(), line_no, e.to_string());
                tracing::debug!("{}", err);
            }
        }
    }
    Ok(())
}

struct ObjectSeq<'a, F> {
    stats: &'a mut LoadStats,
    on_object: &'a mut F,
    stopped: &'a mut bool,
}

impl<'de, F> Visitor<'de> for ObjectSeq<'_, F>
where
    F: FnMut(Map<String, Value>) -> ControlFlow<()>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<(), A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(value) = seq.next_element::<Value>()? {
            self.stats.scanned += 1;
            self.stats.parsed += 1;
            match value {
                Value::Object(obj) => {
                    self.stats.yielded += 1;
                    if (self.on_object)(obj).is_break() {
                        // abandon the rest of the array without reading it
                        *self.stopped = true;
                        return Err(A::Error::custom("stopped by caller"));
                    }
                }
                _ => self.stats.non_object += 1,
            }
        }
        Ok(())
    }
}

fn read_array<F>(path: &Path, reader: Box<dyn BufRead>, stats: &mut LoadStats, on_object: &mut F)
where
    F: FnMut(Map<String, Value>) -> ControlFlow<()>,
{
    let mut de = serde_json::Deserializer::from_reader(reader);
    let mut stopped = false;
    let visitor = ObjectSeq {
        stats: &mut *stats,
        on_object: &mut *on_object,
        stopped: &mut stopped,
    };
    let outcome = (&mut de).deserialize_seq(visitor);
    if let Err(e) = outcome {
        if stopped {
            return;
        }
        stats.malformed += 1;
        tracing::warn!("Stopped reading {} early: {}", path.display(), e);
    }
}

/// Result of loading the configured dumps
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Field-resolved papers, in dump order
    pub papers: Vec<RawPaper>,
    /// Counters for the abstracts dump
    pub abstracts: LoadStats,
    /// Papers that received a code link from the links dump
    pub linked: usize,
}

/// Load papers from the abstracts dump and attach code links
pub fn load_papers(sources: &SourcesConfig, reporter: &dyn Reporter) -> Result<LoadReport> {
    reporter.stage("Step 1/4  Load raw paper dumps");

    let abstracts_path = sources
        .abstracts
        .as_deref()
        .ok_or_else(|| Error::config("sources.abstracts is not configured"))?;

    let mut report = LoadReport::default();
    {
        let _t = timed(reporter, "merge abstracts & metadata");
        if abstracts_path.exists() {
            reporter.info(&format!("reading: {}", abstracts_path.display()));
            let papers = &mut report.papers;
            let format = for_each_object(abstracts_path, &mut report.abstracts, |obj| {
                papers.push(resolve_paper(&obj));
                ControlFlow::Continue(())
            })?;
            let s = &report.abstracts;
            reporter.success(&format!(
                "{} | scanned: {} | parsed: {} | malformed: {} | records: {}",
                format.as_str(),
                s.scanned,
                s.parsed,
                s.malformed,
                s.yielded
            ));
        } else {
            reporter.warn(&format!("missing file: {}", abstracts_path.display()));
        }
    }

    if let Some(links_path) = sources.links.as_deref() {
        let _t = timed(reporter, "merge code repos from links");
        report.linked = link_code_repos(&mut report.papers, links_path, reporter)?;
        reporter.success(&format!("code repo linked for {} papers", report.linked));
    }

    Ok(report)
}

/// Fill empty `code` fields from a paper-to-repository links dump.
/// When several repositories link to one paper the smallest URL wins.
pub fn link_code_repos(papers: &mut [RawPaper], links_path: &Path, reporter: &dyn Reporter) -> Result<usize> {
    if !links_path.exists() {
        reporter.warn(&format!("missing file: {}", links_path.display()));
        return Ok(0);
    }

    let mut links: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut stats = LoadStats::default();
    for_each_object(links_path, &mut stats, |obj| {
        let paper_url = resolve_str(&obj, LINK_PAPER_KEYS);
        let repo_url = resolve_str(&obj, LINK_REPO_KEYS);
        if !paper_url.is_empty() && !repo_url.is_empty() {
            links.entry(paper_url).or_default().insert(repo_url);
        }
        ControlFlow::Continue(())
    })?;
    tracing::debug!("links dump: {:?}", stats);

    let mut linked = 0;
    for paper in papers.iter_mut().filter(|p| p.code.is_empty()) {
        if let Some(repo) = links.get(&paper.url).and_then(|repos| repos.iter().next()) {
            paper.code = repo.clone();
            linked += 1;
        }
    }
    Ok(linked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn write_gz(path: &Path, content: &str) {
        let mut enc = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        enc.write_all(content.as_bytes()).unwrap();
        enc.finish().unwrap();
    }

    #[test]
    fn test_sniff_formats() {
        let dir = tempfile::tempdir().unwrap();
        let array = dir.path().join("a.json");
        std::fs::write(&array, "  \n [ {\"title\": \"x\"} ]").unwrap();
        let lines = dir.path().join("b.jsonl.gz");
        write_gz(&lines, "{\"title\": \"x\"}\n");

        assert_eq!(RawFormat::sniff(&array).unwrap(), RawFormat::JsonArray);
        assert_eq!(RawFormat::sniff(&lines).unwrap(), RawFormat::JsonLines);
    }

    #[test]
    fn test_jsonl_counts_malformed_and_non_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.jsonl");
        std::fs::write(&path, "{\"title\": \"A\"}\n\n{broken\n[1, 2]\n{\"title\": \"B\"}\n").unwrap();

        let mut stats = LoadStats::default();
        let mut titles = Vec::new();
        let format = for_each_object(&path, &mut stats, |obj| {
            titles.push(obj["title"].as_str().unwrap().to_string());
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(format, RawFormat::JsonLines);
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(
            stats,
            LoadStats { scanned: 4, parsed: 3, malformed: 1, non_object: 1, yielded: 2 }
        );
    }

    #[test]
    fn test_gzip_array_is_streamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json.gz");
        write_gz(&path, r#"[{"title": "A"}, 7, {"title": "B"}]"#);

        let mut stats = LoadStats::default();
        let mut count = 0;
        for_each_object(&path, &mut stats, |_| {
            count += 1;
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(stats.non_object, 1);
        assert_eq!(stats.malformed, 0);
    }

    #[test]
    fn test_break_stops_array_without_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.json");
        std::fs::write(&path, r#"[{"a": 1}, {"a": 2}, {"a": 3}]"#).unwrap();

        let mut stats = LoadStats::default();
        let mut count = 0;
        for_each_object(&path, &mut stats, |_| {
            count += 1;
            if count == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(stats.yielded, 2);
        assert_eq!(stats.malformed, 0);
    }

    #[test]
    fn test_load_papers_links_code() {
        let dir = tempfile::tempdir().unwrap();
        let abstracts = dir.path().join("papers.json");
        std::fs::write(
            &abstracts,
            r#"[
                {"title": "A", "abstract": "a", "paper_url": "p1", "arxiv_id": "1"},
                {"title": "B", "abstract": "b", "paper_url": "p2"},
                {"title": "C", "abstract": "c", "paper_url": "p3", "code": "kept"}
            ]"#,
        )
        .unwrap();
        let links = dir.path().join("links.jsonl");
        std::fs::write(
            &links,
            "{\"paper_url\": \"p1\", \"repo_url\": \"https://github.com/z/z\"}\n\
             {\"paper_url\": \"p1\", \"repo_url\": \"https://github.com/a/a\"}\n\
             {\"paper\": {\"url\": \"p3\"}, \"repository\": {\"url\": \"other\"}}\n",
        )
        .unwrap();

        let sources = SourcesConfig {
            abstracts: Some(abstracts),
            links: Some(links),
            ..Default::default()
        };
        let report = load_papers(&sources, &NullReporter).unwrap();

        assert_eq!(report.papers.len(), 3);
        assert_eq!(report.linked, 1);
        assert_eq!(report.papers[0].code, "https://github.com/a/a");
        assert_eq!(report.papers[0].source_id, "1");
        assert_eq!(report.papers[1].code, "");
        assert_eq!(report.papers[2].code, "kept");
    }

    #[test]
    fn test_missing_abstracts_warns() {
        let reporter = crate::report::MemoryReporter::new();
        let sources = SourcesConfig {
            abstracts: Some("/nonexistent/papers.json.gz".into()),
            ..Default::default()
        };
        let report = load_papers(&sources, &reporter).unwrap();
        assert!(report.papers.is_empty());
        assert_eq!(reporter.messages(crate::report::EventKind::Warn).len(), 1);
    }
}
