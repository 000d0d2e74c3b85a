//! Raw dump sampling, for inspecting unfamiliar dump layouts

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use super::jsonl::JsonlWriter;
use super::loader::{for_each_object, LoadStats, RawFormat};
use crate::error::{Error, Result};
use crate::report::{timed, Reporter};

const MAX_EXAMPLES: usize = 5;
const EXAMPLE_KEYS: usize = 8;
const LISTED_KEYS: usize = 50;

/// What a sampling run wrote
#[derive(Debug, Clone)]
pub struct SampleReport {
    pub format: RawFormat,
    pub kept: usize,
    /// Union of top-level keys over the sampled objects
    pub keys: BTreeSet<String>,
    pub sample_path: PathBuf,
    pub stats_path: PathBuf,
}

/// File stem without `.gz` and `.json` suffixes
fn sample_stem(src: &Path) -> String {
    let name = src
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let name = name
        .strip_suffix(".jsonl")
        .or_else(|| name.strip_suffix(".json"))
        .unwrap_or(name);
    name.to_string()
}

/// Copy the first `limit` objects of `src` into `<stem>.sample.jsonl` and
/// write a `<stem>.stats.txt` summary next to it. Returns `None` when `src`
/// does not exist.
pub fn sample_file(src: &Path, out_dir: &Path, limit: usize, reporter: &dyn Reporter) -> Result<Option<SampleReport>> {
    if !src.exists() {
        reporter.warn(&format!("missing: {}", src.display()));
        return Ok(None);
    }

    let stem = sample_stem(src);
    let sample_path = out_dir.join(format!("{}.sample.jsonl", stem));
    let stats_path = out_dir.join(format!("{}.stats.txt", stem));

    reporter.stage(&format!("Sample -> {}", src.display()));
    let format = RawFormat::sniff(src)?;
    reporter.info(&format!("detected format: {}", format.as_str()));

    let mut keys = BTreeSet::new();
    let mut examples: Vec<Map<String, Value>> = Vec::new();
    let mut writer = JsonlWriter::create(&sample_path)?;
    let mut write_error = None;
    {
        let _t = timed(
            reporter,
            format!("write first {} objects to {}", limit, sample_path.display()),
        );
        let mut stats = LoadStats::default();
        if limit > 0 {
            for_each_object(src, &mut stats, |obj| {
                if examples.len() < MAX_EXAMPLES {
                    examples.push(
                        obj.iter()
                            .take(EXAMPLE_KEYS)
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    );
                }
                keys.extend(obj.keys().cloned());
                if let Err(e) = writer.write(&obj) {
                    write_error = Some(e);
                    return ControlFlow::Break(());
                }
                if writer.written() >= limit {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })?;
        }
        tracing::debug!("sampling {}: {:?}", src.display(), stats);
    }
    if let Some(e) = write_error {
        return Err(e);
    }
    let kept = writer.finish()?;

    let source = src.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let rendered = examples
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let mut summary = String::new();
    write_summary(&mut summary, &source, format, kept, &keys, &rendered)
        .map_err(|e| Error::internal(format!("failed to format sample stats: {}", e)))?;
    std::fs::write(&stats_path, summary)?;

    reporter.success(&format!("sample saved: {} | kept={}", sample_path.display(), kept));
    reporter.success(&format!("stats saved:  {}", stats_path.display()));

    Ok(Some(SampleReport {
        format,
        kept,
        keys,
        sample_path,
        stats_path,
    }))
}

/// Human-readable `<stem>.stats.txt` body
fn write_summary(
    out: &mut String,
    source: &str,
    format: RawFormat,
    kept: usize,
    keys: &BTreeSet<String>,
    examples: &[String],
) -> fmt::Result {
    let listed: Vec<&String> = keys.iter().take(LISTED_KEYS).collect();
    writeln!(out, "source: {}", source)?;
    writeln!(out, "format: {}", format.as_str())?;
    writeln!(out, "kept: {}", kept)?;
    writeln!(out, "keys(total {}): {:?}", keys.len(), listed)?;
    writeln!(out, "examples (up to {}, partial keys):", MAX_EXAMPLES)?;
    for (i, example) in examples.iter().enumerate() {
        writeln!(out, "  [{}] {}", i + 1, example)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;

    #[test]
    fn test_stem_strips_dump_suffixes() {
        assert_eq!(sample_stem(Path::new("raw/papers-with-abstracts.json.gz")), "papers-with-abstracts");
        assert_eq!(sample_stem(Path::new("links.jsonl")), "links");
        assert_eq!(sample_stem(Path::new("methods")), "methods");
    }

    #[test]
    fn test_sample_respects_limit_and_writes_stats() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("papers.json");
        std::fs::write(
            &src,
            r#"[{"title": "A", "zeta": 1}, {"title": "B", "alpha": 2}, {"title": "C", "omega": 3}]"#,
        )
        .unwrap();
        let out_dir = dir.path().join("samples");

        let report = sample_file(&src, &out_dir, 2, &NullReporter).unwrap().unwrap();
        assert_eq!(report.format, RawFormat::JsonArray);
        assert_eq!(report.kept, 2);
        assert_eq!(
            report.keys.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["alpha", "title", "zeta"]
        );

        let sample = std::fs::read_to_string(&report.sample_path).unwrap();
        assert_eq!(sample.lines().count(), 2);

        let stats = std::fs::read_to_string(out_dir.join("papers.stats.txt")).unwrap();
        assert!(stats.contains("format: array"));
        assert!(stats.contains("kept: 2"));
        assert!(stats.contains("[2] "));
    }

    #[test]
    fn test_sample_keeps_dump_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("links.jsonl");
        std::fs::write(&src, "{\"zeta\": 1, \"alpha\": 2, \"mid\": 3}\n").unwrap();

        let report = sample_file(&src, dir.path(), 10, &NullReporter).unwrap().unwrap();
        let sample = std::fs::read_to_string(&report.sample_path).unwrap();
        assert_eq!(sample.lines().next(), Some(r#"{"zeta":1,"alpha":2,"mid":3}"#));

        let stats = std::fs::read_to_string(&report.stats_path).unwrap();
        assert!(stats.contains(r#"  [1] {"zeta":1,"alpha":2,"mid":3}"#));
        assert!(stats.contains(r#"keys(total 3): ["alpha", "mid", "zeta"]"#));
    }

    #[test]
    fn test_summary_lists_examples_in_order() {
        let keys: BTreeSet<String> = ["b", "a"].iter().map(|k| k.to_string()).collect();
        let examples = vec![r#"{"b":1}"#.to_string(), r#"{"a":2}"#.to_string()];
        let mut out = String::new();
        write_summary(&mut out, "papers.json", RawFormat::JsonArray, 2, &keys, &examples).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "source: papers.json");
        assert_eq!(lines[3], r#"keys(total 2): ["a", "b"]"#);
        assert_eq!(lines[5], r#"  [1] {"b":1}"#);
        assert_eq!(lines[6], r#"  [2] {"a":2}"#);
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_file(&dir.path().join("nope.jsonl"), dir.path(), 10, &NullReporter).unwrap();
        assert!(report.is_none());
    }
}
