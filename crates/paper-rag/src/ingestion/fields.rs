//! Field resolution for heterogeneous raw paper records
//!
//! Every logical field resolves from a priority-ordered list of source keys;
//! the first key holding a non-empty value wins. Keeping the table in one
//! place means a new dump layout is a one-line change here.

use serde_json::{Map, Value};

use crate::types::RawPaper;

/// Logical fields of a raw paper record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperField {
    Title,
    Abstract,
    Url,
    Code,
    SourceId,
    Tasks,
    Methods,
    Datasets,
}

/// Source keys consulted for a field, highest priority first
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: PaperField,
    pub keys: &'static [&'static str],
}

/// Resolution table for Papers-with-Code style dumps
pub const PAPER_FIELDS: &[FieldRule] = &[
    FieldRule { field: PaperField::Title, keys: &["title"] },
    FieldRule { field: PaperField::Abstract, keys: &["abstract"] },
    FieldRule { field: PaperField::Url, keys: &["url", "paper_url", "url_abs", "url_pdf"] },
    FieldRule { field: PaperField::Code, keys: &["code", "repo_url"] },
    FieldRule {
        field: PaperField::SourceId,
        keys: &["source_id", "arxiv_id", "openreview_id", "nips_id"],
    },
    FieldRule { field: PaperField::Tasks, keys: &["tasks"] },
    FieldRule { field: PaperField::Methods, keys: &["methods"] },
    FieldRule { field: PaperField::Datasets, keys: &["datasets"] },
];

/// Keys naming the paper side of a paper-to-code link
pub const LINK_PAPER_KEYS: &[&str] = &["paper_url", "paper.url"];

/// Keys naming the repository side of a paper-to-code link
pub const LINK_REPO_KEYS: &[&str] = &["repo_url", "repository.url", "code"];

fn keys_for(field: PaperField) -> &'static [&'static str] {
    PAPER_FIELDS
        .iter()
        .find(|rule| rule.field == field)
        .map(|rule| rule.keys)
        .unwrap_or(&[])
}

/// Look up a possibly dotted key (`"paper.url"`) in an object
fn lookup<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = obj.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty string among `keys`, trimmed; empty string when none
pub fn resolve_str(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| lookup(obj, key))
        .filter_map(scalar_to_string)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

/// First non-empty list among `keys`. Elements may be strings or objects
/// with a `name` field; anything else is ignored.
pub fn resolve_list(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    for key in keys {
        let Some(Value::Array(items)) = lookup(obj, key) else {
            continue;
        };
        let names: Vec<String> = items
            .iter()
            .filter_map(|item| match item {
                Value::Object(inner) => inner.get("name").and_then(scalar_to_string),
                other => scalar_to_string(other),
            })
            .filter(|s| !s.is_empty())
            .collect();
        if !names.is_empty() {
            return names;
        }
    }
    Vec::new()
}

/// Resolve a raw JSON object into a [`RawPaper`]
pub fn resolve_paper(obj: &Map<String, Value>) -> RawPaper {
    let text = |field| resolve_str(obj, keys_for(field));
    let list = |field| resolve_list(obj, keys_for(field));

    RawPaper {
        title: text(PaperField::Title),
        abstract_text: text(PaperField::Abstract),
        url: text(PaperField::Url),
        code: text(PaperField::Code),
        tasks: list(PaperField::Tasks),
        methods: list(PaperField::Methods),
        datasets: list(PaperField::Datasets),
        source_id: text(PaperField::SourceId),
    }
}
