//! Document and passage types carried through the pipeline

use serde::{Deserialize, Serialize};

/// Denormalized paper fields carried unchanged from ingestion to search hits
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PaperMeta {
    /// Paper title
    pub title: String,
    /// Canonical paper URL
    pub url: String,
    /// Linked code repository
    pub code: String,
    /// Task tags
    pub tasks: Vec<String>,
    /// Method tags
    pub methods: Vec<String>,
    /// Dataset tags
    pub datasets: Vec<String>,
    /// Upstream identifier (arXiv, OpenReview, ...)
    pub source_id: String,
}

/// A paper record after field resolution, before normalization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPaper {
    pub title: String,
    pub abstract_text: String,
    pub url: String,
    pub code: String,
    pub tasks: Vec<String>,
    pub methods: Vec<String>,
    pub datasets: Vec<String>,
    pub source_id: String,
}

impl RawPaper {
    /// Convenience constructor used by tests and callers with pre-parsed data
    pub fn new(title: impl Into<String>, abstract_text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Split into the metadata bag; title is trimmed, other fields verbatim
    pub fn to_meta(&self) -> PaperMeta {
        PaperMeta {
            title: self.title.trim().to_string(),
            url: self.url.clone(),
            code: self.code.clone(),
            tasks: self.tasks.clone(),
            methods: self.methods.clone(),
            datasets: self.datasets.clone(),
            source_id: self.source_id.clone(),
        }
    }
}

/// A normalized paper: one line of the document stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier derived from (source id or title, url)
    pub doc_id: String,
    /// Title and abstract joined by a blank line
    pub text: String,
    /// Metadata bag
    pub meta: PaperMeta,
}

/// A window of a document's text: one line of the passage stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Passage {
    /// `{doc_id}_{char_offset}`
    pub chunk_id: String,
    /// Parent document
    pub doc_id: String,
    /// Trimmed window text, never empty
    pub chunk_text: String,
    /// Copy of the parent document's metadata
    pub meta: PaperMeta,
}

impl Passage {
    /// Build a chunk id from its parent and the window's start offset
    pub fn make_id(doc_id: &str, offset: usize) -> String {
        format!("{}_{}", doc_id, offset)
    }

    /// Metadata entry stored in the bundle's docstore
    pub fn to_meta(&self) -> PassageMeta {
        PassageMeta {
            chunk_id: self.chunk_id.clone(),
            doc_id: self.doc_id.clone(),
            paper: self.meta.clone(),
        }
    }
}

/// Per-passage metadata kept in the index bundle and returned with hits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassageMeta {
    pub chunk_id: String,
    pub doc_id: String,
    #[serde(flatten)]
    pub paper: PaperMeta,
}

impl PassageMeta {
    /// Paper title, for display
    pub fn title(&self) -> &str {
        &self.paper.title
    }

    /// Paper URL, for display
    pub fn url(&self) -> &str {
        &self.paper.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_defaults_when_fields_missing() {
        let meta: PaperMeta = serde_json::from_str(r#"{"title": "A"}"#).unwrap();
        assert_eq!(meta.title, "A");
        assert_eq!(meta.url, "");
        assert!(meta.tasks.is_empty());
    }

    #[test]
    fn test_passage_meta_is_flat() {
        let passage = Passage {
            chunk_id: Passage::make_id("abc", 1000),
            doc_id: "abc".to_string(),
            chunk_text: "text".to_string(),
            meta: PaperMeta {
                title: "A".to_string(),
                ..Default::default()
            },
        };
        assert_eq!(passage.chunk_id, "abc_1000");

        let value = serde_json::to_value(passage.to_meta()).unwrap();
        assert_eq!(value["chunk_id"], "abc_1000");
        assert_eq!(value["doc_id"], "abc");
        assert_eq!(value["title"], "A");
        assert!(value.get("paper").is_none());

        let back: PassageMeta = serde_json::from_value(value).unwrap();
        assert_eq!(back.title(), "A");
    }
}
