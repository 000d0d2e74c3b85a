//! End-to-end pipeline tests using the offline hashing provider

use std::path::Path;
use std::sync::Arc;

use paper_rag::config::EmbeddingBackend;
use paper_rag::index::{IndexBundle, IDS_FILE, VECTORS_FILE};
use paper_rag::ingestion::{JsonlReader, NormalizeOptions, TextChunker};
use paper_rag::providers::HashingEmbedder;
use paper_rag::report::{EventKind, MemoryReporter, NullReporter};
use paper_rag::{BuildOutcome, Document, Error, Passage, Pipeline, RagConfig};

fn config(root: &Path, papers: &str) -> RagConfig {
    let abstracts = root.join("raw").join("papers.jsonl");
    std::fs::create_dir_all(abstracts.parent().unwrap()).unwrap();
    std::fs::write(&abstracts, papers).unwrap();

    let mut config = RagConfig::default();
    config.sources.abstracts = Some(abstracts);
    config.paths.docs = root.join("processed").join("docs.jsonl");
    config.paths.chunks = root.join("chunks").join("chunks.jsonl");
    config.paths.index_dir = root.join("indexes").join("flat");
    config.embeddings.provider = EmbeddingBackend::Hashing;
    config.embeddings.dimensions = 64;
    config
}

fn pipeline(config: RagConfig) -> Pipeline {
    let dims = config.embeddings.dimensions;
    Pipeline::new(config, Arc::new(HashingEmbedder::new(dims))).unwrap()
}

const TWO_RECORDS: &str = concat!(
    r#"{"title": "A", "abstract": "B", "url": "u1"}"#,
    "\n",
    r#"{"title": "", "abstract": "", "url": "u2"}"#,
    "\n"
);

#[tokio::test]
async fn test_single_paper_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path(), TWO_RECORDS));

    let summary = pipeline.run(&NullReporter).await.unwrap();
    assert_eq!(summary.load.yielded, 2);
    assert_eq!(summary.normalize.kept, 1);
    assert_eq!(summary.normalize.dropped_empty, 1);
    assert_eq!(summary.chunk.passages, 1);
    let BuildOutcome::Built(stats) = &summary.build else {
        panic!("expected a bundle, got {:?}", summary.build);
    };
    assert_eq!(stats.count, 1);

    let docs: Vec<Document> = JsonlReader::open(&pipeline.config().paths.docs)
        .unwrap()
        .collect::<paper_rag::Result<_>>()
        .unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].text, "A\n\nB");

    let hits = pipeline.retriever().unwrap().search("A", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].meta.title(), "A");
    assert_eq!(hits[0].meta.url(), "u1");
}

#[tokio::test]
async fn test_empty_corpus_builds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let empty = r#"{"title": "", "abstract": "", "url": "u2"}"#;
    let pipeline = pipeline(config(dir.path(), empty));
    let reporter = MemoryReporter::new();

    let summary = pipeline.run(&reporter).await.unwrap();
    assert_eq!(summary.build, BuildOutcome::EmptyCorpus);
    assert!(!pipeline.config().paths.index_dir.exists());
    assert!(reporter
        .messages(EventKind::Warn)
        .iter()
        .any(|m| m.contains("no chunks")));

    let err = pipeline.retriever().err().unwrap();
    assert!(err.is_index_load());
}

fn corpus(n: usize) -> String {
    let topics = ["graph neural networks", "image segmentation", "speech recognition", "protein folding"];
    (0..n)
        .map(|i| {
            format!(
                r#"{{"title": "Paper {i} on {t}", "abstract": "We study {t} with method {i}. {pad}", "url": "https://papers/{i}", "arxiv_id": "{i}"}}"#,
                t = topics[i % topics.len()],
                pad = "Details follow. ".repeat(i % 5 * 10),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_bundle_consistency_and_cardinality() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), &corpus(12));
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;
    config.embeddings.dimensions = 4096;
    let pipeline = pipeline(config);

    let summary = pipeline.run(&NullReporter).await.unwrap();
    let bundle = IndexBundle::load(&pipeline.config().paths.index_dir).unwrap();
    let passages: Vec<Passage> = JsonlReader::open(&pipeline.config().paths.chunks)
        .unwrap()
        .collect::<paper_rag::Result<_>>()
        .unwrap();

    assert_eq!(bundle.len(), summary.chunk.passages);
    assert_eq!(bundle.stats().count, passages.len());
    assert_eq!(bundle.stats().dim, 4096);
    assert!(bundle.stats().normalize);
    for (i, passage) in passages.iter().enumerate() {
        assert_eq!(bundle.ids()[i], passage.chunk_id);
        assert_eq!(bundle.meta(i).unwrap().doc_id, passage.doc_id);
    }

    let retriever = pipeline.retriever().unwrap();
    for k in [1, 3, 6, passages.len(), passages.len() + 10] {
        let hits = retriever.search("protein folding", k).await.unwrap();
        assert_eq!(hits.len(), k.min(passages.len()));
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
    let top = retriever.search("protein folding", 1).await.unwrap();
    assert!(top[0].meta.title().contains("protein folding"));
}

#[tokio::test]
async fn test_rebuild_with_new_chunking_replaces_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), &corpus(6));
    config.chunking.chunk_size = 80;
    config.chunking.chunk_overlap = 10;
    pipeline(config.clone()).run(&NullReporter).await.unwrap();
    let first = IndexBundle::load(&config.paths.index_dir).unwrap();

    config.chunking.chunk_size = 400;
    config.chunking.chunk_overlap = 50;
    let rebuilt = pipeline(config.clone());
    rebuilt.chunk(&NullReporter).unwrap();
    rebuilt.build_index(&NullReporter).await.unwrap();
    let second = IndexBundle::load(&config.paths.index_dir).unwrap();

    assert!(second.len() < first.len());
    let chunker = TextChunker::new(400, 50).unwrap();
    let docs: Vec<Document> = JsonlReader::open(&config.paths.docs)
        .unwrap()
        .collect::<paper_rag::Result<_>>()
        .unwrap();
    let expected: Vec<String> = docs
        .iter()
        .flat_map(|d| chunker.chunk_document(d))
        .map(|p| p.chunk_id)
        .collect();
    assert_eq!(second.ids(), expected.as_slice());
}

#[tokio::test]
async fn test_corrupt_bundle_is_an_index_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path(), &corpus(3)));
    pipeline.run(&NullReporter).await.unwrap();
    let index_dir = pipeline.config().paths.index_dir.clone();

    std::fs::remove_file(index_dir.join(VECTORS_FILE)).unwrap();
    assert!(matches!(pipeline.retriever(), Err(Error::IndexLoad { .. })));

    pipeline.build_index(&NullReporter).await.unwrap();
    std::fs::write(index_dir.join(IDS_FILE), "[]").unwrap();
    assert!(matches!(pipeline.retriever(), Err(Error::IndexLoad { .. })));
}

#[tokio::test]
async fn test_duplicates_kept_by_normalize_fail_build_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let papers = concat!(
        r#"{"title": "A", "abstract": "B", "url": "u1"}"#,
        "\n",
        r#"{"title": "A", "abstract": "B again", "url": "u1"}"#,
        "\n"
    );
    let pipeline = pipeline(config(dir.path(), papers)).with_normalize_options(NormalizeOptions { dedupe: false });

    let err = pipeline.run(&NullReporter).await.unwrap_err();
    assert!(matches!(&err, Error::VectorIndex(msg) if msg.contains("duplicate chunk id")));
    assert!(err.to_string().contains("dedupe"));
    assert!(!pipeline.config().paths.index_dir.exists());
}

#[tokio::test]
async fn test_normalize_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(config(dir.path(), &corpus(5)));

    pipeline.normalize(&NullReporter).unwrap();
    let first = std::fs::read_to_string(&pipeline.config().paths.docs).unwrap();
    pipeline.normalize(&NullReporter).unwrap();
    let second = std::fs::read_to_string(&pipeline.config().paths.docs).unwrap();
    assert_eq!(first, second);
}
