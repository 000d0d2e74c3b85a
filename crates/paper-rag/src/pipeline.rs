//! End-to-end orchestration: load, normalize, chunk, build

use std::sync::Arc;

use crate::config::RagConfig;
use crate::embeddings::Embedder;
use crate::error::Result;
use crate::index::{BuildOutcome, IndexBuilder};
use crate::ingestion::{
    load_papers, sample_file, write_documents, ChunkStats, LoadStats, NormalizeOptions, NormalizeStats,
    SampleReport, TextChunker,
};
use crate::providers::{build_provider, EmbeddingProvider};
use crate::report::Reporter;
use crate::retrieval::Retriever;

/// What a full run produced
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub load: LoadStats,
    pub linked: usize,
    pub normalize: NormalizeStats,
    pub chunk: ChunkStats,
    pub build: BuildOutcome,
}

/// Runs the pipeline stages against the paths in a [`RagConfig`]
pub struct Pipeline {
    config: RagConfig,
    provider: Arc<dyn EmbeddingProvider>,
    normalize_options: NormalizeOptions,
}

impl Pipeline {
    /// Create a pipeline with an explicit embedding provider
    pub fn new(config: RagConfig, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            normalize_options: NormalizeOptions::default(),
        })
    }

    /// Create a pipeline using the provider named in the config
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let provider = build_provider(&config)?;
        Self::new(config, provider)
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize_options = options;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn embedder(&self) -> Embedder {
        Embedder::new(Arc::clone(&self.provider), self.config.embeddings.batch_size)
    }

    /// Write samples of every configured raw dump
    pub fn sample(&self, reporter: &dyn Reporter) -> Result<Vec<SampleReport>> {
        let sampling = &self.config.sampling;
        let mut reports = Vec::new();
        for (name, path) in self.config.sources.all() {
            tracing::debug!("sampling {} dump", name);
            if let Some(report) = sample_file(path, &sampling.out_dir, sampling.limit, reporter)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Steps 1 and 2: load raw dumps and write the document stream
    pub fn normalize(&self, reporter: &dyn Reporter) -> Result<(LoadStats, usize, NormalizeStats)> {
        let loaded = load_papers(&self.config.sources, reporter)?;
        let stats = write_documents(
            &loaded.papers,
            &self.config.paths.docs,
            &self.normalize_options,
            reporter,
        )?;
        Ok((loaded.abstracts, loaded.linked, stats))
    }

    /// Step 3: chunk the document stream
    pub fn chunk(&self, reporter: &dyn Reporter) -> Result<ChunkStats> {
        let chunker = TextChunker::from_config(&self.config.chunking)?;
        chunker.write_passages(&self.config.paths.docs, &self.config.paths.chunks, reporter)
    }

    /// Step 4: embed passages and write the index bundle
    pub async fn build_index(&self, reporter: &dyn Reporter) -> Result<BuildOutcome> {
        let builder = IndexBuilder::new(self.embedder(), self.config.embeddings.normalize);
        builder
            .build(&self.config.paths.chunks, &self.config.paths.index_dir, reporter)
            .await
    }

    /// All four steps in order
    pub async fn run(&self, reporter: &dyn Reporter) -> Result<PipelineSummary> {
        let (load, linked, normalize) = self.normalize(reporter)?;
        let chunk = self.chunk(reporter)?;
        let build = self.build_index(reporter).await?;
        Ok(PipelineSummary {
            load,
            linked,
            normalize,
            chunk,
            build,
        })
    }

    /// Open the configured index bundle for search
    pub fn retriever(&self) -> Result<Retriever> {
        Retriever::open(&self.config.paths.index_dir, self.embedder())
    }
}
