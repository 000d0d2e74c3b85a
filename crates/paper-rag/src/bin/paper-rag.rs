//! paper-rag command line
//!
//! Run with: cargo run -p paper-rag -- run --config paper-rag.toml

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use paper_rag::config::EmbeddingBackend;
use paper_rag::report::ConsoleReporter;
use paper_rag::{BuildOutcome, Pipeline, RagConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "paper-rag",
    version,
    about = "Build and search a retrieval index over research-paper abstracts"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "PAPER_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Embedding backend, overriding the config
    #[arg(long, global = true, value_enum)]
    provider: Option<EmbeddingBackend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy the first objects of every raw dump and summarize their keys
    Sample {
        /// Objects per dump
        #[arg(long)]
        limit: Option<usize>,
        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Load raw dumps and write the document stream
    Normalize(SourceArgs),
    /// Split documents into overlapping passages
    Chunk {
        #[arg(long)]
        chunk_size: Option<usize>,
        #[arg(long)]
        chunk_overlap: Option<usize>,
    },
    /// Embed passages and write the index bundle
    Build,
    /// Run normalize, chunk and build in sequence
    Run(SourceArgs),
    /// Query the index bundle
    Search {
        /// Natural-language query
        query: String,
        /// Number of hits
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Papers-with-abstracts dump (.json, .jsonl, optionally .gz)
    #[arg(long)]
    abstracts: Option<PathBuf>,
    /// Paper-to-code links dump
    #[arg(long)]
    links: Option<PathBuf>,
}

impl SourceArgs {
    fn apply(&self, config: &mut RagConfig) {
        if let Some(path) = &self.abstracts {
            config.sources.abstracts = Some(path.clone());
        }
        if let Some(path) = &self.links {
            config.sources.links = Some(path.clone());
        }
    }
}

fn load_config(cli: &Cli) -> Result<RagConfig> {
    let mut config = match &cli.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RagConfig::default(),
    };
    if let Some(provider) = cli.provider {
        config.embeddings.provider = provider;
    }

    match &cli.command {
        Command::Sample { limit, out_dir } => {
            if let Some(limit) = limit {
                config.sampling.limit = *limit;
            }
            if let Some(dir) = out_dir {
                config.sampling.out_dir = dir.clone();
            }
        }
        Command::Normalize(sources) | Command::Run(sources) => sources.apply(&mut config),
        Command::Chunk { chunk_size, chunk_overlap } => {
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = *size;
            }
            if let Some(overlap) = chunk_overlap {
                config.chunking.chunk_overlap = *overlap;
            }
        }
        Command::Search { top_k: Some(k), .. } => config.retrieval.top_k = *k,
        Command::Build | Command::Search { .. } => {}
    }

    config.validate()?;
    Ok(config)
}

fn report_build(outcome: &BuildOutcome) {
    if let BuildOutcome::EmptyCorpus = outcome {
        tracing::warn!("Index not built: the passage stream is empty");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paper_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let reporter = ConsoleReporter::new();
    let pipeline = Pipeline::from_config(config)?;

    match &cli.command {
        Command::Sample { .. } => {
            let reports = pipeline.sample(&reporter)?;
            tracing::info!("sampled {} dumps", reports.len());
        }
        Command::Normalize(_) => {
            pipeline.normalize(&reporter)?;
        }
        Command::Chunk { .. } => {
            pipeline.chunk(&reporter)?;
        }
        Command::Build => {
            let outcome = pipeline.build_index(&reporter).await?;
            report_build(&outcome);
        }
        Command::Run(_) => {
            let summary = pipeline.run(&reporter).await?;
            report_build(&summary.build);
            tracing::info!(
                "pipeline done: papers={} docs={} passages={}",
                summary.load.yielded,
                summary.normalize.kept,
                summary.chunk.passages
            );
        }
        Command::Search { query, .. } => {
            let retriever = pipeline.retriever().with_context(|| {
                format!(
                    "no usable index at {}; run `paper-rag build` first",
                    pipeline.config().paths.index_dir.display()
                )
            })?;
            let hits = retriever
                .search(query, pipeline.config().retrieval.top_k)
                .await?;

            println!("\n== Top hits ==");
            for (i, hit) in hits.iter().enumerate() {
                println!("{}", hit.format_display(i + 1));
            }
        }
    }

    Ok(())
}
