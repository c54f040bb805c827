//! Command-line entry point for the ingestion pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use newsvec::config::{self, Config};
use newsvec::embedding::build_embedding_client;
use newsvec::enrichment::build_enrichment_client;
use newsvec::pipeline::{self, DataLayout, EmbedOptions, IndexOptions};
use newsvec::qdrant::QdrantService;
use newsvec::{export, feeds, logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "newsvec", about = "Persona-partitioned news ingestion pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch configured feeds and write raw persona article files.
    Scrape {
        /// Path to the feed sources configuration file.
        #[arg(long, default_value = "sources.json")]
        sources: PathBuf,
    },
    /// Enrich raw articles with summaries, tags, categories and entities.
    Enrich,
    /// Embed enriched articles, reusing outputs whose input text is unchanged.
    Embed,
    /// Upsert embedded articles into the Qdrant collection.
    Index,
    /// Export embedded articles as TSV for the TensorFlow Projector.
    Export,
    /// Run scrape, enrich, embed and index in sequence.
    Run {
        /// Path to the feed sources configuration file.
        #[arg(long, default_value = "sources.json")]
        sources: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("invalid configuration")?;
    logging::init_tracing();

    let layout = DataLayout::new(&config.data_dir);

    match cli.command {
        Commands::Scrape { sources } => {
            run_scrape(&sources, &layout).await?;
        }
        Commands::Enrich => {
            run_enrich(config, &layout).await?;
        }
        Commands::Embed => {
            run_embed(config, &layout).await?;
        }
        Commands::Index => {
            run_index(config, &layout).await?;
        }
        Commands::Export => {
            let report = export::run(&layout)?;
            tracing::info!(
                exported = report.exported,
                skipped = report.skipped,
                "Export complete"
            );
        }
        Commands::Run { sources } => {
            run_scrape(&sources, &layout).await?;
            run_enrich(config, &layout).await?;
            run_embed(config, &layout).await?;
            run_index(config, &layout).await?;
        }
    }

    Ok(())
}

async fn run_scrape(sources: &std::path::Path, layout: &DataLayout) -> anyhow::Result<()> {
    let http = reqwest::Client::builder()
        .user_agent("newsvec/0.3")
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .context("failed to build feed HTTP client")?;
    let report = feeds::run(&http, sources, layout).await?;
    tracing::info!(
        sources = report.scanned,
        personas = report.written,
        failed = report.failed,
        "Scrape complete"
    );
    Ok(())
}

async fn run_enrich(config: &Config, layout: &DataLayout) -> anyhow::Result<()> {
    let client = build_enrichment_client(config);
    let report = pipeline::enrich::run(client.as_deref(), layout).await?;
    tracing::info!(
        scanned = report.scanned,
        written = report.written,
        failed = report.failed,
        "Enrichment complete"
    );
    Ok(())
}

async fn run_embed(config: &Config, layout: &DataLayout) -> anyhow::Result<()> {
    let client = build_embedding_client(config).context("embedding client unavailable")?;
    let options = EmbedOptions {
        dimension: config.embedding_dimension,
        char_budget: config.embedding_char_budget,
    };
    let report = pipeline::embed::run(client.as_ref(), layout, &options).await?;
    tracing::info!(
        scanned = report.scanned,
        written = report.written,
        reused = report.reused,
        skipped = report.skipped,
        failed = report.failed,
        "Embedding complete"
    );
    Ok(())
}

async fn run_index(config: &Config, layout: &DataLayout) -> anyhow::Result<()> {
    let qdrant = QdrantService::new().context("failed to build Qdrant client")?;
    let options = IndexOptions {
        collection: config.qdrant_collection_name.clone(),
        dimension: config.embedding_dimension,
        batch_size: pipeline::UPSERT_BATCH_SIZE,
    };
    let report = pipeline::index::run(&qdrant, layout, &options).await?;
    tracing::info!(
        scanned = report.scanned,
        upserted = report.upserted,
        skipped = report.skipped,
        failed_batches = report.failed_batches,
        "Indexing complete"
    );
    Ok(())
}
