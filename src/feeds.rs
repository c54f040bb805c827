//! Scrape stage: RSS/Atom feeds into persona-partitioned raw article files.
//!
//! Sources are declared in a JSON file mapping feed URLs to personas. Every
//! source is fetched and parsed independently; a dead or malformed feed is
//! logged and skipped so the other sources still land. Articles are grouped
//! by persona and written as one JSON array per persona, which is the input
//! the enrichment stage expects.

use crate::article::RawArticle;
use crate::pipeline::layout::{self, DataLayout};
use crate::pipeline::types::{StageError, StageReport};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One feed entry from the sources configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSource {
    /// RSS or Atom feed URL.
    pub url: String,
    /// Persona partition the feed's articles belong to.
    pub persona_id: String,
    /// Human-readable name recorded on each article.
    pub source_name: String,
}

/// Run the scrape stage over every configured source.
pub async fn run(
    http: &reqwest::Client,
    sources_path: &Path,
    layout: &DataLayout,
) -> Result<StageReport, StageError> {
    let sources = load_sources(sources_path)?;
    let output_root = layout.feeds_raw();
    layout::ensure_dir(&output_root).map_err(|source| StageError::OutputRoot {
        path: output_root.clone(),
        source,
    })?;

    let mut report = StageReport::default();
    let mut by_persona: BTreeMap<String, Vec<RawArticle>> = BTreeMap::new();

    for source in &sources {
        report.scanned += 1;
        match fetch_feed(http, source).await {
            Ok(articles) => {
                tracing::info!(
                    url = %source.url,
                    persona = %source.persona_id,
                    articles = articles.len(),
                    "Scraped feed"
                );
                by_persona
                    .entry(source.persona_id.clone())
                    .or_default()
                    .extend(articles);
            }
            Err(err) => {
                tracing::warn!(url = %source.url, persona = %source.persona_id, error = %err, "Skipping feed");
                report.failed += 1;
            }
        }
    }

    for (persona, articles) in &by_persona {
        let path = output_root.join(format!("{persona}.json"));
        match layout::write_unit(&path, articles) {
            Ok(()) => report.written += 1,
            Err(err) => {
                tracing::error!(persona, path = %path.display(), error = %err, "Failed to write persona feed file");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        sources = report.scanned,
        personas = report.written,
        failed = report.failed,
        "Scrape stage finished"
    );
    Ok(report)
}

fn load_sources(path: &Path) -> Result<Vec<FeedSource>, StageError> {
    layout::read_unit(path).map_err(|err| StageError::Sources(err.to_string()))
}

async fn fetch_feed(
    http: &reqwest::Client,
    source: &FeedSource,
) -> Result<Vec<RawArticle>, anyhow::Error> {
    use anyhow::Context;

    let response = http
        .get(&source.url)
        .send()
        .await
        .context("feed fetch failed")?
        .error_for_status()
        .context("feed returned an error status")?;
    let bytes = response.bytes().await.context("failed to read feed body")?;
    let feed = feed_rs::parser::parse(&bytes[..]).context("failed to parse RSS/Atom feed")?;

    let articles = feed
        .entries
        .into_iter()
        .map(|entry| RawArticle {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            published: entry.published.map(|dt| dt.to_rfc2822()),
            summary: entry.summary.map(|t| t.content).unwrap_or_default(),
            persona_id: source.persona_id.clone(),
            source: source.source_name.clone(),
        })
        .collect();
    Ok(articles)
}
