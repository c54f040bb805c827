//! Enrichment stage driver: raw persona arrays to per-article enriched files.

use crate::article::{EnrichedArticle, RawArticle, build_embedding_text};
use crate::enrichment::{self, EnrichmentClient};
use crate::pipeline::layout::{self, DataLayout, SlugAllocator};
use crate::pipeline::types::{StageError, StageReport};
use std::collections::BTreeMap;

/// Run the enrichment stage over every persona feed file.
///
/// Collaborator failures are unit-local: the affected field falls back to a
/// deterministic value and the run continues. When `client` is `None` every
/// article gets the fallbacks, which keeps the stage usable without an LLM.
pub async fn run(
    client: Option<&dyn EnrichmentClient>,
    layout: &DataLayout,
) -> Result<StageReport, StageError> {
    let feeds = layout::persona_feeds(&layout.feeds_raw());
    if feeds.is_empty() {
        tracing::warn!(root = %layout.feeds_raw().display(), "No raw feed files found; nothing to enrich");
        return Ok(StageReport::default());
    }

    let enriched_root = layout.enriched();
    let mut report = StageReport::default();

    for (persona, feed_path) in feeds {
        let articles: Vec<RawArticle> = match layout::read_unit(&feed_path) {
            Ok(articles) => articles,
            Err(err) => {
                tracing::error!(persona, error = %err, "Skipping persona: raw feed file unreadable");
                continue;
            }
        };

        let persona_dir = enriched_root.join(&persona);
        if let Err(err) = layout::ensure_dir(&persona_dir) {
            tracing::error!(persona, dir = %persona_dir.display(), error = %err, "Skipping persona: could not create output directory");
            continue;
        }

        tracing::info!(persona, articles = articles.len(), "Enriching persona");
        let mut slugs = SlugAllocator::new();
        for (index, raw) in articles.into_iter().enumerate() {
            report.scanned += 1;
            let slug = slugs.assign(&raw.title, index);
            let record = enrich_article(client, &persona, raw).await;
            let out_path = persona_dir.join(format!("{slug}.json"));
            match layout::write_unit(&out_path, &record) {
                Ok(()) => report.written += 1,
                Err(err) => {
                    tracing::error!(persona, path = %out_path.display(), error = %err, "Failed to write enriched article");
                    report.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        written = report.written,
        failed = report.failed,
        "Enrichment stage finished"
    );
    Ok(report)
}

/// Enrich a single raw article, applying fallbacks per collaborator call.
async fn enrich_article(
    client: Option<&dyn EnrichmentClient>,
    persona: &str,
    raw: RawArticle,
) -> EnrichedArticle {
    let input_text = if raw.summary.trim().is_empty() {
        raw.title.clone()
    } else {
        format!("{}\n\n{}", raw.title, raw.summary)
    };
    let cleaned_text = clean_text(&input_text);

    let tags = match client {
        Some(client) => match enrichment::tag_article(client, &cleaned_text).await {
            Ok(tags) => tags,
            Err(err) => {
                tracing::warn!(persona, title = %raw.title, error = %err, "Tagging failed; leaving tags empty");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let category = match client {
        Some(client) => match enrichment::classify_article(client, &cleaned_text).await {
            Ok(category) => category,
            Err(err) => {
                tracing::warn!(persona, title = %raw.title, error = %err, "Classification failed; using fallback category");
                "general".to_string()
            }
        },
        None => "general".to_string(),
    };

    let entities = match client {
        Some(client) => match enrichment::extract_entities(client, &cleaned_text).await {
            Ok(entities) => entities,
            Err(err) => {
                tracing::warn!(persona, title = %raw.title, error = %err, "Entity extraction failed; leaving entities empty");
                BTreeMap::new()
            }
        },
        None => BTreeMap::new(),
    };

    let enriched_summary = match client {
        Some(client) => match enrichment::summarize(client, &cleaned_text).await {
            Ok(summary) if !summary.trim().is_empty() => summary,
            Ok(_) => raw.summary.trim().to_string(),
            Err(err) => {
                tracing::warn!(persona, title = %raw.title, error = %err, "Summarization failed; keeping original summary");
                raw.summary.trim().to_string()
            }
        },
        None => raw.summary.trim().to_string(),
    };

    let text_for_embedding = build_embedding_text(&raw.title, &enriched_summary, &tags);

    EnrichedArticle {
        title: raw.title,
        link: raw.link,
        published: raw.published,
        source_persona: persona.to_string(),
        original_summary: raw.summary,
        cleaned_text,
        enriched_summary,
        tags,
        category,
        entities,
        text_for_embedding,
    }
}

/// Whitespace-trimming pass-through; real cleaning is a collaborator concern.
fn clean_text(text: &str) -> String {
    text.trim().to_string()
}
