//! LLM enrichment collaborators.
//!
//! The NLP steps (tagging, classification, entity extraction, summarization)
//! are thin prompt calls against a single completion interface. Each helper
//! parses the raw completion into the typed field the enrich stage stores;
//! the stage supplies deterministic fallbacks when a call fails or no
//! provider is configured.

mod ollama;
pub mod prompts;

pub use ollama::OllamaEnrichmentClient;

use crate::config::{Config, EnrichmentProvider};
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors surfaced while calling the enrichment provider.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Enrichment provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by enrichment completion providers.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Generate a completion for an assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String, EnrichmentError>;
}

/// Build the enrichment client selected by configuration.
///
/// Returns `None` when no provider is configured; the enrich stage then runs
/// its deterministic fallbacks.
pub fn build_enrichment_client(config: &Config) -> Option<Box<dyn EnrichmentClient>> {
    match config.enrichment_provider {
        EnrichmentProvider::None => None,
        EnrichmentProvider::Ollama => {
            let model = config.enrichment_model.clone()?;
            Some(Box::new(OllamaEnrichmentClient::new(
                config.ollama_url.clone(),
                model,
            )))
        }
    }
}

/// Maximum accepted tag length; longer completions are refusals or run-ons.
const MAX_TAG_LEN: usize = 50;

/// Tag an article, returning a deduplicated lowercase tag list.
pub async fn tag_article(
    client: &dyn EnrichmentClient,
    text: &str,
) -> Result<Vec<String>, EnrichmentError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let response = client
        .complete(&prompts::fill(prompts::PROMPT_TAGGING, text))
        .await?;
    Ok(parse_tag_list(&response))
}

/// Classify an article into a single category label.
pub async fn classify_article(
    client: &dyn EnrichmentClient,
    text: &str,
) -> Result<String, EnrichmentError> {
    let response = client
        .complete(&prompts::fill(prompts::PROMPT_CLASSIFY, text))
        .await?;
    let label: String = response
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if label.is_empty() {
        return Err(EnrichmentError::InvalidResponse(
            "empty category label".to_string(),
        ));
    }
    Ok(label)
}

/// Extract named entities grouped by kind.
pub async fn extract_entities(
    client: &dyn EnrichmentClient,
    text: &str,
) -> Result<BTreeMap<String, Vec<String>>, EnrichmentError> {
    let response = client
        .complete(&prompts::fill(prompts::PROMPT_ENTITIES, text))
        .await?;
    let stripped = strip_code_fences(&response);
    serde_json::from_str(stripped).map_err(|error| {
        EnrichmentError::InvalidResponse(format!("entities were not a JSON object: {error}"))
    })
}

/// Produce an abstractive summary of the article text.
pub async fn summarize(
    client: &dyn EnrichmentClient,
    text: &str,
) -> Result<String, EnrichmentError> {
    if text.trim().is_empty() {
        return Ok(String::new());
    }
    client
        .complete(&prompts::fill(prompts::PROMPT_SUMMARY, text))
        .await
}

/// Parse a comma-separated tag completion into clean tags.
///
/// Lowercases, trims, deduplicates, and drops overlong tags and "no ..."
/// refusal phrasings. Refusal detection is anchored to the start of the tag
/// so topics merely containing the word pass through.
pub fn parse_tag_list(response: &str) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    for tag in response.split(',') {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || tag.len() >= MAX_TAG_LEN || tag.starts_with("no ") {
            continue;
        }
        seen.insert(tag);
    }
    seen.into_iter().collect()
}

fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}
