//! Typed article records flowing through the pipeline.
//!
//! Each stage adds fields and never mutates what an earlier stage wrote, so
//! the stage records compose: an [`EmbeddedArticle`] is an
//! [`EnrichedArticle`] plus the vector fields, flattened into the same JSON
//! object on disk. Coercions that used to be scattered across stages (tags as
//! string-or-list, blank publication dates) happen once, at deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Raw article as written by the scrape stage, one JSON array per persona.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawArticle {
    /// Article headline from the feed entry.
    #[serde(default)]
    pub title: String,
    /// Canonical article URL; the natural key for point identity.
    #[serde(default)]
    pub link: String,
    /// Publication timestamp as the feed reported it, if any.
    #[serde(default, deserialize_with = "de_optional_string")]
    pub published: Option<String>,
    /// Feed-provided summary or description.
    #[serde(default)]
    pub summary: String,
    /// Persona partition the source feed belongs to.
    #[serde(default)]
    pub persona_id: String,
    /// Human-readable name of the source feed.
    #[serde(default)]
    pub source: String,
}

/// Article after the enrichment stage, one JSON file per article.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichedArticle {
    /// Article headline.
    pub title: String,
    /// Canonical article URL.
    #[serde(default)]
    pub link: String,
    /// Publication timestamp as reported by the feed, if any.
    #[serde(default, deserialize_with = "de_optional_string")]
    pub published: Option<String>,
    /// Persona partition this article belongs to.
    pub source_persona: String,
    /// Summary carried over from the raw feed entry.
    #[serde(default)]
    pub original_summary: String,
    /// Cleaned text used as input to the collaborator calls.
    #[serde(default)]
    pub cleaned_text: String,
    /// Abstractive summary produced by the enrichment collaborator.
    #[serde(default)]
    pub enriched_summary: String,
    /// Topic tags; scalar values are coerced into a one-element list.
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
    /// Category label assigned by the classifier collaborator.
    #[serde(default)]
    pub category: String,
    /// Named entities grouped by kind (persons, organizations, locations).
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<String>>,
    /// Text submitted to the embedding provider for this article.
    #[serde(default)]
    pub text_for_embedding: String,
}

/// Article after the embedding stage: the enriched record plus its vector.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddedArticle {
    /// All fields accumulated by the earlier stages.
    #[serde(flatten)]
    pub article: EnrichedArticle,
    /// Embedding vector of the configured dimension.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Hex SHA-256 of the exact text submitted to the provider.
    #[serde(default)]
    pub embedding_input_sha256: String,
}

/// Assemble the embedding input from the enriched fields.
///
/// Empty components collapse so an article with neither title nor summary nor
/// tags yields an empty string, which the embedding stage skips.
pub fn build_embedding_text(title: &str, enriched_summary: &str, tags: &[String]) -> String {
    let mut text = format!("{title}\n\n{enriched_summary}");
    if !tags.is_empty() {
        text.push_str("\n\nTags: ");
        text.push_str(&tags.join(", "));
    }
    text.trim().to_string()
}

/// Treat blank strings as an absent value.
fn de_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Coerce the upstream `tags` field into a list of strings.
fn de_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_tags(value))
}

pub(crate) fn coerce_tags(value: Option<Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => {
                    let trimmed = s.trim().to_string();
                    (!trimmed.is_empty()).then_some(trimmed)
                }
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(s)) => {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed]
            }
        }
        Some(other) => vec![other.to_string()],
    }
}
