//! Prompt templates for the enrichment collaborators.
//!
//! Templates carry an `{article_text}` placeholder filled in by the thin
//! helper functions in the parent module.

/// Prompt for abstractive summarization (five sentences maximum).
pub const PROMPT_SUMMARY: &str = "\
You are an assistant specialized in technology news monitoring.
Summarize the following article in at most 5 sentences.
Return only the summary, without comments or explanations.

Article:
{article_text}
";

/// Prompt for keyword tagging, returning a comma-separated list.
pub const PROMPT_TAGGING: &str = "\
You are an expert AI and technology news analyst. Your task is to extract the most relevant and concise tags from the provided article text.

Please provide:
1. Up to 5-7 primary tags covering the main topics, technologies, and key concepts.
2. Up to 3 tags for any specific companies or organizations central to the article.
3. Up to 2 tags for any notable individuals mentioned, if they are key to the article's focus.

Guidelines:
- Tags should be in English.
- Tags should be concise (1-3 words ideally).
- Prioritize relevance and specificity. Avoid overly broad tags.
- If a company or person is only mentioned in passing, do not tag them.

Return only a comma-separated list of concise tags, without comments or explanations.

Article Text:
{article_text}

Tags:
";

/// Prompt for single-label category classification.
pub const PROMPT_CLASSIFY: &str = "\
Classify the following article into exactly one category, such as
technology_news, business, science, policy, or culture.
Return only the category label in lowercase snake_case, nothing else.

Article Text:
{article_text}

Category:
";

/// Prompt for named-entity extraction, returning a JSON object.
pub const PROMPT_ENTITIES: &str = "\
Extract the named entities from the following article.
Return only a JSON object with the keys \"persons\", \"organizations\", and
\"locations\", each mapping to an array of strings. Use empty arrays when a
kind has no entities. Do not wrap the JSON in markdown fences.

Article Text:
{article_text}
";

/// Fill the `{article_text}` placeholder in a template.
pub(crate) fn fill(template: &str, article_text: &str) -> String {
    template.replace("{article_text}", article_text)
}
