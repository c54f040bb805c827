//! Embedding stage driver: enriched articles to embedded articles.
//!
//! The stage is incrementally resumable: each output records the SHA-256 of
//! the exact text that was embedded, and a unit is skipped only when an
//! output with a matching hash already exists. Re-running after a partial
//! failure embeds only the units still pending, and a changed
//! `text_for_embedding` re-embeds rather than going stale behind an existing
//! file.

use crate::article::{EmbeddedArticle, EnrichedArticle};
use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::pipeline::layout::{self, DataLayout};
use crate::pipeline::types::{StageError, StageReport};
use sha2::{Digest, Sha256};

/// Options derived from configuration for the embed stage.
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Expected dimensionality of provider vectors.
    pub dimension: usize,
    /// Character budget applied to input text before submission.
    pub char_budget: usize,
}

/// Run the embedding stage over every enriched persona partition.
pub async fn run(
    client: &dyn EmbeddingClient,
    layout: &DataLayout,
    options: &EmbedOptions,
) -> Result<StageReport, StageError> {
    let input_root = layout.enriched();
    let output_root = layout.embeddings();
    let mut report = StageReport::default();

    for (persona, persona_dir) in layout::personas(&input_root) {
        let out_dir = output_root.join(&persona);
        if let Err(err) = layout::ensure_dir(&out_dir) {
            tracing::error!(persona, dir = %out_dir.display(), error = %err, "Skipping persona: could not create output directory");
            continue;
        }

        for path in layout::article_files(&persona_dir) {
            report.scanned += 1;
            let article: EnrichedArticle = match layout::read_unit(&path) {
                Ok(article) => article,
                Err(err) => {
                    tracing::warn!(persona, error = %err, "Skipping unreadable enriched unit");
                    report.failed += 1;
                    continue;
                }
            };

            let text = article.text_for_embedding.trim();
            if text.is_empty() {
                tracing::debug!(persona, path = %path.display(), "No embeddable text; unit excluded from index");
                report.skipped += 1;
                continue;
            }

            let (text, truncated) = truncate_to_budget(text, options.char_budget);
            if truncated {
                tracing::warn!(
                    persona,
                    path = %path.display(),
                    budget = options.char_budget,
                    "Embedding input exceeded character budget; truncated"
                );
            }
            let input_hash = content_hash(text);

            let file_name = path.file_name().unwrap_or_default();
            let out_path = out_dir.join(file_name);
            if is_current(&out_path, &input_hash) {
                report.reused += 1;
                continue;
            }

            match client.embed(text).await {
                Ok(vector) => {
                    if vector.len() != options.dimension {
                        tracing::warn!(
                            persona,
                            path = %path.display(),
                            expected = options.dimension,
                            actual = vector.len(),
                            "Provider returned unexpected vector dimension; unit excluded"
                        );
                        report.failed += 1;
                        continue;
                    }
                    let record = EmbeddedArticle {
                        article,
                        embedding: vector,
                        embedding_input_sha256: input_hash,
                    };
                    match layout::write_unit(&out_path, &record) {
                        Ok(()) => report.written += 1,
                        Err(err) => {
                            tracing::error!(persona, path = %out_path.display(), error = %err, "Failed to write embedded article");
                            report.failed += 1;
                        }
                    }
                }
                Err(EmbeddingError::Auth(message)) => {
                    tracing::error!(persona, "Aborting embed stage: {message}");
                    return Err(StageError::Auth(message));
                }
                Err(err) => {
                    tracing::warn!(persona, path = %path.display(), error = %err, "Embedding failed; unit stays pending");
                    report.failed += 1;
                }
            }
        }
    }

    tracing::info!(
        scanned = report.scanned,
        written = report.written,
        reused = report.reused,
        skipped = report.skipped,
        failed = report.failed,
        "Embedding stage finished"
    );
    Ok(report)
}

/// True when an output exists and was produced from the same input text.
fn is_current(out_path: &std::path::Path, input_hash: &str) -> bool {
    if !out_path.exists() {
        return false;
    }
    match layout::read_unit::<EmbeddedArticle>(out_path) {
        Ok(existing) => existing.embedding_input_sha256 == input_hash,
        // Corrupt outputs are re-embedded rather than trusted.
        Err(_) => false,
    }
}

/// Truncate text to the character budget on a char boundary.
fn truncate_to_budget(text: &str, budget: usize) -> (&str, bool) {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Hex SHA-256 of the embedding input text.
pub(crate) fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Mode {
        Vectors(usize),
        RateLimited,
        Auth,
    }

    struct FakeEmbedder {
        mode: Mode,
        calls: AtomicUsize,
        last_input: Mutex<String>,
    }

    impl FakeEmbedder {
        fn vectors(dimension: usize) -> Self {
            Self {
                mode: Mode::Vectors(dimension),
                calls: AtomicUsize::new(0),
                last_input: Mutex::new(String::new()),
            }
        }

        fn failing(mode: Mode) -> Self {
            Self {
                mode,
                calls: AtomicUsize::new(0),
                last_input: Mutex::new(String::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingClient for FakeEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_input.lock().expect("lock") = text.to_string();
            match self.mode {
                Mode::Vectors(dimension) => Ok(vec![0.1; dimension]),
                Mode::RateLimited => Err(EmbeddingError::RateLimited("429".into())),
                Mode::Auth => Err(EmbeddingError::Auth("401".into())),
            }
        }
    }

    fn write_enriched(layout: &DataLayout, persona: &str, slug: &str, text: &str) {
        let dir = layout.enriched().join(persona);
        layout::ensure_dir(&dir).expect("dir");
        let record = json!({
            "title": slug,
            "link": format!("https://example.com/{slug}"),
            "source_persona": persona,
            "text_for_embedding": text,
        });
        std::fs::write(
            dir.join(format!("{slug}.json")),
            serde_json::to_vec(&record).expect("json"),
        )
        .expect("write");
    }

    fn options() -> EmbedOptions {
        EmbedOptions {
            dimension: 4,
            char_budget: 32_000,
        }
    }

    #[tokio::test]
    async fn embeds_units_and_resumes_with_zero_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "one", "First article text");
        write_enriched(&layout, "alpha", "two", "Second article text");

        let client = FakeEmbedder::vectors(4);
        let report = run(&client, &layout, &options()).await.expect("report");
        assert_eq!(report.written, 2);
        assert_eq!(client.calls(), 2);

        let report = run(&client, &layout, &options()).await.expect("report");
        assert_eq!(report.written, 0);
        assert_eq!(report.reused, 2);
        assert_eq!(client.calls(), 2, "second run must make no provider calls");
    }

    #[tokio::test]
    async fn changed_input_text_is_re_embedded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "one", "Original text");

        let client = FakeEmbedder::vectors(4);
        run(&client, &layout, &options()).await.expect("first run");
        assert_eq!(client.calls(), 1);

        write_enriched(&layout, "alpha", "one", "Updated text");
        let report = run(&client, &layout, &options()).await.expect("second run");
        assert_eq!(report.written, 1);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn empty_text_is_skipped_and_never_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "empty", "   ");

        let client = FakeEmbedder::vectors(4);
        let report = run(&client, &layout, &options()).await.expect("report");
        assert_eq!(report.skipped, 1);
        assert_eq!(client.calls(), 0);
        assert!(!layout.embeddings().join("alpha").join("empty.json").exists());
    }

    #[tokio::test]
    async fn rate_limited_unit_is_skipped_but_run_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "one", "Some text");
        write_enriched(&layout, "alpha", "two", "More text");

        let client = FakeEmbedder::failing(Mode::RateLimited);
        let report = run(&client, &layout, &options()).await.expect("report");
        assert_eq!(report.failed, 2);
        assert_eq!(report.written, 0);
    }

    #[tokio::test]
    async fn auth_failure_aborts_the_run() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "one", "Some text");

        let client = FakeEmbedder::failing(Mode::Auth);
        let error = run(&client, &layout, &options()).await.unwrap_err();
        assert!(matches!(error, StageError::Auth(_)));
    }

    #[tokio::test]
    async fn oversized_input_is_truncated_before_submission() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "long", &"x".repeat(200));

        let client = FakeEmbedder::vectors(4);
        let report = run(
            &client,
            &layout,
            &EmbedOptions {
                dimension: 4,
                char_budget: 50,
            },
        )
        .await
        .expect("report");
        assert_eq!(report.written, 1);
        assert_eq!(client.last_input.lock().expect("lock").len(), 50);
    }

    #[tokio::test]
    async fn wrong_dimension_vector_is_not_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = DataLayout::new(dir.path());
        write_enriched(&layout, "alpha", "one", "Some text");

        let client = FakeEmbedder::vectors(3);
        let report = run(&client, &layout, &options()).await.expect("report");
        assert_eq!(report.failed, 1);
        assert!(!layout.embeddings().join("alpha").join("one.json").exists());
    }

    #[test]
    fn content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
