//! Index stage driver: embedded articles into the Qdrant collection.
//!
//! Points are buffered per persona and flushed in fixed-size batches, with a
//! final flush for the remainder. A failed batch is logged and dropped; the
//! stage keeps going, and because point identity is derived from the article
//! link, re-running the stage re-upserts the dropped points without
//! duplicating the ones that landed.

use crate::article::EmbeddedArticle;
use crate::pipeline::layout::{self, DataLayout};
use crate::pipeline::types::{IndexReport, StageError};
use crate::qdrant::{PointUpsert, QdrantService, build_payload, point_id};

/// Number of points accumulated before a batch is flushed upstream.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Options derived from configuration for the index stage.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Target collection name.
    pub collection: String,
    /// Expected vector dimensionality; mismatched units are excluded.
    pub dimension: usize,
    /// Points per upsert request.
    pub batch_size: usize,
}

/// Run the index stage over every embedded persona partition.
pub async fn run(
    qdrant: &QdrantService,
    layout: &DataLayout,
    options: &IndexOptions,
) -> Result<IndexReport, StageError> {
    qdrant
        .create_collection_if_not_exists(&options.collection, options.dimension as u64)
        .await?;
    qdrant.ensure_payload_indexes(&options.collection).await?;

    let mut report = IndexReport::default();

    for (persona, persona_dir) in layout::personas(&layout.embeddings()) {
        let mut batch: Vec<PointUpsert> = Vec::with_capacity(options.batch_size);
        for path in layout::article_files(&persona_dir) {
            report.scanned += 1;
            let article: EmbeddedArticle = match layout::read_unit(&path) {
                Ok(article) => article,
                Err(err) => {
                    tracing::warn!(persona, error = %err, "Skipping unreadable embedded unit");
                    report.skipped += 1;
                    continue;
                }
            };

            if article.embedding.len() != options.dimension {
                tracing::warn!(
                    persona,
                    path = %path.display(),
                    expected = options.dimension,
                    actual = article.embedding.len(),
                    "Embedded unit has wrong vector dimension; excluded"
                );
                report.skipped += 1;
                continue;
            }

            let fallback = if article.article.title.trim().is_empty() {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            } else {
                article.article.title.clone()
            };
            let id = point_id(&article.article.link, &fallback);

            let payload = match build_payload(&article) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(persona, path = %path.display(), error = %err, "Could not build point payload; excluded");
                    report.skipped += 1;
                    continue;
                }
            };

            batch.push(PointUpsert {
                id: id.to_string(),
                vector: article.embedding,
                payload,
            });
            if batch.len() >= options.batch_size {
                flush(qdrant, &options.collection, &mut batch, &persona, &mut report).await;
            }
        }
        flush(qdrant, &options.collection, &mut batch, &persona, &mut report).await;
    }

    tracing::info!(
        scanned = report.scanned,
        upserted = report.upserted,
        skipped = report.skipped,
        failed_batches = report.failed_batches,
        "Index stage finished"
    );
    Ok(report)
}

/// Flush the accumulated batch; a failure drops the batch but not the run.
async fn flush(
    qdrant: &QdrantService,
    collection: &str,
    batch: &mut Vec<PointUpsert>,
    persona: &str,
    report: &mut IndexReport,
) {
    if batch.is_empty() {
        return;
    }
    let points = std::mem::take(batch);
    let count = points.len();
    match qdrant.upsert_points(collection, points).await {
        Ok(upserted) => report.upserted += upserted,
        Err(err) => {
            tracing::error!(
                persona,
                count,
                error = %err,
                "Batch upsert failed; points dropped, rerun to retry"
            );
            report.failed_batches += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn service(server: &MockServer) -> QdrantService {
        QdrantService::with_base_url(&server.base_url(), None).expect("client")
    }

    fn layout_with_embeddings(
        dir: &std::path::Path,
        persona: &str,
        count: usize,
        dimension: usize,
    ) -> DataLayout {
        let layout = DataLayout::new(dir);
        let persona_dir = layout.embeddings().join(persona);
        layout::ensure_dir(&persona_dir).expect("dir");
        for i in 0..count {
            let record = json!({
                "title": format!("{persona} article {i}"),
                "link": format!("https://example.com/{persona}/{i}"),
                "source_persona": persona,
                "text_for_embedding": "text",
                "embedding": vec![0.5_f32; dimension],
                "embedding_input_sha256": "abc",
            });
            std::fs::write(
                persona_dir.join(format!("article_{i}.json")),
                serde_json::to_vec(&record).expect("json"),
            )
            .expect("write");
        }
        layout
    }

    fn mock_bootstrap(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/collections/news_vectors");
            then.status(200).json_body(json!({"result": {}}));
        });
        server.mock(|when, then| {
            when.method(PUT)
                .path("/collections/news_vectors/index");
            then.status(200).json_body(json!({"result": {}}));
        });
    }

    fn options() -> IndexOptions {
        IndexOptions {
            collection: "news_vectors".into(),
            dimension: 4,
            batch_size: UPSERT_BATCH_SIZE,
        }
    }

    #[tokio::test]
    async fn batches_flush_at_the_batch_size_with_remainder() {
        let server = MockServer::start_async().await;
        mock_bootstrap(&server);
        let upsert = server.mock(|when, then| {
            when.method(PUT).path("/collections/news_vectors/points");
            then.status(200).json_body(json!({"result": {}}));
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_with_embeddings(dir.path(), "alpha", 250, 4);

        let report = run(&service(&server), &layout, &options())
            .await
            .expect("report");
        assert_eq!(report.upserted, 250);
        assert_eq!(upsert.hits(), 3, "100 + 100 + 50 means three requests");
    }

    #[tokio::test]
    async fn failed_batch_is_dropped_but_other_personas_land() {
        let server = MockServer::start_async().await;
        mock_bootstrap(&server);
        // Persona batches are disjoint by link prefix, so the matchers are
        // unambiguous.
        let failing = server.mock(|when, then| {
            when.method(PUT)
                .path("/collections/news_vectors/points")
                .body_contains("example.com/alpha");
            then.status(500).body("internal error");
        });
        let succeeding = server.mock(|when, then| {
            when.method(PUT)
                .path("/collections/news_vectors/points")
                .body_contains("example.com/beta");
            then.status(200).json_body(json!({"result": {}}));
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_with_embeddings(dir.path(), "alpha", 3, 4);
        let beta_dir = layout.embeddings().join("beta");
        layout::ensure_dir(&beta_dir).expect("dir");
        std::fs::write(
            beta_dir.join("only.json"),
            serde_json::to_vec(&json!({
                "title": "beta article",
                "link": "https://example.com/beta/0",
                "source_persona": "beta",
                "text_for_embedding": "text",
                "embedding": vec![0.5_f32; 4],
                "embedding_input_sha256": "abc",
            }))
            .expect("json"),
        )
        .expect("write");

        let report = run(&service(&server), &layout, &options())
            .await
            .expect("report");
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.upserted, 1);
        assert_eq!(failing.hits(), 1);
        assert_eq!(succeeding.hits(), 1);
    }

    #[tokio::test]
    async fn wrong_dimension_units_are_excluded() {
        let server = MockServer::start_async().await;
        mock_bootstrap(&server);
        let upsert = server.mock(|when, then| {
            when.method(PUT).path("/collections/news_vectors/points");
            then.status(200).json_body(json!({"result": {}}));
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_with_embeddings(dir.path(), "alpha", 2, 3);

        let report = run(&service(&server), &layout, &options())
            .await
            .expect("report");
        assert_eq!(report.skipped, 2);
        assert_eq!(report.upserted, 0);
        assert_eq!(upsert.hits(), 0);
    }

    #[tokio::test]
    async fn bootstrap_failure_aborts_the_run() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/collections/news_vectors");
            then.status(500).body("boom");
        });

        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_with_embeddings(dir.path(), "alpha", 1, 4);

        let error = run(&service(&server), &layout, &options())
            .await
            .unwrap_err();
        assert!(matches!(error, StageError::Bootstrap(_)));
    }
}
