//! TSV export of embedded articles for the TensorFlow Embedding Projector.
//!
//! Writes two aligned files under the projector output root: `vectors.tsv`
//! (one tab-separated vector per line) and `metadata.tsv` (a header row plus
//! one metadata row per vector, same order). Tab and newline characters in
//! metadata values would desynchronize the two files, so they are replaced
//! with spaces.

use crate::article::EmbeddedArticle;
use crate::pipeline::layout::{self, DataLayout};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Metadata columns, in the order the projector displays them.
const METADATA_COLUMNS: [&str; 7] = [
    "title",
    "tags",
    "published",
    "persona",
    "link",
    "category",
    "enriched_summary",
];

/// Errors that abort the export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The projector output files could not be created or written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// File involved in the failure.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
}

/// Counters reported by the export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Rows written to both TSV files.
    pub exported: usize,
    /// Units excluded (unreadable or missing an embedding vector).
    pub skipped: usize,
}

/// Export every embedded article into the projector TSV pair.
pub fn run(layout: &DataLayout) -> Result<ExportReport, ExportError> {
    let output_root = layout.projector();
    layout::ensure_dir(&output_root).map_err(|source| ExportError::Io {
        path: output_root.clone(),
        source,
    })?;

    let vectors_path = output_root.join("vectors.tsv");
    let metadata_path = output_root.join("metadata.tsv");
    let mut vectors = writer(&vectors_path)?;
    let mut metadata = writer(&metadata_path)?;

    write_line(&mut metadata, &metadata_path, &METADATA_COLUMNS.join("\t"))?;

    let mut report = ExportReport::default();
    for (persona, persona_dir) in layout::personas(&layout.embeddings()) {
        for path in layout::article_files(&persona_dir) {
            let article: EmbeddedArticle = match layout::read_unit(&path) {
                Ok(article) => article,
                Err(err) => {
                    tracing::warn!(persona, error = %err, "Skipping unreadable embedded unit");
                    report.skipped += 1;
                    continue;
                }
            };
            if article.embedding.is_empty() {
                tracing::warn!(persona, path = %path.display(), "Unit has no embedding vector; excluded");
                report.skipped += 1;
                continue;
            }

            let vector_row = article
                .embedding
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\t");
            write_line(&mut vectors, &vectors_path, &vector_row)?;
            write_line(&mut metadata, &metadata_path, &metadata_row(&article, &persona))?;
            report.exported += 1;
        }
    }

    vectors.flush().map_err(|source| ExportError::Io {
        path: vectors_path.clone(),
        source,
    })?;
    metadata.flush().map_err(|source| ExportError::Io {
        path: metadata_path.clone(),
        source,
    })?;

    tracing::info!(
        exported = report.exported,
        skipped = report.skipped,
        vectors = %vectors_path.display(),
        metadata = %metadata_path.display(),
        "Projector export finished"
    );
    Ok(report)
}

fn metadata_row(article: &EmbeddedArticle, persona: &str) -> String {
    let inner = &article.article;
    let columns = [
        sanitize_tsv(&inner.title),
        sanitize_tsv(&inner.tags.join("; ")),
        sanitize_tsv(inner.published.as_deref().unwrap_or("")),
        sanitize_tsv(persona),
        sanitize_tsv(&inner.link),
        sanitize_tsv(&inner.category),
        sanitize_tsv(&inner.enriched_summary),
    ];
    columns.join("\t")
}

fn sanitize_tsv(value: &str) -> String {
    value
        .replace(['\t', '\n', '\r'], " ")
}

fn writer(path: &PathBuf) -> Result<BufWriter<std::fs::File>, ExportError> {
    std::fs::File::create(path)
        .map(BufWriter::new)
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })
}

fn write_line(
    out: &mut BufWriter<std::fs::File>,
    path: &PathBuf,
    line: &str,
) -> Result<(), ExportError> {
    writeln!(out, "{line}").map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })
}
