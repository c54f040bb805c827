//! Stage reports and the run-fatal error taxonomy.
//!
//! Unit-local and partition-local failures never surface as errors; the
//! stage drivers log them with persona and path context and count them in
//! the report, so a run always finishes with aggregate numbers. Only
//! conditions that make every remaining unit pointless abort the run.

use crate::qdrant::QdrantError;
use std::path::PathBuf;
use thiserror::Error;

/// Run-fatal errors emitted by the stage drivers.
#[derive(Debug, Error)]
pub enum StageError {
    /// Embedding provider rejected credentials; no unit can make progress.
    #[error("Embedding provider authentication failed: {0}")]
    Auth(String),
    /// Vector store interaction failed while establishing the collection.
    #[error("Qdrant bootstrap failed: {0}")]
    Bootstrap(#[from] QdrantError),
    /// The sources configuration file could not be read or decoded.
    #[error("Could not load feed sources: {0}")]
    Sources(String),
    /// The stage output root could not be created.
    #[error("Could not create stage output root {path}: {source}")]
    OutputRoot {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Aggregate counters reported by the enrich and embed stage drivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Units read from the input partition.
    pub scanned: usize,
    /// Units written to the output partition.
    pub written: usize,
    /// Units skipped because a matching output already existed.
    pub reused: usize,
    /// Units skipped by design (for example, empty embeddable text).
    pub skipped: usize,
    /// Units that failed and were left pending for a re-run.
    pub failed: usize,
}

/// Aggregate counters reported by the index stage driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Embedded units scanned across all personas.
    pub scanned: usize,
    /// Points successfully upserted into the collection.
    pub upserted: usize,
    /// Units excluded before upsert (unreadable, missing or wrong-size embedding).
    pub skipped: usize,
    /// Batches rejected by the vector store and dropped.
    pub failed_batches: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_default_to_zero() {
        assert_eq!(StageReport::default().scanned, 0);
        assert_eq!(IndexReport::default().failed_batches, 0);
    }
}
