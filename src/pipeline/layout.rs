//! The persona-partitioned stage directory convention.
//!
//! Every stage reads one directory tree and writes another. The raw stage
//! stores one JSON array per persona (`feeds_raw/{persona}.json`); the
//! enriched and embedded stages store one JSON file per article
//! (`{root}/{persona}/{slug}.json`). A missing stage root or an empty
//! persona is a no-op, and decoding failures are scoped to the single unit
//! that failed.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum length of a slug derived from an article title.
const SLUG_CAP: usize = 100;

/// Errors scoped to reading or writing a single unit file.
#[derive(Debug, Error)]
pub enum UnitError {
    /// Filesystem access to the unit failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Unit path involved in the failure.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Unit contents were not valid JSON for the expected record shape.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// Unit path involved in the failure.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Root of the persona-partitioned data tree with the four stage roots.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Create a layout rooted at the given data directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data root itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw scrape output: one JSON array per persona.
    pub fn feeds_raw(&self) -> PathBuf {
        self.root.join("feeds_raw")
    }

    /// Enrichment output: one file per article under a persona directory.
    pub fn enriched(&self) -> PathBuf {
        self.root.join("enriched")
    }

    /// Embedding output: enriched records plus vectors.
    pub fn embeddings(&self) -> PathBuf {
        self.root.join("embeddings")
    }

    /// Projector TSV export output.
    pub fn projector(&self) -> PathBuf {
        self.root.join("projector")
    }
}

/// Enumerate persona partitions (subdirectories) of a stage root, sorted.
///
/// A missing root is a no-op for the stage, not an error.
pub fn personas(stage_root: &Path) -> Vec<(String, PathBuf)> {
    let entries = match fs::read_dir(stage_root) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(root = %stage_root.display(), error = %err, "Stage root unavailable; nothing to do");
            return Vec::new();
        }
    };

    let mut partitions: Vec<(String, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    partitions.sort();
    partitions
}

/// Enumerate persona feed files (`{persona}.json`) under the raw root, sorted.
pub fn persona_feeds(feeds_root: &Path) -> Vec<(String, PathBuf)> {
    let mut feeds: Vec<(String, PathBuf)> = json_files(feeds_root)
        .into_iter()
        .filter_map(|path| {
            let persona = path.file_stem()?.to_string_lossy().into_owned();
            Some((persona, path))
        })
        .collect();
    feeds.sort();
    feeds
}

/// Enumerate the `.json` unit files inside a persona directory, sorted.
pub fn article_files(persona_dir: &Path) -> Vec<PathBuf> {
    json_files(persona_dir)
}

fn json_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!(dir = %dir.display(), error = %err, "Directory unavailable; nothing to do");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().map(|ext| ext == "json").unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Create a stage directory, tolerating it already existing.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Read and decode one unit file.
pub fn read_unit<T: DeserializeOwned>(path: &Path) -> Result<T, UnitError> {
    let bytes = fs::read(path).map_err(|source| UnitError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| UnitError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize and write one unit file.
pub fn write_unit<T: Serialize>(path: &Path, record: &T) -> Result<(), UnitError> {
    let bytes = serde_json::to_vec_pretty(record).map_err(|source| UnitError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| UnitError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Derive a filesystem slug from an article title.
///
/// Spaces become underscores, path separators become hyphens, and everything
/// that is not alphanumeric, `_`, or `-` is stripped. The result is capped at
/// 100 characters. Returns `None` when nothing survives sanitization.
pub fn slug_from_title(title: &str) -> Option<String> {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        match ch {
            ' ' => slug.push('_'),
            '/' | '\\' => slug.push('-'),
            ':' => slug.push('_'),
            c if c.is_alphanumeric() || c == '_' || c == '-' => slug.push(c),
            _ => {}
        }
        if slug.chars().count() >= SLUG_CAP {
            break;
        }
    }
    let capped: String = slug.chars().take(SLUG_CAP).collect();
    if capped.is_empty() { None } else { Some(capped) }
}

/// Allocates unique output filenames within one persona partition.
///
/// The same title always maps to the same base slug; an empty or symbol-only
/// title falls back to a positional name, and colliding slugs within a run
/// get a numeric suffix instead of silently overwriting a sibling.
#[derive(Debug, Default)]
pub struct SlugAllocator {
    used: HashSet<String>,
}

impl SlugAllocator {
    /// Create an empty allocator for one persona.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a unique slug for the article at `index` with the given title.
    pub fn assign(&mut self, title: &str, index: usize) -> String {
        let base = slug_from_title(title).unwrap_or_else(|| format!("article_{}", index + 1));
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut attempt = 2;
        loop {
            let candidate = format!("{base}-{attempt}");
            if self.used.insert(candidate.clone()) {
                tracing::warn!(
                    title,
                    slug = %candidate,
                    "Sanitized filename collided within persona; disambiguated"
                );
                return candidate;
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_deterministic_and_strips_symbols() {
        let title = "AI/ML: what's next? (2025)";
        let first = slug_from_title(title).expect("slug");
        let second = slug_from_title(title).expect("slug");
        assert_eq!(first, second);
        assert_eq!(first, "AI-ML__whats_next_2025");
    }

    #[test]
    fn symbol_only_title_yields_no_slug() {
        assert_eq!(slug_from_title("???!!!"), None);
        assert_eq!(slug_from_title(""), None);
    }

    #[test]
    fn slug_is_capped_at_one_hundred_chars() {
        let title = "x".repeat(400);
        let slug = slug_from_title(&title).expect("slug");
        assert_eq!(slug.chars().count(), 100);
    }

    #[test]
    fn allocator_falls_back_to_positional_names() {
        let mut alloc = SlugAllocator::new();
        assert_eq!(alloc.assign("???", 0), "article_1");
        assert_eq!(alloc.assign("", 4), "article_5");
    }

    #[test]
    fn allocator_disambiguates_colliding_titles() {
        let mut alloc = SlugAllocator::new();
        assert_eq!(alloc.assign("Same Title", 0), "Same_Title");
        assert_eq!(alloc.assign("Same Title", 1), "Same_Title-2");
        assert_eq!(alloc.assign("Same Title", 2), "Same_Title-3");
    }

    #[test]
    fn missing_stage_root_yields_no_partitions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("does-not-exist");
        assert!(personas(&missing).is_empty());
        assert!(article_files(&missing).is_empty());
    }

    #[test]
    fn personas_enumerates_subdirectories_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("beta")).expect("mkdir");
        fs::create_dir(dir.path().join("alpha")).expect("mkdir");
        fs::write(dir.path().join("stray.json"), b"[]").expect("write");

        let names: Vec<String> = personas(dir.path())
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["alpha".to_string(), "beta".to_string()]);
    }
}
