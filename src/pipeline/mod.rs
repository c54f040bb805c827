//! Stage drivers and the shared on-disk layout they operate over.
//!
//! Each stage reads the previous stage's persona partitions, processes one
//! unit at a time, and reports aggregate counters. Unit-level failures are
//! logged and counted; only failures that make every unit hopeless (missing
//! output root, rejected credentials, unreachable vector store during
//! bootstrap) abort a stage.

pub mod embed;
pub mod enrich;
pub mod index;
pub mod layout;
pub mod types;

pub use embed::EmbedOptions;
pub use index::{IndexOptions, UPSERT_BATCH_SIZE};
pub use layout::DataLayout;
pub use types::{IndexReport, StageError, StageReport};
