//! Qdrant vector store integration.

pub mod client;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use payload::{build_payload, normalize_published, point_id};
pub use types::{PointUpsert, QdrantError};
