#![deny(missing_docs)]

//! Core library for the newsvec ingestion pipeline.
//!
//! Articles move through four persona-partitioned stages (scrape, enrich,
//! embed, index), each reading one directory tree and writing the next, with
//! the final stage upserting into a Qdrant collection keyed by stable point
//! identity.

/// Typed article records exchanged between pipeline stages.
pub mod article;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and HTTP-backed providers.
pub mod embedding;
/// LLM enrichment collaborators and prompt templates.
pub mod enrichment;
/// TSV export of embedded articles for vector visualization tools.
pub mod export;
/// Feed scraping into raw persona files.
pub mod feeds;
/// Structured logging and tracing setup.
pub mod logging;
/// Stage drivers and the persona-partitioned directory convention.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
