//! Long-term conversational memory for AI agents.
//!
//! mnemo sits between a chat frontend and a small "memory" language model.
//! It ingests conversation transcripts, asynchronously distills them into
//! discrete, attributable facts via the model, indexes those facts for
//! full-text retrieval, and on demand synthesizes the most relevant facts
//! back into a natural-language answer.
//!
//! # Architecture
//!
//! - **Storage**: SQLite in WAL mode with an FTS5 index over
//!   (user, topic, fact), kept in sync transactionally with every write
//! - **Ingestion**: per-session debounce windows → overlapping transcript
//!   chunks → model extraction → fact writes, bounded by a global
//!   concurrency limit on extraction calls
//! - **Recall**: FTS5 keyword search (recency fallback) → top-K selection →
//!   model synthesis, degrading to raw facts when the model is unreachable
//! - **Transport**: a thin HTTP JSON surface over the pipelines
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite initialization, schema, and the shared async handle
//! - [`store`] — Fact/summary persistence, full-text search, and statistics
//! - [`model`] — HTTP client for the external text-generation endpoint
//! - [`ingest`] — Debounce, chunking, and fact-extraction pipeline
//! - [`recall`] — Search, ranking, and synthesis pipeline
//! - [`server`] — HTTP routes wiring the pipelines together

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod model;
pub mod recall;
pub mod server;
pub mod store;
