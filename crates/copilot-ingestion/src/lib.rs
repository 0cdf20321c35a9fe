//! Document indexing pipeline for the retrieval-augmented knowledge system.
//!
//! Ingests an uploaded file (PDF, Word, plain text, or Markdown) and
//! transforms it into a hierarchy of enriched, searchable chunks suitable
//! for downstream vector indexing and retrieval:
//!
//! `Load → Parse → Structure → Chunk → Enrich → Persist`
//!
//! The [`orchestrator`] module sequences the five stages per job, enforces
//! per-stage timeouts, retries transient failures, and persists results
//! idempotently per `fileId`.

pub mod chunk;
pub mod config;
pub mod enrich;
pub mod error;
pub mod load;
pub mod orchestrator;
pub mod parse;
pub mod structure;
pub mod types;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result, Stage};
pub use orchestrator::{Job, Orchestrator, PipelineOutput, PipelineRepository, PipelineStats, VectorIndexSignal};
