//! docqa-rag: document question answering over uploaded files
//!
//! Uploaded `.txt`, `.pdf` and `.docx` files are split into overlapping
//! chunks, embedded through Gemini or Ollama, and stored in a persistent
//! LanceDB vector collection. Questions retrieve the nearest chunks and
//! an LLM answers from them, reporting which files the context came from.

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use engine::RagEngine;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, Document, FileType, SourceMetadata},
    query::AskRequest,
    response::{AskOutcome, AskResponse, ClearResponse, IngestSummary, UploadResponse},
};
