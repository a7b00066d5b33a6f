//! Core types for the document Q&A system

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, FileType, SourceMetadata};
pub use query::AskRequest;
pub use response::{AskOutcome, AskResponse, ClearResponse, IngestSummary, UploadResponse};
