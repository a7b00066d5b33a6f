//! Response types for ingestion, questions and index maintenance

use serde::{Deserialize, Serialize};

/// Message returned when a question arrives before any document was loaded
pub const NOT_READY_MESSAGE: &str = "No documents loaded. Please load documents first.";

/// Result of asking a question
#[derive(Debug, Clone, PartialEq)]
pub enum AskOutcome {
    /// No index is loaded; nothing was retrieved or generated
    NotReady,
    /// An answer was synthesized from retrieved chunks
    Answered {
        /// Generated answer text
        answer: String,
        /// Source name of each retrieved chunk, in retrieval order
        sources: Vec<String>,
    },
}

impl AskOutcome {
    /// Status code carried in the response body (mirrors HTTP semantics)
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotReady => 400,
            Self::Answered { .. } => 200,
        }
    }

    /// Check whether the outcome carries an answer
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }
}

/// Body of the `POST /ask` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    /// 200 when answered, 400 when no index is loaded
    pub status_code: u16,
    /// Answer text, or the not-ready message
    pub response: String,
    /// Source of each retrieved chunk, in retrieval order
    pub sources: Vec<String>,
}

impl From<AskOutcome> for AskResponse {
    fn from(outcome: AskOutcome) -> Self {
        let status_code = outcome.status_code();
        match outcome {
            AskOutcome::NotReady => Self {
                status_code,
                response: NOT_READY_MESSAGE.to_string(),
                sources: Vec::new(),
            },
            AskOutcome::Answered { answer, sources } => Self {
                status_code,
                response: answer,
                sources,
            },
        }
    }
}

/// Summary of a single `load` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Documents produced by the loader (pages for PDFs)
    pub documents: usize,
    /// Chunks embedded and added to the index
    pub chunks: usize,
    /// Total entries in the index after the load
    pub total_entries: usize,
}

/// Body of the `POST /upload` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always 200 on success
    pub status_code: u16,
    /// Human readable summary
    pub message: String,
}

impl UploadResponse {
    /// Success response for an uploaded file
    pub fn processed(filename: &str) -> Self {
        Self {
            status_code: 200,
            message: format!("File '{}' uploaded and processed successfully!", filename),
        }
    }
}

/// Body of the `GET /clearDB` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Outcome of the clear, successful or not
    pub message: String,
}
