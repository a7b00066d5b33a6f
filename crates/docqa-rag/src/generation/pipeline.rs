//! Retrieval-augmented answer synthesis as an explicit chain of stages
//!
//! `retrieve → format_context → fill_template → synthesize → parse_text`

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::retrieval::{ScoredChunk, VectorIndex};

use super::prompt::PromptTemplate;

/// Separator placed between retrieved passages in the context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// An answer and the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct SynthesizedAnswer {
    /// Cleaned answer text
    pub answer: String,
    /// Retrieved chunks, nearest first
    pub chunks: Vec<ScoredChunk>,
}

impl SynthesizedAnswer {
    /// File name of each retrieved chunk, in retrieval order
    pub fn sources(&self) -> Vec<String> {
        self.chunks
            .iter()
            .map(|c| c.chunk.metadata.source_name())
            .collect()
    }
}

/// Question-answering pipeline over a vector index
pub struct SynthesisPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    top_k: usize,
}

impl SynthesisPipeline {
    /// Create a new pipeline
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        template: PromptTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            llm,
            template,
            top_k,
        }
    }

    /// Run every stage for one question
    pub async fn run(&self, index: &VectorIndex, question: &str) -> Result<SynthesizedAnswer> {
        let chunks = self.retrieve(index, question).await?;
        let context = Self::format_context(&chunks);
        let prompt = self.fill_template(&context, question);
        let raw = self.synthesize(&prompt).await?;

        Ok(SynthesizedAnswer {
            answer: Self::parse_text(&raw),
            chunks,
        })
    }

    /// Fetch the `top_k` chunks nearest to the question
    pub async fn retrieve(&self, index: &VectorIndex, question: &str) -> Result<Vec<ScoredChunk>> {
        let chunks = index.search(question, self.embedder.as_ref(), self.top_k).await?;
        tracing::debug!("Retrieved {} chunks for question", chunks.len());
        Ok(chunks)
    }

    /// Join chunk contents in retrieval order
    pub fn format_context(chunks: &[ScoredChunk]) -> String {
        chunks
            .iter()
            .map(|c| c.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Render the prompt
    pub fn fill_template(&self, context: &str, question: &str) -> String {
        self.template.fill(context, question)
    }

    /// Send the prompt to the synthesizer
    pub async fn synthesize(&self, prompt: &str) -> Result<String> {
        self.llm.generate(prompt).await
    }

    /// Clean up raw synthesizer output
    pub fn parse_text(raw: &str) -> String {
        raw.trim().to_string()
    }
}
