//! Answer synthesis: prompt template and the retrieval pipeline

pub mod pipeline;
pub mod prompt;

pub use pipeline::{SynthesisPipeline, SynthesizedAnswer};
pub use prompt::PromptTemplate;
