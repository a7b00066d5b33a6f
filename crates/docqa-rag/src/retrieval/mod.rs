//! Persistent vector index and similarity retrieval

pub mod collection;
mod index;

pub use collection::ChunkCollection;
pub use index::{ClearFailure, ScoredChunk, VectorIndex, CLEARED_MESSAGE};
