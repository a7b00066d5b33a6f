//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Chunk;

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorSearchResult {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine distance to the query (0.0 is identical, lower is nearer)
    pub distance: f32,
}

/// Trait for a persistent collection of (vector, chunk) entries
///
/// Implementations:
/// - `ChunkCollection`: LanceDB table with cosine nearest-neighbour search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert entries atomically, returning how many were stored
    async fn insert(&self, entries: Vec<(Vec<f32>, Chunk)>) -> Result<usize>;

    /// Return the `top_k` nearest entries, nearest first
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>>;

    /// Get total number of entries stored
    async fn count(&self) -> Result<usize>;

    /// Delete the whole collection
    async fn drop_collection(&self) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
