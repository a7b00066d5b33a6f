//! Vector index adapter: embedding plus storage behind one handle

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, EmbeddingTask, VectorSearchResult, VectorStoreProvider};
use crate::types::Chunk;

use super::collection::ChunkCollection;

/// Message returned when the collection is dropped
pub const CLEARED_MESSAGE: &str = "Vector index cleared successfully.";

/// A retrieved chunk and its distance to the query
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine distance (lower is nearer)
    pub distance: f32,
}

impl From<VectorSearchResult> for ScoredChunk {
    fn from(result: VectorSearchResult) -> Self {
        Self {
            chunk: result.chunk,
            distance: result.distance,
        }
    }
}

/// Returned by [`VectorIndex::clear`] when the collection could not be dropped
///
/// The handle comes back untouched so the caller can keep serving from it.
#[derive(Debug)]
pub struct ClearFailure {
    /// The index that failed to clear
    pub index: VectorIndex,
    /// Why it failed
    pub error: Error,
}

/// Handle to a persistent vector collection
pub struct VectorIndex {
    store: Arc<dyn VectorStoreProvider>,
    location: Option<PathBuf>,
}

impl fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("store", &self.store.name())
            .field("location", &self.location)
            .finish()
    }
}

impl VectorIndex {
    /// Wrap an arbitrary store
    pub fn new(store: Arc<dyn VectorStoreProvider>) -> Self {
        Self {
            store,
            location: None,
        }
    }

    /// Open the collection under `persist_dir`, creating the directory if needed
    pub async fn create_or_load(persist_dir: &Path) -> Result<Self> {
        let collection = ChunkCollection::open(persist_dir).await?;

        Ok(Self {
            store: Arc::new(collection),
            location: Some(persist_dir.to_path_buf()),
        })
    }

    /// Open a previously persisted, non-empty collection
    ///
    /// Returns `None` if nothing was persisted or the collection is empty.
    pub async fn try_load(persist_dir: &Path) -> Result<Option<Self>> {
        let Some(collection) = ChunkCollection::open_existing(persist_dir).await? else {
            return Ok(None);
        };

        let entries = collection.len().await?;
        if entries == 0 {
            return Ok(None);
        }

        tracing::info!("Found {} indexed chunks in {}", entries, persist_dir.display());
        Ok(Some(Self {
            store: Arc::new(collection),
            location: Some(persist_dir.to_path_buf()),
        }))
    }

    /// Embed chunks as documents and store them
    pub async fn add(&self, chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed_batch(&texts, EmbeddingTask::Document).await?;
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "{} returned {} embeddings for {} chunks",
                embedder.name(),
                vectors.len(),
                chunks.len()
            )));
        }

        self.store.insert(vectors.into_iter().zip(chunks).collect()).await
    }

    /// Embed `query` as a question and return the `k` nearest chunks
    pub async fn search(
        &self,
        query: &str,
        embedder: &dyn EmbeddingProvider,
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let vector = embedder.embed(query, EmbeddingTask::Query).await?;
        let results = self.store.search(&vector, k).await?;
        Ok(results.into_iter().map(ScoredChunk::from).collect())
    }

    /// Number of stored entries
    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }

    /// Drop the collection, consuming the handle
    pub async fn clear(self) -> std::result::Result<String, ClearFailure> {
        match self.store.drop_collection().await {
            Ok(()) => Ok(CLEARED_MESSAGE.to_string()),
            Err(e) => Err(ClearFailure {
                index: self,
                error: Error::IndexClear(e.to_string()),
            }),
        }
    }
}
