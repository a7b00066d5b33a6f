//! LanceDB-backed chunk collection with cosine nearest-neighbour search

use arrow_array::types::Float32Type;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::index::{vector::IvfPqIndexBuilder, Index};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::vector_store::{VectorSearchResult, VectorStoreProvider};
use crate::types::{Chunk, SourceMetadata};

/// Table holding the entries inside the persist directory
pub const TABLE_NAME: &str = "chunks";

/// Row count from which an IVF-PQ index is trained
const ANN_INDEX_MIN_ROWS: usize = 4096;

/// Extra candidates fetched so equal distances can be ordered by insertion
const TIE_CANDIDATES: usize = 16;

/// A persistent set of (vector, chunk) entries
#[derive(Clone)]
pub struct ChunkCollection {
    db: Connection,
    dir: PathBuf,
}

impl ChunkCollection {
    /// Connect to the collection under `dir`, creating the directory if needed
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        Self::connect(dir).await
    }

    /// Connect only if a table was persisted under `dir`
    pub async fn open_existing(dir: &Path) -> Result<Option<Self>> {
        if !table_path(dir).exists() {
            return Ok(None);
        }
        let collection = Self::connect(dir).await?;
        // A table directory lancedb does not recognise is unreadable, not absent
        if collection.table().await?.is_none() {
            return Err(Error::VectorDb(format!(
                "{} is not a readable table",
                table_path(dir).display()
            )));
        }
        Ok(Some(collection))
    }

    async fn connect(dir: &Path) -> Result<Self> {
        let db = connect(dir.to_string_lossy().as_ref())
            .execute()
            .await
            .map_err(|e| Error::VectorDb(format!("Failed to open {}: {}", dir.display(), e)))?;
        Ok(Self {
            db,
            dir: dir.to_path_buf(),
        })
    }

    async fn table(&self) -> Result<Option<Table>> {
        let names = self.db.table_names().execute().await?;
        if !names.iter().any(|n| n == TABLE_NAME) {
            return Ok(None);
        }
        Ok(Some(self.db.open_table(TABLE_NAME).execute().await?))
    }

    /// Insert all entries as one table version
    pub async fn insert_all(&self, entries: &[(Vec<f32>, Chunk)]) -> Result<usize> {
        let Some((first, _)) = entries.first() else {
            return Ok(0);
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(Error::VectorDb("Cannot store empty embeddings".to_string()));
        }
        if let Some((vector, _)) = entries.iter().find(|(v, _)| v.len() != dimension) {
            return Err(Error::VectorDb(format!(
                "Embedding dimension mismatch in batch: {} vs {}",
                vector.len(),
                dimension
            )));
        }

        let table = self.table().await?;
        let first_seq = match &table {
            Some(table) => {
                let stored = stored_dimension(table).await?;
                if stored != dimension {
                    return Err(Error::VectorDb(format!(
                        "Embedding dimension {} does not match collection dimension {}",
                        dimension, stored
                    )));
                }
                table.count_rows(None).await? as u64
            }
            None => 0,
        };

        let schema = entry_schema(dimension);
        let batch = to_record_batch(schema.clone(), entries, first_seq, dimension)?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));

        let table = match table {
            Some(table) => {
                table.add(reader).execute().await?;
                table
            }
            None => self.db.create_table(TABLE_NAME, reader).execute().await?,
        };

        self.ensure_ann_index(&table).await;
        Ok(entries.len())
    }

    /// Train an IVF-PQ index once the table is large enough
    ///
    /// Failures are logged; search falls back to a flat scan.
    async fn ensure_ann_index(&self, table: &Table) {
        let rows = match table.count_rows(None).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Failed to count rows in {}: {}", TABLE_NAME, e);
                return;
            }
        };
        if rows < ANN_INDEX_MIN_ROWS {
            return;
        }
        match table.list_indices().await {
            Ok(indices) if !indices.is_empty() => return,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to list indices on {}: {}", TABLE_NAME, e);
                return;
            }
        }

        tracing::info!("Training IVF-PQ index over {} entries", rows);
        let index = Index::IvfPq(IvfPqIndexBuilder::default().distance_type(DistanceType::Cosine));
        if let Err(e) = table.create_index(&["vector"], index).execute().await {
            tracing::warn!("Failed to build vector index, searches stay exhaustive: {}", e);
        }
    }

    /// Return the `top_k` entries nearest to `query`, ties in insertion order
    pub async fn nearest(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        let Some(table) = self.table().await? else {
            return Ok(Vec::new());
        };
        let stored = stored_dimension(&table).await?;
        if stored != query.len() {
            return Err(Error::VectorDb(format!(
                "Query dimension {} does not match collection dimension {}",
                query.len(),
                stored
            )));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut stream = table
            .vector_search(query.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(top_k + TIE_CANDIDATES)
            .execute()
            .await?;

        let mut scored = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            scored.extend(read_batch(&batch)?);
        }

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(distance, _, chunk)| VectorSearchResult { chunk, distance })
            .collect())
    }

    /// Number of stored entries
    pub async fn len(&self) -> Result<usize> {
        match self.table().await? {
            Some(table) => Ok(table.count_rows(None).await?),
            None => Ok(0),
        }
    }

    /// Check if the collection is empty
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Delete the table and its files
    pub async fn drop_all(&self) -> Result<()> {
        let path = table_path(&self.dir);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::VectorDb(format!(
                    "Failed to delete {}: {}",
                    path.display(),
                    e
                )))
            }
        }
        tracing::info!("Dropped collection at {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl VectorStoreProvider for ChunkCollection {
    async fn insert(&self, entries: Vec<(Vec<f32>, Chunk)>) -> Result<usize> {
        self.insert_all(&entries).await
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorSearchResult>> {
        self.nearest(query, top_k).await
    }

    async fn count(&self) -> Result<usize> {
        self.len().await
    }

    async fn drop_collection(&self) -> Result<()> {
        self.drop_all().await
    }

    fn name(&self) -> &str {
        "lancedb"
    }
}

fn table_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.lance", TABLE_NAME))
}

fn entry_schema(dimension: usize) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, true),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("char_start", DataType::UInt64, false),
        Field::new("seq", DataType::UInt64, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimension as i32,
            ),
            true,
        ),
    ]))
}

async fn stored_dimension(table: &Table) -> Result<usize> {
    let schema = table.schema().await?;
    match schema.field_with_name("vector")?.data_type() {
        DataType::FixedSizeList(_, size) => Ok(*size as usize),
        other => Err(Error::VectorDb(format!("Unexpected vector column type {}", other))),
    }
}

fn to_record_batch(
    schema: SchemaRef,
    entries: &[(Vec<f32>, Chunk)],
    first_seq: u64,
    dimension: usize,
) -> Result<RecordBatch> {
    let ids: Vec<String> = entries.iter().map(|(_, c)| c.id.to_string()).collect();
    let contents: Vec<&str> = entries.iter().map(|(_, c)| c.content.as_str()).collect();
    let sources: Vec<&str> = entries.iter().map(|(_, c)| c.metadata.source.as_str()).collect();
    let pages: Vec<Option<u32>> = entries.iter().map(|(_, c)| c.metadata.page).collect();
    let chunk_indices: Vec<u32> = entries.iter().map(|(_, c)| c.chunk_index).collect();
    let char_starts: Vec<u64> = entries.iter().map(|(_, c)| c.char_start as u64).collect();
    let seqs: Vec<u64> = (first_seq..first_seq + entries.len() as u64).collect();
    let vectors = entries
        .iter()
        .map(|(v, _)| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));

    Ok(RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(sources)),
            Arc::new(UInt32Array::from(pages)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(UInt64Array::from(char_starts)),
            Arc::new(UInt64Array::from(seqs)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
                vectors,
                dimension as i32,
            )),
        ],
    )?)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| Error::VectorDb(format!("Search result is missing column '{}'", name)))
}

/// Decode a search batch into (distance, seq, chunk) rows
fn read_batch(batch: &RecordBatch) -> Result<Vec<(f32, u64, Chunk)>> {
    let ids = column::<StringArray>(batch, "id")?;
    let contents = column::<StringArray>(batch, "content")?;
    let sources = column::<StringArray>(batch, "source")?;
    let pages = column::<UInt32Array>(batch, "page")?;
    let chunk_indices = column::<UInt32Array>(batch, "chunk_index")?;
    let char_starts = column::<UInt64Array>(batch, "char_start")?;
    let seqs = column::<UInt64Array>(batch, "seq")?;
    let distances = column::<Float32Array>(batch, "_distance")?;

    (0..batch.num_rows())
        .map(|i| {
            let id = ids.value(i);
            let chunk = Chunk {
                id: Uuid::parse_str(id)
                    .map_err(|e| Error::VectorDb(format!("Corrupt entry id '{}': {}", id, e)))?,
                content: contents.value(i).to_string(),
                metadata: SourceMetadata {
                    source: sources.value(i).to_string(),
                    page: (!pages.is_null(i)).then(|| pages.value(i)),
                },
                chunk_index: chunk_indices.value(i),
                char_start: char_starts.value(i) as usize,
            };
            Ok((distances.value(i), seqs.value(i), chunk))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(vector: Vec<f32>, text: &str) -> (Vec<f32>, Chunk) {
        (
            vector,
            Chunk::new(text.to_string(), SourceMetadata::file("notes.txt"), 0, 0),
        )
    }

    async fn collection() -> (tempfile::TempDir, ChunkCollection) {
        let dir = tempfile::tempdir().unwrap();
        let collection = ChunkCollection::open(dir.path()).await.unwrap();
        (dir, collection)
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance() {
        let (_dir, collection) = collection().await;
        collection
            .insert_all(&[
                entry(vec![0.0, 1.0], "far"),
                entry(vec![1.0, 0.1], "near"),
                entry(vec![1.0, 1.0], "middle"),
            ])
            .await
            .unwrap();

        let results = collection.nearest(&[1.0, 0.0], 2).await.unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(texts, vec!["near", "middle"]);
        assert!(results[0].distance <= results[1].distance);
        assert!(results[0].distance < 0.01);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let (_dir, collection) = collection().await;
        collection
            .insert_all(&[entry(vec![1.0, 0.0], "first"), entry(vec![2.0, 0.0], "second")])
            .await
            .unwrap();
        collection.insert_all(&[entry(vec![3.0, 0.0], "third")]).await.unwrap();

        let results = collection.nearest(&[1.0, 0.0], 3).await.unwrap();
        let texts: Vec<_> = results.iter().map(|r| r.chunk.content.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_round_trips_chunk_fields() {
        let (_dir, collection) = collection().await;
        let chunk = Chunk::new("page text".to_string(), SourceMetadata::page("r.pdf", 4), 2, 117);
        let plain = Chunk::new("plain text".to_string(), SourceMetadata::file("n.txt"), 0, 0);
        collection
            .insert_all(&[(vec![0.3, 0.4], chunk.clone()), (vec![-0.4, 0.3], plain.clone())])
            .await
            .unwrap();

        let results = collection.nearest(&[0.3, 0.4], 2).await.unwrap();
        assert_eq!(results[0].chunk, chunk);
        assert_eq!(results[1].chunk, plain);
        assert_eq!(results[1].chunk.metadata.page, None);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let (_dir, collection) = collection().await;
        collection.insert_all(&[entry(vec![1.0, 0.0], "a")]).await.unwrap();

        assert!(matches!(
            collection.nearest(&[1.0, 0.0, 0.0], 1).await,
            Err(Error::VectorDb(_))
        ));
        assert!(matches!(
            collection.insert_all(&[entry(vec![1.0], "b")]).await,
            Err(Error::VectorDb(_))
        ));
        assert!(matches!(
            collection
                .insert_all(&[entry(vec![1.0, 0.0], "c"), entry(vec![1.0], "d")])
                .await,
            Err(Error::VectorDb(_))
        ));
        assert_eq!(collection.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_search() {
        let (_dir, collection) = collection().await;
        assert!(collection.nearest(&[1.0], 3).await.unwrap().is_empty());
        assert!(collection.is_empty().await.unwrap());
        assert_eq!(collection.insert_all(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ChunkCollection::open_existing(dir.path()).await.unwrap().is_none());

        {
            let collection = ChunkCollection::open(dir.path()).await.unwrap();
            collection.insert_all(&[entry(vec![1.0, 0.0], "kept")]).await.unwrap();
        }

        let reopened = ChunkCollection::open_existing(dir.path()).await.unwrap().unwrap();
        assert_eq!(reopened.len().await.unwrap(), 1);
        let hits = reopened.nearest(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(hits[0].chunk.content, "kept");
    }

    #[tokio::test]
    async fn test_drop_collection() {
        let (dir, collection) = collection().await;
        collection.insert(vec![entry(vec![1.0], "gone")]).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 1);

        collection.drop_collection().await.unwrap();
        assert!(!table_path(dir.path()).exists());
        assert!(ChunkCollection::open_existing(dir.path()).await.unwrap().is_none());

        // Dropping twice is harmless
        collection.drop_collection().await.unwrap();
    }
}
