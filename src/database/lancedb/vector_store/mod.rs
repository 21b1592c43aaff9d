
use super::EmbeddingRecord;
use crate::RagError;
use crate::embeddings::{Chunk, ChunkMetadata};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
    table::AddDataMode,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, RagError>;

/// Vector database over one project's index directory
pub struct VectorStore {
    connection: Connection,
    index_dir: PathBuf,
}

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub chunk: Chunk,
    /// L2 distance to the query vector; smaller is closer
    pub distance: f32,
}

fn db_error(context: &str, e: impl std::fmt::Display) -> RagError {
    RagError::Database(format!("{}: {}", context, e))
}

impl VectorStore {
    /// Open (creating if needed) the LanceDB database in `index_dir`
    ///
    /// # Errors
    /// Returns `RagError::Database` if the directory cannot be created or opened
    #[inline]
    pub async fn open<P: AsRef<Path>>(index_dir: P) -> Result<Self> {
        let index_dir = index_dir.as_ref().to_path_buf();
        debug!("Opening LanceDB at path: {:?}", index_dir);

        std::fs::create_dir_all(&index_dir)
            .map_err(|e| db_error("Failed to create vector index directory", e))?;

        let uri = index_dir.to_string_lossy().into_owned();
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| db_error("Failed to connect to LanceDB", e))?;

        Ok(Self {
            connection,
            index_dir,
        })
    }

    #[inline]
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// On-disk location of a collection's table
    #[inline]
    pub fn collection_path(&self, name: &str) -> PathBuf {
        collection_path(&self.index_dir, name)
    }

    /// # Errors
    /// Returns `RagError::Database` if the table list cannot be read
    #[inline]
    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| db_error("Failed to list tables", e))?;
        Ok(table_names.iter().any(|t| t == name))
    }

    /// Replace the whole collection with `records` in one commit
    ///
    /// The record batch is built before the store is touched, so an invalid batch
    /// leaves the previous contents in place. An empty slice drops the collection.
    /// Returns the number of rows stored.
    ///
    /// # Errors
    /// Returns `RagError::Database` if the batch is invalid, the write fails, or
    /// the stored row count does not match
    #[inline]
    pub async fn replace_collection(&self, name: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        let Some(first) = records.first() else {
            debug!("No records for collection '{}', dropping it", name);
            self.drop_collection(name).await?;
            return Ok(0);
        };

        let vector_dim = first.vector.len();
        let record_batch = create_record_batch(records, vector_dim)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let existing_dim = if self.collection_exists(name).await? {
            Some(self.vector_dimension(name).await?)
        } else {
            None
        };

        match existing_dim {
            Some(dim) if dim == vector_dim => {
                debug!("Overwriting collection '{}' with {} rows", name, records.len());
                let table = self.open_table(name).await?;
                table
                    .add(reader)
                    .mode(AddDataMode::Overwrite)
                    .execute()
                    .await
                    .map_err(|e| db_error("Failed to overwrite collection", e))?;
            }
            other => {
                if let Some(dim) = other {
                    info!(
                        "Vector dimension changed from {} to {}, recreating collection '{}'",
                        dim, vector_dim, name
                    );
                    self.drop_collection(name).await?;
                }
                self.connection
                    .create_table(name, reader)
                    .execute()
                    .await
                    .map_err(|e| db_error("Failed to create collection", e))?;
            }
        }

        let stored = self.count(name).await?;
        if stored != records.len() {
            return Err(RagError::Database(format!(
                "Collection '{}' holds {} rows after writing {}",
                name,
                stored,
                records.len()
            )));
        }

        info!("Stored {} embeddings in collection '{}'", stored, name);
        Ok(stored)
    }

    /// Drop a collection; dropping a missing collection is a no-op
    ///
    /// # Errors
    /// Returns `RagError::Database` if the drop fails
    #[inline]
    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        if self.collection_exists(name).await? {
            info!("Dropping collection '{}'", name);
            self.connection
                .drop_table(name)
                .await
                .map_err(|e| db_error("Failed to drop collection", e))?;
        }
        Ok(())
    }

    /// Nearest-neighbour search returning at most `k` hits by ascending distance
    ///
    /// # Errors
    /// Returns `RagError::Database` if the collection cannot be searched
    #[inline]
    pub async fn search(&self, name: &str, query_vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching '{}' for {} nearest chunks", name, k);
        let table = self.open_table(name).await?;

        let mut stream = table
            .vector_search(query_vector)
            .map_err(|e| db_error("Failed to create vector search", e))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| db_error("Failed to execute search", e))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| db_error("Failed to read result stream", e))?
        {
            results.extend(parse_batch(&batch)?);
        }

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);

        debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// # Errors
    /// Returns `RagError::Database` if the collection cannot be opened
    #[inline]
    pub async fn count(&self, name: &str) -> Result<usize> {
        let table = self.open_table(name).await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| db_error("Failed to count rows", e))
    }

    /// Every record id in the collection, sorted by chunk position
    ///
    /// # Errors
    /// Returns `RagError::Database` if the collection cannot be read
    #[inline]
    pub async fn list_ids(&self, name: &str) -> Result<Vec<String>> {
        let total = self.count(name).await?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let table = self.open_table(name).await?;
        let mut stream = table
            .query()
            .limit(total)
            .execute()
            .await
            .map_err(|e| db_error("Failed to query ids", e))?;

        let mut rows: Vec<(u32, String)> = Vec::with_capacity(total);
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| db_error("Failed to read id stream", e))?
        {
            let ids = string_column(&batch, "id")?;
            let indices = u32_column(&batch, "chunk_index")?;
            for row in 0..batch.num_rows() {
                rows.push((indices.value(row), ids.value(row).to_string()));
            }
        }

        rows.sort();
        Ok(rows.into_iter().map(|(_, id)| id).collect())
    }

    async fn open_table(&self, name: &str) -> Result<lancedb::Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| db_error(&format!("Failed to open collection '{}'", name), e))
    }

    /// Length of the vectors stored in a collection
    ///
    /// # Errors
    /// Returns `RagError::Database` if the collection is missing or has no vector column
    #[inline]
    pub async fn vector_dimension(&self, name: &str) -> Result<usize> {
        let table = self.open_table(name).await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| db_error("Failed to get table schema", e))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                RagError::Database("Could not find vector column or determine dimension".to_string())
            })
    }
}

/// On-disk table directory LanceDB uses for `name` inside `index_dir`
#[inline]
pub fn collection_path(index_dir: &Path, name: &str) -> PathBuf {
    index_dir.join(format!("{}.lance", name))
}

fn create_schema(vector_dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_dim,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("pages", DataType::Utf8, false),
        Field::new("section", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("indexed_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(records: &[EmbeddingRecord], vector_dim: usize) -> Result<RecordBatch> {
    if vector_dim == 0 {
        return Err(RagError::Database("Embedding vectors are empty".to_string()));
    }
    if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
        return Err(RagError::Database(format!(
            "Record {} has {} dimensions, expected {}",
            bad.id,
            bad.vector.len(),
            vector_dim
        )));
    }
    let list_size = i32::try_from(vector_dim)
        .map_err(|_| RagError::Database(format!("Vector dimension {} is too large", vector_dim)))?;

    let flat_values: Vec<f32> = records
        .iter()
        .flat_map(|r| r.vector.iter().copied())
        .collect();
    let item_field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        item_field,
        list_size,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| db_error("Failed to create vector array", e))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()))),
        Arc::new(vector_array),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.chunk.text.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.chunk.metadata.source.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.chunk.metadata.pages.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.chunk.metadata.section.as_str()),
        )),
        Arc::new(UInt32Array::from_iter_values(
            records.iter().map(|r| r.chunk_index),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.indexed_at.as_str()),
        )),
    ];

    RecordBatch::try_new(create_schema(list_size), arrays)
        .map_err(|e| db_error("Failed to create record batch", e))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

/// Parse one batch of search results
fn parse_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let ids = string_column(batch, "id")?;
    let texts = string_column(batch, "text")?;
    let sources = string_column(batch, "source")?;
    let pages = string_column(batch, "pages")?;
    let sections = string_column(batch, "section")?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let results = (0..batch.num_rows())
        .map(|row| SearchResult {
            id: ids.value(row).to_string(),
            chunk: Chunk {
                text: texts.value(row).to_string(),
                metadata: ChunkMetadata {
                    source: sources.value(row).to_string(),
                    pages: pages.value(row).to_string(),
                    section: sections.value(row).to_string(),
                },
            },
            distance: distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
        })
        .collect();

    Ok(results)
}
