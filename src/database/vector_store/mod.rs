
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use super::{SegmentMetadata, SegmentRecord};
use crate::config::Config;
use crate::{PdfChatError, Result};

const TABLE_NAME: &str = "segments";

/// Vector database store using LanceDB for similarity search.
///
/// One table holds every ingested document; records carry a `seq` column
/// so storage order survives scans.
pub struct VectorStore {
    connection: Connection,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub metadata: SegmentMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Opens the store under the configured base directory, creating the
    /// segments table on first use.
    #[inline]
    pub async fn open_or_create(config: &Config) -> Result<Self> {
        let db_path = config.store_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PdfChatError::Database(format!("Failed to create store directory: {}", e))
            })?;
        }

        let connection = connect(&db_path).await?;
        let table_names = list_tables(&connection).await?;

        let vector_dimension = if table_names.iter().any(|name| name == TABLE_NAME) {
            let dimension = detect_vector_dimension(&connection).await?;
            debug!(dimension, "Opened existing segments table");
            dimension
        } else {
            let dimension = config.gemini.embedding_dimension as usize;
            create_segments_table(&connection, dimension).await?;
            info!(dimension, "Created segments table");
            dimension
        };

        Ok(Self {
            connection,
            vector_dimension,
        })
    }

    /// Opens the store only if documents have been ingested before.
    #[inline]
    pub async fn open_existing(config: &Config) -> Result<Self> {
        let db_path = config.store_path();
        if !db_path.exists() {
            return Err(no_documents());
        }

        let connection = connect(&db_path).await?;
        let table_names = list_tables(&connection).await?;
        if !table_names.iter().any(|name| name == TABLE_NAME) {
            return Err(no_documents());
        }

        let vector_dimension = detect_vector_dimension(&connection).await?;
        Ok(Self {
            connection,
            vector_dimension,
        })
    }

    /// Vector width this store was created with.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.vector_dimension
    }

    /// Appends records to the store. Existing records are never touched;
    /// ingesting the same document twice adds a second copy.
    #[inline]
    pub async fn add_segments(&mut self, records: Vec<SegmentRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No segments to store");
            return Ok(());
        }

        let received = records[0].vector.len();
        if received != self.vector_dimension {
            return Err(PdfChatError::Database(format!(
                "Embedding dimension mismatch: table stores {}, received {}",
                self.vector_dimension, received
            )));
        }

        debug!(count = records.len(), "Storing segment batch");

        let record_batch = create_record_batch(&records, self.vector_dimension)?;
        let table = self.open_table().await?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to insert segments: {}", e)))?;

        info!(count = records.len(), "Stored segments");
        Ok(())
    }

    /// Nearest-neighbor search over segment embeddings, best match first.
    #[inline]
    pub async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        debug!(limit, "Searching for similar segments");

        let table = self.open_table().await?;
        let results = table
            .vector_search(query_vector)
            .map_err(|e| PdfChatError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to execute search: {}", e)))?;

        let rows = collect_rows(results).await?;
        debug!(count = rows.len(), "Search returned segments");

        Ok(rows
            .into_iter()
            .map(|(metadata, distance)| SearchResult {
                metadata,
                similarity_score: 1.0 - distance,
                distance,
            })
            .collect())
    }

    /// Every stored segment, ordered by insertion.
    #[inline]
    pub async fn all_segments(&self) -> Result<Vec<SegmentMetadata>> {
        let table = self.open_table().await?;
        let results = table
            .query()
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to scan segments: {}", e)))?;

        let mut rows = collect_rows(results).await?;
        rows.sort_by_key(|(metadata, _)| metadata.seq);
        Ok(rows.into_iter().map(|(metadata, _)| metadata).collect())
    }

    /// Number of stored segments.
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to count segments: {}", e)))?;
        Ok(count as u64)
    }

    /// Drops every stored segment, leaving an empty table ready for new
    /// ingests.
    #[inline]
    pub async fn clear(&mut self) -> Result<()> {
        let table_names = list_tables(&self.connection).await?;
        if table_names.iter().any(|name| name == TABLE_NAME) {
            self.connection.drop_table(TABLE_NAME).await.map_err(|e| {
                PdfChatError::Database(format!("Failed to drop segments table: {}", e))
            })?;
        }
        create_segments_table(&self.connection, self.vector_dimension).await?;

        info!("Cleared vector store");
        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| PdfChatError::Database(format!("Failed to open segments table: {}", e)))
    }
}

fn no_documents() -> PdfChatError {
    PdfChatError::NotFound(
        "No documents have been ingested yet. Run `pdf-chat ingest <file>` first".to_string(),
    )
}

async fn connect(db_path: &Path) -> Result<Connection> {
    let uri = format!("file://{}", db_path.display());
    debug!(path = %db_path.display(), "Connecting to LanceDB");
    lancedb::connect(&uri)
        .execute()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to connect to LanceDB: {}", e)))
}

async fn list_tables(connection: &Connection) -> Result<Vec<String>> {
    connection
        .table_names()
        .execute()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to list tables: {}", e)))
}

async fn create_segments_table(connection: &Connection, dimension: usize) -> Result<()> {
    connection
        .create_empty_table(TABLE_NAME, segments_schema(dimension))
        .execute()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to create segments table: {}", e)))?;
    Ok(())
}

async fn detect_vector_dimension(connection: &Connection) -> Result<usize> {
    let table = connection
        .open_table(TABLE_NAME)
        .execute()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to open segments table: {}", e)))?;

    let schema = table
        .schema()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to read table schema: {}", e)))?;

    for field in schema.fields() {
        if field.name() == "vector" {
            if let DataType::FixedSizeList(_, size) = field.data_type() {
                return Ok(*size as usize);
            }
        }
    }

    Err(PdfChatError::Database(
        "Could not find vector column or determine dimension".to_string(),
    ))
}

fn segments_schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("seq", DataType::UInt64, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("char_count", DataType::UInt32, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(records: &[SegmentRecord], dimension: usize) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * dimension);
    let mut sources = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut seqs = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut char_counts = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        sources.push(record.metadata.source.as_str());
        pages.push(record.metadata.page);
        chunk_indices.push(record.metadata.chunk_index);
        seqs.push(record.metadata.seq);
        contents.push(record.metadata.content.as_str());
        char_counts.push(record.metadata.char_count);
        created_ats.push(record.metadata.created_at.as_str());
    }

    let values_array = Float32Array::from(flat_values);
    let item_field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(item_field, dimension as i32, Arc::new(values_array), None)
            .map_err(|e| PdfChatError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(pages)),
        Arc::new(UInt32Array::from(chunk_indices)),
        Arc::new(UInt64Array::from(seqs)),
        Arc::new(StringArray::from(contents)),
        Arc::new(UInt32Array::from(char_counts)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(segments_schema(dimension), arrays)
        .map_err(|e| PdfChatError::Database(format!("Failed to create record batch: {}", e)))
}

async fn collect_rows(
    mut results: lancedb::arrow::SendableRecordBatchStream,
) -> Result<Vec<(SegmentMetadata, f32)>> {
    let mut rows = Vec::new();
    while let Some(batch) = results
        .try_next()
        .await
        .map_err(|e| PdfChatError::Database(format!("Failed to read result stream: {}", e)))?
    {
        rows.extend(parse_batch(&batch)?);
    }
    Ok(rows)
}

fn parse_batch(batch: &RecordBatch) -> Result<Vec<(SegmentMetadata, f32)>> {
    let sources = column::<StringArray>(batch, "source")?;
    let pages = column::<UInt32Array>(batch, "page")?;
    let chunk_indices = column::<UInt32Array>(batch, "chunk_index")?;
    let seqs = column::<UInt64Array>(batch, "seq")?;
    let contents = column::<StringArray>(batch, "content")?;
    let char_counts = column::<UInt32Array>(batch, "char_count")?;
    let created_ats = column::<StringArray>(batch, "created_at")?;

    // The `_distance` column is only present on vector search results.
    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut rows = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let metadata = SegmentMetadata {
            source: sources.value(row).to_string(),
            page: pages.value(row),
            chunk_index: chunk_indices.value(row),
            seq: seqs.value(row),
            content: contents.value(row).to_string(),
            char_count: char_counts.value(row),
            created_at: created_ats.value(row).to_string(),
        };
        let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });
        rows.push((metadata, distance));
    }

    Ok(rows)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| PdfChatError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| PdfChatError::Database(format!("Invalid {} column type", name)))
}
