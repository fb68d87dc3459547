// Vector database module
// Persists segment embeddings and serves similarity search

#[cfg(test)]
mod tests;

pub mod vector_store;

pub use vector_store::{SearchResult, VectorStore};

use serde::{Deserialize, Serialize};

use crate::chunking::Segment;

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Unique identifier for this record
    pub id: String,
    /// The vector embedding of the segment text
    pub vector: Vec<f32>,
    /// Metadata stored alongside the vector
    pub metadata: SegmentMetadata,
}

/// Metadata for a segment stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// File name of the document this segment came from
    pub source: String,
    /// 1-based page number within the source document
    pub page: u32,
    /// Position of this segment within its document
    pub chunk_index: u32,
    /// Global insertion order across every ingested document
    pub seq: u64,
    /// The segment text
    pub content: String,
    /// Character count of the segment text
    pub char_count: u32,
    /// Timestamp when this record was created
    pub created_at: String,
}

impl SegmentRecord {
    /// Builds a record for a segment with a fresh id and timestamp. `seq`
    /// fixes the record's place in the store-wide insertion order.
    #[inline]
    pub fn new(segment: &Segment, vector: Vec<f32>, seq: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            metadata: SegmentMetadata {
                source: segment.source.clone(),
                page: segment.page,
                chunk_index: segment.index as u32,
                seq,
                content: segment.text.clone(),
                char_count: segment.char_count as u32,
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}
