// Ingestion module
// Turns a PDF on disk into embedded segments in the vector store


use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info};

use crate::Result;
use crate::chunking::{Segment, chunk_pages};
use crate::config::Config;
use crate::database::{SegmentRecord, VectorStore};
use crate::gemini::GeminiClient;
use crate::pdf;

/// Summary of one completed ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source: String,
    pub pages: usize,
    pub segments: usize,
    /// Segments already in the store before this ingest.
    pub prior_total: u64,
    /// Segments in the store afterwards.
    pub store_total: u64,
}

/// Pipeline that reads a PDF, chunks its pages, embeds the segments and
/// appends them to the store.
pub struct Ingestor<'a> {
    config: &'a Config,
    client: &'a GeminiClient,
    store: &'a mut VectorStore,
}

impl<'a> Ingestor<'a> {
    #[inline]
    pub fn new(config: &'a Config, client: &'a GeminiClient, store: &'a mut VectorStore) -> Self {
        Self {
            config,
            client,
            store,
        }
    }

    /// Ingest a PDF file from disk.
    #[inline]
    pub async fn ingest_file(&mut self, path: &Path) -> Result<IngestReport> {
        let source = pdf::source_name(path);
        debug!(source = %source, path = %path.display(), "Reading PDF");
        let bytes = std::fs::read(path)?;
        self.ingest_bytes(&bytes, &source).await
    }

    /// Ingest an in-memory PDF. The parse works on the byte buffer, so no
    /// temporary files are written.
    #[inline]
    pub async fn ingest_bytes(&mut self, bytes: &[u8], source: &str) -> Result<IngestReport> {
        let pages = pdf::extract_pages(bytes, source)?;
        let segments = chunk_pages(&pages, source, &self.config.chunking)?;

        info!(
            source,
            pages = pages.len(),
            segments = segments.len(),
            "Embedding document segments"
        );

        let vectors = self.embed_segments(&segments)?;

        let prior_total = self.store.count().await?;
        let records = build_records(&segments, vectors, prior_total)?;
        self.store.add_segments(records).await?;
        let store_total = self.store.count().await?;

        info!(source, total = store_total, "Document ingested");

        Ok(IngestReport {
            source: source.to_string(),
            pages: pages.len(),
            segments: segments.len(),
            prior_total,
            store_total,
        })
    }

    fn embed_segments(&self, segments: &[Segment]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();

        let bar = embedding_progress(texts.len() as u64);
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.gemini.batch_size as usize) {
            vectors.extend(self.client.embed_batch(batch)?);
            bar.inc(batch.len() as u64);
        }
        bar.finish_and_clear();

        Ok(vectors)
    }
}

/// Pairs segments with their vectors, numbering them after the segments
/// already in the store so storage order is preserved across ingests.
fn build_records(
    segments: &[Segment],
    vectors: Vec<Vec<f32>>,
    base_seq: u64,
) -> Result<Vec<SegmentRecord>> {
    if segments.len() != vectors.len() {
        return Err(anyhow::anyhow!(
            "Segment and vector counts differ: {} vs {}",
            segments.len(),
            vectors.len()
        )
        .into());
    }

    Ok(segments
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(offset, (segment, vector))| {
            SegmentRecord::new(segment, vector, base_seq + offset as u64)
        })
        .collect())
}

fn embedding_progress(total: u64) -> ProgressBar {
    if console::user_attended_stderr() {
        ProgressBar::new(total).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding segments")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    }
}
