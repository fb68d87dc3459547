//! PDF text extraction
//!
//! Parses a PDF from in-memory bytes and produces one text block per page.
//! Page boundaries are preserved so downstream chunking never produces a
//! segment spanning two pages.


use std::path::Path;

use tracing::{debug, warn};

use crate::{PdfChatError, Result};

/// Extracted text for one page of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number.
    pub number: u32,
    pub text: String,
}

/// Extracts per-page text from raw PDF bytes. `source` is only used for
/// error and log messages.
#[inline]
pub fn extract_pages(bytes: &[u8], source: &str) -> Result<Vec<PageText>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| PdfChatError::Extraction(format!("Failed to load PDF '{source}': {e}")))?;
    extract_from_document(&doc, source)
}

/// Reads and extracts a PDF from disk.
#[inline]
pub fn extract_pages_from_file(path: &Path) -> Result<Vec<PageText>> {
    let source = source_name(path);
    let doc = lopdf::Document::load(path).map_err(|e| {
        PdfChatError::Extraction(format!("Failed to load PDF '{}': {e}", path.display()))
    })?;
    extract_from_document(&doc, &source)
}

/// Filename component of a path, used as the source tag on every segment
/// produced from the document.
#[inline]
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extract_from_document(doc: &lopdf::Document, source: &str) -> Result<Vec<PageText>> {
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    debug!(
        source,
        page_count = page_numbers.len(),
        "Extracting text from PDF"
    );

    let mut pages = Vec::with_capacity(page_numbers.len());
    for number in page_numbers {
        match doc.extract_text(&[number]) {
            Ok(raw) => {
                let text = normalize_text(&raw);
                if text.is_empty() {
                    debug!(source, page = number, "Page has no text content");
                } else {
                    pages.push(PageText { number, text });
                }
            }
            Err(e) => {
                warn!(source, page = number, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    if pages.is_empty() {
        return Err(PdfChatError::Extraction(format!(
            "No text content extracted from PDF '{source}'"
        )));
    }

    Ok(pages)
}

/// Normalizes extracted page text: line endings unified, BOM and NUL bytes
/// dropped, trailing whitespace per line removed, runs of blank lines
/// collapsed to a single paragraph break. Paragraph structure survives so
/// the chunker can prefer it as a split boundary.
#[inline]
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    let mut blank_pending = false;
    for raw_line in unified.lines() {
        let cleaned = raw_line.replace(['\u{FEFF}', '\u{0}'], "");
        let line = cleaned.trim_end();
        if line.is_empty() {
            blank_pending = !lines.is_empty();
        } else {
            if blank_pending {
                lines.push(String::new());
                blank_pending = false;
            }
            lines.push(line.to_string());
        }
    }

    lines.join("\n")
}
