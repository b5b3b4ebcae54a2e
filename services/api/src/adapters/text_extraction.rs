//! services/api/src/adapters/text_extraction.rs
//!
//! Turns uploaded bytes into plain text: `pdf-extract` for PDFs, lossy
//! UTF-8 decoding for everything else.

use async_trait::async_trait;
use contract_core::ports::{PortError, PortResult, TextExtractionService};

#[derive(Clone, Copy, Debug, Default)]
pub struct PdfTextExtractor;

fn is_plain_text(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with(".txt") || lower.ends_with(".md")
}

#[async_trait]
impl TextExtractionService for PdfTextExtractor {
    async fn extract_text(&self, file_name: &str, data: &[u8]) -> PortResult<String> {
        if is_plain_text(file_name) {
            return Ok(String::from_utf8_lossy(data).into_owned());
        }

        // PDF parsing is CPU-bound.
        let bytes = data.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PortError::Unexpected(format!("Task join error: {e}")))?
            .map_err(|e| PortError::Unexpected(format!("PDF text extraction failed: {e}")))?;

        Ok(text.trim().to_string())
    }
}
