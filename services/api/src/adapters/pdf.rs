//! services/api/src/adapters/pdf.rs
//!
//! PDF text extraction, implementing the `DocumentTextExtractor` port with `pdf-extract`.

use async_trait::async_trait;
use picata_core::ports::{DocumentTextExtractor, PortError, PortResult};

/// Extracts page text with `pdf-extract`. Parsing is CPU bound, so it runs on the
/// blocking pool rather than on the request's executor thread.
#[derive(Clone, Default)]
pub struct PdfExtractAdapter;

impl PdfExtractAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentTextExtractor for PdfExtractAdapter {
    async fn extract_pages(&self, pdf: &[u8]) -> PortResult<Vec<String>> {
        let bytes = pdf.to_vec();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    PortError::InvalidInput("PDF parser could not handle this file".to_string())
                } else {
                    PortError::Unexpected(e.to_string())
                }
            })?
            .map_err(|e| PortError::InvalidInput(format!("Could not read PDF: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_bytes_are_rejected_as_invalid_input() {
        let result = PdfExtractAdapter::new()
            .extract_pages(b"definitely not a pdf")
            .await;
        assert!(matches!(result, Err(PortError::InvalidInput(_))));
    }
}
