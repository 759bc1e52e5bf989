//! crates/picata_core/src/documents.rs
//!
//! Per-session PDF context: turns extracted pages into chunked context text and
//! caches the result so chat turns never re-parse a document.

use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::chunking::TextSplitter;
use crate::domain::{DocumentOrigin, DocumentText};

/// Chunks every page in order and joins all chunks with newlines.
pub fn build_document_text(
    source: &str,
    origin: DocumentOrigin,
    pages: &[String],
    splitter: &TextSplitter,
) -> DocumentText {
    let chunks: Vec<String> = pages.iter().flat_map(|page| splitter.split(page)).collect();
    DocumentText {
        source: source.to_string(),
        origin,
        text: chunks.join("\n"),
    }
}

/// Hex SHA-1 of a document's raw bytes, used as its cache key.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// The documents attached to one session, plus their combined context string.
#[derive(Debug, Default, Clone)]
pub struct DocumentLibrary {
    documents: Vec<DocumentText>,
    by_digest: HashMap<String, usize>,
    context: String,
}

impl DocumentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[DocumentText] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns the already-processed document for these bytes, if any.
    pub fn cached(&self, digest: &str) -> Option<&DocumentText> {
        self.by_digest.get(digest).map(|&i| &self.documents[i])
    }

    /// Adds a processed document. Re-adding the same digest is a no-op.
    pub fn insert(&mut self, digest: String, document: DocumentText) {
        if self.by_digest.contains_key(&digest) {
            return;
        }
        self.by_digest.insert(digest, self.documents.len());
        self.documents.push(document);
        self.rebuild_context();
    }

    /// Drops uploaded documents; bundled ones stay.
    pub fn clear_uploads(&mut self) {
        let mut entries: Vec<(String, usize)> = self.by_digest.drain().collect();
        entries.sort_by_key(|entry| entry.1);
        let documents = std::mem::take(&mut self.documents);

        for (digest, index) in entries {
            let document = &documents[index];
            if document.origin == DocumentOrigin::Bundled {
                self.by_digest.insert(digest, self.documents.len());
                self.documents.push(document.clone());
            }
        }
        self.rebuild_context();
    }

    /// The context string handed to the prompt. Empty when no document is loaded.
    pub fn context(&self) -> &str {
        &self.context
    }

    fn rebuild_context(&mut self) {
        self.context = match self.documents.as_slice() {
            [] => String::new(),
            [only] => only.text.clone(),
            many => many
                .iter()
                .map(|doc| format!("--- Document: {} ---\n{}", doc.source, doc.text))
                .collect::<Vec<_>>()
                .join("\n\n"),
        };
    }
}
