//! Corpus construction: enumerate, extract and encode every document.

use std::path::{Path, PathBuf};

use crate::extract::{is_supported, TextExtractor};
use crate::progress::{CancelToken, ProgressReporter};
use crate::semantic::embeddings::{EmbeddingError, Encoder};
use crate::semantic::fingerprint::{identifier_for, list_files};
use crate::semantic::SearchError;

/// One document and its embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    /// Root-relative path with `/` separators
    pub identifier: String,
    pub embedding: Vec<f32>,
}

/// All document embeddings of a directory, in enumeration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    dimensions: usize,
    records: Vec<DocumentRecord>,
}

impl Corpus {
    pub fn new(dimensions: usize) -> Self {
        Self::with_capacity(dimensions, 0)
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            dimensions,
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record. Its embedding must have `dimensions()` entries.
    pub fn push(&mut self, record: DocumentRecord) {
        debug_assert_eq!(record.embedding.len(), self.dimensions);
        self.records.push(record);
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.identifier.as_str())
    }

    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.records.iter().map(|r| r.embedding.as_slice())
    }
}

/// Supported documents under `root`, root-relative, in sorted order.
pub fn list_documents(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(list_files(root)?
        .into_iter()
        .filter(|path| is_supported(path))
        .collect())
}

/// Builds a full corpus from scratch using the injected collaborators.
pub struct CorpusLoader<'a> {
    encoder: &'a dyn Encoder,
    extractor: &'a dyn TextExtractor,
}

impl<'a> CorpusLoader<'a> {
    pub fn new(encoder: &'a dyn Encoder, extractor: &'a dyn TextExtractor) -> Self {
        Self { encoder, extractor }
    }

    /// Extract and encode every supported document under `root`.
    ///
    /// Fails on the first unreadable, malformed or unencodable document;
    /// there is no partial corpus. `cancel` is checked before each file.
    pub fn build_corpus(
        &self,
        root: &Path,
        progress: &mut dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<Corpus, SearchError> {
        let documents = list_documents(root)?;
        let total = documents.len();
        let dimensions = self.encoder.dimensions();

        log::info!("Encoding {} documents under {}", total, root.display());

        let mut corpus = Corpus::with_capacity(dimensions, total);
        for (i, relative) in documents.iter().enumerate() {
            if cancel.is_cancelled() {
                log::warn!("Encoding cancelled after {} of {} documents", i, total);
                return Err(SearchError::Cancelled);
            }

            let text = self.extractor.extract_text(&root.join(relative))?;
            let embedding = self.encoder.encode(&text)?;
            if embedding.len() != dimensions {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: dimensions,
                    got: embedding.len(),
                }
                .into());
            }

            corpus.push(DocumentRecord {
                identifier: identifier_for(relative)?,
                embedding,
            });

            progress.on_progress(i + 1, total);
        }

        Ok(corpus)
    }
}
