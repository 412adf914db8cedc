//! Semantic search service for document directories.
//!
//! Provides the operations the command-line shell needs:
//! - `search`: fingerprint, rebuild if needed, rank, preview
//! - `index`: bring the cache up to date without querying
//! - `clear`: drop a directory's cache

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::extract::{DocumentExtractor, ExtractError, TextExtractor};
use crate::progress::{CancelToken, ProgressReporter};
use crate::semantic::cache::{CacheStatus, EmbeddingCache};
use crate::semantic::corpus::Corpus;
use crate::semantic::embeddings::EmbeddingError;
use crate::semantic::index::QueryRanker;
use crate::semantic::preprocess::{text_preview, DEFAULT_PREVIEW_CHARS};
use crate::semantic::storage::VectorStorageError;
use crate::semantic::{EmbeddingModel, Encoder, DEFAULT_TOP_K};

/// Errors that can occur during semantic search operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Storage error: {0}")]
    Storage(#[from] VectorStorageError),

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Indexing cancelled")]
    Cancelled,
}

/// One ranked document with its preview.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// Root-relative identifier
    pub identifier: String,
    /// Location on disk
    pub path: PathBuf,
    /// Cosine similarity to the query
    pub score: f32,
    /// Leading characters of the document text
    pub preview: String,
}

/// Ranking parameters.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub top_k: usize,
    pub preview_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }
}

/// Service for searching document directories.
///
/// Owns the encoder and extractor for its lifetime; every search runs
/// synchronously on the calling thread.
pub struct SearchService {
    encoder: Box<dyn Encoder>,
    extractor: Box<dyn TextExtractor>,
    options: SearchOptions,
}

impl SearchService {
    /// Create a service from explicit collaborators.
    pub fn new(
        encoder: Box<dyn Encoder>,
        extractor: Box<dyn TextExtractor>,
        options: SearchOptions,
    ) -> Self {
        Self {
            encoder,
            extractor,
            options,
        }
    }

    /// Load the configured embedding model and use the default extractor.
    ///
    /// # Arguments
    /// * `config` - Application configuration
    /// * `base_path` - Base directory for downloaded models (`models/`)
    pub fn from_config(config: &Config, base_path: &Path) -> Result<Self, SearchError> {
        log::info!("Initializing semantic search with model '{}'", config.model);

        let model = EmbeddingModel::new(
            &config.model,
            base_path.to_path_buf(),
            config.show_download_progress,
        )?;

        Ok(Self::new(
            Box::new(model),
            Box::new(DocumentExtractor),
            SearchOptions {
                top_k: config.top_k,
                preview_chars: config.preview_chars,
            },
        ))
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    fn cache(&self) -> EmbeddingCache<'_> {
        EmbeddingCache::new(self.encoder.as_ref(), self.extractor.as_ref())
    }

    /// Bring the cache of `root` up to date.
    pub fn index(
        &self,
        root: &Path,
        progress: &mut dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<(Corpus, CacheStatus), SearchError> {
        self.cache().refresh(root, progress, cancel)
    }

    /// Search the documents under `root` for `query`.
    ///
    /// # Returns
    /// Up to `top_k` hits sorted by similarity (highest first); equal
    /// scores keep corpus order.
    pub fn search(
        &self,
        query: &str,
        root: &Path,
        progress: &mut dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let corpus = self.cache().get_corpus_vectors(root, progress, cancel)?;

        let results = QueryRanker::new(self.encoder.as_ref()).search(
            query,
            &corpus,
            self.options.top_k,
        )?;

        results
            .into_iter()
            .map(|result| -> Result<SearchHit, SearchError> {
                let identifier = corpus.records()[result.index].identifier.clone();
                let path = root.join(&identifier);

                // previews are re-extracted, not cached
                let text = self.extractor.extract_text(&path)?;

                Ok(SearchHit {
                    identifier,
                    path,
                    score: result.score,
                    preview: text_preview(&text, self.options.preview_chars),
                })
            })
            .collect()
    }

    /// Remove the cached state of `root`.
    pub fn clear(root: &Path) -> Result<(), SearchError> {
        EmbeddingCache::clear(root)
    }
}
