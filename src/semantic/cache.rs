//! Fingerprint-keyed embedding cache for a watched directory.
//!
//! The whole directory is one cache unit: any change anywhere rebuilds
//! every embedding. The check-and-rebuild sequence runs under an
//! exclusive lock on the directory's cache, so overlapping searches
//! against the same directory never race to overwrite its state.

use std::path::Path;

use crate::extract::TextExtractor;
use crate::lock::DirectoryLock;
use crate::progress::{CancelToken, ProgressReporter};
use crate::semantic::corpus::{Corpus, CorpusLoader};
use crate::semantic::embeddings::Encoder;
use crate::semantic::fingerprint::fingerprint;
use crate::semantic::storage::{self, VectorStorage, VectorStorageError};
use crate::semantic::SearchError;

/// How a corpus lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Stored vectors were reused without encoding
    Hit,
    /// Every document was encoded again
    Rebuilt,
}

pub struct EmbeddingCache<'a> {
    encoder: &'a dyn Encoder,
    extractor: &'a dyn TextExtractor,
}

impl<'a> EmbeddingCache<'a> {
    pub fn new(encoder: &'a dyn Encoder, extractor: &'a dyn TextExtractor) -> Self {
        Self { encoder, extractor }
    }

    /// Current corpus of `root`, reusing cached vectors when the directory
    /// is unchanged.
    pub fn get_corpus_vectors(
        &self,
        root: &Path,
        progress: &mut dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<Corpus, SearchError> {
        self.refresh(root, progress, cancel).map(|(corpus, _)| corpus)
    }

    /// Like `get_corpus_vectors`, also reporting whether vectors were reused.
    ///
    /// A failed or cancelled rebuild leaves the previous cache state in place.
    pub fn refresh(
        &self,
        root: &Path,
        progress: &mut dyn ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<(Corpus, CacheStatus), SearchError> {
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            )
            .into());
        }

        let storage = VectorStorage::open(root)?;
        let _lock = DirectoryLock::acquire_blocking(storage.dir()).map_err(|source| {
            SearchError::Lock {
                path: storage.dir().to_path_buf(),
                source,
            }
        })?;

        let current = fingerprint(root)?;
        log::debug!("Fingerprint of {}: {}", root.display(), current);
        let model_id = self.encoder.model_id();
        let dimensions = self.encoder.dimensions();

        match storage.read_fingerprint() {
            Ok(Some(saved)) if saved == current.to_hex() => {
                match storage.load(&model_id, dimensions) {
                    Ok(corpus) => {
                        log::info!(
                            "Directory unchanged, loaded {} cached vectors",
                            corpus.len()
                        );
                        return Ok((corpus, CacheStatus::Hit));
                    }
                    Err(VectorStorageError::ModelMismatch) => {
                        log::info!("Model changed, rebuilding index");
                    }
                    Err(VectorStorageError::VersionMismatch(file_ver, _)) => {
                        log::info!("Cache version {} unsupported, rebuilding index", file_ver);
                    }
                    Err(e) => {
                        log::warn!("Cached vectors unusable ({}), rebuilding index", e);
                    }
                }
            }
            Ok(Some(_)) => log::info!("Directory changed, rebuilding index"),
            Ok(None) => log::info!("No cached index, building"),
            Err(e) => log::warn!("Failed to read fingerprint marker ({}), rebuilding index", e),
        }

        let _span = tracing::info_span!("rebuild", root = %root.display()).entered();

        let corpus = CorpusLoader::new(self.encoder, self.extractor)
            .build_corpus(root, progress, cancel)?;
        storage.save(&corpus, &model_id, &current)?;

        log::info!("Indexed {} documents", corpus.len());
        Ok((corpus, CacheStatus::Rebuilt))
    }

    /// Remove the cached state of `root`.
    pub fn clear(root: &Path) -> Result<(), SearchError> {
        let dir = storage::cache_dir_for(root);
        if !dir.exists() {
            return Ok(());
        }

        let _lock = DirectoryLock::acquire_blocking(&dir).map_err(|source| SearchError::Lock {
            path: dir.clone(),
            source,
        })?;
        storage::delete(root)?;
        Ok(())
    }
}
