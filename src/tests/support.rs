//! Deterministic encoders and fixtures for tests that must not download a model.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::semantic::embeddings::{model_id_hash, EmbeddingError, Encoder};

/// Bag-of-words encoder: dimension `i` counts occurrences of `vocabulary[i]`.
pub struct WordEncoder {
    vocabulary: Vec<String>,
    model_name: String,
    fail_on: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl WordEncoder {
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_lowercase()).collect(),
            model_name: "word-encoder".to_string(),
            fail_on: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_model_name(mut self, name: &str) -> Self {
        self.model_name = name.to_string();
        self
    }

    /// Fail any text containing `word`.
    pub fn failing_on(mut self, word: &str) -> Self {
        self.fail_on = Some(word.to_lowercase());
        self
    }

    /// Shared count of `encode` calls, still readable after the encoder is boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Encoder for WordEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        if let Some(bad) = &self.fail_on {
            if words.contains(bad) {
                return Err(EmbeddingError::EmbeddingFailed(format!("refusing '{}'", bad)));
            }
        }

        let mut embedding = vec![0.0; self.vocabulary.len()];
        for word in &words {
            if let Some(i) = self.vocabulary.iter().position(|v| v == word) {
                embedding[i] += 1.0;
            }
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len()
    }

    fn model_id(&self) -> [u8; 32] {
        model_id_hash(&self.model_name)
    }
}

/// Returns the same vector for every text, regardless of its declared dimensions.
pub struct FixedEncoder {
    dimensions: usize,
    vector: Vec<f32>,
}

impl FixedEncoder {
    pub fn new(dimensions: usize, vector: Vec<f32>) -> Self {
        Self { dimensions, vector }
    }
}

impl Encoder for FixedEncoder {
    fn encode(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector.clone())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> [u8; 32] {
        model_id_hash("fixed-encoder")
    }
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}
