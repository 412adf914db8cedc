//! Semantic search over a directory of documents.
//!
//! Documents are embedded with fastembed-rs and ranked by cosine
//! similarity. Embeddings are cached inside the watched directory and
//! reused until its content fingerprint changes.
//!
//! # Architecture
//!
//! - `fingerprint`: Content digest of a directory tree
//! - `embeddings`: Encoder trait and the fastembed-backed model
//! - `corpus`: Document enumeration and encoding
//! - `storage`: Cache files (fingerprint, vectors.bin, identifiers.json)
//! - `cache`: Reuse-or-rebuild decision under a directory lock
//! - `index`: Cosine similarity ranking with stable top-K
//! - `preprocess`: Result previews
//! - `service`: High-level search service

mod cache;
mod corpus;
pub mod embeddings;
mod fingerprint;
mod index;
mod preprocess;
mod service;
mod storage;

pub use cache::CacheStatus;
pub use embeddings::{EmbeddingModel, Encoder};
pub use service::{SearchError, SearchOptions, SearchService};

/// Reserved directory under each watched root holding its cache
pub const CACHE_DIR_NAME: &str = ".docseek";

/// Default number of results per query
pub const DEFAULT_TOP_K: usize = 5;
