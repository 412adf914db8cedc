//! On-disk cache state for one watched directory.
//!
//! Layout under `<root>/.docseek/`:
//! - `fingerprint`: lowercase hex digest of the directory contents
//! - `vectors.bin`: embedding matrix, one row per document
//! - `identifiers.json`: JSON array of document identifiers, row order
//!
//! `vectors.bin` header (51 bytes):
//! - version: u8 (2)
//! - model_id: [u8; 32] (SHA256 hash of model name)
//! - dimensions: u16 (little-endian)
//! - entry_count: u64 (little-endian)
//! - body_checksum: u32 (CRC32 of every entry byte)
//! - checksum: u32 (CRC32 of header fields before checksum)
//!
//! Entries (repeated):
//! - embedding: [f32; dimensions] (little-endian)

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::semantic::corpus::{Corpus, DocumentRecord};
use crate::semantic::fingerprint::DirectoryFingerprint;
use crate::semantic::CACHE_DIR_NAME;
use crate::storage::{BackendLocal, StorageManager};

/// Current file format version
const FORMAT_VERSION: u8 = 2;

/// Header size in bytes: version(1) + model_id(32) + dimensions(2) + entry_count(8)
/// + body_checksum(4) + checksum(4)
const HEADER_SIZE: usize = 51;

/// Bytes covered by the header checksum
const CHECKED_HEADER_SIZE: usize = HEADER_SIZE - 4;

pub const FINGERPRINT_FILE: &str = "fingerprint";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const IDENTIFIERS_FILE: &str = "identifiers.json";

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum VectorStorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: file version {0}, supported version {1}")]
    VersionMismatch(u8, u8),

    #[error("Model mismatch: file uses different model")]
    ModelMismatch,

    #[error("Checksum mismatch: file may be corrupted")]
    ChecksumMismatch,

    #[error("Dimension mismatch: expected {expected}, file has {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cache holds {vectors} vectors but {identifiers} identifiers")]
    CountMismatch { vectors: usize, identifiers: usize },

    #[error("Invalid identifier list: {0}")]
    Identifiers(#[from] serde_json::Error),
}

/// Storage manager for a directory's cached corpus.
pub struct VectorStorage {
    store: BackendLocal,
}

impl VectorStorage {
    /// Open (creating if needed) the cache directory for `root`.
    pub fn open(root: &Path) -> Result<Self, VectorStorageError> {
        let store = BackendLocal::new(cache_dir_for(root))?;
        Ok(Self { store })
    }

    /// Get the cache directory path.
    pub fn dir(&self) -> &Path {
        &self.store.base_dir
    }

    /// Read the stored fingerprint marker, if any.
    pub fn read_fingerprint(&self) -> Result<Option<String>, VectorStorageError> {
        if !self.store.exists(FINGERPRINT_FILE) {
            return Ok(None);
        }
        let bytes = self.store.read(FINGERPRINT_FILE)?;
        let marker = String::from_utf8(bytes)
            .map_err(|_| VectorStorageError::InvalidFormat("fingerprint is not utf8".to_string()))?;
        Ok(Some(marker.trim().to_string()))
    }

    /// Load the cached corpus.
    ///
    /// # Arguments
    /// * `expected_model_id` - SHA256 hash of the expected model name
    /// * `expected_dimensions` - Expected embedding dimensions
    ///
    /// # Returns
    /// The stored corpus, or an error if the files are invalid/incompatible.
    pub fn load(
        &self,
        expected_model_id: &[u8; 32],
        expected_dimensions: usize,
    ) -> Result<Corpus, VectorStorageError> {
        let vector_bytes = self.store.read(VECTORS_FILE)?;
        let mut reader = vector_bytes.as_slice();

        // Read and validate header
        let header = read_header(&mut reader)?;
        validate_header(&header, expected_model_id, expected_dimensions)?;

        let identifiers: Vec<String> = serde_json::from_slice(&self.store.read(IDENTIFIERS_FILE)?)?;
        if identifiers.len() as u64 != header.entry_count {
            return Err(VectorStorageError::CountMismatch {
                vectors: header.entry_count as usize,
                identifiers: identifiers.len(),
            });
        }

        let dimensions = header.dimensions as usize;
        let expected_len = header.entry_count as usize * dimensions * 4;
        if reader.len() != expected_len {
            return Err(VectorStorageError::InvalidFormat(format!(
                "expected {} bytes of vectors, found {}",
                expected_len,
                reader.len()
            )));
        }
        if compute_checksum(reader) != header.body_checksum {
            return Err(VectorStorageError::ChecksumMismatch);
        }

        let mut corpus = Corpus::with_capacity(dimensions, identifiers.len());
        for identifier in identifiers {
            let embedding = read_entry(&mut reader, dimensions)?;
            corpus.push(DocumentRecord {
                identifier,
                embedding,
            });
        }

        Ok(corpus)
    }

    /// Replace the cached state with `corpus`.
    ///
    /// Each file is written atomically (temp file -> fsync -> rename). The
    /// marker is removed first and written last, so an interrupted save
    /// leaves no marker and the next lookup rebuilds.
    pub fn save(
        &self,
        corpus: &Corpus,
        model_id: &[u8; 32],
        fingerprint: &DirectoryFingerprint,
    ) -> Result<(), VectorStorageError> {
        if corpus.dimensions() > u16::MAX as usize {
            return Err(VectorStorageError::InvalidFormat(format!(
                "{} dimensions exceed the format limit",
                corpus.dimensions()
            )));
        }

        if self.store.exists(FINGERPRINT_FILE) {
            self.store.delete(FINGERPRINT_FILE)?;
        }

        let mut body = Vec::with_capacity(corpus.len() * corpus.dimensions() * 4);
        for record in corpus.records() {
            write_entry(&mut body, &record.embedding)?;
        }
        let header = Header {
            version: FORMAT_VERSION,
            model_id: *model_id,
            dimensions: corpus.dimensions() as u16,
            entry_count: corpus.len() as u64,
            body_checksum: compute_checksum(&body),
        };

        let mut vectors = Vec::with_capacity(HEADER_SIZE + body.len());
        write_header(&mut vectors, &header)?;
        vectors.extend_from_slice(&body);
        self.store.write(VECTORS_FILE, &vectors)?;

        let identifiers: Vec<&str> = corpus.identifiers().collect();
        self.store.write(IDENTIFIERS_FILE, &serde_json::to_vec(&identifiers)?)?;

        self.store.write(FINGERPRINT_FILE, fingerprint.to_hex().as_bytes())?;

        Ok(())
    }
}

/// Cache directory for a watched root.
pub fn cache_dir_for(root: &Path) -> PathBuf {
    root.join(CACHE_DIR_NAME)
}

/// Delete the cache directory of `root` if it exists.
pub fn delete(root: &Path) -> Result<(), VectorStorageError> {
    let dir = cache_dir_for(root);
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    Ok(())
}

/// Read header from the start of the vector file.
fn read_header(reader: &mut impl Read) -> Result<Header, VectorStorageError> {
    let mut header_bytes = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header_bytes).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            VectorStorageError::InvalidFormat("truncated header".to_string())
        }
        _ => e.into(),
    })?;

    // Verify checksum (computed over header without checksum field)
    let stored_checksum = read_u32(&header_bytes[CHECKED_HEADER_SIZE..]);
    let computed_checksum = compute_checksum(&header_bytes[..CHECKED_HEADER_SIZE]);
    if stored_checksum != computed_checksum {
        return Err(VectorStorageError::ChecksumMismatch);
    }

    let version = header_bytes[0];
    if version != FORMAT_VERSION {
        return Err(VectorStorageError::VersionMismatch(version, FORMAT_VERSION));
    }

    let mut model_id = [0u8; 32];
    model_id.copy_from_slice(&header_bytes[1..33]);

    let dimensions = u16::from_le_bytes([header_bytes[33], header_bytes[34]]);
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header_bytes[35..43]);
    let entry_count = u64::from_le_bytes(count_bytes);
    let body_checksum = read_u32(&header_bytes[43..47]);

    Ok(Header {
        version,
        model_id,
        dimensions,
        entry_count,
        body_checksum,
    })
}

/// Validate header against expected values.
fn validate_header(
    header: &Header,
    expected_model_id: &[u8; 32],
    expected_dimensions: usize,
) -> Result<(), VectorStorageError> {
    if header.model_id != *expected_model_id {
        return Err(VectorStorageError::ModelMismatch);
    }

    if header.dimensions as usize != expected_dimensions {
        return Err(VectorStorageError::DimensionMismatch {
            expected: expected_dimensions,
            got: header.dimensions as usize,
        });
    }

    Ok(())
}

fn write_header(writer: &mut impl Write, header: &Header) -> io::Result<()> {
    let mut header_bytes = [0u8; HEADER_SIZE];

    header_bytes[0] = header.version;
    header_bytes[1..33].copy_from_slice(&header.model_id);
    header_bytes[33..35].copy_from_slice(&header.dimensions.to_le_bytes());
    header_bytes[35..43].copy_from_slice(&header.entry_count.to_le_bytes());
    header_bytes[43..47].copy_from_slice(&header.body_checksum.to_le_bytes());

    // Compute and store checksum
    let checksum = compute_checksum(&header_bytes[..CHECKED_HEADER_SIZE]);
    header_bytes[CHECKED_HEADER_SIZE..].copy_from_slice(&checksum.to_le_bytes());

    writer.write_all(&header_bytes)
}

fn read_entry(reader: &mut impl Read, dimensions: usize) -> Result<Vec<f32>, VectorStorageError> {
    let mut embedding = Vec::with_capacity(dimensions);
    for _ in 0..dimensions {
        let mut float_bytes = [0u8; 4];
        reader.read_exact(&mut float_bytes)?;
        embedding.push(f32::from_le_bytes(float_bytes));
    }
    Ok(embedding)
}

fn write_entry(writer: &mut impl Write, embedding: &[f32]) -> io::Result<()> {
    for &value in embedding {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Compute CRC32 checksum of data.
fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// File header structure.
#[derive(Debug)]
struct Header {
    version: u8,
    model_id: [u8; 32],
    dimensions: u16,
    entry_count: u64,
    body_checksum: u32,
}
