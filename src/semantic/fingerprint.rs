//! Directory content fingerprinting for cache invalidation.
//!
//! The digest covers every regular file under the root except cache
//! directories at any depth. Files are visited in a global order sorted by
//! root-relative path, so the result does not depend on the order the
//! filesystem returns directory entries in. Each file contributes its
//! relative path, its length and its bytes.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::semantic::CACHE_DIR_NAME;

/// Read buffer size used while hashing file contents
const CHUNK_SIZE: usize = 8 * 1024;

/// SHA-256 digest summarizing the contents of a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryFingerprint([u8; 32]);

impl DirectoryFingerprint {
    /// Lowercase hex form, as stored in the fingerprint marker.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for DirectoryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// List every regular file under `root`, as root-relative paths in sorted order.
///
/// Cache directories are skipped wherever they appear, so a cache built
/// for a subdirectory never changes its parent's fingerprint. Symlinks are
/// not followed.
pub fn list_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        ));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() > 0
                && entry.file_type().is_dir()
                && entry.file_name() == CACHE_DIR_NAME)
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        files.push(relative.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Stable identifier for a root-relative path: components joined with `/`.
///
/// Fails with `InvalidData` when a component is not valid UTF-8.
pub fn identifier_for(relative: &Path) -> io::Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("file name is not valid UTF-8: {}", relative.display()),
                )
            })?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}

/// Compute the fingerprint of the directory tree at `root`.
///
/// Fails if `root` is not a directory or any file cannot be read.
pub fn fingerprint(root: &Path) -> io::Result<DirectoryFingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    for relative in list_files(root)? {
        let identifier = identifier_for(&relative)?;
        hasher.update((identifier.len() as u64).to_le_bytes());
        hasher.update(identifier.as_bytes());

        let mut file = File::open(root.join(&relative))?;
        let len = file.metadata()?.len();
        hasher.update(len.to_le_bytes());

        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }

    Ok(DirectoryFingerprint(hasher.finalize().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"hello world");
        write(dir.path(), "sub/b.txt", b"goodbye world");

        let first = fingerprint(dir.path()).unwrap();
        let second = fingerprint(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_hex().len(), 64);
    }

    #[test]
    fn test_single_byte_change_in_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"hello world");
        write(dir.path(), "deep/er/b.txt", b"goodbye world");
        let before = fingerprint(dir.path()).unwrap();

        write(dir.path(), "deep/er/b.txt", b"goodbye worle");
        let after = fingerprint(dir.path()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_same_content_in_different_trees_matches() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();

        // created in different orders
        write(one.path(), "x/1.txt", b"one");
        write(one.path(), "y/2.txt", b"two");
        write(two.path(), "y/2.txt", b"two");
        write(two.path(), "x/1.txt", b"one");

        assert_eq!(fingerprint(one.path()).unwrap(), fingerprint(two.path()).unwrap());
    }

    #[test]
    fn test_rename_changes_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"same");
        let before = fingerprint(dir.path()).unwrap();

        std::fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).unwrap();
        assert_ne!(before, fingerprint(dir.path()).unwrap());
    }

    #[test]
    fn test_bytes_moving_between_files_changes_fingerprint() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        write(one.path(), "a.txt", b"ab");
        write(one.path(), "b.txt", b"c");
        write(two.path(), "a.txt", b"a");
        write(two.path(), "b.txt", b"bc");

        assert_ne!(fingerprint(one.path()).unwrap(), fingerprint(two.path()).unwrap());
    }

    #[test]
    fn test_cache_directory_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"hello");
        let before = fingerprint(dir.path()).unwrap();

        write(dir.path(), &format!("{}/fingerprint", CACHE_DIR_NAME), b"deadbeef");
        write(dir.path(), &format!("{}/vectors.bin", CACHE_DIR_NAME), b"\x01\x02");
        assert_eq!(before, fingerprint(dir.path()).unwrap());

        // caches of subdirectories are excluded too
        write(dir.path(), &format!("nested/{}/fingerprint", CACHE_DIR_NAME), b"x");
        assert_eq!(before, fingerprint(dir.path()).unwrap());

        // a regular file with the reserved name is still content
        write(dir.path(), &format!("other/{}", CACHE_DIR_NAME), b"x");
        assert_ne!(before, fingerprint(dir.path()).unwrap());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = fingerprint(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_large_file_is_streamed() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![7u8; CHUNK_SIZE * 3 + 17];
        write(dir.path(), "big.txt", &big);
        let before = fingerprint(dir.path()).unwrap();

        let mut changed = big.clone();
        changed[CHUNK_SIZE * 2 + 5] = 8;
        write(dir.path(), "big.txt", &changed);
        assert_ne!(before, fingerprint(dir.path()).unwrap());
    }

    #[test]
    fn test_list_files_is_sorted_and_relative() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", b"");
        write(dir.path(), "a/z.txt", b"");
        write(dir.path(), "a.txt", b"");

        let ids: Vec<String> = list_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| identifier_for(p).unwrap())
            .collect();
        assert_eq!(ids, vec!["a/z.txt", "a.txt", "b.txt"]);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_non_utf8_file_name_is_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"caf\xe9.txt")), b"hello").unwrap();

        let err = fingerprint(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
