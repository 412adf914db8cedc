//! Advisory locking of a watched directory's cache.
//!
//! Uses flock() on a lock file inside the cache directory. flock locks
//! belong to the open file description, so two handles in the same
//! process exclude each other just like two processes do.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Lock file name placed in the cache directory
pub const LOCK_FILE_NAME: &str = "docseek.lock";

/// A held directory lock that releases on drop
pub struct DirectoryLock {
    #[allow(dead_code)]
    file: File,
}

impl DirectoryLock {
    /// Acquire an exclusive lock, blocking until available.
    pub fn acquire_blocking(cache_dir: &Path) -> io::Result<Self> {
        let file = Self::open_lock_file(cache_dir)?;
        Self::lock_exclusive(&file)?;
        Ok(DirectoryLock { file })
    }

    fn open_lock_file(cache_dir: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(cache_dir.join(LOCK_FILE_NAME))
    }

    #[cfg(unix)]
    fn lock_exclusive(file: &File) -> io::Result<()> {
        let fd = file.as_raw_fd();
        let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    // No locking on non-Unix platforms yet
    #[cfg(not(unix))]
    fn lock_exclusive(_file: &File) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let fd = self.file.as_raw_fd();
        // Release the lock - ignore errors on drop
        unsafe { libc::flock(fd, libc::LOCK_UN) };
    }
}
