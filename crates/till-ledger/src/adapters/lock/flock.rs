//! # File Lock Implementation
//!
//! Uses `fs2` for advisory locking (flock on Unix, LockFile on Windows).
//!
//! The lock lives on the open file description, so every store operation
//! opens its own handle. Two handles in one process contend exactly like two
//! processes do.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{LockMode, LockWait};

/// First retry delay when polling for a bounded wait.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Retry delay cap.
const MAX_RETRY_DELAY: Duration = Duration::from_millis(500);

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors from advisory file locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock call itself failed (not contention).
    #[error("failed to lock {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Another holder kept the lock past the configured wait.
    #[error("{mode} lock on {} still held after {}ms", .path.display(), .waited.as_millis())]
    Timeout {
        path: PathBuf,
        mode: LockMode,
        waited: Duration,
    },
}

impl From<LockError> for LedgerError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Io { path, source } => LedgerError::Io { path, source },
            LockError::Timeout { path, mode, waited } => LedgerError::LockTimeout {
                path,
                mode,
                waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
            },
        }
    }
}

// =============================================================================
// FILE LOCK
// =============================================================================

/// Advisory lock held on an open file, released on drop (RAII).
///
/// # Example
///
/// ```ignore
/// let file = File::open(&path)?;
/// let lock = FileLock::acquire(file, &path, LockMode::Shared, LockWait::Block)?;
/// // read through lock.file() while the lock is held
/// ```
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
    mode: LockMode,
}

impl FileLock {
    /// Lock `file` in `mode`, waiting as `wait` allows.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Timeout` if a bounded wait expires, and
    /// `LockError::Io` if the platform lock call fails outright.
    pub fn acquire(
        file: File,
        path: &Path,
        mode: LockMode,
        wait: LockWait,
    ) -> Result<Self, LockError> {
        let started = Instant::now();

        match wait {
            LockWait::Block => {
                let locked = match mode {
                    LockMode::Shared => fs2::FileExt::lock_shared(&file),
                    LockMode::Exclusive => fs2::FileExt::lock_exclusive(&file),
                };
                locked.map_err(|source| LockError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
            LockWait::Timeout(limit) => {
                let deadline = started + limit;
                let mut retry_delay = INITIAL_RETRY_DELAY;

                loop {
                    let attempt = match mode {
                        LockMode::Shared => fs2::FileExt::try_lock_shared(&file),
                        LockMode::Exclusive => fs2::FileExt::try_lock_exclusive(&file),
                    };
                    match attempt {
                        Ok(()) => break,
                        Err(e) if is_contended(&e) => {
                            let now = Instant::now();
                            if now >= deadline {
                                return Err(LockError::Timeout {
                                    path: path.to_path_buf(),
                                    mode,
                                    waited: now - started,
                                });
                            }
                            // Retry with exponential backoff, never sleeping past the deadline
                            thread::sleep(retry_delay.min(deadline - now));
                            retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
                        }
                        Err(source) => {
                            return Err(LockError::Io {
                                path: path.to_path_buf(),
                                source,
                            })
                        }
                    }
                }
            }
        }

        debug!(
            path = %path.display(),
            %mode,
            waited_ms = started.elapsed().as_millis() as u64,
            "lock acquired"
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            mode,
        })
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        debug!(path = %self.path.display(), mode = %self.mode, "lock released");
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
