//! Helpers shared by the CSV-file stores: opening under a lock, header
//! creation and line encoding.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::info;

use crate::adapters::lock::FileLock;
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::value_objects::{LockMode, LockWait};

pub(super) fn csv_error(path: &Path, err: csv::Error) -> LedgerError {
    LedgerError::io(path, io::Error::from(err))
}

/// Create the parent directory of a backing file if needed.
pub(super) fn ensure_parent(path: &Path) -> LedgerResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| LedgerError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Open `path` with `options` and lock the handle.
pub(super) fn open_locked(
    path: &Path,
    options: &OpenOptions,
    mode: LockMode,
    wait: LockWait,
) -> LedgerResult<FileLock> {
    let file = options.open(path).map_err(|e| LedgerError::io(path, e))?;
    Ok(FileLock::acquire(file, path, mode, wait)?)
}

/// Encode rows as `\n`-terminated CSV lines.
pub(super) fn encode_lines<I, S>(path: &Path, rows: I) -> LedgerResult<Vec<u8>>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| csv_error(path, e))?;
    }
    writer
        .into_inner()
        .map_err(|e| LedgerError::io(path, e.into_error()))
}

/// Size of the file behind a lock.
pub(super) fn file_len(lock: &FileLock) -> LedgerResult<u64> {
    lock.file()
        .metadata()
        .map(|m| m.len())
        .map_err(|e| LedgerError::io(lock.path(), e))
}

const TAIL_CHUNK: u64 = 4096;

/// Bytes that close a partial last line left by a writer that died mid-line,
/// or `None` when the file ends with a newline.
///
/// The terminator closes an open quoted field and adds one empty field, so
/// the torn row can never pass as a complete record and the reader is back on
/// a record boundary for the next append.
pub(super) fn torn_tail_terminator(lock: &FileLock) -> LedgerResult<Option<Vec<u8>>> {
    let len = file_len(lock)?;
    if len == 0 {
        return Ok(None);
    }

    let mut file = lock.file();
    let mut end = len;
    let mut quotes = 0usize;
    let mut first = true;
    while end > 0 {
        let start = end.saturating_sub(TAIL_CHUNK);
        let mut chunk = vec![0u8; (end - start) as usize];
        file.seek(SeekFrom::Start(start))
            .and_then(|_| file.read_exact(&mut chunk))
            .map_err(|e| LedgerError::io(lock.path(), e))?;

        if first {
            if chunk.last() == Some(&b'\n') {
                return Ok(None);
            }
            first = false;
        }
        match chunk.iter().rposition(|&b| b == b'\n') {
            Some(pos) => {
                quotes += chunk[pos + 1..].iter().filter(|&&b| b == b'"').count();
                break;
            }
            None => quotes += chunk.iter().filter(|&&b| b == b'"').count(),
        }
        end = start;
    }

    let mut terminator = Vec::with_capacity(3);
    if quotes % 2 == 1 {
        terminator.push(b'"');
    }
    terminator.extend_from_slice(b",\n");
    Ok(Some(terminator))
}

/// Write `bytes` at the current end and force them to disk.
pub(super) fn append_bytes(lock: &FileLock, bytes: &[u8]) -> LedgerResult<()> {
    let mut file = lock.file();
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .and_then(|_| file.sync_data())
        .map_err(|e| LedgerError::io(lock.path(), e))
}

/// Create `path` holding only `header` unless it already has content.
///
/// Returns whether the header was written. The check runs under the
/// exclusive lock, so concurrent initializers write it once.
pub(super) fn initialize(path: &Path, header: &[&str], wait: LockWait) -> LedgerResult<bool> {
    ensure_parent(path)?;
    let lock = open_locked(
        path,
        OpenOptions::new().read(true).append(true).create(true),
        LockMode::Exclusive,
        wait,
    )?;

    if file_len(&lock)? > 0 {
        return Ok(false);
    }

    append_bytes(&lock, &encode_lines(path, [header])?)?;
    info!(path = %path.display(), "initialized backing file");
    Ok(true)
}
