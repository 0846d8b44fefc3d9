//! Append-only CSV ledger guarded by advisory locks.

use std::fs::{File, OpenOptions};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::csv_file::{
    append_bytes, csv_error, encode_lines, ensure_parent, file_len, initialize, open_locked,
    torn_tail_terminator,
};
use crate::adapters::lock::FileLock;
use crate::domain::codec::CsvRow;
use crate::domain::entities::LedgerRecord;
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::value_objects::{LockMode, LockWait};
use crate::ports::outbound::SalesJournal;

/// Durable, append-only log of `R` rows in one CSV file.
///
/// The handle is only a path and a wait policy; every operation opens the
/// file afresh, so any number of handles (and processes) may share a file.
#[derive(Debug)]
pub struct RecordStore<R> {
    path: PathBuf,
    wait: LockWait,
    _row: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            wait: self.wait,
            _row: PhantomData,
        }
    }
}

impl<R: CsvRow> RecordStore<R> {
    pub fn new(path: impl Into<PathBuf>, wait: LockWait) -> Self {
        Self {
            path: path.into(),
            wait,
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with its header row if absent.
    ///
    /// An existing file is left alone whatever its header says.
    pub fn ensure_initialized(&self) -> LedgerResult<bool> {
        initialize(&self.path, R::HEADER, self.wait)
    }

    /// Append `records` in order as one locked write.
    ///
    /// Every record is encoded before the lock is taken, so an encoding
    /// failure writes nothing. Another writer's bytes never land inside this
    /// call's batch. A process crash mid-write can still leave a partial last
    /// line; the next append terminates it so it is skipped as malformed
    /// instead of corrupting the following record.
    pub fn append(&self, records: &[R]) -> LedgerResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let body = encode_lines(&self.path, records.iter().map(|r| r.to_fields()))?;

        ensure_parent(&self.path)?;
        let lock = open_locked(
            &self.path,
            OpenOptions::new().read(true).append(true).create(true),
            LockMode::Exclusive,
            self.wait,
        )?;

        let mut bytes = Vec::with_capacity(body.len() + 64);
        if file_len(&lock)? == 0 {
            bytes.extend(encode_lines(&self.path, [R::HEADER])?);
        } else if let Some(terminator) = torn_tail_terminator(&lock)? {
            warn!(path = %self.path.display(), "terminating torn final line");
            bytes.extend(terminator);
        }
        bytes.extend(body);

        append_bytes(&lock, &bytes)?;
        debug!(path = %self.path.display(), records = records.len(), "appended");
        Ok(())
    }

    /// Lazily read every row matching `predicate` under a shared lock.
    ///
    /// The lock is held until the iterator is exhausted or dropped. Each call
    /// starts from the top of the file. Malformed lines are logged and
    /// skipped; an I/O error is yielded once and ends the scan.
    pub fn scan<F>(&self, predicate: F) -> LedgerResult<Scan<R, F>>
    where
        F: FnMut(&R) -> bool,
    {
        let lock = open_locked(
            &self.path,
            OpenOptions::new().read(true),
            LockMode::Shared,
            self.wait,
        )?;
        // The clone shares the open file description, so reads happen under
        // the lock held through `lock`.
        let file = lock
            .file()
            .try_clone()
            .map_err(|e| LedgerError::io(&self.path, e))?;
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file)
            .into_records();

        Ok(Scan {
            records,
            predicate,
            path: self.path.clone(),
            skipped: 0,
            lock: Some(lock),
            _row: PhantomData,
        })
    }

    /// Every row in file order.
    pub fn read_all(&self) -> LedgerResult<Vec<R>> {
        self.scan(|_| true)?.collect()
    }
}

/// Iterator returned by [`RecordStore::scan`].
pub struct Scan<R, F> {
    records: csv::StringRecordsIntoIter<File>,
    predicate: F,
    path: PathBuf,
    skipped: usize,
    lock: Option<FileLock>,
    _row: PhantomData<fn() -> R>,
}

impl<R, F> Scan<R, F> {
    /// Malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn finish(&mut self) {
        if self.lock.take().is_some() && self.skipped > 0 {
            warn!(
                path = %self.path.display(),
                skipped = self.skipped,
                "scan skipped malformed rows"
            );
        }
    }
}

impl<R: CsvRow, F: FnMut(&R) -> bool> Iterator for Scan<R, F> {
    type Item = LedgerResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lock.as_ref()?;

        loop {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(err)) => {
                    if err.is_io_error() {
                        let err = csv_error(&self.path, err);
                        self.finish();
                        return Some(Err(err));
                    }
                    // Invalid UTF-8 and similar: the line is unreadable, not the file.
                    let line = err.position().map_or(0, |p| p.line());
                    warn!(path = %self.path.display(), line, error = %err, "skipping unreadable row");
                    self.skipped += 1;
                    continue;
                }
                None => {
                    self.finish();
                    return None;
                }
            };

            let line = record.position().map_or(0, |p| p.line());
            let fields: Vec<&str> = record.iter().collect();
            match R::from_fields(line, &fields) {
                Ok(row) => {
                    if (self.predicate)(&row) {
                        return Some(Ok(row));
                    }
                }
                Err(malformed) => {
                    warn!(path = %self.path.display(), line, reason = %malformed.reason, "skipping malformed row");
                    self.skipped += 1;
                }
            }
        }
    }
}

impl SalesJournal for RecordStore<LedgerRecord> {
    fn append_sales(&self, records: &[LedgerRecord]) -> LedgerResult<()> {
        self.append(records)
    }
}
