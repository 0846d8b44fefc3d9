//! # Lock Tests

use super::*;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{LockMode, LockWait};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

fn scratch_file(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("ledger.csv");
    File::create(&path).unwrap();
    path
}

fn open(path: &Path) -> File {
    OpenOptions::new().read(true).write(true).open(path).unwrap()
}

const SHORT: LockWait = LockWait::Timeout(Duration::from_millis(120));

#[test]
fn test_shared_locks_coexist() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_file(&dir);

    let first = FileLock::acquire(open(&path), &path, LockMode::Shared, SHORT)
        .expect("first reader");
    let second = FileLock::acquire(open(&path), &path, LockMode::Shared, SHORT)
        .expect("second reader");

    assert_eq!(first.mode(), LockMode::Shared);
    assert_eq!(second.path(), path.as_path());
}

#[test]
fn test_exclusive_times_out_against_reader() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_file(&dir);

    let _reader = FileLock::acquire(open(&path), &path, LockMode::Shared, LockWait::Block)
        .expect("reader");

    let started = Instant::now();
    let result = FileLock::acquire(open(&path), &path, LockMode::Exclusive, SHORT);
    assert!(matches!(
        result,
        Err(LockError::Timeout {
            mode: LockMode::Exclusive,
            ..
        })
    ));
    assert!(started.elapsed() >= Duration::from_millis(120));
}

#[test]
fn test_shared_times_out_against_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_file(&dir);

    let _writer = FileLock::acquire(open(&path), &path, LockMode::Exclusive, LockWait::Block)
        .expect("writer");

    let result = FileLock::acquire(open(&path), &path, LockMode::Shared, SHORT);
    assert!(matches!(result, Err(LockError::Timeout { .. })));
}

#[test]
fn test_lock_released_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_file(&dir);

    {
        let _lock = FileLock::acquire(open(&path), &path, LockMode::Exclusive, SHORT)
            .expect("should acquire");
    }

    // Should be able to acquire again after drop
    let again = FileLock::acquire(open(&path), &path, LockMode::Exclusive, SHORT);
    assert!(again.is_ok());
}

#[test]
fn test_blocking_wait_resumes_after_release() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_file(&dir);

    let holder = FileLock::acquire(open(&path), &path, LockMode::Exclusive, LockWait::Block)
        .expect("holder");

    let (tx, rx) = mpsc::channel();
    let waiter_path = path.clone();
    let waiter = thread::spawn(move || {
        let lock = FileLock::acquire(
            open(&waiter_path),
            &waiter_path,
            LockMode::Exclusive,
            LockWait::Block,
        )
        .expect("waiter");
        tx.send(()).unwrap();
        drop(lock);
    });

    // Still blocked while the holder keeps the lock
    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());

    drop(holder);
    rx.recv_timeout(Duration::from_secs(5))
        .expect("waiter should get the lock once released");
    waiter.join().unwrap();
}

#[test]
fn test_bounded_wait_succeeds_when_released_in_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = scratch_file(&dir);

    let holder = FileLock::acquire(open(&path), &path, LockMode::Exclusive, LockWait::Block)
        .expect("holder");
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(80));
        drop(holder);
    });

    let lock = FileLock::acquire(
        open(&path),
        &path,
        LockMode::Exclusive,
        LockWait::Timeout(Duration::from_secs(5)),
    );
    assert!(lock.is_ok());
    releaser.join().unwrap();
}

#[test]
fn test_timeout_converts_to_ledger_error() {
    let err = LockError::Timeout {
        path: PathBuf::from("sales.csv"),
        mode: LockMode::Shared,
        waited: Duration::from_millis(250),
    };

    match LedgerError::from(err) {
        LedgerError::LockTimeout {
            mode, waited_ms, ..
        } => {
            assert_eq!(mode, LockMode::Shared);
            assert_eq!(waited_ms, 250);
        }
        other => panic!("unexpected error: {other}"),
    }
}
