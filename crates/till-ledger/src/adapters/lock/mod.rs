//! # Advisory File Locking
//!
//! Cross-process mutual exclusion on the ledger and product files.
//!
//! ## Modules
//!
//! - `flock`: FileLock implementation using fs2

mod flock;
#[cfg(test)]
mod tests;

pub use flock::{FileLock, LockError};
