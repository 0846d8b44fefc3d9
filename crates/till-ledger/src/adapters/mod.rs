//! # Adapters Module
//!
//! ## Modules
//!
//! - `lock`: Advisory file locking (fs2)
//! - `storage`: Sales/cash ledgers, product table, in-memory doubles

pub mod lock;
pub mod storage;

pub use lock::{FileLock, LockError};
pub use storage::{InMemoryJournal, InMemoryStock, InventoryTable, RecordStore, Scan};
