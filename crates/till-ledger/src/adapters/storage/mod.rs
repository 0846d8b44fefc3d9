//! Storage Adapters
//!
//! CSV-file implementations of the outbound ports, plus in-memory doubles.

mod csv_file;
mod inventory_table;
pub mod memory;
mod record_store;

pub use inventory_table::InventoryTable;
pub use memory::{InMemoryJournal, InMemoryStock};
pub use record_store::{RecordStore, Scan};
