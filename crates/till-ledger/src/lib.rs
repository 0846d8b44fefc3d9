//! # Till Ledger
//!
//! Transactional ledger and inventory reconciliation for a single-register
//! shop, kept in a directory of CSV files shared by independent processes
//! (checkout screen, product editor, report viewer).
//!
//! ## Architecture
//!
//! ```text
//! Checkout ──finalize──→ sales.csv      (1) append, exclusive lock
//!                   └──→ products.csv   (2) re-read + rewrite, exclusive lock
//! CashDrawer ──────────→ cash_flow.csv  append, exclusive lock
//! ReportAggregator ←──── sales.csv, cash_flow.csv   scan, shared lock
//! ```
//!
//! The sales ledger is the durability boundary. If step (2) fails the sale
//! stays recorded and `LedgerError::InventoryUpdateFailed` tells the caller
//! to run `Reconciler::reconcile_sale` later.
//!
//! ## Guarantees
//!
//! | Operation | Guarantee |
//! |-----------|-----------|
//! | `RecordStore::append` | One locked write per call, never interleaved |
//! | `RecordStore::scan` | Sees whole appends only |
//! | `InventoryTable::apply` | Lock held across read, modify and rewrite |
//! | `InventoryTable` rewrites | Row order and unparsed rows preserved |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Entities, CSV codec, cart, sale state machine, errors
//! - `ports/` - Outbound traits (journal, stock, clock, observer)
//! - `adapters/` - fs2 file locks, CSV-file stores, in-memory stores
//! - `service/` - `Till` handle and the services it hands out
//! - `config.rs` - `LedgerConfig` from environment
//!
//! ## Usage
//!
//! ```ignore
//! use till_ledger::{LedgerConfig, Role, Till};
//!
//! let till = Till::open(LedgerConfig::from_env())?;
//! let mut checkout = till.checkout(Role::Cashier)?;
//! checkout.enter("P001*2")?;
//! checkout.request_payment()?;
//! checkout.tender(dec!(10.00))?;
//! let sale = checkout.commit()?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use adapters::{FileLock, InMemoryJournal, InMemoryStock, InventoryTable, LockError, RecordStore};
pub use config::LedgerConfig;
pub use domain::cart::{Cart, CartLine};
pub use domain::catalog::{Catalog, EntryCode};
pub use domain::codec::CsvRow;
pub use domain::entities::{CashFlowKind, CashFlowRecord, LedgerRecord, Product, Timestamp};
pub use domain::errors::{LedgerError, LedgerResult, MalformedRow};
pub use domain::report::{Report, Summary};
pub use domain::role::{Action, Role};
pub use domain::sale::{CommittedSale, SaleState, SaleTransaction};
pub use domain::value_objects::{
    ApplyOutcome, DateRange, LockMode, LockWait, StockDeltas, StockLevel,
};
pub use ports::outbound::{Clock, FixedClock, SaleObserver, SalesJournal, StockStore, SystemClock};
pub use service::{CashDrawer, Checkout, Reconciler, Reconciliation, ReportAggregator, Till};
